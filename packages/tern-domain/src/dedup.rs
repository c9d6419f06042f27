//! Dedup key derivation.
//!
//! Two records describe the same underlying fact iff they produce the same key. Field values are
//! hashed verbatim: case, whitespace, and date formats are not normalized.

use crate::record::{
	DEFAULT_CABIN_CLASS, DEFAULT_PASSENGERS, FlightRecord, LodgingRecord, RawRecord, WebRecord,
};

pub fn derive_key(record: &RawRecord) -> String {
	match record {
		RawRecord::Flight(flight) => flight_query_key(flight),
		RawRecord::Lodging(lodging) => lodging_content_key(lodging),
		RawRecord::Web(web) => web_content_key(web),
	}
}

/// Hash of the canonical search tuple. Price, duration, and stops are not part of the identity.
pub fn flight_query_key(flight: &FlightRecord) -> String {
	let canonical = serde_json::json!({
		"origin": flight.origin,
		"destination": flight.destination,
		"departureDate": flight.departure_date,
		"returnDate": flight.return_date,
		"passengers": flight.passengers.unwrap_or(DEFAULT_PASSENGERS),
		"cabinClass": flight.cabin_class.as_deref().unwrap_or(DEFAULT_CABIN_CLASS),
	});

	digest(canonical.to_string().as_bytes())
}

pub fn lodging_content_key(lodging: &LodgingRecord) -> String {
	let amenities = lodging.amenities.join(",");

	content_hash(&[
		lodging.title.as_str(),
		lodging.description.as_deref().unwrap_or_default(),
		amenities.as_str(),
	])
}

pub fn web_content_key(web: &WebRecord) -> String {
	let text = web.text.as_deref().or(web.title.as_deref()).unwrap_or_default();

	content_hash(&[text])
}

/// Hash of the ordered fields joined with `|`.
pub fn content_hash(fields: &[&str]) -> String {
	digest(fields.join("|").as_bytes())
}

fn digest(bytes: &[u8]) -> String {
	blake3::hash(bytes).to_hex().to_string()
}
