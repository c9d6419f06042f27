use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
	Error, Result,
	source::{KeyKind, SourceType},
};

pub const DEFAULT_PASSENGERS: u32 = 1;
pub const DEFAULT_CABIN_CLASS: &str = "Economy";
pub const DEFAULT_TITLE: &str = "Source";

/// Presentation metadata shared by every record shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMeta {
	#[serde(default, alias = "sourceId")]
	pub source_id: Option<String>,
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub tags: Vec<String>,
}

/// A priced itinerary returned for one flight search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
	pub origin: String,
	pub destination: String,
	#[serde(alias = "departureDate")]
	pub departure_date: String,
	#[serde(default, alias = "returnDate")]
	pub return_date: Option<String>,
	#[serde(default)]
	pub passengers: Option<u32>,
	#[serde(default, alias = "cabinClass")]
	pub cabin_class: Option<String>,
	#[serde(default)]
	pub airline: Option<String>,
	#[serde(default)]
	pub price: Option<f64>,
	#[serde(default)]
	pub duration: Option<String>,
	#[serde(default)]
	pub stops: Option<u32>,
	#[serde(default)]
	pub title: Option<String>,
	#[serde(flatten)]
	pub meta: RecordMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LodgingRecord {
	pub title: String,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub amenities: Vec<String>,
	#[serde(default)]
	pub price: Option<f64>,
	#[serde(flatten)]
	pub meta: RecordMeta,
}

/// A scraped web snippet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebRecord {
	#[serde(default)]
	pub text: Option<String>,
	#[serde(default)]
	pub title: Option<String>,
	#[serde(flatten)]
	pub meta: RecordMeta,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
	Flight(FlightRecord),
	Lodging(LodgingRecord),
	Web(WebRecord),
}
impl RawRecord {
	/// Decodes one wire record declared as `source_type`.
	pub fn from_value(source_type: SourceType, index: usize, value: Value) -> Result<Self> {
		let shape_error = |err: serde_json::Error| Error::RecordShape {
			index,
			source_type: source_type.as_str(),
			message: err.to_string(),
		};

		match source_type {
			SourceType::Flight => serde_json::from_value(value).map(Self::Flight).map_err(shape_error),
			SourceType::Lodging =>
				serde_json::from_value(value).map(Self::Lodging).map_err(shape_error),
			SourceType::Web => serde_json::from_value(value).map(Self::Web).map_err(shape_error),
		}
	}

	pub fn source_type(&self) -> SourceType {
		match self {
			Self::Flight(_) => SourceType::Flight,
			Self::Lodging(_) => SourceType::Lodging,
			Self::Web(_) => SourceType::Web,
		}
	}

	pub fn meta(&self) -> &RecordMeta {
		match self {
			Self::Flight(flight) => &flight.meta,
			Self::Lodging(lodging) => &lodging.meta,
			Self::Web(web) => &web.meta,
		}
	}

	pub fn title(&self) -> String {
		match self {
			Self::Flight(flight) => flight
				.title
				.clone()
				.or_else(|| flight.airline.clone())
				.unwrap_or_else(|| "Flight".to_string()),
			Self::Lodging(lodging) => non_blank(&lodging.title)
				.map(str::to_string)
				.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
			Self::Web(web) => web.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
		}
	}

	/// Text handed to the embedding provider and stored on the chunk.
	pub fn text(&self) -> String {
		match self {
			Self::Flight(flight) => format!(
				"{} {} {} {} stops",
				flight.airline.as_deref().unwrap_or("Flight"),
				flight.price.map(|price| price.to_string()).as_deref().unwrap_or("price unknown"),
				flight.duration.as_deref().unwrap_or("duration unknown"),
				flight.stops.map(|stops| stops.to_string()).as_deref().unwrap_or("n/a"),
			),
			Self::Lodging(lodging) => {
				let amenities = lodging.amenities.join(", ");
				let parts = [
					lodging.title.as_str(),
					lodging.description.as_deref().unwrap_or_default(),
					amenities.as_str(),
				];

				parts.iter().filter_map(|part| non_blank(part)).collect::<Vec<_>>().join(" ")
			},
			Self::Web(web) =>
				web.text.clone().or_else(|| web.title.clone()).unwrap_or_default(),
		}
	}

	/// Fields compared against the active chunk to detect a material change.
	pub fn attributes(&self) -> ChunkAttributes {
		match self {
			Self::Flight(flight) => ChunkAttributes {
				price: flight.price,
				duration: flight.duration.clone(),
				stops: flight.stops,
				description: None,
			},
			Self::Lodging(lodging) => ChunkAttributes {
				price: lodging.price,
				description: lodging.description.clone(),
				..Default::default()
			},
			Self::Web(_) => ChunkAttributes::default(),
		}
	}
}

/// Category-specific mutable fields persisted beside a chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkAttributes {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub price: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub duration: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stops: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
}
impl ChunkAttributes {
	/// Raw equality, no normalization: "11h" and "11 h" differ.
	pub fn differs_from(&self, existing: &Self, kind: KeyKind) -> bool {
		match kind {
			KeyKind::StructuredQuery =>
				self.price != existing.price
					|| self.duration != existing.duration
					|| self.stops != existing.stops,
			KeyKind::ContentHash => self.description != existing.description,
		}
	}
}

/// Source id used when the caller did not supply one.
pub fn synthesize_source_id(unix_millis: i128, index: usize) -> String {
	format!("src_{unix_millis}_{index}")
}

fn non_blank(value: &str) -> Option<&str> {
	if value.trim().is_empty() { None } else { Some(value) }
}
