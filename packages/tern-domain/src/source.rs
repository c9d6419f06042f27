use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// Category tag carried by every chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
	Web,
	Flight,
	Lodging,
}
impl SourceType {
	pub const ALL: [Self; 3] = [Self::Web, Self::Flight, Self::Lodging];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Web => "web",
			Self::Flight => "flight",
			Self::Lodging => "lodging",
		}
	}

	pub fn key_kind(self) -> KeyKind {
		match self {
			Self::Flight => KeyKind::StructuredQuery,
			Self::Web | Self::Lodging => KeyKind::ContentHash,
		}
	}
}
impl fmt::Display for SourceType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for SourceType {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		match raw {
			"web" => Ok(Self::Web),
			"flight" => Ok(Self::Flight),
			"lodging" => Ok(Self::Lodging),
			other => Err(Error::UnknownSourceType(other.to_string())),
		}
	}
}

/// How a source type derives its dedup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
	/// Hash of the search parameters. Trip-agnostic.
	StructuredQuery,
	/// Hash of the record content. Scoped to the owning trip.
	ContentHash,
}

/// Partition in which a dedup key must be unique among active chunks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupScope {
	Trip(String),
	Global,
}
impl DedupScope {
	pub fn for_record(source_type: SourceType, trip_id: &str) -> Self {
		match source_type.key_kind() {
			KeyKind::StructuredQuery => Self::Global,
			KeyKind::ContentHash => Self::Trip(trip_id.to_string()),
		}
	}

	/// Column encoding used by the chunk table and the unique-active index.
	pub fn as_column(&self) -> String {
		match self {
			Self::Trip(trip_id) => format!("trip:{trip_id}"),
			Self::Global => "global".to_string(),
		}
	}
}
