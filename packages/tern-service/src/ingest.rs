use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{ChunkLookup, Error, NewChunk, Result, TernService, WriteBatch};
use tern_domain::{
	dedup,
	record::{self, RawRecord},
	source::{DedupScope, SourceType},
};

#[derive(Debug, Clone)]
pub struct IngestRequest {
	pub trip_id: String,
	pub source_type: SourceType,
	pub records: Vec<RawRecord>,
	pub embedding_model: Option<String>,
}
impl IngestRequest {
	/// Decodes wire records declared as `source_type`.
	pub fn from_values(
		trip_id: String,
		source_type: SourceType,
		values: Vec<Value>,
		embedding_model: Option<String>,
	) -> Result<Self> {
		let records = values
			.into_iter()
			.enumerate()
			.map(|(index, value)| RawRecord::from_value(source_type, index, value))
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Self { trip_id, source_type, records, embedding_model })
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResponse {
	pub inserted: u32,
	pub replaced: u32,
	pub skipped: u32,
}

impl TernService {
	/// Deduplicates a batch against the active chunks and writes the survivors in one batch.
	///
	/// Re-running an unchanged batch writes nothing. Provider and store failures abort the whole
	/// batch.
	pub async fn ingest(&self, req: IngestRequest) -> Result<IngestResponse> {
		crate::require_trip_id(&req.trip_id)?;
		self.validate_batch(&req)?;

		if req.records.is_empty() {
			tracing::debug!(trip_id = %req.trip_id, source_type = %req.source_type, "Empty ingest batch.");

			return Ok(IngestResponse::default());
		}

		let model = self.resolve_model(req.embedding_model.as_deref())?;
		let texts = req.records.iter().map(RawRecord::text).collect::<Vec<_>>();
		let vectors = self.embed_checked(model, &texts).await?;
		let scope = DedupScope::for_record(req.source_type, &req.trip_id);
		let key_kind = req.source_type.key_kind();
		let keys = req.records.iter().map(dedup::derive_key).collect::<Vec<_>>();
		let winners = last_index_per_key(&keys);
		let now = OffsetDateTime::now_utc();
		let unix_millis = now.unix_timestamp_nanos() / 1_000_000;
		let mut response = IngestResponse::default();
		let mut batch = WriteBatch::default();

		for (index, ((record, text), vector)) in
			req.records.iter().zip(texts).zip(vectors).enumerate()
		{
			let dedup_key = &keys[index];

			if winners.get(dedup_key.as_str()) != Some(&index) {
				response.skipped += 1;

				continue;
			}

			let lookup = ChunkLookup {
				source_type: req.source_type,
				scope: scope.clone(),
				dedup_key: dedup_key.clone(),
			};
			let attributes = record.attributes();

			match self.store.find_active(&lookup).await? {
				None => response.inserted += 1,
				Some(existing) if attributes.differs_from(&existing.attributes, key_kind) => {
					batch.deactivate.push(existing.chunk_id);

					response.replaced += 1;
				},
				Some(_) => {
					response.skipped += 1;

					continue;
				},
			}

			let meta = record.meta();

			batch.insert.push(NewChunk {
				chunk_id: Uuid::new_v4(),
				trip_id: req.trip_id.clone(),
				source_id: meta
					.source_id
					.clone()
					.unwrap_or_else(|| record::synthesize_source_id(unix_millis, index)),
				source_type: req.source_type,
				url: meta.url.clone().unwrap_or_default(),
				title: record.title(),
				chunk_index: index as u32,
				text,
				tags: meta.tags.clone(),
				embedding: vector,
				embedding_model: model.to_string(),
				dedup_key: dedup_key.clone(),
				scope: scope.clone(),
				attributes,
				created_at: now,
			});
		}

		if !batch.is_empty() {
			self.store.apply(batch).await?;
		}

		tracing::info!(
			trip_id = %req.trip_id,
			source_type = %req.source_type,
			model,
			inserted = response.inserted,
			replaced = response.replaced,
			skipped = response.skipped,
			"Evidence batch ingested."
		);

		Ok(response)
	}

	fn validate_batch(&self, req: &IngestRequest) -> Result<()> {
		let max_records = self.cfg.ingestion.max_records as usize;

		if req.records.len() > max_records {
			return Err(Error::Validation {
				message: format!(
					"Ingest batch has {} records; the limit is {max_records}.",
					req.records.len()
				),
			});
		}

		if let Some((index, record)) =
			req.records.iter().enumerate().find(|(_, record)| record.source_type() != req.source_type)
		{
			return Err(Error::Validation {
				message: format!(
					"Record {index} is a {} record in a {} batch.",
					record.source_type(),
					req.source_type
				),
			});
		}

		Ok(())
	}
}

/// Input position that wins for each key when a batch repeats it: the last one.
fn last_index_per_key(keys: &[String]) -> HashMap<&str, usize> {
	keys.iter().enumerate().map(|(index, key)| (key.as_str(), index)).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn later_duplicates_win() {
		let keys = vec!["a".to_string(), "b".to_string(), "a".to_string()];
		let winners = last_index_per_key(&keys);

		assert_eq!(winners.get("a"), Some(&2));
		assert_eq!(winners.get("b"), Some(&1));
	}

	#[test]
	fn decodes_values_or_names_the_bad_record() {
		let ok = IngestRequest::from_values(
			"T1".to_string(),
			SourceType::Web,
			vec![serde_json::json!({ "text": "Ueno guide" })],
			None,
		)
		.expect("decode failed");

		assert_eq!(ok.records.len(), 1);

		let err = IngestRequest::from_values(
			"T1".to_string(),
			SourceType::Flight,
			vec![serde_json::json!({ "origin": "SFO" })],
			None,
		)
		.expect_err("Expected a validation error.");

		assert!(matches!(err, Error::Validation { .. }));
		assert!(err.to_string().contains("Record 0"));
	}
}
