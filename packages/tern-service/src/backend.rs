//! Postgres + Qdrant implementation of the store and index seams.
//!
//! Postgres holds every chunk and is the only place ingest writes to. Qdrant is a projection fed
//! by the indexing outbox (see `tern-worker`) or by a full rebuild. Search results are hydrated
//! back from Postgres, so a lagging projection can hide a chunk but never resurrect one.

use std::collections::HashMap;

use qdrant_client::qdrant::{
	Condition, Filter, Query, QueryPointsBuilder, ScoredPoint, SearchParamsBuilder, Value,
	point_id::PointIdOptions, value::Kind,
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	BoxFuture, ChunkLookup, Error, EvidenceIndex, EvidenceStore, IndexHit, NewChunk, RebuildReport,
	Result, StoredChunk, VectorQuery, WriteBatch,
};
use tern_config::Config;
use tern_domain::{record::ChunkAttributes, source::SourceType};
use tern_storage::{
	chunks,
	db::Db,
	models::{EvidenceChunk, NewEvidenceChunk},
	outbox,
	qdrant::{DENSE_VECTOR_NAME, QdrantStore},
};

const REBUILD_PAGE_SIZE: i64 = 256;

pub struct StorageBackend {
	pub db: Db,
	pub qdrant: QdrantStore,
}
impl StorageBackend {
	pub fn new(db: Db, qdrant: QdrantStore) -> Self {
		Self { db, qdrant }
	}

	/// Connects to both stores and bootstraps the schema and the collection.
	pub async fn connect(cfg: &Config) -> Result<Self> {
		let db = Db::connect(&cfg.storage.postgres).await?;

		db.ensure_schema(cfg.storage.qdrant.vector_dim).await?;

		let qdrant = QdrantStore::new(&cfg.storage.qdrant)?;

		qdrant.ensure_collection().await?;

		Ok(Self { db, qdrant })
	}

	async fn find_active_row(&self, lookup: &ChunkLookup) -> Result<Option<StoredChunk>> {
		let row = chunks::find_active_chunk(
			&self.db.pool,
			lookup.source_type.as_str(),
			&lookup.scope.as_column(),
			&lookup.dedup_key,
		)
		.await?;

		row.map(stored_chunk).transpose()
	}

	async fn apply_batch(&self, batch: WriteBatch) -> Result<()> {
		let now = OffsetDateTime::now_utc();
		let rows = batch.insert.iter().map(new_row).collect::<Result<Vec<_>>>()?;
		let mut tx = self.db.pool.begin().await?;

		for chunk_id in &batch.deactivate {
			chunks::deactivate_chunk(&mut *tx, *chunk_id).await?;
			outbox::enqueue_index_outbox(&mut *tx, *chunk_id, outbox::OP_DEACTIVATE, now).await?;
		}

		chunks::insert_chunks(&mut *tx, &rows).await?;

		for row in &rows {
			outbox::enqueue_index_outbox(&mut *tx, row.chunk_id, outbox::OP_UPSERT, now).await?;
		}

		tx.commit().await?;

		tracing::debug!(
			deactivated = batch.deactivate.len(),
			inserted = rows.len(),
			"Chunk batch committed."
		);

		Ok(())
	}

	async fn fetch_active_rows(&self, trip_id: &str, chunk_ids: &[Uuid]) -> Result<Vec<StoredChunk>> {
		chunks::fetch_active_chunks(&self.db.pool, trip_id, chunk_ids)
			.await?
			.into_iter()
			.map(stored_chunk)
			.collect()
	}

	async fn search_points(&self, query: &VectorQuery) -> Result<Vec<IndexHit>> {
		let search = QueryPointsBuilder::new(self.qdrant.collection.clone())
			.query(Query::new_nearest(query.vector.clone()))
			.using(DENSE_VECTOR_NAME)
			.filter(search_filter(query))
			.params(SearchParamsBuilder::default().hnsw_ef(query.num_candidates as u64))
			.limit(query.limit as u64)
			.with_payload(true);
		let response = self.qdrant.client.query(search).await?;
		let hits = response.result.iter().filter_map(index_hit).collect::<Vec<_>>();

		Ok(hits)
	}

	async fn rebuild_points(&self) -> Result<RebuildReport> {
		let expected_dim = self.qdrant.vector_dim as usize;
		let mut report = RebuildReport::default();
		let mut after = None;

		loop {
			let page = chunks::list_projections(&self.db.pool, after, REBUILD_PAGE_SIZE).await?;
			let Some(last) = page.last() else {
				break;
			};

			after = Some(last.chunk_id);

			for projection in page {
				let Some(vec_text) = projection.embedding.as_deref() else {
					report.missing_vector_count += 1;

					continue;
				};
				let vec = match chunks::parse_vector_text(vec_text) {
					Ok(vec) if vec.len() == expected_dim => vec,
					_ => {
						report.error_count += 1;

						continue;
					},
				};

				if let Err(err) = self.qdrant.upsert_chunk(&projection, vec).await {
					tracing::warn!(chunk_id = %projection.chunk_id, error = %err, "Rebuild upsert failed.");

					report.error_count += 1;

					continue;
				}

				report.rebuilt_count += 1;
			}
		}

		Ok(report)
	}
}

impl EvidenceStore for StorageBackend {
	fn find_active<'a>(&'a self, lookup: &'a ChunkLookup) -> BoxFuture<'a, Result<Option<StoredChunk>>> {
		Box::pin(self.find_active_row(lookup))
	}

	fn apply(&self, batch: WriteBatch) -> BoxFuture<'_, Result<()>> {
		Box::pin(self.apply_batch(batch))
	}

	fn fetch_active<'a>(
		&'a self,
		trip_id: &'a str,
		chunk_ids: &'a [Uuid],
	) -> BoxFuture<'a, Result<Vec<StoredChunk>>> {
		Box::pin(self.fetch_active_rows(trip_id, chunk_ids))
	}
}

impl EvidenceIndex for StorageBackend {
	fn search<'a>(&'a self, query: &'a VectorQuery) -> BoxFuture<'a, Result<Vec<IndexHit>>> {
		Box::pin(self.search_points(query))
	}

	fn rebuild(&self) -> BoxFuture<'_, Result<RebuildReport>> {
		Box::pin(self.rebuild_points())
	}
}

/// `trip_id`, `is_active` and `embedding_model` must match; `source_type` must be in the set
/// when one is given.
pub fn search_filter(query: &VectorQuery) -> Filter {
	let mut must = vec![
		Condition::matches("trip_id", query.trip_id.clone()),
		Condition::matches("is_active", true),
		Condition::matches("embedding_model", query.embedding_model.clone()),
	];

	if !query.source_types.is_empty() {
		let source_types =
			query.source_types.iter().map(|source_type| source_type.as_str().to_string()).collect::<Vec<_>>();

		must.push(Condition::matches("source_type", source_types));
	}

	Filter::must(must)
}

fn index_hit(point: &ScoredPoint) -> Option<IndexHit> {
	let chunk_id = point
		.id
		.as_ref()
		.and_then(|id| match &id.point_id_options {
			Some(PointIdOptions::Uuid(id)) => Uuid::parse_str(id).ok(),
			_ => None,
		})
		.or_else(|| payload_uuid(&point.payload, "chunk_id"))?;

	Some(IndexHit { chunk_id, score: point.score })
}

fn payload_uuid(payload: &HashMap<String, Value>, key: &str) -> Option<Uuid> {
	match &payload.get(key)?.kind {
		Some(Kind::StringValue(text)) => Uuid::parse_str(text).ok(),
		_ => None,
	}
}

fn stored_chunk(row: EvidenceChunk) -> Result<StoredChunk> {
	let source_type = row.source_type.parse::<SourceType>().map_err(|err| Error::Storage {
		message: format!("Chunk {} has an invalid source type: {err}", row.chunk_id),
	})?;
	let attributes: ChunkAttributes =
		serde_json::from_value(row.attributes).map_err(|err| Error::Storage {
			message: format!("Chunk {} has invalid attributes: {err}", row.chunk_id),
		})?;

	Ok(StoredChunk {
		chunk_id: row.chunk_id,
		trip_id: row.trip_id,
		source_id: row.source_id,
		source_type,
		url: row.url,
		title: row.title,
		chunk_index: row.chunk_index.max(0) as u32,
		text: row.text,
		tags: row.tags,
		embedding_model: row.embedding_model,
		dedup_key: row.dedup_key,
		attributes,
		is_active: row.is_active,
		created_at: row.created_at,
	})
}

fn new_row(chunk: &NewChunk) -> Result<NewEvidenceChunk> {
	let attributes = serde_json::to_value(&chunk.attributes).map_err(|err| Error::Storage {
		message: format!("Failed to encode chunk attributes: {err}"),
	})?;

	Ok(NewEvidenceChunk {
		chunk_id: chunk.chunk_id,
		trip_id: chunk.trip_id.clone(),
		source_id: chunk.source_id.clone(),
		source_type: chunk.source_type.as_str().to_string(),
		url: chunk.url.clone(),
		title: chunk.title.clone(),
		chunk_index: chunk.chunk_index as i32,
		text: chunk.text.clone(),
		tags: chunk.tags.clone(),
		embedding: chunks::format_vector_text(&chunk.embedding),
		embedding_model: chunk.embedding_model.clone(),
		dedup_key: chunk.dedup_key.clone(),
		dedup_scope: chunk.scope.as_column(),
		attributes,
		created_at: chunk.created_at,
	})
}
