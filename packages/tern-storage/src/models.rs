use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

/// One stored evidence chunk without its vector.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EvidenceChunk {
	pub chunk_id: Uuid,
	pub trip_id: String,
	pub source_id: String,
	pub source_type: String,
	pub url: String,
	pub title: String,
	pub chunk_index: i32,
	pub text: String,
	pub tags: Vec<String>,
	pub embedding_model: String,
	pub dedup_key: String,
	pub dedup_scope: String,
	pub attributes: Value,
	pub is_active: bool,
	pub created_at: OffsetDateTime,
}

/// A chunk about to be written. `embedding` is already in pgvector text form.
#[derive(Debug, Clone)]
pub struct NewEvidenceChunk {
	pub chunk_id: Uuid,
	pub trip_id: String,
	pub source_id: String,
	pub source_type: String,
	pub url: String,
	pub title: String,
	pub chunk_index: i32,
	pub text: String,
	pub tags: Vec<String>,
	pub embedding: String,
	pub embedding_model: String,
	pub dedup_key: String,
	pub dedup_scope: String,
	pub attributes: Value,
	pub created_at: OffsetDateTime,
}

/// The fields projected into the vector index, with the vector as pgvector text.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChunkProjection {
	pub chunk_id: Uuid,
	pub trip_id: String,
	pub source_type: String,
	pub dedup_key: String,
	pub embedding_model: String,
	pub is_active: bool,
	pub embedding: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct IndexOutboxEntry {
	pub outbox_id: Uuid,
	pub chunk_id: Uuid,
	pub op: String,
	pub status: String,
	pub attempts: i32,
	pub last_error: Option<String>,
	pub available_at: OffsetDateTime,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
