pub mod action;
pub mod admin;
pub mod backend;
pub mod ingest;
pub mod retrieve;

mod error;

pub use action::{ActionRequest, ActionResponse, Intent};
pub use admin::RebuildReport;
pub use backend::StorageBackend;
pub use error::{Error, Result};
pub use ingest::{IngestRequest, IngestResponse};
pub use retrieve::{RetrieveRequest, RetrieveResponse, RetrievedEvidence};

use std::{future::Future, pin::Pin, sync::Arc};

use time::OffsetDateTime;
use uuid::Uuid;

use tern_config::{Config, EmbeddingProviderConfig};
use tern_domain::{
	record::ChunkAttributes,
	source::{DedupScope, SourceType},
};
use tern_providers::embedding;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Turns text into vectors under a caller-chosen model.
///
/// Implementations must return exactly one vector per input, in input order, and must not be
/// called with an empty slice.
pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		model: &'a str,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// Source of truth for chunks.
pub trait EvidenceStore
where
	Self: Send + Sync,
{
	fn find_active<'a>(&'a self, lookup: &'a ChunkLookup) -> BoxFuture<'a, Result<Option<StoredChunk>>>;

	/// Applies every soft delete and insert of one ingest batch, or none of them.
	///
	/// Fails with `Error::Conflict` when a soft delete finds its chunk already inactive or an insert
	/// would leave two active chunks for one key.
	fn apply(&self, batch: WriteBatch) -> BoxFuture<'_, Result<()>>;

	/// Active chunks of `trip_id` among `chunk_ids`, in no particular order.
	fn fetch_active<'a>(
		&'a self,
		trip_id: &'a str,
		chunk_ids: &'a [Uuid],
	) -> BoxFuture<'a, Result<Vec<StoredChunk>>>;
}

/// Approximate nearest-neighbor index over chunk vectors.
pub trait EvidenceIndex
where
	Self: Send + Sync,
{
	/// Hits ordered by descending score.
	fn search<'a>(&'a self, query: &'a VectorQuery) -> BoxFuture<'a, Result<Vec<IndexHit>>>;

	fn rebuild(&self) -> BoxFuture<'_, Result<RebuildReport>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkLookup {
	pub source_type: SourceType,
	pub scope: DedupScope,
	pub dedup_key: String,
}

#[derive(Debug, Clone)]
pub struct StoredChunk {
	pub chunk_id: Uuid,
	pub trip_id: String,
	pub source_id: String,
	pub source_type: SourceType,
	pub url: String,
	pub title: String,
	pub chunk_index: u32,
	pub text: String,
	pub tags: Vec<String>,
	pub embedding_model: String,
	pub dedup_key: String,
	pub attributes: ChunkAttributes,
	pub is_active: bool,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewChunk {
	pub chunk_id: Uuid,
	pub trip_id: String,
	pub source_id: String,
	pub source_type: SourceType,
	pub url: String,
	pub title: String,
	pub chunk_index: u32,
	pub text: String,
	pub tags: Vec<String>,
	pub embedding: Vec<f32>,
	pub embedding_model: String,
	pub dedup_key: String,
	pub scope: DedupScope,
	pub attributes: ChunkAttributes,
	pub created_at: OffsetDateTime,
}
impl NewChunk {
	pub fn into_stored(self) -> (StoredChunk, DedupScope, Vec<f32>) {
		let stored = StoredChunk {
			chunk_id: self.chunk_id,
			trip_id: self.trip_id,
			source_id: self.source_id,
			source_type: self.source_type,
			url: self.url,
			title: self.title,
			chunk_index: self.chunk_index,
			text: self.text,
			tags: self.tags,
			embedding_model: self.embedding_model,
			dedup_key: self.dedup_key,
			attributes: self.attributes,
			is_active: true,
			created_at: self.created_at,
		};

		(stored, self.scope, self.embedding)
	}
}

/// Writes decided by one ingest call.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
	pub deactivate: Vec<Uuid>,
	pub insert: Vec<NewChunk>,
}
impl WriteBatch {
	pub fn is_empty(&self) -> bool {
		self.deactivate.is_empty() && self.insert.is_empty()
	}
}

#[derive(Debug, Clone)]
pub struct VectorQuery {
	pub trip_id: String,
	pub vector: Vec<f32>,
	pub embedding_model: String,
	/// Empty means every source type.
	pub source_types: Vec<SourceType>,
	pub limit: u32,
	pub num_candidates: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexHit {
	pub chunk_id: Uuid,
	pub score: f32,
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>) -> Self {
		Self { embedding }
	}
}
impl Default for Providers {
	fn default() -> Self {
		Self { embedding: Arc::new(HttpEmbeddingProvider) }
	}
}

pub struct TernService {
	pub cfg: Config,
	pub store: Arc<dyn EvidenceStore>,
	pub index: Arc<dyn EvidenceIndex>,
	pub providers: Providers,
}
impl TernService {
	pub fn new(
		cfg: Config,
		store: Arc<dyn EvidenceStore>,
		index: Arc<dyn EvidenceIndex>,
		providers: Providers,
	) -> Self {
		Self { cfg, store, index, providers }
	}

	/// Model named by the request, else the configured default.
	pub(crate) fn resolve_model<'a>(&'a self, requested: Option<&'a str>) -> Result<&'a str> {
		match requested {
			Some(model) if model.trim().is_empty() => Err(Error::Validation {
				message: "embedding_model must be non-empty when set.".to_string(),
			}),
			Some(model) => Ok(model),
			None => Ok(self.cfg.providers.embedding.model.as_str()),
		}
	}

	/// Embeds `texts` and checks the provider kept its count and dimension promises.
	pub(crate) async fn embed_checked(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>> {
		let vectors =
			self.providers.embedding.embed(&self.cfg.providers.embedding, model, texts).await?;

		if vectors.len() != texts.len() {
			return Err(Error::Provider {
				message: format!(
					"Embedding provider returned {} vectors for {} inputs.",
					vectors.len(),
					texts.len()
				),
			});
		}

		let expected = self.cfg.storage.qdrant.vector_dim as usize;

		if let Some(vector) = vectors.iter().find(|vector| vector.len() != expected) {
			return Err(Error::Provider {
				message: format!(
					"Embedding dimension mismatch: expected {expected}, got {}.",
					vector.len()
				),
			});
		}

		Ok(vectors)
	}
}

struct HttpEmbeddingProvider;
impl EmbeddingProvider for HttpEmbeddingProvider {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		model: &'a str,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(embedding::embed(cfg, model, texts).await?) })
	}
}

pub(crate) fn require_trip_id(trip_id: &str) -> Result<()> {
	if trip_id.trim().is_empty() {
		return Err(Error::Validation { message: "trip_id must be non-empty.".to_string() });
	}

	Ok(())
}
