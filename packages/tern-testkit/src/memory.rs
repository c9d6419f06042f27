//! In-process store and index with the same contracts as the Postgres + Qdrant backend.

use std::{
	collections::HashSet,
	sync::{Arc, Mutex, MutexGuard},
};

use uuid::Uuid;

use tern_domain::source::{DedupScope, SourceType};
use tern_service::{
	BoxFuture, ChunkLookup, Error, EvidenceIndex, EvidenceStore, IndexHit, NewChunk, RebuildReport,
	Result, StoredChunk, VectorQuery, WriteBatch,
};

struct MemoryChunk {
	chunk: StoredChunk,
	scope: DedupScope,
	embedding: Vec<f32>,
}
impl MemoryChunk {
	fn holds_key(&self, source_type: SourceType, scope: &DedupScope, dedup_key: &str) -> bool {
		self.chunk.is_active
			&& self.chunk.source_type == source_type
			&& &self.scope == scope
			&& self.chunk.dedup_key == dedup_key
	}
}

/// Chunk table and exact-cosine index sharing one list.
///
/// `apply` is all-or-nothing and enforces one active chunk per key, like the partial unique
/// index in Postgres.
#[derive(Default)]
pub struct MemoryEvidence {
	chunks: Mutex<Vec<MemoryChunk>>,
}
impl MemoryEvidence {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Every chunk ever written, including inactive ones, in write order.
	pub fn chunks(&self) -> Vec<StoredChunk> {
		self.lock().iter().map(|entry| entry.chunk.clone()).collect()
	}

	pub fn active_chunks(&self) -> Vec<StoredChunk> {
		self.lock().iter().filter(|entry| entry.chunk.is_active).map(|entry| entry.chunk.clone()).collect()
	}

	pub fn embedding_of(&self, chunk_id: Uuid) -> Option<Vec<f32>> {
		self.lock()
			.iter()
			.find(|entry| entry.chunk.chunk_id == chunk_id)
			.map(|entry| entry.embedding.clone())
	}

	/// Writes a chunk directly, bypassing ingestion.
	pub fn seed(&self, chunk: NewChunk, is_active: bool) -> Uuid {
		let (mut chunk, scope, embedding) = chunk.into_stored();
		let chunk_id = chunk.chunk_id;

		chunk.is_active = is_active;

		self.lock().push(MemoryChunk { chunk, scope, embedding });

		chunk_id
	}

	fn lock(&self) -> MutexGuard<'_, Vec<MemoryChunk>> {
		self.chunks.lock().unwrap_or_else(|err| err.into_inner())
	}

	fn apply_batch(&self, batch: WriteBatch) -> Result<()> {
		let mut chunks = self.lock();
		let retiring = batch.deactivate.iter().copied().collect::<HashSet<_>>();

		for chunk_id in &retiring {
			if !chunks.iter().any(|entry| entry.chunk.chunk_id == *chunk_id && entry.chunk.is_active)
			{
				return Err(Error::Conflict { message: format!("Chunk {chunk_id} is no longer active.") });
			}
		}

		let mut claimed = HashSet::new();

		for chunk in &batch.insert {
			let key = (chunk.source_type, chunk.scope.clone(), chunk.dedup_key.clone());
			let taken = chunks.iter().any(|entry| {
				!retiring.contains(&entry.chunk.chunk_id)
					&& entry.holds_key(chunk.source_type, &chunk.scope, &chunk.dedup_key)
			});

			if taken || !claimed.insert(key) {
				return Err(Error::Conflict {
					message: format!("Active chunk already exists for key {}.", chunk.dedup_key),
				});
			}
		}

		for entry in chunks.iter_mut() {
			if retiring.contains(&entry.chunk.chunk_id) {
				entry.chunk.is_active = false;
			}
		}
		for chunk in batch.insert {
			let (chunk, scope, embedding) = chunk.into_stored();

			chunks.push(MemoryChunk { chunk, scope, embedding });
		}

		Ok(())
	}

	fn rank(&self, query: &VectorQuery) -> Vec<IndexHit> {
		let chunks = self.lock();
		let mut hits = chunks
			.iter()
			.filter(|entry| {
				entry.chunk.is_active
					&& entry.chunk.trip_id == query.trip_id
					&& entry.chunk.embedding_model == query.embedding_model
					&& (query.source_types.is_empty()
						|| query.source_types.contains(&entry.chunk.source_type))
			})
			.map(|entry| IndexHit {
				chunk_id: entry.chunk.chunk_id,
				score: cosine(&query.vector, &entry.embedding),
			})
			.collect::<Vec<_>>();

		hits.sort_by(|a, b| b.score.total_cmp(&a.score));
		hits.truncate(query.limit as usize);

		hits
	}
}

impl EvidenceStore for MemoryEvidence {
	fn find_active<'a>(&'a self, lookup: &'a ChunkLookup) -> BoxFuture<'a, Result<Option<StoredChunk>>> {
		let found = self
			.lock()
			.iter()
			.find(|entry| entry.holds_key(lookup.source_type, &lookup.scope, &lookup.dedup_key))
			.map(|entry| entry.chunk.clone());

		Box::pin(async move { Ok(found) })
	}

	fn apply(&self, batch: WriteBatch) -> BoxFuture<'_, Result<()>> {
		let result = self.apply_batch(batch);

		Box::pin(async move { result })
	}

	fn fetch_active<'a>(
		&'a self,
		trip_id: &'a str,
		chunk_ids: &'a [Uuid],
	) -> BoxFuture<'a, Result<Vec<StoredChunk>>> {
		let found = self
			.lock()
			.iter()
			.filter(|entry| {
				entry.chunk.is_active
					&& entry.chunk.trip_id == trip_id
					&& chunk_ids.contains(&entry.chunk.chunk_id)
			})
			.map(|entry| entry.chunk.clone())
			.collect();

		Box::pin(async move { Ok(found) })
	}
}

impl EvidenceIndex for MemoryEvidence {
	fn search<'a>(&'a self, query: &'a VectorQuery) -> BoxFuture<'a, Result<Vec<IndexHit>>> {
		let hits = self.rank(query);

		Box::pin(async move { Ok(hits) })
	}

	fn rebuild(&self) -> BoxFuture<'_, Result<RebuildReport>> {
		let rebuilt_count = self.lock().len() as u64;

		Box::pin(async move { Ok(RebuildReport { rebuilt_count, ..Default::default() }) })
	}
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
	let dot = a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
	let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
	let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

	if norm_a == 0.0 || norm_b == 0.0 { 0.0 } else { dot / (norm_a * norm_b) }
}
