use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, TernService, VectorQuery};
use tern_domain::source::SourceType;

#[derive(Debug, Clone, Deserialize)]
pub struct RetrieveRequest {
	pub trip_id: String,
	pub query: String,
	#[serde(default)]
	pub limit: Option<u32>,
	#[serde(default)]
	pub num_candidates: Option<u32>,
	#[serde(default)]
	pub source_types: Vec<SourceType>,
	#[serde(default)]
	pub embedding_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveResponse {
	pub items: Vec<RetrievedEvidence>,
}

/// One ranked hit. The vector is never returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedEvidence {
	pub id: Uuid,
	pub source_type: SourceType,
	pub text: String,
	pub url: String,
	pub title: String,
	pub score: f32,
}

impl TernService {
	/// Ranks the trip's active chunks against `query`.
	///
	/// The query is embedded with the requested model, or the configured default, and only chunks
	/// written under that same model are considered.
	pub async fn retrieve(&self, req: RetrieveRequest) -> Result<RetrieveResponse> {
		crate::require_trip_id(&req.trip_id)?;

		if req.query.trim().is_empty() {
			return Err(Error::Validation { message: "query must be non-empty.".to_string() });
		}

		let (limit, num_candidates) = self.resolve_bounds(req.limit, req.num_candidates)?;
		let model = self.resolve_model(req.embedding_model.as_deref())?;
		let mut vectors = self.embed_checked(model, std::slice::from_ref(&req.query)).await?;
		let Some(vector) = vectors.pop() else {
			return Err(Error::Provider { message: "Embedding provider returned no vector.".to_string() });
		};
		let query = VectorQuery {
			trip_id: req.trip_id.clone(),
			vector,
			embedding_model: model.to_string(),
			source_types: distinct(req.source_types),
			limit,
			num_candidates,
		};
		let hits = self.index.search(&query).await?;

		if hits.is_empty() {
			tracing::info!(trip_id = %req.trip_id, count = 0, "Evidence retrieved.");

			return Ok(RetrieveResponse { items: Vec::new() });
		}

		let ids = hits.iter().map(|hit| hit.chunk_id).collect::<Vec<_>>();
		let mut chunks = self
			.store
			.fetch_active(&req.trip_id, &ids)
			.await?
			.into_iter()
			.map(|chunk| (chunk.chunk_id, chunk))
			.collect::<HashMap<_, _>>();
		let mut items = Vec::with_capacity(hits.len());

		// Hits whose chunk is gone or inactive in the store are stale index entries.
		for hit in hits {
			let Some(chunk) = chunks.remove(&hit.chunk_id) else {
				tracing::debug!(chunk_id = %hit.chunk_id, "Dropping stale index hit.");

				continue;
			};

			items.push(RetrievedEvidence {
				id: chunk.chunk_id,
				source_type: chunk.source_type,
				text: chunk.text,
				url: chunk.url,
				title: chunk.title,
				score: hit.score,
			});
		}

		items.truncate(limit as usize);

		tracing::info!(trip_id = %req.trip_id, count = items.len(), "Evidence retrieved.");

		Ok(RetrieveResponse { items })
	}

	fn resolve_bounds(&self, limit: Option<u32>, num_candidates: Option<u32>) -> Result<(u32, u32)> {
		let cfg = &self.cfg.retrieval;
		let limit = limit.unwrap_or(cfg.default_limit);
		let num_candidates = num_candidates.unwrap_or(cfg.default_num_candidates.max(limit));

		if limit == 0 {
			return Err(Error::Validation { message: "limit must be greater than zero.".to_string() });
		}
		if num_candidates < limit {
			return Err(Error::Validation {
				message: format!("num_candidates ({num_candidates}) must be at least limit ({limit})."),
			});
		}
		if num_candidates > cfg.max_num_candidates {
			return Err(Error::Validation {
				message: format!(
					"num_candidates ({num_candidates}) exceeds the maximum of {}.",
					cfg.max_num_candidates
				),
			});
		}

		Ok((limit, num_candidates))
	}
}

fn distinct(source_types: Vec<SourceType>) -> Vec<SourceType> {
	let mut out = Vec::with_capacity(source_types.len());

	for source_type in source_types {
		if !out.contains(&source_type) {
			out.push(source_type);
		}
	}

	out
}
