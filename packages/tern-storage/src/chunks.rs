use sqlx::{PgExecutor, QueryBuilder};
use uuid::Uuid;

use crate::{
	Error, Result,
	models::{ChunkProjection, EvidenceChunk, NewEvidenceChunk},
};

const CHUNK_COLUMNS: &str = "\
chunk_id,
	trip_id,
	source_id,
	source_type,
	url,
	title,
	chunk_index,
	text,
	tags,
	embedding_model,
	dedup_key,
	dedup_scope,
	attributes,
	is_active,
	created_at";

pub async fn find_active_chunk<'e, E>(
	executor: E,
	source_type: &str,
	dedup_scope: &str,
	dedup_key: &str,
) -> Result<Option<EvidenceChunk>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
SELECT {CHUNK_COLUMNS}
FROM evidence_chunks
WHERE source_type = $1 AND dedup_scope = $2 AND dedup_key = $3 AND is_active"
	);
	let row = sqlx::query_as::<_, EvidenceChunk>(&sql)
		.bind(source_type)
		.bind(dedup_scope)
		.bind(dedup_key)
		.fetch_optional(executor)
		.await?;

	Ok(row)
}

/// Writes all chunks in one statement. A clash with an active key surfaces as `Conflict`.
pub async fn insert_chunks<'e, E>(executor: E, chunks: &[NewEvidenceChunk]) -> Result<()>
where
	E: PgExecutor<'e>,
{
	if chunks.is_empty() {
		return Ok(());
	}

	let mut builder = QueryBuilder::new(
		"\
INSERT INTO evidence_chunks (
	chunk_id,
	trip_id,
	source_id,
	source_type,
	url,
	title,
	chunk_index,
	text,
	tags,
	embedding,
	embedding_model,
	dedup_key,
	dedup_scope,
	attributes,
	is_active,
	created_at
) ",
	);

	builder.push_values(chunks, |mut b, chunk| {
		b.push_bind(chunk.chunk_id)
			.push_bind(chunk.trip_id.as_str())
			.push_bind(chunk.source_id.as_str())
			.push_bind(chunk.source_type.as_str())
			.push_bind(chunk.url.as_str())
			.push_bind(chunk.title.as_str())
			.push_bind(chunk.chunk_index)
			.push_bind(chunk.text.as_str())
			.push_bind(chunk.tags.as_slice())
			.push_bind(chunk.embedding.as_str())
			.push_unseparated("::text::vector")
			.push_bind(chunk.embedding_model.as_str())
			.push_bind(chunk.dedup_key.as_str())
			.push_bind(chunk.dedup_scope.as_str())
			.push_bind(&chunk.attributes)
			.push_bind(true)
			.push_bind(chunk.created_at);
	});
	builder
		.build()
		.execute(executor)
		.await
		.map_err(|err| Error::from_write(err, "Active chunk already exists for dedup key"))?;

	Ok(())
}

/// Soft-deletes an active chunk. Fails with `Conflict` when the chunk is no longer active.
pub async fn deactivate_chunk<'e, E>(executor: E, chunk_id: Uuid) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"UPDATE evidence_chunks SET is_active = false WHERE chunk_id = $1 AND is_active",
	)
	.bind(chunk_id)
	.execute(executor)
	.await?;

	if result.rows_affected() == 0 {
		return Err(Error::Conflict(format!("Chunk {chunk_id} is no longer active.")));
	}

	Ok(())
}

/// Loads active chunks of one trip by id. Order is unspecified.
pub async fn fetch_active_chunks<'e, E>(
	executor: E,
	trip_id: &str,
	chunk_ids: &[Uuid],
) -> Result<Vec<EvidenceChunk>>
where
	E: PgExecutor<'e>,
{
	if chunk_ids.is_empty() {
		return Ok(Vec::new());
	}

	let sql = format!(
		"\
SELECT {CHUNK_COLUMNS}
FROM evidence_chunks
WHERE chunk_id = ANY($1) AND trip_id = $2 AND is_active"
	);
	let rows = sqlx::query_as::<_, EvidenceChunk>(&sql)
		.bind(chunk_ids)
		.bind(trip_id)
		.fetch_all(executor)
		.await?;

	Ok(rows)
}

/// Every chunk ever written for one key, newest first.
pub async fn list_key_history<'e, E>(
	executor: E,
	source_type: &str,
	dedup_scope: &str,
	dedup_key: &str,
) -> Result<Vec<EvidenceChunk>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
SELECT {CHUNK_COLUMNS}
FROM evidence_chunks
WHERE source_type = $1 AND dedup_scope = $2 AND dedup_key = $3
ORDER BY created_at DESC, chunk_id"
	);
	let rows = sqlx::query_as::<_, EvidenceChunk>(&sql)
		.bind(source_type)
		.bind(dedup_scope)
		.bind(dedup_key)
		.fetch_all(executor)
		.await?;

	Ok(rows)
}

pub async fn fetch_projection<'e, E>(executor: E, chunk_id: Uuid) -> Result<Option<ChunkProjection>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, ChunkProjection>(
		"\
SELECT
	chunk_id,
	trip_id,
	source_type,
	dedup_key,
	embedding_model,
	is_active,
	embedding::text AS embedding
FROM evidence_chunks
WHERE chunk_id = $1",
	)
	.bind(chunk_id)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

/// One page of projections ordered by `chunk_id`, starting after `after`.
pub async fn list_projections<'e, E>(
	executor: E,
	after: Option<Uuid>,
	limit: i64,
) -> Result<Vec<ChunkProjection>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, ChunkProjection>(
		"\
SELECT
	chunk_id,
	trip_id,
	source_type,
	dedup_key,
	embedding_model,
	is_active,
	embedding::text AS embedding
FROM evidence_chunks
WHERE $1::uuid IS NULL OR chunk_id > $1
ORDER BY chunk_id
LIMIT $2",
	)
	.bind(after)
	.bind(limit)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

/// Renders a vector in pgvector text form.
pub fn format_vector_text(vec: &[f32]) -> String {
	let mut out = String::with_capacity(vec.len() * 8);

	out.push('[');

	for (idx, value) in vec.iter().enumerate() {
		if idx > 0 {
			out.push(',');
		}

		out.push_str(&value.to_string());
	}

	out.push(']');

	out
}

pub fn parse_vector_text(text: &str) -> Result<Vec<f32>> {
	let trimmed = text.trim();
	let without_brackets =
		trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')).ok_or_else(|| {
			Error::InvalidArgument("Vector text is not bracketed.".to_string())
		})?;

	if without_brackets.trim().is_empty() {
		return Ok(Vec::new());
	}

	let mut vec = Vec::new();

	for part in without_brackets.split(',') {
		let value: f32 = part.trim().parse().map_err(|_| {
			Error::InvalidArgument("Vector text contains a non-numeric value.".to_string())
		})?;

		vec.push(value);
	}

	Ok(vec)
}
