use std::time::Duration as StdDuration;

use time::{Duration, OffsetDateTime};
use tokio::time as tokio_time;

use crate::{Error, Result};
use tern_storage::{
	chunks,
	db::Db,
	models::IndexOutboxEntry,
	outbox::{self, OP_DEACTIVATE, OP_UPSERT},
	qdrant::{self, QdrantStore},
};

const POLL_INTERVAL_MS: i64 = 500;
const CLAIM_LEASE_SECONDS: i64 = 30;
const BASE_BACKOFF_MS: i64 = 500;
const MAX_BACKOFF_MS: i64 = 30_000;
const MAX_OUTBOX_ERROR_CHARS: usize = 1_024;

pub struct WorkerState {
	pub db: Db,
	pub qdrant: QdrantStore,
}

/// What one pass over the outbox did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
	Idle,
	Done,
	Failed,
}

pub async fn run_worker(state: WorkerState) -> Result<()> {
	loop {
		match process_index_outbox_once(&state).await {
			// Keep draining while there is work.
			Ok(JobOutcome::Done | JobOutcome::Failed) => continue,
			Ok(JobOutcome::Idle) => {},
			Err(err) => {
				tracing::error!(error = %err, "Index outbox processing failed.");
			},
		}

		tokio_time::sleep(to_std_duration(Duration::milliseconds(POLL_INTERVAL_MS))).await;
	}
}

/// Claims one due job, projects it into Qdrant, and records the result.
pub async fn process_index_outbox_once(state: &WorkerState) -> Result<JobOutcome> {
	let now = OffsetDateTime::now_utc();
	let Some(job) = outbox::claim_next_index_job(&state.db, now, CLAIM_LEASE_SECONDS).await? else {
		return Ok(JobOutcome::Idle);
	};

	match apply_job(state, &job).await {
		Ok(()) => {
			outbox::mark_index_job_done(&state.db, job.outbox_id, OffsetDateTime::now_utc()).await?;

			tracing::debug!(outbox_id = %job.outbox_id, chunk_id = %job.chunk_id, op = %job.op, "Outbox job done.");

			Ok(JobOutcome::Done)
		},
		Err(err) => {
			let attempts = job.attempts.saturating_add(1);
			let now = OffsetDateTime::now_utc();
			let available_at = now + backoff_for_attempt(attempts);
			let error_text = sanitize_outbox_error(&err.to_string());

			outbox::mark_index_job_failed(
				&state.db,
				job.outbox_id,
				attempts,
				&error_text,
				available_at,
				now,
			)
			.await?;

			tracing::error!(
				error = %error_text,
				outbox_id = %job.outbox_id,
				chunk_id = %job.chunk_id,
				attempts,
				"Outbox job failed."
			);

			Ok(JobOutcome::Failed)
		},
	}
}

async fn apply_job(state: &WorkerState, job: &IndexOutboxEntry) -> Result<()> {
	match job.op.as_str() {
		OP_UPSERT => handle_upsert(state, job).await,
		OP_DEACTIVATE => handle_deactivate(state, job).await,
		other => Err(Error::Message(format!("Unsupported outbox op: {other}."))),
	}
}

async fn handle_upsert(state: &WorkerState, job: &IndexOutboxEntry) -> Result<()> {
	let Some(projection) = chunks::fetch_projection(&state.db.pool, job.chunk_id).await? else {
		return Err(Error::Message(format!("Chunk {} does not exist.", job.chunk_id)));
	};
	let Some(embedding) = projection.embedding.as_deref() else {
		return Err(Error::Message(format!("Chunk {} has no stored vector.", job.chunk_id)));
	};
	let vec = chunks::parse_vector_text(embedding)?;

	validate_vector_dim(&vec, state.qdrant.vector_dim)?;

	// The payload carries the row's current is_active, so a late upsert cannot revive a chunk.
	state.qdrant.upsert_chunk(&projection, vec).await?;

	Ok(())
}

async fn handle_deactivate(state: &WorkerState, job: &IndexOutboxEntry) -> Result<()> {
	match state.qdrant.deactivate_chunk(job.chunk_id).await {
		Ok(()) => Ok(()),
		Err(tern_storage::Error::Qdrant(err)) if qdrant::is_point_not_found(&err) => {
			tracing::debug!(chunk_id = %job.chunk_id, "Point already absent from the index.");

			Ok(())
		},
		Err(err) => Err(err.into()),
	}
}

fn validate_vector_dim(vec: &[f32], expected_dim: u32) -> Result<()> {
	if vec.len() != expected_dim as usize {
		return Err(Error::Message(format!(
			"Vector dimension mismatch: expected {expected_dim}, got {}.",
			vec.len()
		)));
	}

	Ok(())
}

/// Redacts credentials and truncates before the text lands in `last_error`.
pub fn sanitize_outbox_error(text: &str) -> String {
	let mut parts = Vec::new();
	let mut redact_next = false;

	for raw in text.split_whitespace() {
		let mut word = raw.to_string();

		if redact_next {
			word = "[REDACTED]".to_string();
			redact_next = false;
		}
		if raw.eq_ignore_ascii_case("bearer") {
			redact_next = true;
		}

		let lowered = raw.to_ascii_lowercase();

		for key in ["api_key", "apikey", "password", "secret", "token"] {
			if lowered.contains(key) && (lowered.contains('=') || lowered.contains(':')) {
				let sep = if raw.contains('=') { '=' } else { ':' };
				let prefix = raw.split(sep).next().unwrap_or(raw);

				word = format!("{prefix}{sep}[REDACTED]");

				break;
			}
		}

		parts.push(word);
	}

	let mut out = parts.join(" ");

	if out.chars().count() > MAX_OUTBOX_ERROR_CHARS {
		out = out.chars().take(MAX_OUTBOX_ERROR_CHARS).collect();
		out.push_str("...");
	}

	out
}

/// 500 ms for the first failure, doubling per attempt, capped at 30 s.
pub fn backoff_for_attempt(attempt: i32) -> Duration {
	let attempts = attempt.max(1) as u32;
	let exp = attempts.saturating_sub(1).min(6);
	let base = BASE_BACKOFF_MS.saturating_mul(1 << exp);

	Duration::milliseconds(base.min(MAX_BACKOFF_MS))
}

fn to_std_duration(duration: Duration) -> StdDuration {
	let millis = duration.whole_milliseconds();

	if millis <= 0 {
		return StdDuration::from_millis(0);
	}

	StdDuration::from_millis(millis as u64)
}
