use axum::{
	Json, Router,
	extract::{State, rejection::JsonRejection},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::AppState;
use tern_domain::source::SourceType;
use tern_service::{
	ActionRequest, ActionResponse, Error, IngestRequest, IngestResponse, Intent, RebuildReport,
	RetrieveRequest, RetrieveResponse,
};

#[derive(Debug, Deserialize)]
pub struct IngestBody {
	pub trip_id: String,
	pub source_type: SourceType,
	pub records: Vec<Value>,
	#[serde(default)]
	pub embedding_model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActionBody {
	pub trip_id: String,
	pub intent: Intent,
	pub source_type: SourceType,
	#[serde(default)]
	pub records: Option<Vec<Value>>,
	#[serde(default)]
	pub query: Option<String>,
	#[serde(default)]
	pub limit: Option<u32>,
	#[serde(default)]
	pub num_candidates: Option<u32>,
	#[serde(default)]
	pub embedding_model: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: &'static str,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: &'static str,
	message: String,
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		let (status, error_code) = match &err {
			Error::Validation { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
			Error::Conflict { .. } => (StatusCode::CONFLICT, "CONFLICT"),
			Error::Provider { .. } => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR"),
			Error::Configuration { .. } =>
				(StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR"),
			Error::Storage { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
			Error::Qdrant { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "INDEX_ERROR"),
		};

		if status.is_server_error() {
			tracing::error!(error = %err, "Request failed.");
		}

		Self { status, error_code, message: err.to_string() }
	}
}
impl From<JsonRejection> for ApiError {
	fn from(rejection: JsonRejection) -> Self {
		Self {
			status: StatusCode::BAD_REQUEST,
			error_code: "VALIDATION_ERROR",
			message: format!("Invalid request: {}", rejection.body_text()),
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/evidence/ingest", post(ingest))
		.route("/v1/evidence/retrieve", post(retrieve))
		.route("/v1/evidence/action", post(action))
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new().route("/v1/admin/rebuild_index", post(rebuild_index)).with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn ingest(
	State(state): State<AppState>,
	payload: Result<Json<IngestBody>, JsonRejection>,
) -> Result<Json<IngestResponse>, ApiError> {
	let Json(body) = payload?;
	let req =
		IngestRequest::from_values(body.trip_id, body.source_type, body.records, body.embedding_model)?;
	let response = state.service.ingest(req).await?;

	Ok(Json(response))
}

async fn retrieve(
	State(state): State<AppState>,
	payload: Result<Json<RetrieveRequest>, JsonRejection>,
) -> Result<Json<RetrieveResponse>, ApiError> {
	let Json(req) = payload?;
	let response = state.service.retrieve(req).await?;

	Ok(Json(response))
}

async fn action(
	State(state): State<AppState>,
	payload: Result<Json<ActionBody>, JsonRejection>,
) -> Result<Json<ActionResponse>, ApiError> {
	let Json(body) = payload?;
	let records = match body.records {
		Some(values) =>
			Some(IngestRequest::from_values(body.trip_id.clone(), body.source_type, values, None)?.records),
		None => None,
	};
	let req = ActionRequest {
		trip_id: body.trip_id,
		intent: body.intent,
		source_type: body.source_type,
		records,
		query: body.query,
		limit: body.limit,
		num_candidates: body.num_candidates,
		embedding_model: body.embedding_model,
	};
	let response = state.service.action(req).await?;

	Ok(Json(response))
}

async fn rebuild_index(State(state): State<AppState>) -> Result<Json<RebuildReport>, ApiError> {
	let report = state.service.rebuild_index().await?;

	Ok(Json(report))
}
