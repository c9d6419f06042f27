use std::sync::Arc;

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::Value;
use tower::util::ServiceExt;

use tern_api::{routes, state::AppState};
use tern_service::{Providers, TernService};
use tern_testkit::{MemoryEvidence, StubEmbedder};

fn app_with(embedder: StubEmbedder) -> AppState {
	let evidence = MemoryEvidence::new();
	let service = TernService::new(
		tern_testkit::test_config(StubEmbedder::keyword_dim()),
		evidence.clone(),
		evidence,
		Providers::new(Arc::new(embedder)),
	);

	AppState::from_service(service)
}

async fn post_json(app: Router, uri: &str, payload: Value) -> (StatusCode, Value) {
	let response = app
		.oneshot(
			Request::builder()
				.method("POST")
				.uri(uri)
				.header("content-type", "application/json")
				.body(Body::from(payload.to_string()))
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call router.");
	let status = response.status();
	let body = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");
	let json = serde_json::from_slice(&body).unwrap_or(Value::Null);

	(status, json)
}

fn flight_ingest(price: f64) -> Value {
	serde_json::json!({
		"trip_id": "T1",
		"source_type": "flight",
		"records": [{
			"origin": "SFO",
			"destination": "TYO",
			"departureDate": "2026-03-10",
			"returnDate": "2026-03-13",
			"price": price,
			"duration": "11h",
			"stops": 0
		}]
	})
}

#[tokio::test]
async fn health_ok() {
	let app = routes::router(app_with(StubEmbedder::keywords()));
	let response = app
		.oneshot(Request::builder().uri("/health").body(Body::empty()).expect("Failed to build request."))
		.await
		.expect("Failed to call /health.");

	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn ingest_then_retrieve_over_http() {
	let state = app_with(StubEmbedder::keywords());
	let (status, first) =
		post_json(routes::router(state.clone()), "/v1/evidence/ingest", flight_ingest(920.0)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(first, serde_json::json!({ "inserted": 1, "replaced": 0, "skipped": 0 }));

	let (_, second) =
		post_json(routes::router(state.clone()), "/v1/evidence/ingest", flight_ingest(850.0)).await;

	assert_eq!(second["replaced"], 1);

	let (status, found) = post_json(
		routes::router(state),
		"/v1/evidence/retrieve",
		serde_json::json!({ "trip_id": "T1", "query": "Tokyo flight", "limit": 1 }),
	)
	.await;

	assert_eq!(status, StatusCode::OK);

	let items = found["items"].as_array().expect("items must be an array");

	assert_eq!(items.len(), 1);
	assert_eq!(items[0]["source_type"], "flight");
	assert!(items[0]["text"].as_str().unwrap_or_default().contains("850"));
	assert!(items[0].get("embedding").is_none());
}

#[tokio::test]
async fn validation_errors_are_bad_requests() {
	let app = routes::router(app_with(StubEmbedder::keywords()));
	let (status, body) = post_json(
		app,
		"/v1/evidence/retrieve",
		serde_json::json!({ "trip_id": "T1", "query": "Tokyo", "limit": 10, "num_candidates": 5 }),
	)
	.await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["error_code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn malformed_records_are_bad_requests() {
	let app = routes::router(app_with(StubEmbedder::keywords()));
	let (status, body) = post_json(
		app,
		"/v1/evidence/ingest",
		serde_json::json!({ "trip_id": "T1", "source_type": "flight", "records": [{ "origin": "SFO" }] }),
	)
	.await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert!(body["message"].as_str().unwrap_or_default().contains("Record 0"));
}

#[tokio::test]
async fn undecodable_bodies_are_validation_errors() {
	let state = app_with(StubEmbedder::keywords());
	let cases = [
		("/v1/evidence/retrieve", serde_json::json!({ "query": "Tokyo flight" })),
		("/v1/evidence/ingest", serde_json::json!({ "source_type": "flight", "records": [] })),
		(
			"/v1/evidence/ingest",
			serde_json::json!({ "trip_id": "T1", "source_type": "cruise", "records": [] }),
		),
		(
			"/v1/evidence/action",
			serde_json::json!({ "intent": "RETRIEVE_ONLY", "source_type": "web", "query": "Tokyo" }),
		),
	];

	for (uri, payload) in cases {
		let (status, body) = post_json(routes::router(state.clone()), uri, payload).await;

		assert_eq!(status, StatusCode::BAD_REQUEST, "Unexpected status for {uri}.");
		assert_eq!(body["error_code"], "VALIDATION_ERROR");
		assert!(body["message"].as_str().is_some_and(|message| !message.is_empty()));
	}
}

#[tokio::test]
async fn provider_failures_are_bad_gateway() {
	let app = routes::router(app_with(StubEmbedder::failing()));
	let (status, body) = post_json(app, "/v1/evidence/ingest", flight_ingest(920.0)).await;

	assert_eq!(status, StatusCode::BAD_GATEWAY);
	assert_eq!(body["error_code"], "PROVIDER_ERROR");
}

#[tokio::test]
async fn action_dispatches_by_intent() {
	let state = app_with(StubEmbedder::keywords());
	let (status, scraped) = post_json(
		routes::router(state.clone()),
		"/v1/evidence/action",
		serde_json::json!({
			"trip_id": "T1",
			"intent": "SCRAPE_AND_UPDATE",
			"source_type": "web",
			"records": [{ "text": "Tokyo flight tips", "url": "https://example.com/tips" }]
		}),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(scraped["ingest"]["inserted"], 1);

	let (status, retrieved) = post_json(
		routes::router(state.clone()),
		"/v1/evidence/action",
		serde_json::json!({
			"trip_id": "T1",
			"intent": "RETRIEVE_ONLY",
			"source_type": "web",
			"query": "Tokyo flight"
		}),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(retrieved["evidence"][0]["url"], "https://example.com/tips");
	assert!(retrieved.get("ingest").is_none());

	let (status, body) = post_json(
		routes::router(state),
		"/v1/evidence/action",
		serde_json::json!({ "trip_id": "T1", "intent": "RETRIEVE_ONLY", "source_type": "web" }),
	)
	.await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["error_code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn admin_rebuild_reports_counts() {
	let state = app_with(StubEmbedder::keywords());

	post_json(routes::router(state.clone()), "/v1/evidence/ingest", flight_ingest(920.0)).await;

	let (status, report) =
		post_json(routes::admin_router(state), "/v1/admin/rebuild_index", Value::Null).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(report["rebuilt_count"], 1);
	assert_eq!(report["error_count"], 0);
}

#[test]
fn admin_bind_must_be_loopback() {
	let mut cfg = tern_testkit::test_config(4);

	assert!(tern_api::bind_addrs(&cfg).is_ok());

	cfg.service.admin_bind = "0.0.0.0:9090".to_string();

	assert!(tern_api::bind_addrs(&cfg).is_err());
}

#[test]
fn http_bind_must_be_loopback_when_restricted() {
	let mut cfg = tern_testkit::test_config(4);

	cfg.service.http_bind = "0.0.0.0:8080".to_string();

	assert!(tern_api::bind_addrs(&cfg).is_err());

	cfg.security.bind_localhost_only = false;

	assert!(tern_api::bind_addrs(&cfg).is_ok());
}
