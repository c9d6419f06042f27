use std::{collections::HashMap, sync::Arc};

use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use tern_domain::{
	record::ChunkAttributes,
	source::{DedupScope, SourceType},
};
use tern_service::{
	ActionRequest, BoxFuture, Error, EvidenceIndex, EvidenceStore, IndexHit, IngestRequest,
	IngestResponse, Intent, NewChunk, Providers, RebuildReport, Result, RetrieveRequest,
	TernService, VectorQuery, WriteBatch,
};
use tern_testkit::{MemoryEvidence, StubEmbedder};

const MODEL: &str = "stub-embedding";

fn service_with(embedder: Arc<StubEmbedder>, vector_dim: u32) -> (TernService, Arc<MemoryEvidence>) {
	let evidence = MemoryEvidence::new();
	let service = TernService::new(
		tern_testkit::test_config(vector_dim),
		evidence.clone(),
		evidence.clone(),
		Providers::new(embedder),
	);

	(service, evidence)
}

fn keyword_service() -> (TernService, Arc<MemoryEvidence>, Arc<StubEmbedder>) {
	let embedder = Arc::new(StubEmbedder::keywords());
	let (service, evidence) = service_with(embedder.clone(), StubEmbedder::keyword_dim());

	(service, evidence, embedder)
}

fn flight(price: f64) -> Value {
	serde_json::json!({
		"origin": "SFO",
		"destination": "TYO",
		"departureDate": "2026-03-10",
		"returnDate": "2026-03-13",
		"price": price,
		"duration": "11h",
		"stops": 0
	})
}

fn lodging(title: &str, description: &str, price: f64) -> Value {
	serde_json::json!({
		"title": title,
		"description": description,
		"amenities": ["Wi-Fi", "Breakfast"],
		"price": price
	})
}

fn web(text: &str) -> Value {
	serde_json::json!({ "text": text, "url": "https://example.com/guide" })
}

fn ingest_request(trip_id: &str, source_type: SourceType, values: Vec<Value>) -> IngestRequest {
	IngestRequest::from_values(trip_id.to_string(), source_type, values, None)
		.expect("Failed to decode records.")
}

fn retrieve_request(trip_id: &str, query: &str, limit: Option<u32>) -> RetrieveRequest {
	RetrieveRequest {
		trip_id: trip_id.to_string(),
		query: query.to_string(),
		limit,
		num_candidates: None,
		source_types: Vec::new(),
		embedding_model: None,
	}
}

fn counts(inserted: u32, replaced: u32, skipped: u32) -> IngestResponse {
	IngestResponse { inserted, replaced, skipped }
}

fn seeded_chunk(trip_id: &str, text: &str, embedding: Vec<f32>) -> NewChunk {
	NewChunk {
		chunk_id: Uuid::new_v4(),
		trip_id: trip_id.to_string(),
		source_id: "seed".to_string(),
		source_type: SourceType::Web,
		url: String::new(),
		title: "Seed".to_string(),
		chunk_index: 0,
		text: text.to_string(),
		tags: Vec::new(),
		embedding,
		embedding_model: MODEL.to_string(),
		dedup_key: Uuid::new_v4().to_string(),
		scope: DedupScope::Trip(trip_id.to_string()),
		attributes: ChunkAttributes::default(),
		created_at: OffsetDateTime::now_utc(),
	}
}

fn assert_single_active_per_key(evidence: &MemoryEvidence) {
	let mut active = HashMap::new();

	for chunk in evidence.active_chunks() {
		let scope = DedupScope::for_record(chunk.source_type, &chunk.trip_id);

		*active.entry((chunk.source_type, scope, chunk.dedup_key.clone())).or_insert(0) += 1;
	}

	assert!(active.values().all(|count| *count == 1), "Found a key with several active chunks.");
}

#[tokio::test]
async fn reingesting_unchanged_records_is_idempotent() {
	let (service, evidence, _) = keyword_service();
	let records = vec![
		lodging("Hotel Gracery", "Shinjuku", 180.0),
		lodging("Ueno Inn", "Near the park", 120.0),
		lodging("Osaka Bay Hotel", "Harbor view", 140.0),
	];
	let first = service
		.ingest(ingest_request("T1", SourceType::Lodging, records.clone()))
		.await
		.expect("First ingest failed.");
	let second = service
		.ingest(ingest_request("T1", SourceType::Lodging, records))
		.await
		.expect("Second ingest failed.");

	assert_eq!(first, counts(3, 0, 0));
	assert_eq!(second, counts(0, 0, 3));
	assert_eq!(evidence.chunks().len(), 3);
}

#[tokio::test]
async fn price_change_replaces_the_active_flight() {
	let (service, evidence, _) = keyword_service();

	service.ingest(ingest_request("T1", SourceType::Flight, vec![flight(920.0)])).await.expect("ingest failed");

	let old_id = evidence.active_chunks()[0].chunk_id;
	let response = service
		.ingest(ingest_request("T1", SourceType::Flight, vec![flight(850.0)]))
		.await
		.expect("ingest failed");

	assert_eq!(response, counts(0, 1, 0));

	let chunks = evidence.chunks();
	let old = chunks.iter().find(|chunk| chunk.chunk_id == old_id).expect("Old chunk is gone.");
	let active = evidence.active_chunks();

	assert!(!old.is_active, "Replaced chunk must be soft-deleted, not removed.");
	assert_eq!(chunks.len(), 2);
	assert_eq!(active.len(), 1);
	assert_ne!(active[0].chunk_id, old_id);
	assert_eq!(active[0].attributes.price, Some(850.0));
	assert!(active[0].text.contains("850"));
	assert!(evidence.embedding_of(active[0].chunk_id).is_some());
}

#[tokio::test]
async fn duration_and_stops_changes_also_replace() {
	let (service, evidence, _) = keyword_service();
	let mut changed = flight(920.0);

	changed["stops"] = serde_json::json!(1);

	service.ingest(ingest_request("T1", SourceType::Flight, vec![flight(920.0)])).await.expect("ingest failed");

	let response = service
		.ingest(ingest_request("T1", SourceType::Flight, vec![changed]))
		.await
		.expect("ingest failed");

	assert_eq!(response, counts(0, 1, 0));
	assert_eq!(evidence.active_chunks()[0].attributes.stops, Some(1));
}

#[tokio::test]
async fn lodging_description_change_is_a_new_fact() {
	let (service, evidence, _) = keyword_service();

	service
		.ingest(ingest_request("T1", SourceType::Lodging, vec![lodging("Ueno Inn", "Near the park", 120.0)]))
		.await
		.expect("ingest failed");

	// The description is part of the content key, so a new description is a new key.
	let response = service
		.ingest(ingest_request("T1", SourceType::Lodging, vec![lodging("Ueno Inn", "Renovated rooms", 120.0)]))
		.await
		.expect("ingest failed");

	assert_eq!(response, counts(1, 0, 0));
	assert_eq!(evidence.active_chunks().len(), 2);
}

#[tokio::test]
async fn lodging_price_change_alone_is_skipped() {
	let (service, _, _) = keyword_service();

	service
		.ingest(ingest_request("T1", SourceType::Lodging, vec![lodging("Ueno Inn", "Near the park", 120.0)]))
		.await
		.expect("ingest failed");

	let response = service
		.ingest(ingest_request("T1", SourceType::Lodging, vec![lodging("Ueno Inn", "Near the park", 99.0)]))
		.await
		.expect("ingest failed");

	assert_eq!(response, counts(0, 0, 1));
}

#[tokio::test]
async fn at_most_one_active_chunk_per_key_across_many_ingests() {
	let (service, evidence, _) = keyword_service();

	for price in [920.0, 850.0, 850.0, 990.0, 920.0] {
		service
			.ingest(ingest_request("T1", SourceType::Flight, vec![flight(price)]))
			.await
			.expect("ingest failed");
		service
			.ingest(ingest_request("T2", SourceType::Flight, vec![flight(price)]))
			.await
			.expect("ingest failed");
		service
			.ingest(ingest_request("T1", SourceType::Web, vec![web("Tokyo train passes"), web("Tokyo train passes")]))
			.await
			.expect("ingest failed");
	}

	assert_single_active_per_key(&evidence);
	assert_eq!(evidence.active_chunks().len(), 2);
}

#[tokio::test]
async fn batch_duplicates_resolve_to_the_last_record() {
	let (service, evidence, _) = keyword_service();
	let response = service
		.ingest(ingest_request("T1", SourceType::Flight, vec![flight(920.0), flight(850.0)]))
		.await
		.expect("ingest failed");

	assert_eq!(response, counts(1, 0, 1));

	let active = evidence.active_chunks();

	assert_eq!(active.len(), 1);
	assert_eq!(active[0].attributes.price, Some(850.0));
	assert_eq!(active[0].chunk_index, 1);
}

#[tokio::test]
async fn flight_keys_are_global_and_free_text_keys_are_per_trip() {
	let (service, evidence, _) = keyword_service();
	let t1 = service
		.ingest(ingest_request("T1", SourceType::Flight, vec![flight(920.0)]))
		.await
		.expect("ingest failed");
	let t2 = service
		.ingest(ingest_request("T2", SourceType::Flight, vec![flight(920.0)]))
		.await
		.expect("ingest failed");

	assert_eq!(t1, counts(1, 0, 0));
	assert_eq!(t2, counts(0, 0, 1));

	// A re-price from another trip retires the shared offer and hands it to that trip.
	let repriced = service
		.ingest(ingest_request("T2", SourceType::Flight, vec![flight(850.0)]))
		.await
		.expect("ingest failed");

	assert_eq!(repriced, counts(0, 1, 0));

	let flights_for = |trip_id: &str| RetrieveRequest {
		source_types: vec![SourceType::Flight],
		..retrieve_request(trip_id, "Tokyo flight", None)
	};
	let t1_flights = service.retrieve(flights_for("T1")).await.expect("retrieve failed");
	let t2_flights = service.retrieve(flights_for("T2")).await.expect("retrieve failed");

	assert!(t1_flights.items.is_empty());
	assert_eq!(t2_flights.items.len(), 1);
	assert!(t2_flights.items[0].text.contains("850"));

	let t1 = service
		.ingest(ingest_request("T1", SourceType::Web, vec![web("Refundable hotel near Ueno.")]))
		.await
		.expect("ingest failed");
	let t2 = service
		.ingest(ingest_request("T2", SourceType::Web, vec![web("Refundable hotel near Ueno.")]))
		.await
		.expect("ingest failed");

	assert_eq!(t1, counts(1, 0, 0));
	assert_eq!(t2, counts(1, 0, 0));
	assert_eq!(evidence.active_chunks().len(), 3);
}

fn flight_chunk(dedup_key: &str, price: f64) -> NewChunk {
	let mut chunk = seeded_chunk("T1", &format!("Flight {price} 11h 0 stops"), vec![1.0; 8]);

	chunk.source_type = SourceType::Flight;
	chunk.scope = DedupScope::Global;
	chunk.dedup_key = dedup_key.to_string();
	chunk.attributes.price = Some(price);

	chunk
}

#[tokio::test]
async fn losing_writer_gets_a_conflict_and_changes_nothing() {
	let (service, evidence, _) = keyword_service();

	service.ingest(ingest_request("T1", SourceType::Flight, vec![flight(920.0)])).await.expect("ingest failed");

	let original = evidence.active_chunks()[0].clone();
	let winner = WriteBatch {
		deactivate: vec![original.chunk_id],
		insert: vec![flight_chunk(&original.dedup_key, 850.0)],
	};
	let loser = WriteBatch {
		deactivate: vec![original.chunk_id],
		insert: vec![flight_chunk(&original.dedup_key, 990.0)],
	};

	// Both writers read the 920 chunk as active; the first to commit wins.
	evidence.apply(winner).await.expect("winning batch failed");

	let before = evidence.chunks().len();
	let lost_delete = evidence.apply(loser).await;
	let clashing_insert = evidence
		.apply(WriteBatch {
			deactivate: Vec::new(),
			insert: vec![flight_chunk(&original.dedup_key, 990.0)],
		})
		.await;

	assert!(matches!(lost_delete, Err(Error::Conflict { .. })));
	assert!(matches!(clashing_insert, Err(Error::Conflict { .. })));
	assert_eq!(evidence.chunks().len(), before, "A conflicting batch must write nothing.");
	assert_single_active_per_key(&evidence);

	let active = evidence.active_chunks();

	assert_eq!(active.len(), 1);
	assert_eq!(active[0].attributes.price, Some(850.0));
}

#[tokio::test]
async fn batch_vectors_are_assigned_by_input_position() {
	let embedder = Arc::new(StubEmbedder::index_encoding(4));
	let (service, evidence) = service_with(embedder.clone(), 4);
	let texts = ["a", "b", "c"];
	let response = service
		.ingest(ingest_request("T1", SourceType::Web, texts.iter().map(|text| web(text)).collect()))
		.await
		.expect("ingest failed");

	assert_eq!(response, counts(3, 0, 0));
	assert_eq!(embedder.calls(), 1);
	assert_eq!(embedder.batch_sizes(), vec![3]);

	for chunk in evidence.chunks() {
		let embedding = evidence.embedding_of(chunk.chunk_id).expect("Missing embedding.");

		assert_eq!(embedding[0], chunk.chunk_index as f32);
		assert_eq!(chunk.text, texts[chunk.chunk_index as usize]);
	}
}

#[tokio::test]
async fn empty_batch_never_calls_the_provider() {
	let (service, evidence, embedder) = keyword_service();
	let response =
		service.ingest(ingest_request("T1", SourceType::Web, Vec::new())).await.expect("ingest failed");

	assert_eq!(response, counts(0, 0, 0));
	assert_eq!(embedder.calls(), 0);
	assert!(evidence.chunks().is_empty());
}

#[tokio::test]
async fn retrieving_from_an_empty_trip_returns_nothing() {
	let (service, _, _) = keyword_service();
	let response =
		service.retrieve(retrieve_request("T1", "Tokyo flight", None)).await.expect("retrieve failed");

	assert!(response.items.is_empty());
}

#[tokio::test]
async fn provider_failure_aborts_without_writes() {
	let embedder = Arc::new(StubEmbedder::failing());
	let (service, evidence) = service_with(embedder, 4);
	let err = service
		.ingest(ingest_request("T1", SourceType::Flight, vec![flight(920.0)]))
		.await
		.expect_err("Expected provider failure.");

	assert!(matches!(err, Error::Provider { .. }));
	assert!(evidence.chunks().is_empty());
}

#[tokio::test]
async fn short_provider_batch_aborts_without_writes() {
	let embedder = Arc::new(StubEmbedder::drop_last(4));
	let (service, evidence) = service_with(embedder, 4);
	let err = service
		.ingest(ingest_request("T1", SourceType::Web, vec![web("a"), web("b")]))
		.await
		.expect_err("Expected count mismatch.");

	assert!(matches!(err, Error::Provider { .. }));
	assert!(evidence.chunks().is_empty());
}

#[tokio::test]
async fn vectors_of_the_wrong_dimension_are_rejected() {
	let embedder = Arc::new(StubEmbedder::index_encoding(3));
	let (service, evidence) = service_with(embedder, 4);
	let err = service
		.ingest(ingest_request("T1", SourceType::Web, vec![web("a")]))
		.await
		.expect_err("Expected dimension mismatch.");

	assert!(matches!(err, Error::Provider { .. }));
	assert!(evidence.chunks().is_empty());
}

#[tokio::test]
async fn retrieval_never_crosses_trips_or_returns_inactive_chunks() {
	let (service, evidence, _) = keyword_service();
	// Exact match for the query "Tokyo flight".
	let best = vec![1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0];

	evidence.seed(seeded_chunk("T2", "Tokyo flight deals", best.clone()), true);
	evidence.seed(seeded_chunk("T1", "Old Tokyo flight deals", best), false);

	service
		.ingest(ingest_request("T1", SourceType::Web, vec![web("Ueno hotel with refund policy")]))
		.await
		.expect("ingest failed");

	let response =
		service.retrieve(retrieve_request("T1", "Tokyo flight", Some(5))).await.expect("retrieve failed");

	assert_eq!(response.items.len(), 1);
	assert_eq!(response.items[0].text, "Ueno hotel with refund policy");
}

#[tokio::test]
async fn retrieval_ranks_by_similarity_and_honors_limit() {
	let (service, _, _) = keyword_service();

	service
		.ingest(ingest_request(
			"T1",
			SourceType::Web,
			vec![web("Osaka train schedule"), web("Tokyo flight tips"), web("Tokyo hotel list")],
		))
		.await
		.expect("ingest failed");

	let response =
		service.retrieve(retrieve_request("T1", "Tokyo flight", Some(2))).await.expect("retrieve failed");

	assert_eq!(response.items.len(), 2);
	assert_eq!(response.items[0].text, "Tokyo flight tips");
	assert!(response.items[0].score >= response.items[1].score);
	assert_eq!(response.items[0].url, "https://example.com/guide");
}

#[tokio::test]
async fn source_type_filter_restricts_candidates() {
	let (service, _, _) = keyword_service();

	service.ingest(ingest_request("T1", SourceType::Flight, vec![flight(920.0)])).await.expect("ingest failed");
	service
		.ingest(ingest_request("T1", SourceType::Web, vec![web("Tokyo flight tips")]))
		.await
		.expect("ingest failed");

	let mut req = retrieve_request("T1", "Tokyo flight", None);

	req.source_types = vec![SourceType::Flight];

	let response = service.retrieve(req).await.expect("retrieve failed");

	assert_eq!(response.items.len(), 1);
	assert_eq!(response.items[0].source_type, SourceType::Flight);
}

#[tokio::test]
async fn chunks_record_the_model_and_retrieval_stays_within_it() {
	let (service, evidence, embedder) = keyword_service();
	let mut req = ingest_request("T1", SourceType::Web, vec![web("Tokyo flight tips")]);

	req.embedding_model = Some("other-model".to_string());

	service.ingest(req).await.expect("ingest failed");

	assert_eq!(evidence.chunks()[0].embedding_model, "other-model");
	assert_eq!(embedder.models(), vec!["other-model".to_string()]);

	let default_model =
		service.retrieve(retrieve_request("T1", "Tokyo flight", None)).await.expect("retrieve failed");

	assert!(default_model.items.is_empty());

	let mut req = retrieve_request("T1", "Tokyo flight", None);

	req.embedding_model = Some("other-model".to_string());

	let same_model = service.retrieve(req).await.expect("retrieve failed");

	assert_eq!(same_model.items.len(), 1);
}

#[tokio::test]
async fn malformed_requests_are_validation_errors() {
	let (service, _, embedder) = keyword_service();
	let cases = vec![
		service.retrieve(retrieve_request("", "Tokyo flight", None)).await,
		service.retrieve(retrieve_request("T1", "   ", None)).await,
		service.retrieve(retrieve_request("T1", "Tokyo flight", Some(0))).await,
		service
			.retrieve(RetrieveRequest { num_candidates: Some(2), ..retrieve_request("T1", "Tokyo", Some(5)) })
			.await,
		service
			.retrieve(RetrieveRequest { num_candidates: Some(10_000), ..retrieve_request("T1", "Tokyo", None) })
			.await,
	];

	for result in cases {
		assert!(matches!(result, Err(Error::Validation { .. })), "Unexpected result: {result:?}");
	}

	let missing_trip = service.ingest(ingest_request(" ", SourceType::Flight, vec![flight(920.0)])).await;
	let oversized = service
		.ingest(ingest_request("T1", SourceType::Web, (0..17).map(|i| web(&format!("page {i}"))).collect()))
		.await;
	let mut mixed = ingest_request("T1", SourceType::Web, vec![web("a")]);

	mixed.source_type = SourceType::Lodging;

	let mixed = service.ingest(mixed).await;

	assert!(matches!(missing_trip, Err(Error::Validation { .. })));
	assert!(matches!(oversized, Err(Error::Validation { .. })));
	assert!(matches!(mixed, Err(Error::Validation { .. })));
	assert_eq!(embedder.calls(), 0, "Validation must fail before any provider call.");
}

struct StaleIndex {
	hits: Vec<IndexHit>,
}
impl EvidenceIndex for StaleIndex {
	fn search<'a>(&'a self, _query: &'a VectorQuery) -> BoxFuture<'a, Result<Vec<IndexHit>>> {
		let hits = self.hits.clone();

		Box::pin(async move { Ok(hits) })
	}

	fn rebuild(&self) -> BoxFuture<'_, Result<RebuildReport>> {
		Box::pin(async move { Ok(RebuildReport::default()) })
	}
}

#[tokio::test]
async fn stale_index_hits_are_dropped_on_hydration() {
	let evidence = MemoryEvidence::new();
	let live = evidence.seed(seeded_chunk("T1", "Tokyo flight tips", vec![1.0; 8]), true);
	let retired = evidence.seed(seeded_chunk("T1", "Retired tips", vec![1.0; 8]), false);
	let foreign = evidence.seed(seeded_chunk("T2", "Other trip", vec![1.0; 8]), true);
	let index = Arc::new(StaleIndex {
		hits: vec![
			IndexHit { chunk_id: retired, score: 0.99 },
			IndexHit { chunk_id: Uuid::new_v4(), score: 0.98 },
			IndexHit { chunk_id: foreign, score: 0.97 },
			IndexHit { chunk_id: live, score: 0.5 },
		],
	});
	let service = TernService::new(
		tern_testkit::test_config(StubEmbedder::keyword_dim()),
		evidence,
		index,
		Providers::new(Arc::new(StubEmbedder::keywords())),
	);
	let response =
		service.retrieve(retrieve_request("T1", "Tokyo flight", None)).await.expect("retrieve failed");

	assert_eq!(response.items.len(), 1);
	assert_eq!(response.items[0].id, live);
	assert_eq!(response.items[0].score, 0.5);
}

#[tokio::test]
async fn tokyo_flight_end_to_end() {
	let (service, evidence, _) = keyword_service();
	let first = service
		.ingest(ingest_request("T1", SourceType::Flight, vec![flight(920.0)]))
		.await
		.expect("ingest failed");

	assert_eq!(first, counts(1, 0, 0));

	let second = service
		.ingest(ingest_request("T1", SourceType::Flight, vec![flight(850.0)]))
		.await
		.expect("ingest failed");

	assert_eq!(second, counts(0, 1, 0));

	let active = evidence.active_chunks();

	assert_eq!(active.len(), 1);
	assert_eq!(active[0].attributes.price, Some(850.0));

	let response =
		service.retrieve(retrieve_request("T1", "Tokyo flight", Some(1))).await.expect("retrieve failed");

	assert_eq!(response.items.len(), 1);
	assert_eq!(response.items[0].id, active[0].chunk_id);
	assert!(response.items[0].score > 0.0);
}

fn action(intent: Intent, records: Option<Vec<Value>>, query: Option<&str>) -> ActionRequest {
	let records = records.map(|values| ingest_request("T1", SourceType::Web, values).records);

	ActionRequest {
		trip_id: "T1".to_string(),
		intent,
		source_type: SourceType::Web,
		records,
		query: query.map(str::to_string),
		limit: None,
		num_candidates: None,
		embedding_model: None,
	}
}

#[tokio::test]
async fn action_intents_dispatch_to_ingest_and_retrieve() {
	let (service, _, embedder) = keyword_service();
	let scraped = service
		.action(action(Intent::ScrapeAndUpdate, Some(vec![web("Tokyo flight tips")]), None))
		.await
		.expect("action failed");

	assert_eq!(scraped.ingest, Some(counts(1, 0, 0)));
	assert!(scraped.evidence.is_empty());

	let replanned = service
		.action(action(Intent::FullReplan, Some(vec![web("Osaka train guide")]), Some("Tokyo flight")))
		.await
		.expect("action failed");

	assert_eq!(replanned.ingest, Some(counts(1, 0, 0)));
	assert_eq!(replanned.evidence[0].text, "Tokyo flight tips");

	let retrieved = service
		.action(action(Intent::RetrieveOnly, None, Some("Osaka train")))
		.await
		.expect("action failed");

	assert!(retrieved.ingest.is_none());
	assert_eq!(retrieved.evidence[0].text, "Osaka train guide");

	let calls_before = embedder.calls();
	let edited = service.action(action(Intent::PlanEditOnly, None, None)).await.expect("action failed");

	assert!(edited.ingest.is_none() && edited.evidence.is_empty());
	assert_eq!(embedder.calls(), calls_before);
}

#[tokio::test]
async fn action_intents_require_their_inputs() {
	let (service, _, _) = keyword_service();
	let no_query = service.action(action(Intent::RetrieveOnly, None, Some(" "))).await;
	let no_records = service.action(action(Intent::ScrapeAndUpdate, None, None)).await;
	let nothing_to_do =
		service.action(action(Intent::FullReplan, None, None)).await.expect("action failed");

	assert!(matches!(no_query, Err(Error::Validation { .. })));
	assert!(matches!(no_records, Err(Error::Validation { .. })));
	assert!(nothing_to_do.ingest.is_none() && nothing_to_do.evidence.is_empty());
}

#[tokio::test]
async fn rebuild_reports_through_the_index() {
	let (service, _, _) = keyword_service();

	service
		.ingest(ingest_request("T1", SourceType::Web, vec![web("a"), web("b")]))
		.await
		.expect("ingest failed");

	let report = service.rebuild_index().await.expect("rebuild failed");

	assert_eq!(report, RebuildReport { rebuilt_count: 2, ..Default::default() });
}
