use serde::{Deserialize, Serialize};

use crate::{
	Error, IngestRequest, IngestResponse, Result, RetrieveRequest, RetrievedEvidence, TernService,
};
use tern_domain::{record::RawRecord, source::SourceType};

/// What a planning step wants done with evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
	RetrieveOnly,
	ScrapeAndUpdate,
	FullReplan,
	PlanEditOnly,
}

#[derive(Debug, Clone)]
pub struct ActionRequest {
	pub trip_id: String,
	pub intent: Intent,
	pub source_type: SourceType,
	/// `None` when the caller sent no records at all, as opposed to an empty list.
	pub records: Option<Vec<RawRecord>>,
	pub query: Option<String>,
	pub limit: Option<u32>,
	pub num_candidates: Option<u32>,
	pub embedding_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
	pub intent: Intent,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ingest: Option<IngestResponse>,
	#[serde(default)]
	pub evidence: Vec<RetrievedEvidence>,
}

impl TernService {
	pub async fn action(&self, req: ActionRequest) -> Result<ActionResponse> {
		crate::require_trip_id(&req.trip_id)?;

		let intent = req.intent;
		let mut response = ActionResponse { intent, ingest: None, evidence: Vec::new() };
		let query = req.query.clone().filter(|query| !query.trim().is_empty());

		match intent {
			Intent::RetrieveOnly => {
				let Some(query) = query else {
					return Err(Error::Validation {
						message: "query is required for RETRIEVE_ONLY.".to_string(),
					});
				};

				response.evidence = self.retrieve(retrieve_request(&req, query)).await?.items;
			},
			Intent::ScrapeAndUpdate => {
				let Some(records) = req.records.clone() else {
					return Err(Error::Validation {
						message: "records are required for SCRAPE_AND_UPDATE.".to_string(),
					});
				};

				response.ingest = Some(self.ingest(ingest_request(&req, records)).await?);
			},
			Intent::FullReplan => {
				if let Some(records) = req.records.clone() {
					response.ingest = Some(self.ingest(ingest_request(&req, records)).await?);
				}
				if let Some(query) = query {
					response.evidence = self.retrieve(retrieve_request(&req, query)).await?.items;
				}
			},
			Intent::PlanEditOnly => {
				tracing::debug!(trip_id = %req.trip_id, "Plan edit only; evidence untouched.");
			},
		}

		Ok(response)
	}
}

fn ingest_request(req: &ActionRequest, records: Vec<RawRecord>) -> IngestRequest {
	IngestRequest {
		trip_id: req.trip_id.clone(),
		source_type: req.source_type,
		records,
		embedding_model: req.embedding_model.clone(),
	}
}

fn retrieve_request(req: &ActionRequest, query: String) -> RetrieveRequest {
	RetrieveRequest {
		trip_id: req.trip_id.clone(),
		query,
		limit: req.limit,
		num_candidates: req.num_candidates,
		source_types: vec![req.source_type],
		embedding_model: req.embedding_model.clone(),
	}
}
