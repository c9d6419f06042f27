pub const DENSE_VECTOR_NAME: &str = "dense";

const KEYWORD_PAYLOAD_FIELDS: [&str; 4] = ["chunk_id", "trip_id", "source_type", "embedding_model"];

use std::{collections::HashMap, time::Duration};

use qdrant_client::{
	Payload,
	qdrant::{
		CreateCollectionBuilder, CreateFieldIndexCollection, Distance, FieldType, PointId,
		PointStruct, PointsIdsList, SetPayloadPointsBuilder, UpsertPointsBuilder, Vector,
		VectorParamsBuilder, VectorsConfigBuilder,
	},
};

use crate::{Result, models::ChunkProjection};

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &tern_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url)
			.timeout(Duration::from_millis(cfg.timeout_ms))
			.build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	/// Creates the collection and its payload indexes when the collection is missing.
	pub async fn ensure_collection(&self) -> Result<()> {
		if self.client.collection_exists(&self.collection).await? {
			return Ok(());
		}

		let mut vectors_config = VectorsConfigBuilder::default();

		vectors_config.add_named_vector_params(
			DENSE_VECTOR_NAME,
			VectorParamsBuilder::new(self.vector_dim.into(), Distance::Cosine),
		);

		self.client
			.create_collection(
				CreateCollectionBuilder::new(self.collection.clone()).vectors_config(vectors_config),
			)
			.await?;

		let indexes = KEYWORD_PAYLOAD_FIELDS
			.iter()
			.map(|field| (*field, FieldType::Keyword))
			.chain([("is_active", FieldType::Bool)]);

		for (field_name, field_type) in indexes {
			let request = CreateFieldIndexCollection {
				collection_name: self.collection.clone(),
				wait: Some(true),
				field_name: field_name.to_string(),
				field_type: Some(field_type as i32),
				field_index_params: None,
				ordering: None,
			};

			self.client.create_field_index(request).await?;
		}

		Ok(())
	}

	pub async fn upsert_chunk(&self, projection: &ChunkProjection, vec: Vec<f32>) -> Result<()> {
		let point = chunk_point(projection, vec);

		self.client
			.upsert_points(UpsertPointsBuilder::new(self.collection.clone(), vec![point]).wait(true))
			.await?;

		Ok(())
	}

	/// Marks the point inactive in the payload. The vector is kept for audit.
	pub async fn deactivate_chunk(&self, chunk_id: uuid::Uuid) -> Result<()> {
		let mut payload = Payload::new();

		payload.insert("is_active", false);

		let selector = PointsIdsList { ids: vec![PointId::from(chunk_id.to_string())] };

		self.client
			.set_payload(
				SetPayloadPointsBuilder::new(self.collection.clone(), payload)
					.points_selector(selector)
					.wait(true),
			)
			.await?;

		Ok(())
	}
}

pub fn chunk_point(projection: &ChunkProjection, vec: Vec<f32>) -> PointStruct {
	let mut payload = Payload::new();

	payload.insert("chunk_id", projection.chunk_id.to_string());
	payload.insert("trip_id", projection.trip_id.clone());
	payload.insert("source_type", projection.source_type.clone());
	payload.insert("dedup_key", projection.dedup_key.clone());
	payload.insert("embedding_model", projection.embedding_model.clone());
	payload.insert("is_active", projection.is_active);

	let mut vectors = HashMap::new();

	vectors.insert(DENSE_VECTOR_NAME.to_string(), Vector::from(vec));

	PointStruct::new(projection.chunk_id.to_string(), vectors, payload)
}

/// Qdrant reports a missing point through the error message only.
pub fn is_point_not_found(err: &qdrant_client::QdrantError) -> bool {
	let message = err.to_string().to_lowercase();
	let point_not_found =
		(message.contains("not found") || message.contains("404")) && message.contains("point");
	let no_point_found = message.contains("no point") && message.contains("found");

	point_not_found || no_point_found
}
