use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub ingestion: Ingestion,
	#[serde(default)]
	pub retrieval: Retrieval,
	pub security: Security,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
	#[serde(default = "default_qdrant_timeout_ms")]
	pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	/// Model used when a request does not name one.
	pub model: String,
	pub dimensions: u32,
	/// Optional. Request field carrying `dimensions`, e.g. "dimensions" or "output_dimension".
	/// The field is omitted when unset.
	#[serde(default)]
	pub dimensions_param: Option<String>,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Ingestion {
	pub max_records: u32,
}
impl Default for Ingestion {
	fn default() -> Self {
		Self { max_records: 128 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	pub default_limit: u32,
	pub default_num_candidates: u32,
	pub max_num_candidates: u32,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self { default_limit: 8, default_num_candidates: 200, max_num_candidates: 2_000 }
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
}

fn default_qdrant_timeout_ms() -> u64 {
	10_000
}
