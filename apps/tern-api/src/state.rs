use std::sync::Arc;

use tern_service::{Providers, StorageBackend, TernService};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<TernService>,
}
impl AppState {
	/// Connects Postgres and Qdrant, bootstrapping the schema and the collection.
	pub async fn new(config: tern_config::Config) -> color_eyre::Result<Self> {
		let backend = Arc::new(StorageBackend::connect(&config).await?);
		let service = TernService::new(config, backend.clone(), backend, Providers::default());

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: TernService) -> Self {
		Self { service: Arc::new(service) }
	}
}
