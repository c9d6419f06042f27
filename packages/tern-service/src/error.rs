pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	Validation { message: String },
	#[error("Configuration error: {message}")]
	Configuration { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Qdrant error: {message}")]
	Qdrant { message: String },
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<tern_storage::Error> for Error {
	fn from(err: tern_storage::Error) -> Self {
		match err {
			tern_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			tern_storage::Error::InvalidArgument(message) => Self::Storage { message },
			tern_storage::Error::Conflict(message) => Self::Conflict { message },
			tern_storage::Error::Qdrant(inner) => Self::Qdrant { message: inner.to_string() },
		}
	}
}

impl From<tern_providers::Error> for Error {
	fn from(err: tern_providers::Error) -> Self {
		if err.is_config() {
			Self::Configuration { message: err.to_string() }
		} else {
			Self::Provider { message: err.to_string() }
		}
	}
}

impl From<tern_domain::Error> for Error {
	fn from(err: tern_domain::Error) -> Self {
		Self::Validation { message: err.to_string() }
	}
}

impl From<qdrant_client::QdrantError> for Error {
	fn from(err: qdrant_client::QdrantError) -> Self {
		Self::Qdrant { message: err.to_string() }
	}
}
