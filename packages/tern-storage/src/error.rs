const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Conflict: {0}")]
	Conflict(String),
	#[error(transparent)]
	Qdrant(#[from] Box<qdrant_client::QdrantError>),
}
impl Error {
	/// Maps a unique-constraint violation to `Conflict`, leaving other errors untouched.
	pub(crate) fn from_write(err: sqlx::Error, context: &str) -> Self {
		if let sqlx::Error::Database(db_err) = &err
			&& db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
		{
			return Self::Conflict(format!("{context}: {}", db_err.message()));
		}

		Self::Sqlx(err)
	}
}
impl From<qdrant_client::QdrantError> for Error {
	fn from(err: qdrant_client::QdrantError) -> Self {
		Self::Qdrant(Box::new(err))
	}
}
