pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Unknown source type {0:?}.")]
	UnknownSourceType(String),
	#[error("Record {index} does not match source type {source_type}: {message}")]
	RecordShape { index: usize, source_type: &'static str, message: String },
}
