use std::sync::{
	Mutex,
	atomic::{AtomicUsize, Ordering},
};

use tern_config::EmbeddingProviderConfig;
use tern_service::{BoxFuture, EmbeddingProvider, Error, Result};

/// Terms the keyword embedder counts, one dimension each, plus a trailing bias dimension.
pub const TRAVEL_VOCABULARY: [&str; 7] = ["tokyo", "flight", "hotel", "ueno", "refund", "osaka", "train"];

enum Mode {
	Keywords(Vec<String>),
	IndexEncoding { dim: usize },
	Failing,
	DropLast { dim: usize },
}

/// Deterministic embedding provider for tests. Records every call.
pub struct StubEmbedder {
	mode: Mode,
	calls: AtomicUsize,
	inputs: Mutex<Vec<usize>>,
	models: Mutex<Vec<String>>,
}
impl StubEmbedder {
	/// Bag-of-words over `TRAVEL_VOCABULARY`; the dimension is the vocabulary size plus one.
	pub fn keywords() -> Self {
		Self::with_mode(Mode::Keywords(TRAVEL_VOCABULARY.iter().map(|term| term.to_string()).collect()))
	}

	/// Vector `i` starts with `i` so callers can check positional alignment.
	pub fn index_encoding(dim: usize) -> Self {
		Self::with_mode(Mode::IndexEncoding { dim })
	}

	pub fn failing() -> Self {
		Self::with_mode(Mode::Failing)
	}

	/// Returns one vector fewer than requested.
	pub fn drop_last(dim: usize) -> Self {
		Self::with_mode(Mode::DropLast { dim })
	}

	pub fn keyword_dim() -> u32 {
		TRAVEL_VOCABULARY.len() as u32 + 1
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	/// Batch size of each call, in call order.
	pub fn batch_sizes(&self) -> Vec<usize> {
		self.inputs.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	/// Model named on each call, in call order.
	pub fn models(&self) -> Vec<String> {
		self.models.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	fn with_mode(mode: Mode) -> Self {
		Self {
			mode,
			calls: AtomicUsize::new(0),
			inputs: Mutex::new(Vec::new()),
			models: Mutex::new(Vec::new()),
		}
	}

	fn vectors(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
		match &self.mode {
			Mode::Keywords(vocabulary) =>
				Ok(texts.iter().map(|text| keyword_vector(vocabulary, text)).collect()),
			Mode::IndexEncoding { dim } =>
				Ok((0..texts.len()).map(|index| index_vector(index, *dim)).collect()),
			Mode::Failing =>
				Err(Error::Provider { message: "Stub embedding provider is unavailable.".to_string() }),
			Mode::DropLast { dim } => Ok((0..texts.len().saturating_sub(1))
				.map(|index| index_vector(index, *dim))
				.collect()),
		}
	}
}

impl EmbeddingProvider for StubEmbedder {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		model: &'a str,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.inputs.lock().unwrap_or_else(|err| err.into_inner()).push(texts.len());
		self.models.lock().unwrap_or_else(|err| err.into_inner()).push(model.to_string());

		let result = self.vectors(texts);

		Box::pin(async move { result })
	}
}

fn keyword_vector(vocabulary: &[String], text: &str) -> Vec<f32> {
	let lowered = text.to_lowercase();
	let mut vector =
		vocabulary.iter().map(|term| lowered.matches(term.as_str()).count() as f32).collect::<Vec<_>>();

	vector.push(1.0);

	vector
}

fn index_vector(index: usize, dim: usize) -> Vec<f32> {
	let mut vector = vec![1.0; dim.max(1)];

	vector[0] = index as f32;

	vector
}
