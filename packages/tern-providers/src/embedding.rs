use std::time::Duration;

use reqwest::Client;
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Embeds `texts` under `model` in one request.
///
/// `vectors[i]` always corresponds to `texts[i]`. The call fails as a whole when the provider
/// returns a different number of vectors than inputs.
pub async fn embed(
	cfg: &tern_config::EmbeddingProviderConfig,
	model: &str,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	if texts.is_empty() {
		return Ok(Vec::new());
	}

	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = request_body(cfg, model, texts);

	tracing::debug!(provider = %cfg.provider_id, model, count = texts.len(), "Requesting embeddings.");

	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;
	let vectors = parse_embedding_response(json, texts.len())?;

	tracing::debug!(model, count = vectors.len(), "Embeddings received.");

	Ok(vectors)
}

fn request_body(
	cfg: &tern_config::EmbeddingProviderConfig,
	model: &str,
	texts: &[String],
) -> Value {
	let mut body = Map::new();

	body.insert("model".to_string(), Value::from(model));
	body.insert("input".to_string(), Value::from(texts.to_vec()));

	if let Some(param) = cfg.dimensions_param.as_deref() {
		body.insert(param.to_string(), Value::from(cfg.dimensions));
	}

	Value::Object(body)
}

fn parse_embedding_response(json: Value, expected: usize) -> Result<Vec<Vec<f32>>> {
	let data = json.get("data").and_then(|v| v.as_array()).ok_or_else(|| {
		Error::InvalidResponse { message: "Embedding response is missing data array.".to_string() }
	})?;

	if data.len() != expected {
		return Err(Error::InvalidResponse {
			message: format!(
				"Embedding provider returned {} vectors for {expected} inputs.",
				data.len()
			),
		});
	}

	let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];

	for (fallback_index, item) in data.iter().enumerate() {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.map(|v| v as usize)
			.unwrap_or(fallback_index);
		let embedding = item.get("embedding").and_then(|v| v.as_array()).ok_or_else(|| {
			Error::InvalidResponse { message: "Embedding item missing embedding array.".to_string() }
		})?;
		let mut vec = Vec::with_capacity(embedding.len());

		for value in embedding {
			let number = value.as_f64().ok_or_else(|| Error::InvalidResponse {
				message: "Embedding value must be numeric.".to_string(),
			})?;

			vec.push(number as f32);
		}

		if vec.is_empty() {
			return Err(Error::InvalidResponse {
				message: format!("Embedding item {index} is empty."),
			});
		}

		let Some(slot) = slots.get_mut(index) else {
			return Err(Error::InvalidResponse {
				message: format!("Embedding index {index} is out of range for {expected} inputs."),
			});
		};

		if slot.is_some() {
			return Err(Error::InvalidResponse {
				message: format!("Embedding index {index} appears more than once."),
			});
		}

		*slot = Some(vec);
	}

	// Length and uniqueness checks above leave every slot filled.
	Ok(slots.into_iter().flatten().collect())
}
