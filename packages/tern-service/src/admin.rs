use serde::{Deserialize, Serialize};

use crate::{Result, TernService};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildReport {
	pub rebuilt_count: u64,
	pub missing_vector_count: u64,
	pub error_count: u64,
}

impl TernService {
	/// Re-projects every stored chunk into the vector index.
	pub async fn rebuild_index(&self) -> Result<RebuildReport> {
		let report = self.index.rebuild().await?;

		tracing::info!(
			rebuilt = report.rebuilt_count,
			missing_vectors = report.missing_vector_count,
			errors = report.error_count,
			"Vector index rebuilt."
		);

		Ok(report)
	}
}
