use arag_config::Executor as ExecutorConfig;
use arag_domain::Candidate;

use crate::{
	Reranker,
	error::{Stage, StageError},
	stage,
	state::ExecutorState,
};

pub async fn run(
	state: &ExecutorState,
	reranker: &dyn Reranker,
	settings: &ExecutorConfig,
) -> Result<Vec<Candidate>, StageError> {
	let merged = &state.round_candidates_merged;

	if merged.is_empty() {
		return Ok(Vec::new());
	}

	let idx = state.current_round_index;
	let round = stage::current_round(state);
	let spec = &round.rerank;

	if !spec.enabled.unwrap_or(true) {
		tracing::debug!(round = idx, "Rerank disabled for round.");

		return Ok(merged.clone());
	}

	let top_k = spec.rerank_top_k.unwrap_or(settings.rerank_top_k);
	let reranked = reranker
		.rerank(&state.context.normalized_query, merged, top_k, &state.plan)
		.await
		.map_err(|err| StageError::from_report(Stage::RerankCandidates, &err))?;

	tracing::info!(
		round = idx,
		merged = merged.len(),
		reranked = reranked.len(),
		top_k,
		"Reranked candidates."
	);

	Ok(reranked)
}
