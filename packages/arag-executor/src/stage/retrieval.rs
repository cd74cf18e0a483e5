use arag_config::Executor as ExecutorConfig;
use arag_domain::{Candidate, RetrievalMode, RetrievalModeSpec};

use crate::{
	Retriever,
	error::{Stage, StageError},
	stage,
	state::ExecutorState,
};

/// Fans every round query out over every retrieval mode, in `(query, mode)` order.
pub async fn run(
	state: &ExecutorState,
	retriever: &dyn Retriever,
	settings: &ExecutorConfig,
) -> Result<Vec<Candidate>, StageError> {
	if state.round_queries.is_empty() {
		return Err(StageError::schema_validation(Stage::RunRetrieval, "Missing round_queries."));
	}

	let idx = state.current_round_index;
	let round = stage::current_round(state);
	let round_id = round.round_id.unwrap_or_else(|| stage::round_index_u32(idx));
	let default_modes = [RetrievalModeSpec { mode: RetrievalMode::Hybrid, k: None, alpha: None }];
	let modes = if round.retrieval_modes.is_empty() {
		&default_modes[..]
	} else {
		&round.retrieval_modes[..]
	};
	let mut raw = Vec::new();

	for query in &state.round_queries {
		for spec in modes {
			let k = spec.k.unwrap_or(settings.retrieval_k);
			let hits = retriever
				.search(query, spec.mode, k, spec.alpha, &round.filters)
				.await
				.map_err(|err| StageError::from_report(Stage::RunRetrieval, &err))?;

			tracing::debug!(
				round = idx,
				query = %query,
				mode = spec.mode.as_str(),
				k,
				hits = hits.len(),
				"Retriever returned hits."
			);

			raw.extend(
				hits.into_iter().map(|hit| hit.with_provenance(round_id, query.as_str(), spec.mode)),
			);
		}
	}

	tracing::info!(
		round = idx,
		queries = state.round_queries.len(),
		modes = modes.len(),
		raw = raw.len(),
		"Retrieval finished."
	);

	Ok(raw)
}
