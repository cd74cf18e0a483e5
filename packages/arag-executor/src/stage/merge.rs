use std::{cmp::Ordering, collections::HashMap};

use arag_config::Executor as ExecutorConfig;
use arag_domain::{Candidate, RetrievalMode, cmp_score_desc};

use crate::{
	Fusion,
	fusion::dedupe_by_best_score,
	stage,
	state::ExecutorState,
};

const MISSING_RANK: u32 = 1_000_000_000;

/// Collapses the round's raw hits into one deduplicated list, fused with RRF unless the round
/// opts out.
pub fn run(
	state: &ExecutorState,
	fusion: &dyn Fusion,
	settings: &ExecutorConfig,
) -> Vec<Candidate> {
	let raw = &state.round_candidates_raw;

	if raw.is_empty() {
		return Vec::new();
	}

	let idx = state.current_round_index;
	let use_rrf = stage::current_round(state).rrf.unwrap_or(true);
	let lists = ranked_lists(raw);
	let merged = if use_rrf && !lists.is_empty() {
		let fused = fusion.rrf(&lists, settings.rrf_pool_size as usize, settings.rrf_k);
		let mut merged = dedupe_by_best_score(fused);

		merged.sort_by(|a, b| cmp_score_desc(a.rrf_score, b.rrf_score));

		merged
	} else {
		dedupe_by_best_score(raw.clone())
	};

	tracing::info!(
		round = idx,
		raw = raw.len(),
		lists = lists.len(),
		merged = merged.len(),
		rrf = use_rrf,
		"Merged candidates."
	);

	merged
}

/// Groups hits by `(query, mode)` in order of first appearance, each group ordered by its
/// retrieval scores and then by its ranks.
pub fn ranked_lists(raw: &[Candidate]) -> Vec<Vec<Candidate>> {
	let mut lists: Vec<Vec<Candidate>> = Vec::new();
	let mut index: HashMap<(Option<&str>, Option<RetrievalMode>), usize> = HashMap::new();

	for candidate in raw {
		let key = (candidate.query.as_deref(), candidate.mode);
		let slot = *index.entry(key).or_insert_with(|| {
			lists.push(Vec::new());

			lists.len() - 1
		});

		lists[slot].push(candidate.clone());
	}

	for list in &mut lists {
		list.sort_by(cmp_within_list);
	}

	lists
}

fn cmp_within_list(a: &Candidate, b: &Candidate) -> Ordering {
	cmp_score_desc(Some(a.retrieval_score_sum()), Some(b.retrieval_score_sum()))
		.then_with(|| rank_or_missing(a.bm25_rank).cmp(&rank_or_missing(b.bm25_rank)))
		.then_with(|| rank_or_missing(a.vector_rank).cmp(&rank_or_missing(b.vector_rank)))
}

fn rank_or_missing(rank: Option<u32>) -> u32 {
	rank.unwrap_or(MISSING_RANK)
}
