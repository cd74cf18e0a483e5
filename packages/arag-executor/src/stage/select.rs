use std::collections::{HashMap, VecDeque};

use arag_config::Executor as ExecutorConfig;
use arag_domain::{Candidate, cmp_score_desc};

use crate::{stage, state::ExecutorState};

pub fn run(state: &ExecutorState, settings: &ExecutorConfig) -> Vec<Candidate> {
	let reranked = &state.round_candidates_reranked;

	if reranked.is_empty() {
		return Vec::new();
	}

	let max_docs = stage::current_round(state)
		.output
		.max_docs
		.unwrap_or(settings.max_docs_per_round) as usize;
	let selected = diverse_top_k(reranked, max_docs);

	tracing::info!(
		round = state.current_round_index,
		reranked = reranked.len(),
		selected = selected.len(),
		max_docs,
		"Selected evidence."
	);

	selected
}

/// Takes the best remaining chunk of each document in turn until `max_docs` are taken, so one
/// document cannot crowd out the others.
pub fn diverse_top_k(candidates: &[Candidate], max_docs: usize) -> Vec<Candidate> {
	let mut sorted = candidates.to_vec();

	sorted.sort_by(|a, b| cmp_score_desc(a.selection_score(), b.selection_score()));

	let mut groups: Vec<VecDeque<Candidate>> = Vec::new();
	let mut index: HashMap<String, usize> = HashMap::new();

	for candidate in sorted {
		let slot = *index.entry(candidate.key.doc_id.clone()).or_insert_with(|| {
			groups.push(VecDeque::new());

			groups.len() - 1
		});

		groups[slot].push_back(candidate);
	}

	let mut selected = Vec::with_capacity(max_docs.min(candidates.len()));

	while selected.len() < max_docs {
		let mut progressed = false;

		for group in &mut groups {
			let Some(candidate) = group.pop_front() else {
				continue;
			};

			selected.push(candidate);
			progressed = true;

			if selected.len() >= max_docs {
				break;
			}
		}

		if !progressed {
			break;
		}
	}

	selected
}
