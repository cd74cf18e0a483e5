use time::OffsetDateTime;

use arag_config::Executor as ExecutorConfig;
use arag_domain::cmp_score_desc;

use crate::{report::RoundSummary, state::ExecutorState};

/// Picks the final evidence from the pool and closes the report. Never fails.
pub fn run(state: &mut ExecutorState, settings: &ExecutorConfig) {
	let cap = state.execution_context(settings).max_total_docs as usize;
	let mut evidence = state.evidence_pool.clone();

	evidence.sort_by(|a, b| cmp_score_desc(a.best_score(), b.best_score()));
	evidence.truncate(cap);

	let report = &mut state.retrieval_report;

	report.round_count = state.rounds.len();
	report.final_docs = evidence.len();
	report.rounds = state.rounds.iter().map(RoundSummary::from).collect();
	report.finished_at = Some(OffsetDateTime::now_utc());

	tracing::info!(
		run_id = %report.run_id,
		rounds = report.round_count,
		pool = state.evidence_pool.len(),
		final_docs = report.final_docs,
		stop_reasons = ?report.stop_reasons,
		errors = state.errors.len(),
		"Evidence pack finalized."
	);

	state.final_evidence = evidence;
}

#[cfg(test)]
mod tests {
	use arag_domain::{Candidate, CandidateKey, Plan, RequestContext, StopConditions};

	use super::*;

	#[test]
	fn caps_and_sorts_by_best_score() {
		let mut state = ExecutorState::new(Plan::default(), RequestContext::new("q"));

		state.evidence_pool = (0..20)
			.map(|i| {
				Candidate::new(CandidateKey::new(format!("doc{i}"), "0"), "t")
					.with_rrf_score(f64::from(i) / 100.0)
			})
			.collect();

		run(&mut state, &ExecutorConfig::default());

		let scores = state.final_evidence.iter().filter_map(|c| c.best_score()).collect::<Vec<_>>();

		assert_eq!(state.final_evidence.len(), 12);
		assert_eq!(state.retrieval_report.final_docs, 12);
		assert!(scores.windows(2).all(|pair| pair[0] >= pair[1]));
		assert_eq!(scores[0], 0.19);
		assert_eq!(state.evidence_pool.len(), 20);
	}

	#[test]
	fn plan_cap_overrides_default() {
		let plan = Plan {
			stop_conditions: StopConditions { max_total_docs: Some(2), ..StopConditions::default() },
			..Plan::default()
		};
		let mut state = ExecutorState::new(plan, RequestContext::new("q"));

		state.evidence_pool = ["a", "b", "c"]
			.iter()
			.map(|doc| Candidate::new(CandidateKey::new(*doc, "0"), "t").with_bm25(Some(1), Some(1.0)))
			.collect();

		run(&mut state, &ExecutorConfig::default());

		assert_eq!(state.final_evidence.len(), 2);
	}

	#[test]
	fn empty_pool_finalizes_empty() {
		let mut state = ExecutorState::new(Plan::default(), RequestContext::new("q"));

		run(&mut state, &ExecutorConfig::default());

		assert!(state.final_evidence.is_empty());
		assert_eq!(state.retrieval_report.round_count, 0);
		assert!(state.retrieval_report.finished_at.is_some());
	}

	#[test]
	fn nan_scores_fall_below_the_cap() {
		let mut state = ExecutorState::new(Plan::default(), RequestContext::new("q"));

		state.evidence_pool = (0..40)
			.map(|i| {
				let candidate = Candidate::new(CandidateKey::new(format!("doc{i}"), "0"), "t");

				if i % 2 == 0 {
					candidate.with_rerank_score(f64::NAN)
				} else {
					candidate.with_rerank_score(f64::from(i) / 100.0)
				}
			})
			.collect();

		run(&mut state, &ExecutorConfig::default());

		assert_eq!(state.final_evidence.len(), 12);
		assert_eq!(state.final_evidence[0].rerank_score, Some(0.39));
		assert!(state.final_evidence.iter().all(|c| c.rerank_score.is_some_and(|s| !s.is_nan())));
	}
}
