use std::collections::HashSet;

use serde_json::{Map, Value};

use arag_config::Executor as ExecutorConfig;
use arag_domain::{CandidateKey, RoundResult};

use crate::{
	report::StopReason,
	stage,
	state::{ExecutionContext, ExecutorState},
};

/// Outcome of the three independent stop conditions for one completed round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopDecision {
	pub reached_max: bool,
	pub meets_confidence: bool,
	pub stale: bool,
}
impl StopDecision {
	pub fn evaluate(
		round_index: usize,
		ctx: &ExecutionContext,
		planned_rounds: usize,
		confidence: f64,
		no_new_streak: u32,
	) -> Self {
		let limit = (ctx.max_rounds as usize).min(planned_rounds);

		Self {
			reached_max: round_index + 1 >= limit,
			meets_confidence: ctx
				.confidence_threshold
				.is_some_and(|threshold| confidence >= threshold),
			stale: no_new_streak >= ctx.no_new_information_rounds,
		}
	}

	pub fn should_continue(self) -> bool {
		!(self.reached_max || self.meets_confidence || self.stale)
	}

	pub fn reasons(self) -> Vec<StopReason> {
		[
			(self.reached_max, StopReason::MaxRounds),
			(self.meets_confidence, StopReason::ConfidenceReached),
			(self.stale, StopReason::NoNewInformation),
		]
		.into_iter()
		.filter_map(|(held, reason)| held.then_some(reason))
		.collect()
	}
}

/// Folds the round into the pool and the round log, then decides whether another round runs.
///
/// Returns whether the loop continues. The index only advances when it does.
pub fn run(state: &mut ExecutorState, settings: &ExecutorConfig) -> bool {
	let idx = state.current_round_index;
	let ctx = state.execution_context(settings);
	let mut known = state
		.evidence_pool
		.iter()
		.map(|candidate| candidate.key.clone())
		.collect::<HashSet<CandidateKey>>();
	let novel = state
		.round_selected
		.iter()
		.filter(|candidate| known.insert(candidate.key.clone()))
		.cloned()
		.collect::<Vec<_>>();
	let novelty = novel.len();

	state.evidence_pool.extend(novel);

	let report = &mut state.retrieval_report;

	report.no_new_streak = if novelty == 0 { report.no_new_streak + 1 } else { 0 };

	let confidence = state.coverage.as_ref().map_or(0.0, |coverage| coverage.confidence);
	let decision = StopDecision::evaluate(
		idx,
		&ctx,
		state.plan.retrieval_rounds.len(),
		confidence,
		report.no_new_streak,
	);

	for reason in decision.reasons() {
		report.push_stop_reason(reason);
	}

	let (round_id, purpose) = match state.plan.round(idx) {
		Some(spec) => (
			spec.round_id.unwrap_or_else(|| stage::round_index_u32(idx)),
			spec.purpose.map_or("unknown", |purpose| purpose.as_str()).to_string(),
		),
		None => (stage::round_index_u32(idx), "unknown".to_string()),
	};
	let mut debug = Map::new();

	debug.insert("reached_max".to_string(), Value::Bool(decision.reached_max));
	debug.insert("meets_confidence".to_string(), Value::Bool(decision.meets_confidence));
	debug.insert("stale".to_string(), Value::Bool(decision.stale));

	state.rounds.push(RoundResult {
		round_id,
		purpose,
		queries: state.round_queries.clone(),
		raw_candidates_count: state.round_candidates_raw.len(),
		merged_candidates_count: state.round_candidates_merged.len(),
		reranked_candidates_count: state.round_candidates_reranked.len(),
		selected: state.round_selected.clone(),
		novelty_new_items: novelty,
		debug,
	});

	let proceed = decision.should_continue();

	state.continue_search = proceed;

	if proceed {
		state.current_round_index += 1;
	}

	tracing::info!(
		round = idx,
		novelty,
		pool = state.evidence_pool.len(),
		no_new_streak = state.retrieval_report.no_new_streak,
		confidence,
		reached_max = decision.reached_max,
		meets_confidence = decision.meets_confidence,
		stale = decision.stale,
		proceed,
		"Round completed."
	);

	proceed
}
