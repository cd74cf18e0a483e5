use arag_config::Executor as ExecutorConfig;
use arag_domain::Coverage;

use crate::{
	error::{Stage, StageError},
	state::{ExecutionContext, ExecutorState},
};

/// Decides whether the plan runs retrieval at all and resolves the run's stop limits.
pub fn run(state: &mut ExecutorState, settings: &ExecutorConfig) -> Result<(), StageError> {
	let strategy = state.plan.strategy;

	if !strategy.runs_retrieval() {
		tracing::info!(strategy = strategy.as_str(), "Retrieval skipped for strategy.");

		state.continue_search = false;
		state.final_evidence.clear();
		state.coverage = Some(Coverage::empty());
		state.retrieval_report.skipped = true;
		state.retrieval_report.reason = Some(format!("strategy={}", strategy.as_str()));

		return Ok(());
	}
	if state.plan.retrieval_rounds.is_empty() {
		state.continue_search = false;

		return Err(StageError::schema_validation(
			Stage::ExecutorGate,
			"Missing retrieval_rounds for retrieve_then_answer strategy.",
		));
	}

	let ctx = ExecutionContext::resolve(&state.plan, settings);

	tracing::debug!(
		max_rounds = ctx.max_rounds,
		max_total_docs = ctx.max_total_docs,
		confidence_threshold = ?ctx.confidence_threshold,
		no_new_information_rounds = ctx.no_new_information_rounds,
		"Execution context resolved."
	);

	state.execution_context = Some(ctx);
	state.current_round_index = 0;
	state.rounds.clear();
	state.evidence_pool.clear();
	state.continue_search = true;
	state.retrieval_report.skipped = false;
	state.retrieval_report.reason = None;

	Ok(())
}

#[cfg(test)]
mod tests {
	use arag_domain::{EvidenceQuality, Plan, RequestContext, RetrievalRound, Strategy};

	use super::*;
	use crate::error::ErrorKind;

	fn state_for(plan: Plan) -> ExecutorState {
		ExecutorState::new(plan, RequestContext::new("q"))
	}

	#[test]
	fn non_retrieval_strategies_are_skipped() {
		for strategy in
			[Strategy::DirectAnswer, Strategy::ClarifyThenRetrieve, Strategy::DeferOrRefuse]
		{
			let mut state = state_for(Plan {
				strategy,
				retrieval_rounds: vec![RetrievalRound::default()],
				..Plan::default()
			});

			run(&mut state, &ExecutorConfig::default()).expect("gate failed");

			let coverage = state.coverage.clone().expect("coverage missing");

			assert!(!state.continue_search);
			assert!(state.retrieval_report.skipped);
			assert_eq!(
				state.retrieval_report.reason,
				Some(format!("strategy={}", strategy.as_str()))
			);
			assert_eq!(coverage.confidence, 0.0);
			assert_eq!(coverage.evidence_quality, EvidenceQuality::Low);
			assert!(state.execution_context.is_none());
		}
	}

	#[test]
	fn retrieve_strategy_requires_rounds() {
		let mut state = state_for(Plan::default());
		let err = run(&mut state, &ExecutorConfig::default()).expect_err("Expected schema error.");

		assert_eq!(err.kind, ErrorKind::SchemaValidation);
		assert_eq!(err.node, Stage::ExecutorGate);
		assert!(!err.retryable);
		assert!(!state.continue_search);
	}

	#[test]
	fn retrieve_strategy_starts_the_loop() {
		let mut state = state_for(Plan {
			retrieval_rounds: vec![RetrievalRound::default(); 3],
			..Plan::default()
		});

		state.current_round_index = 2;

		run(&mut state, &ExecutorConfig::default()).expect("gate failed");

		assert!(state.continue_search);
		assert_eq!(state.current_round_index, 0);
		assert!(!state.retrieval_report.skipped);
		assert_eq!(state.execution_context.map(|ctx| ctx.max_rounds), Some(3));
	}
}
