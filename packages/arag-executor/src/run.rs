use arag_domain::{Plan, RequestContext};

use crate::{
	Executor,
	error::{Stage, StageError},
	report::StopReason,
	retry::with_retry,
	stage,
	state::ExecutorState,
};

impl Executor {
	/// Runs the gate, the round loop, and finalize. Failures never abort the run: they are
	/// recorded in `errors` and the evidence gathered so far is finalized.
	pub async fn run(&self, plan: Plan, context: RequestContext) -> ExecutorState {
		let mut state = ExecutorState::new(plan, context);

		tracing::info!(
			run_id = %state.retrieval_report.run_id,
			strategy = state.plan.strategy.as_str(),
			planned_rounds = state.plan.retrieval_rounds.len(),
			"Executor run started."
		);

		if let Err(err) = stage::gate::run(&mut state, &self.settings) {
			record_failure(&mut state, err);
		}

		while state.continue_search {
			if let Err(err) = self.run_round(&mut state).await {
				record_failure(&mut state, err);
			}
		}

		stage::finalize::run(&mut state, &self.settings);

		state
	}

	async fn run_round(&self, state: &mut ExecutorState) -> Result<(), StageError> {
		let attempts = self.settings.max_retries;
		let settings = &self.settings;
		let hyde = self.adapters.hyde.as_ref();
		let retriever = self.adapters.retriever.as_ref();
		let fusion = self.adapters.fusion.as_ref();
		let reranker = self.adapters.reranker.as_ref();
		let grader = self.adapters.grader.as_ref();

		state.clear_round_scratch();

		let view: &ExecutorState = state;
		let prepared = with_retry(Stage::PrepareRoundQueries, attempts, || {
			stage::queries::prepare(view, hyde, settings)
		})
		.await?;
		let Some(queries) = prepared else {
			state.continue_search = false;
			state.retrieval_report.push_stop_reason(StopReason::RoundOutOfRange);

			return Ok(());
		};

		state.round_queries = queries;

		let view: &ExecutorState = state;
		let raw =
			with_retry(Stage::RunRetrieval, attempts, || stage::retrieval::run(view, retriever, settings))
				.await?;

		state.round_candidates_raw = raw;
		state.round_candidates_merged = stage::merge::run(state, fusion, settings);

		let view: &ExecutorState = state;
		let reranked = with_retry(Stage::RerankCandidates, attempts, || {
			stage::rerank::run(view, reranker, settings)
		})
		.await?;

		state.round_candidates_reranked = reranked;
		state.round_selected = stage::select::run(state, settings);

		let view: &ExecutorState = state;
		let coverage =
			with_retry(Stage::GradeCoverage, attempts, || stage::grade::run(view, grader)).await?;

		state.coverage = Some(coverage);

		stage::controller::run(state, settings);

		Ok(())
	}
}

fn record_failure(state: &mut ExecutorState, err: StageError) {
	tracing::warn!(
		node = err.node.as_str(),
		kind = err.kind.as_str(),
		retryable = err.retryable,
		round = state.current_round_index,
		error = %err.message,
		"Stage failed. Finalizing with gathered evidence."
	);

	state.continue_search = false;
	state.retrieval_report.push_stop_reason(StopReason::Error);
	state.errors.push(err);
}
