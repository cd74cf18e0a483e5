use serde::{Deserialize, Serialize};

use arag_config::Executor as ExecutorConfig;
use arag_domain::{Candidate, Coverage, Plan, RequestContext, RoundResult};

use crate::{error::StageError, report::RetrievalReport};

/// Stop limits resolved once per run from the plan, with executor defaults filling gaps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
	/// At least one.
	pub max_rounds: u32,
	pub max_total_docs: u32,
	pub confidence_threshold: Option<f64>,
	pub no_new_information_rounds: u32,
}
impl ExecutionContext {
	pub fn resolve(plan: &Plan, settings: &ExecutorConfig) -> Self {
		let stop = &plan.stop_conditions;
		let planned = u32::try_from(plan.retrieval_rounds.len()).unwrap_or(u32::MAX);

		Self {
			max_rounds: stop.max_rounds.unwrap_or(planned).max(1),
			max_total_docs: stop.max_total_docs.unwrap_or(settings.max_total_docs),
			confidence_threshold: stop.confidence_threshold,
			no_new_information_rounds: stop.no_new_information_rounds.unwrap_or(1),
		}
	}
}

/// Everything one executor run reads and writes.
///
/// The `round_*` fields are scratch space overwritten by every round. `rounds` and
/// `evidence_pool` only grow, and only the round controller appends to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorState {
	pub plan: Plan,
	pub context: RequestContext,

	pub execution_context: Option<ExecutionContext>,
	pub current_round_index: usize,

	pub round_queries: Vec<String>,
	pub round_candidates_raw: Vec<Candidate>,
	pub round_candidates_merged: Vec<Candidate>,
	pub round_candidates_reranked: Vec<Candidate>,
	pub round_selected: Vec<Candidate>,

	pub rounds: Vec<RoundResult>,
	pub evidence_pool: Vec<Candidate>,
	pub final_evidence: Vec<Candidate>,
	pub coverage: Option<Coverage>,
	pub retrieval_report: RetrievalReport,

	pub continue_search: bool,
	pub errors: Vec<StageError>,
}
impl ExecutorState {
	pub fn new(plan: Plan, context: RequestContext) -> Self {
		let retrieval_report = RetrievalReport::new(&plan);

		Self {
			plan,
			context,
			execution_context: None,
			current_round_index: 0,
			round_queries: Vec::new(),
			round_candidates_raw: Vec::new(),
			round_candidates_merged: Vec::new(),
			round_candidates_reranked: Vec::new(),
			round_selected: Vec::new(),
			rounds: Vec::new(),
			evidence_pool: Vec::new(),
			final_evidence: Vec::new(),
			coverage: None,
			retrieval_report,
			continue_search: false,
			errors: Vec::new(),
		}
	}

	/// The resolved limits, or the same values resolved on the spot when the gate never set them.
	pub fn execution_context(&self, settings: &ExecutorConfig) -> ExecutionContext {
		self.execution_context.unwrap_or_else(|| ExecutionContext::resolve(&self.plan, settings))
	}

	pub(crate) fn clear_round_scratch(&mut self) {
		self.round_queries.clear();
		self.round_candidates_raw.clear();
		self.round_candidates_merged.clear();
		self.round_candidates_reranked.clear();
		self.round_selected.clear();
	}
}
