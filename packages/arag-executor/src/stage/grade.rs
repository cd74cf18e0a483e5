use serde_json::{Map, Value};

use arag_domain::Coverage;

use crate::{
	CoverageGrader,
	error::{Stage, StageError},
	state::ExecutorState,
};

/// Asks the grader about the round's selection. The result is stored as returned.
pub async fn run(
	state: &ExecutorState,
	grader: &dyn CoverageGrader,
) -> Result<Coverage, StageError> {
	let mut context = Map::new();

	context.insert("constraints".to_string(), Value::Object(state.context.constraints.clone()));
	context.insert("guardrails".to_string(), Value::Object(state.context.guardrails.clone()));

	let coverage = grader
		.grade(&state.plan, &state.context.normalized_query, &state.round_selected, &context)
		.await
		.map_err(|err| StageError::from_report(Stage::GradeCoverage, &err))?;

	tracing::info!(
		round = state.current_round_index,
		confidence = coverage.confidence,
		quality = ?coverage.evidence_quality,
		missing_entities = coverage.missing_entities.len(),
		"Graded coverage."
	);

	Ok(coverage)
}
