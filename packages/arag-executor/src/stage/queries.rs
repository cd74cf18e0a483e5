use arag_config::Executor as ExecutorConfig;

use crate::{
	HydeGenerator,
	error::{Stage, StageError},
	state::ExecutorState,
};

/// Builds the queries for the current round. `Ok(None)` means the index ran past the plan.
pub async fn prepare(
	state: &ExecutorState,
	hyde: &dyn HydeGenerator,
	settings: &ExecutorConfig,
) -> Result<Option<Vec<String>>, StageError> {
	let idx = state.current_round_index;
	let Some(round) = state.plan.round(idx) else {
		tracing::debug!(
			round = idx,
			planned = state.plan.retrieval_rounds.len(),
			"Round index is past the plan."
		);

		return Ok(None);
	};
	let normalized_query = &state.context.normalized_query;
	let literal = &state.plan.literal_constraints;
	let terms = literal.required_terms();
	let use_hyde = round.use_hyde && !literal.must_match_exactly && terms.is_empty();
	let mut queries = if round.query_variants.is_empty() {
		vec![normalized_query.clone()]
	} else {
		round.query_variants.clone()
	};

	if use_hyde {
		let synthetic = hyde
			.synthesize(normalized_query, &state.plan)
			.await
			.map_err(|err| StageError::from_report(Stage::PrepareRoundQueries, &err))?;
		let derived = hyde
			.derive_queries(normalized_query, &synthetic, settings.hyde_max_queries)
			.await
			.map_err(|err| StageError::from_report(Stage::PrepareRoundQueries, &err))?;

		queries = std::iter::once(normalized_query.clone()).chain(derived).collect();
	}

	let queries = preserve_literal_terms(queries, &terms);

	tracing::info!(round = idx, queries = queries.len(), use_hyde, "Prepared round queries.");

	Ok(Some(queries))
}

/// Moves queries containing every term to the front. When none does, a query made of the first
/// query followed by the terms takes the front instead. Blank terms must already be removed.
pub fn preserve_literal_terms(queries: Vec<String>, terms: &[&str]) -> Vec<String> {
	if terms.is_empty() {
		return queries;
	}

	let mut preserved = queries
		.iter()
		.filter(|query| terms.iter().all(|term| query.contains(term)))
		.cloned()
		.collect::<Vec<_>>();

	if preserved.is_empty() {
		let base = queries.first().map(String::as_str).unwrap_or_default();

		preserved.push(format!("{base} {}", terms.join(" ")).trim().to_string());
	}

	let rest = queries.into_iter().filter(|query| !preserved.contains(query)).collect::<Vec<_>>();

	preserved.extend(rest);

	preserved
}

#[cfg(test)]
mod tests {
	use std::{
		future::Future,
		sync::atomic::{AtomicUsize, Ordering},
	};

	use arag_domain::{LiteralConstraints, Plan, RequestContext, RetrievalRound};

	use super::*;
	use crate::BoxFuture;

	#[derive(Default)]
	struct SpyHyde {
		calls: AtomicUsize,
	}
	impl HydeGenerator for SpyHyde {
		fn synthesize<'a>(
			&'a self,
			_query: &'a str,
			_plan: &'a Plan,
		) -> BoxFuture<'a, color_eyre::Result<String>> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			Box::pin(async { Ok("a hypothetical answer".to_string()) })
		}

		fn derive_queries<'a>(
			&'a self,
			_original_query: &'a str,
			_synthetic_answer: &'a str,
			_max_queries: u32,
		) -> BoxFuture<'a, color_eyre::Result<Vec<String>>> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			Box::pin(async { Ok(vec!["derived one".to_string(), "derived two".to_string()]) })
		}
	}

	fn strings(values: &[&str]) -> Vec<String> {
		values.iter().map(|value| value.to_string()).collect()
	}

	fn block_on<F: Future>(future: F) -> F::Output {
		tokio::runtime::Builder::new_current_thread()
			.build()
			.expect("Failed to build runtime.")
			.block_on(future)
	}

	fn state_with_round(round: RetrievalRound, literal: LiteralConstraints) -> ExecutorState {
		let plan = Plan {
			retrieval_rounds: vec![round],
			literal_constraints: literal,
			..Plan::default()
		};

		ExecutorState::new(plan, RequestContext::new("rotate azure openai keys"))
	}

	fn prepared(state: &ExecutorState, hyde: &SpyHyde) -> Option<Vec<String>> {
		block_on(prepare(state, hyde, &ExecutorConfig::default())).expect("Prepare failed.")
	}

	#[test]
	fn index_past_the_plan_yields_none() {
		let hyde = SpyHyde::default();
		let mut state = state_with_round(
			RetrievalRound { query_variants: strings(&["q"]), ..RetrievalRound::default() },
			LiteralConstraints::default(),
		);

		state.current_round_index = 1;

		assert_eq!(prepared(&state, &hyde), None);
		assert_eq!(hyde.calls.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn empty_variants_fall_back_to_normalized_query() {
		let hyde = SpyHyde::default();
		let state = state_with_round(RetrievalRound::default(), LiteralConstraints::default());

		assert_eq!(prepared(&state, &hyde), Some(strings(&["rotate azure openai keys"])));
		assert_eq!(hyde.calls.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn hyde_expands_from_the_normalized_query() {
		let hyde = SpyHyde::default();
		let state = state_with_round(
			RetrievalRound {
				query_variants: strings(&["unused variant"]),
				use_hyde: true,
				..RetrievalRound::default()
			},
			LiteralConstraints::default(),
		);

		assert_eq!(
			prepared(&state, &hyde),
			Some(strings(&["rotate azure openai keys", "derived one", "derived two"]))
		);
		assert_eq!(hyde.calls.load(Ordering::SeqCst), 2);
	}

	#[test]
	fn exact_match_suppresses_hyde_without_terms() {
		let hyde = SpyHyde::default();
		let state = state_with_round(
			RetrievalRound {
				query_variants: strings(&["key rotation", "azure keys"]),
				use_hyde: true,
				..RetrievalRound::default()
			},
			LiteralConstraints { must_preserve_terms: Vec::new(), must_match_exactly: true },
		);

		assert_eq!(prepared(&state, &hyde), Some(strings(&["key rotation", "azure keys"])));
		assert_eq!(hyde.calls.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn queries_with_all_terms_move_first() {
		let out = preserve_literal_terms(strings(&["c", "a b"]), &["a", "b"]);

		assert_eq!(out, strings(&["a b", "c"]));
	}

	#[test]
	fn order_is_kept_when_first_query_already_preserves() {
		let out = preserve_literal_terms(strings(&["a b", "c"]), &["a", "b"]);

		assert_eq!(out, strings(&["a b", "c"]));
	}

	#[test]
	fn synthetic_query_is_added_when_none_preserves() {
		let out = preserve_literal_terms(strings(&["config", "setup"]), &["AZURE_OPENAI_KEY"]);

		assert_eq!(out, strings(&["config AZURE_OPENAI_KEY", "config", "setup"]));
	}

	#[test]
	fn synthetic_query_is_trimmed_without_queries() {
		let out = preserve_literal_terms(Vec::new(), &["a", "b"]);

		assert_eq!(out, strings(&["a b"]));
	}

	#[test]
	fn no_terms_is_identity() {
		let queries = strings(&["x", "x", "y"]);

		assert_eq!(preserve_literal_terms(queries.clone(), &[]), queries);
	}
}
