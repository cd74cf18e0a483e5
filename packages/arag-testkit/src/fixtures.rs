use std::sync::Arc;

use arag_domain::{
	Candidate, CandidateKey, Plan, RequestContext, RetrievalMode, RetrievalModeSpec,
	RetrievalRound, RoundOutputSpec, RoundPurpose, StopConditions, Strategy,
};
use arag_executor::{Adapters, NoOpGrader, Retriever, SimpleRrf, Unconfigured};

use crate::ScoreReranker;

pub fn candidate(doc_id: &str, chunk_id: &str, text: &str) -> Candidate {
	Candidate::new(CandidateKey::new(doc_id, chunk_id), text)
}

/// `count` hits spread over `docs` documents, best first, with lexical and dense signals.
pub fn ranked_hits(prefix: &str, count: usize, docs: usize) -> Vec<Candidate> {
	let docs = docs.max(1);

	(0..count)
		.map(|i| {
			let rank = i as u32 + 1;
			let doc_id = format!("{prefix}-doc{}", i % docs);
			let chunk_id = format!("{}", i / docs);

			candidate(&doc_id, &chunk_id, &format!("{prefix} passage {i}"))
				.with_bm25(Some(rank), Some(20.0 - i as f64))
				.with_vector(Some(rank), Some(1.0 - i as f64 / 100.0))
		})
		.collect()
}

/// Fifteen hits about Azure OpenAI configuration over five documents.
pub fn azure_openai_hits() -> Vec<Candidate> {
	ranked_hits("azure-openai", 15, 5)
}

pub fn round(round_id: u32, purpose: RoundPurpose, query_variants: &[&str]) -> RetrievalRound {
	RetrievalRound {
		round_id: Some(round_id),
		purpose: Some(purpose),
		query_variants: query_variants.iter().map(|query| query.to_string()).collect(),
		retrieval_modes: vec![
			RetrievalModeSpec { mode: RetrievalMode::Bm25, k: Some(20), alpha: None },
			RetrievalModeSpec { mode: RetrievalMode::Vector, k: Some(20), alpha: None },
		],
		output: RoundOutputSpec { max_docs: Some(8) },
		..RetrievalRound::default()
	}
}

pub fn plan_with_rounds(rounds: Vec<RetrievalRound>) -> Plan {
	Plan {
		goal: "Explain how to configure the service.".to_string(),
		strategy: Strategy::RetrieveThenAnswer,
		retrieval_rounds: rounds,
		stop_conditions: StopConditions {
			max_rounds: None,
			max_total_docs: Some(12),
			confidence_threshold: None,
			no_new_information_rounds: Some(1),
		},
		..Plan::default()
	}
}

pub fn single_round_plan(query_variants: &[&str]) -> Plan {
	plan_with_rounds(vec![round(0, RoundPurpose::Recall, query_variants)])
}

pub fn request(query: &str) -> RequestContext {
	RequestContext::new(query)
}

/// Static retrieval, score-copy rerank, and the no-op grader. HyDE is left unconfigured.
pub fn adapters(retriever: Arc<dyn Retriever>) -> Adapters {
	Adapters::new(
		retriever,
		Arc::new(Unconfigured::new("hyde")),
		Arc::new(ScoreReranker::default()),
		Arc::new(SimpleRrf),
		Arc::new(NoOpGrader),
	)
}
