use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::plan::RetrievalMode;

/// Identity of a retrievable unit. Equal keys denote the same evidence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateKey {
	pub doc_id: String,
	pub chunk_id: String,
}
impl CandidateKey {
	pub fn new(doc_id: impl Into<String>, chunk_id: impl Into<String>) -> Self {
		Self { doc_id: doc_id.into(), chunk_id: chunk_id.into() }
	}
}

/// One retrieved chunk with its scores and provenance.
///
/// Pipeline stages never assign fields in place; they derive a new value through the `with_*`
/// methods so an adapter's output is left untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
	pub key: CandidateKey,
	pub text: String,
	#[serde(default)]
	pub metadata: Map<String, Value>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub bm25_rank: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub vector_rank: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub bm25_score: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub vector_score: Option<f64>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub rrf_score: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub rerank_score: Option<f64>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub round_id: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub query: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub mode: Option<RetrievalMode>,
}
impl Candidate {
	pub fn new(key: CandidateKey, text: impl Into<String>) -> Self {
		Self {
			key,
			text: text.into(),
			metadata: Map::new(),
			bm25_rank: None,
			vector_rank: None,
			bm25_score: None,
			vector_score: None,
			rrf_score: None,
			rerank_score: None,
			round_id: None,
			query: None,
			mode: None,
		}
	}

	pub fn with_metadata(self, metadata: Map<String, Value>) -> Self {
		Self { metadata, ..self }
	}

	pub fn with_bm25(self, rank: Option<u32>, score: Option<f64>) -> Self {
		Self { bm25_rank: rank, bm25_score: score, ..self }
	}

	pub fn with_vector(self, rank: Option<u32>, score: Option<f64>) -> Self {
		Self { vector_rank: rank, vector_score: score, ..self }
	}

	pub fn with_rrf_score(self, score: f64) -> Self {
		Self { rrf_score: Some(score), ..self }
	}

	pub fn with_rerank_score(self, score: f64) -> Self {
		Self { rerank_score: Some(score), ..self }
	}

	pub fn with_provenance(self, round_id: u32, query: impl Into<String>, mode: RetrievalMode) -> Self {
		Self { round_id: Some(round_id), query: Some(query.into()), mode: Some(mode), ..self }
	}

	/// First present score in rerank > rrf > vector > bm25 order.
	pub fn best_score(&self) -> Option<f64> {
		self.rerank_score.or(self.rrf_score).or(self.vector_score).or(self.bm25_score)
	}

	/// Score used for evidence selection: rerank, falling back to rrf.
	pub fn selection_score(&self) -> Option<f64> {
		self.rerank_score.or(self.rrf_score)
	}

	/// Sum of the lexical and dense retrieval scores, missing values counted as zero.
	pub fn retrieval_score_sum(&self) -> f64 {
		self.bm25_score.unwrap_or(0.0) + self.vector_score.unwrap_or(0.0)
	}
}

/// Descending score order with missing scores counted as zero and NaN sorted last.
pub fn cmp_score_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
	let (a, b) = (a.unwrap_or(0.0), b.unwrap_or(0.0));

	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn best_score_follows_precedence() {
		let base = Candidate::new(CandidateKey::new("d", "c"), "t");

		assert_eq!(base.best_score(), None);

		let bm25 = base.clone().with_bm25(Some(1), Some(0.1));

		assert_eq!(bm25.best_score(), Some(0.1));

		let vector = bm25.with_vector(Some(2), Some(0.2));

		assert_eq!(vector.best_score(), Some(0.2));

		let fused = vector.with_rrf_score(0.3);

		assert_eq!(fused.best_score(), Some(0.3));

		let reranked = fused.with_rerank_score(0.0);

		assert_eq!(reranked.best_score(), Some(0.0));
	}

	#[test]
	fn with_provenance_leaves_source_untouched() {
		let source = Candidate::new(CandidateKey::new("d", "c"), "t").with_bm25(Some(1), Some(1.0));
		let stamped = source.clone().with_provenance(3, "q", RetrievalMode::Bm25);

		assert_eq!(source.round_id, None);
		assert_eq!(stamped.round_id, Some(3));
		assert_eq!(stamped.query.as_deref(), Some("q"));
		assert_eq!(stamped.mode, Some(RetrievalMode::Bm25));
		assert_eq!(stamped.bm25_score, Some(1.0));
	}

	#[test]
	fn score_order_puts_nan_last() {
		let mut scores = vec![Some(f64::NAN), Some(0.2), None, Some(f64::NAN), Some(0.9), Some(-0.5)];

		scores.sort_by(|a, b| cmp_score_desc(*a, *b));

		assert_eq!(scores[0], Some(0.9));
		assert_eq!(scores[1], Some(0.2));
		assert_eq!(scores[2], None);
		assert_eq!(scores[3], Some(-0.5));
		assert!(scores[4..].iter().all(|score| score.is_some_and(f64::is_nan)));
	}
}
