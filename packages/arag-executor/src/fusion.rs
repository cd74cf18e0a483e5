use std::collections::{HashMap, hash_map::Entry};

use arag_domain::{Candidate, CandidateKey, cmp_score_desc};

use crate::Fusion;

/// Deterministic reciprocal rank fusion.
///
/// Each appearance at 1-based `rank` adds `1 / (rrf_k + rank)` to the key's score. The value
/// kept for a key is its last occurrence, placed where the key was first seen; the stable sort
/// then orders ties by that first appearance.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleRrf;

impl Fusion for SimpleRrf {
	fn rrf(&self, ranked_lists: &[Vec<Candidate>], k: usize, rrf_k: u32) -> Vec<Candidate> {
		let mut slots: Vec<(Candidate, f64)> = Vec::new();
		let mut index: HashMap<CandidateKey, usize> = HashMap::new();

		for list in ranked_lists {
			for (offset, candidate) in list.iter().enumerate() {
				let contribution = rrf_contribution(rrf_k, offset + 1);

				match index.entry(candidate.key.clone()) {
					Entry::Occupied(entry) => {
						let slot = &mut slots[*entry.get()];

						slot.0 = candidate.clone();
						slot.1 += contribution;
					},
					Entry::Vacant(entry) => {
						entry.insert(slots.len());
						slots.push((candidate.clone(), contribution));
					},
				}
			}
		}

		let mut fused = slots
			.into_iter()
			.map(|(candidate, score)| candidate.with_rrf_score(score))
			.collect::<Vec<_>>();

		fused.sort_by(|a, b| cmp_score_desc(a.rrf_score, b.rrf_score));
		fused.truncate(k);

		fused
	}
}

pub fn rrf_contribution(rrf_k: u32, rank: usize) -> f64 {
	1.0 / (f64::from(rrf_k) + rank as f64)
}

/// Collapses equal keys to one candidate. The variant with the highest
/// [`Candidate::best_score`] wins, a later variant winning ties. Keys keep the position of
/// their first appearance.
pub fn dedupe_by_best_score(candidates: Vec<Candidate>) -> Vec<Candidate> {
	let mut out: Vec<Candidate> = Vec::with_capacity(candidates.len());
	let mut index: HashMap<CandidateKey, usize> = HashMap::new();

	for candidate in candidates {
		match index.entry(candidate.key.clone()) {
			Entry::Occupied(entry) => {
				let prev = &mut out[*entry.get()];

				if candidate.best_score().unwrap_or(0.0) >= prev.best_score().unwrap_or(0.0) {
					*prev = candidate;
				}
			},
			Entry::Vacant(entry) => {
				entry.insert(out.len());
				out.push(candidate);
			},
		}
	}

	out
}

#[cfg(test)]
mod tests {
	use arag_domain::RetrievalMode;

	use super::*;

	fn candidate(doc: &str, chunk: &str) -> Candidate {
		Candidate::new(CandidateKey::new(doc, chunk), format!("{doc}:{chunk}"))
	}

	#[test]
	fn rrf_sums_reciprocal_ranks() {
		let lists = vec![
			vec![candidate("a", "0"), candidate("b", "0")],
			vec![candidate("b", "0"), candidate("c", "0")],
		];
		let fused = SimpleRrf.rrf(&lists, 200, 60);
		let b = 1.0 / 62.0 + 1.0 / 61.0;

		assert_eq!(fused[0].key.doc_id, "b");
		assert!((fused[0].rrf_score.unwrap_or_default() - b).abs() < 1e-12);
		assert_eq!(fused[1].key.doc_id, "a");
		assert_eq!(fused[1].rrf_score, Some(1.0 / 61.0));
		assert_eq!(fused[2].key.doc_id, "c");
		assert_eq!(fused[2].rrf_score, Some(1.0 / 62.0));
	}

	#[test]
	fn rrf_is_deterministic_and_truncates() {
		let lists = vec![
			vec![candidate("a", "0"), candidate("b", "0"), candidate("c", "0")],
			vec![candidate("c", "0"), candidate("a", "0")],
		];
		let first = SimpleRrf.rrf(&lists, 2, 60);
		let second = SimpleRrf.rrf(&lists, 2, 60);

		assert_eq!(first, second);
		assert_eq!(first.len(), 2);
	}

	#[test]
	fn rrf_keeps_last_variant_of_a_key() {
		let lists = vec![
			vec![candidate("a", "0").with_provenance(0, "first", RetrievalMode::Bm25)],
			vec![candidate("a", "0").with_provenance(0, "second", RetrievalMode::Vector)],
		];
		let fused = SimpleRrf.rrf(&lists, 10, 60);

		assert_eq!(fused.len(), 1);
		assert_eq!(fused[0].query.as_deref(), Some("second"));
	}

	#[test]
	fn dedupe_prefers_higher_best_score() {
		let low = candidate("a", "0").with_rrf_score(0.1);
		let high = candidate("a", "0").with_rerank_score(0.5);
		let merged = dedupe_by_best_score(vec![low, high.clone(), candidate("b", "0")]);

		assert_eq!(merged.len(), 2);
		assert_eq!(merged[0], high);
		assert_eq!(merged[1].key.doc_id, "b");
	}

	#[test]
	fn dedupe_scores_by_first_present_score() {
		let lexical = candidate("a", "0").with_bm25(Some(1), Some(9.0));
		// The rerank score shadows the larger bm25 score.
		let reranked = candidate("a", "0").with_bm25(Some(1), Some(9.0)).with_rerank_score(0.05);
		let merged = dedupe_by_best_score(vec![lexical.clone(), reranked]);

		assert_eq!(merged, vec![lexical]);
	}

	#[test]
	fn dedupe_keeps_earlier_variant_with_better_score() {
		let strong = candidate("a", "0").with_bm25(Some(1), Some(3.0));
		let weak = candidate("a", "0").with_bm25(Some(5), Some(1.0));
		let merged = dedupe_by_best_score(vec![strong.clone(), weak]);

		assert_eq!(merged, vec![strong]);
	}

	#[test]
	fn dedupe_ties_go_to_later_variant() {
		let first = candidate("a", "0")
			.with_vector(Some(1), Some(0.5))
			.with_provenance(0, "q1", RetrievalMode::Vector);
		let second = candidate("a", "0")
			.with_vector(Some(2), Some(0.5))
			.with_provenance(0, "q2", RetrievalMode::Vector);
		let merged = dedupe_by_best_score(vec![first, second.clone()]);

		assert_eq!(merged, vec![second]);
	}

	#[test]
	fn dedupe_is_idempotent() {
		let input = vec![
			candidate("a", "0").with_rrf_score(0.2),
			candidate("b", "1").with_rrf_score(0.4),
			candidate("a", "0").with_rrf_score(0.3),
			candidate("b", "2"),
		];
		let once = dedupe_by_best_score(input);
		let twice = dedupe_by_best_score(once.clone());

		assert_eq!(once, twice);
		assert_eq!(once.len(), 3);
		assert_eq!(once[0].rrf_score, Some(0.3));
	}
}
