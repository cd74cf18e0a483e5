use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use arag_domain::{Plan, RoundResult};

/// Why the round loop ended. More than one stop condition can hold for the same round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
	MaxRounds,
	ConfidenceReached,
	NoNewInformation,
	RoundOutOfRange,
	Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedRef {
	pub doc_id: String,
	pub chunk_id: String,
	pub rerank_score: Option<f64>,
	pub rrf_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSummary {
	pub round_id: u32,
	pub purpose: String,
	pub queries: Vec<String>,
	pub raw_candidates_count: usize,
	pub merged_candidates_count: usize,
	pub reranked_candidates_count: usize,
	pub selected: Vec<SelectedRef>,
	pub novelty_new_items: usize,
}
impl From<&RoundResult> for RoundSummary {
	fn from(round: &RoundResult) -> Self {
		Self {
			round_id: round.round_id,
			purpose: round.purpose.clone(),
			queries: round.queries.clone(),
			raw_candidates_count: round.raw_candidates_count,
			merged_candidates_count: round.merged_candidates_count,
			reranked_candidates_count: round.reranked_candidates_count,
			selected: round
				.selected
				.iter()
				.map(|candidate| SelectedRef {
					doc_id: candidate.key.doc_id.clone(),
					chunk_id: candidate.key.chunk_id.clone(),
					rerank_score: candidate.rerank_score,
					rrf_score: candidate.rrf_score,
				})
				.collect(),
			novelty_new_items: round.novelty_new_items,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalReport {
	pub run_id: Uuid,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub plan_hash: Option<String>,
	pub skipped: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reason: Option<String>,
	pub no_new_streak: u32,
	pub round_count: usize,
	pub final_docs: usize,
	pub rounds: Vec<RoundSummary>,
	pub stop_reasons: Vec<StopReason>,
	#[serde(with = "time::serde::rfc3339")]
	pub started_at: OffsetDateTime,
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub finished_at: Option<OffsetDateTime>,
}
impl RetrievalReport {
	pub fn new(plan: &Plan) -> Self {
		let plan_hash = match hash_plan(plan) {
			Ok(hash) => Some(hash),
			Err(err) => {
				tracing::warn!(error = %err, "Failed to hash plan.");

				None
			},
		};

		Self {
			run_id: Uuid::new_v4(),
			plan_hash,
			skipped: false,
			reason: None,
			no_new_streak: 0,
			round_count: 0,
			final_docs: 0,
			rounds: Vec::new(),
			stop_reasons: Vec::new(),
			started_at: OffsetDateTime::now_utc(),
			finished_at: None,
		}
	}

	pub(crate) fn push_stop_reason(&mut self, reason: StopReason) {
		if !self.stop_reasons.contains(&reason) {
			self.stop_reasons.push(reason);
		}
	}
}

/// BLAKE3 hex digest of the plan's JSON encoding.
pub fn hash_plan(plan: &Plan) -> serde_json::Result<String> {
	let raw = serde_json::to_vec(plan)?;

	Ok(blake3::hash(&raw).to_hex().to_string())
}

#[cfg(test)]
mod tests {
	use arag_domain::{Candidate, CandidateKey};

	use super::*;

	#[test]
	fn plan_hash_is_stable_and_sensitive() {
		let mut plan = Plan::default();
		let first = hash_plan(&plan).expect("hash failed");

		assert_eq!(first, hash_plan(&plan).expect("hash failed"));

		plan.goal = "changed".to_string();

		assert_ne!(first, hash_plan(&plan).expect("hash failed"));
		assert_eq!(first.len(), 64);
	}

	#[test]
	fn report_serializes_rfc3339_timestamps() {
		let report = RetrievalReport::new(&Plan::default());
		let json = serde_json::to_value(&report).expect("serialize failed");
		let started = json.get("started_at").and_then(|v| v.as_str()).unwrap_or_default();

		assert!(OffsetDateTime::parse(started, &time::format_description::well_known::Rfc3339).is_ok());
		assert!(json.get("finished_at").is_some_and(|v| v.is_null()));
		assert!(json.get("reason").is_none());
	}

	#[test]
	fn round_summary_keeps_only_keys_and_scores() {
		let round = RoundResult {
			round_id: 2,
			purpose: "recall".to_string(),
			selected: vec![
				Candidate::new(CandidateKey::new("d1", "c1"), "long text").with_rrf_score(0.03),
			],
			novelty_new_items: 1,
			..RoundResult::default()
		};
		let summary = RoundSummary::from(&round);

		assert_eq!(summary.selected, vec![SelectedRef {
			doc_id: "d1".to_string(),
			chunk_id: "c1".to_string(),
			rerank_score: None,
			rrf_score: Some(0.03),
		}]);
		assert_eq!(summary.novelty_new_items, 1);
	}

	#[test]
	fn stop_reasons_are_not_repeated() {
		let mut report = RetrievalReport::new(&Plan::default());

		report.push_stop_reason(StopReason::MaxRounds);
		report.push_stop_reason(StopReason::MaxRounds);

		assert_eq!(report.stop_reasons, vec![StopReason::MaxRounds]);
	}
}
