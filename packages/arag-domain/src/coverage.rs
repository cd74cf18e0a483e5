use serde::{Deserialize, Serialize};

use crate::plan::Plan;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceQuality {
	High,
	Medium,
	#[default]
	Low,
}

/// A grader's view of how well the selected evidence answers the plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Coverage {
	pub covered_entities: Vec<String>,
	pub missing_entities: Vec<String>,
	pub covered_subquestions: Vec<String>,
	pub missing_subquestions: Vec<String>,
	pub evidence_quality: EvidenceQuality,
	/// In `[0, 1]`.
	pub confidence: f64,
	pub contradictions: Vec<String>,
}
impl Coverage {
	/// Zero confidence, low quality, nothing covered or missing.
	pub fn empty() -> Self {
		Self::default()
	}

	/// Claims nothing and reports every acceptance target as missing.
	pub fn unassessed(plan: &Plan) -> Self {
		Self {
			missing_entities: plan.acceptance_criteria.must_cover_entities.clone(),
			missing_subquestions: plan.acceptance_criteria.must_answer_subquestions.clone(),
			..Self::default()
		}
	}
}
