use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::candidate::Candidate;

/// Audit record for one completed round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
	pub round_id: u32,
	pub purpose: String,
	pub queries: Vec<String>,

	pub raw_candidates_count: usize,
	pub merged_candidates_count: usize,
	pub reranked_candidates_count: usize,

	pub selected: Vec<Candidate>,
	pub novelty_new_items: usize,

	#[serde(default)]
	pub debug: Map<String, Value>,
}
