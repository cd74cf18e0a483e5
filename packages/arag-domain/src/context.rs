use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Intake output handed to the executor. Everything except the query is opaque here and only
/// passed through to adapters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
	pub normalized_query: String,
	#[serde(default)]
	pub constraints: Map<String, Value>,
	#[serde(default)]
	pub guardrails: Map<String, Value>,
	#[serde(default)]
	pub signals: Map<String, Value>,
}
impl RequestContext {
	pub fn new(normalized_query: impl Into<String>) -> Self {
		Self { normalized_query: normalized_query.into(), ..Self::default() }
	}
}
