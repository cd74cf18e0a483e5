use std::fmt::{Display, Formatter};

use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{adapter} adapter is not configured.")]
	NotConfigured { adapter: &'static str },
}

/// Pipeline node an error record is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
	ExecutorGate,
	PrepareRoundQueries,
	RunRetrieval,
	MergeCandidates,
	RerankCandidates,
	SelectEvidence,
	GradeCoverage,
	ShouldContinue,
	FinalizeEvidencePack,
}
impl Stage {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::ExecutorGate => "executor_gate",
			Self::PrepareRoundQueries => "prepare_round_queries",
			Self::RunRetrieval => "run_retrieval",
			Self::MergeCandidates => "merge_candidates",
			Self::RerankCandidates => "rerank_candidates",
			Self::SelectEvidence => "select_evidence",
			Self::GradeCoverage => "grade_coverage",
			Self::ShouldContinue => "should_continue",
			Self::FinalizeEvidencePack => "finalize_evidence_pack",
		}
	}
}

impl Display for Stage {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	SchemaValidation,
	RuntimeError,
	ModelOutputParse,
}
impl ErrorKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::SchemaValidation => "schema_validation",
			Self::RuntimeError => "runtime_error",
			Self::ModelOutputParse => "model_output_parse",
		}
	}

	pub fn is_retryable(self) -> bool {
		!matches!(self, Self::SchemaValidation)
	}
}

/// Structured record of a failed stage. Records accumulate in `ExecutorState::errors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{node} failed with {}: {message}", .kind.as_str())]
pub struct StageError {
	pub node: Stage,
	#[serde(rename = "type")]
	pub kind: ErrorKind,
	pub message: String,
	pub retryable: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub details: Option<Map<String, Value>>,
}
impl StageError {
	pub fn schema_validation(node: Stage, message: impl Into<String>) -> Self {
		Self {
			node,
			kind: ErrorKind::SchemaValidation,
			message: message.into(),
			retryable: false,
			details: None,
		}
	}

	pub fn runtime(node: Stage, message: impl Into<String>) -> Self {
		Self {
			node,
			kind: ErrorKind::RuntimeError,
			message: message.into(),
			retryable: true,
			details: None,
		}
	}

	/// Classifies an adapter failure. Malformed model output maps to `model_output_parse`,
	/// everything else to `runtime_error`. The full cause chain lands in `details.chain`.
	pub fn from_report(node: Stage, err: &eyre::Report) -> Self {
		let kind = match err.downcast_ref::<arag_providers::Error>() {
			Some(arag_providers::Error::MalformedOutput { .. }) => ErrorKind::ModelOutputParse,
			_ => ErrorKind::RuntimeError,
		};
		let chain = err.chain().map(|cause| Value::String(cause.to_string())).collect::<Vec<_>>();
		let mut details = Map::new();

		details.insert("chain".to_string(), Value::Array(chain));

		Self {
			node,
			kind,
			message: err.to_string(),
			retryable: kind.is_retryable(),
			details: Some(details),
		}
	}
}
