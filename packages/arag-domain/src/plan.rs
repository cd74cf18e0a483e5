use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
	DirectAnswer,
	#[default]
	RetrieveThenAnswer,
	ClarifyThenRetrieve,
	DeferOrRefuse,
}
impl Strategy {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::DirectAnswer => "direct_answer",
			Self::RetrieveThenAnswer => "retrieve_then_answer",
			Self::ClarifyThenRetrieve => "clarify_then_retrieve",
			Self::DeferOrRefuse => "defer_or_refuse",
		}
	}

	pub fn runs_retrieval(self) -> bool {
		matches!(self, Self::RetrieveThenAnswer)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPurpose {
	Recall,
	Precision,
	Verification,
	GapFilling,
}
impl RoundPurpose {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Recall => "recall",
			Self::Precision => "precision",
			Self::Verification => "verification",
			Self::GapFilling => "gap_filling",
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
	Bm25,
	Vector,
	#[default]
	Hybrid,
}
impl RetrievalMode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Bm25 => "bm25",
			Self::Vector => "vector",
			Self::Hybrid => "hybrid",
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalModeSpec {
	#[serde(rename = "type", default)]
	pub mode: RetrievalMode,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub k: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub alpha: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundFilters {
	pub doc_types: Vec<String>,
	pub domains: Vec<String>,
	pub entities: Vec<String>,
	/// Free-form; interpreted by the retriever.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub time_range: Option<String>,
}
impl RoundFilters {
	pub fn is_empty(&self) -> bool {
		self.doc_types.is_empty()
			&& self.domains.is_empty()
			&& self.entities.is_empty()
			&& self.time_range.is_none()
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankSpec {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub enabled: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub model: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub rerank_top_k: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundOutputSpec {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max_docs: Option<u32>,
}

/// One planned round. Unset options fall back to executor defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalRound {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub round_id: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub purpose: Option<RoundPurpose>,
	pub query_variants: Vec<String>,
	pub retrieval_modes: Vec<RetrievalModeSpec>,
	pub filters: RoundFilters,
	pub use_hyde: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub rrf: Option<bool>,
	pub rerank: RerankSpec,
	pub output: RoundOutputSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiteralConstraints {
	pub must_preserve_terms: Vec<String>,
	pub must_match_exactly: bool,
}
impl LiteralConstraints {
	/// Preservation terms with blanks dropped.
	pub fn required_terms(&self) -> Vec<&str> {
		self.must_preserve_terms.iter().map(String::as_str).filter(|term| !term.is_empty()).collect()
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptanceCriteria {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub min_independent_sources: Option<u32>,
	pub require_authoritative_source: bool,
	pub must_cover_entities: Vec<String>,
	pub must_answer_subquestions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopConditions {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max_rounds: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max_total_docs: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub confidence_threshold: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub no_new_information_rounds: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerRequirements {
	pub format: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tone: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub length: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub citation_style: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Budget {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max_tokens: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max_latency_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerMeta {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub planner_version: Option<String>,
	pub rationale_tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClarifyingQuestion {
	pub question: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reason: Option<String>,
	pub blocking: bool,
}

/// Planner output. The executor only reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Plan {
	pub goal: String,
	pub strategy: Strategy,
	pub clarifying_questions: Vec<ClarifyingQuestion>,
	pub retrieval_rounds: Vec<RetrievalRound>,
	pub literal_constraints: LiteralConstraints,
	pub acceptance_criteria: AcceptanceCriteria,
	pub stop_conditions: StopConditions,
	pub answer_requirements: AnswerRequirements,
	pub budget: Budget,
	pub planner_meta: PlannerMeta,
}
impl Plan {
	pub fn has_blocking_clarification(&self) -> bool {
		self.clarifying_questions.iter().any(|question| question.blocking)
	}

	/// Applies the planner-side invariants: a blocking clarifying question forces
	/// `clarify_then_retrieve`, and only `retrieve_then_answer` keeps retrieval rounds.
	pub fn normalized(mut self) -> Self {
		if self.has_blocking_clarification() {
			self.strategy = Strategy::ClarifyThenRetrieve;
		}
		if !self.strategy.runs_retrieval() {
			self.retrieval_rounds.clear();
		}

		self
	}

	pub fn round(&self, index: usize) -> Option<&RetrievalRound> {
		self.retrieval_rounds.get(index)
	}
}
