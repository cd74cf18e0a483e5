pub mod candidate;
pub mod context;
pub mod coverage;
pub mod plan;
pub mod round;

pub use candidate::{Candidate, CandidateKey, cmp_score_desc};
pub use context::RequestContext;
pub use coverage::{Coverage, EvidenceQuality};
pub use plan::{
	AcceptanceCriteria, AnswerRequirements, Budget, ClarifyingQuestion, LiteralConstraints, Plan,
	PlannerMeta, RerankSpec, RetrievalMode, RetrievalModeSpec, RetrievalRound, RoundFilters,
	RoundOutputSpec, RoundPurpose, StopConditions, Strategy,
};
pub use round::RoundResult;
