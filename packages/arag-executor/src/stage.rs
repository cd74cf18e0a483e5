//! One module per pipeline node. Nodes that call adapters read the state and return their output;
//! the run loop stores it. The remaining nodes update the state in place.

pub mod controller;
pub mod finalize;
pub mod gate;
pub mod grade;
pub mod merge;
pub mod queries;
pub mod rerank;
pub mod retrieval;
pub mod select;

use std::borrow::Cow;

use arag_domain::RetrievalRound;

use crate::state::ExecutorState;

/// The round at the current index, or an all-default round when the index is past the plan.
pub(crate) fn current_round(state: &ExecutorState) -> Cow<'_, RetrievalRound> {
	state.plan.round(state.current_round_index).map(Cow::Borrowed).unwrap_or_default()
}

pub(crate) fn round_index_u32(index: usize) -> u32 {
	u32::try_from(index).unwrap_or(u32::MAX)
}
