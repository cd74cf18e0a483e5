pub mod adapters;
pub mod error;
pub mod fusion;
pub mod report;
pub mod stage;
pub mod state;

mod retry;
mod run;

pub use adapters::{
	HttpReranker, HttpRetriever, LlmCoverageGrader, LlmHyde, NoOpGrader, Unconfigured,
};
pub use error::{Error, ErrorKind, Result, Stage, StageError};
pub use fusion::SimpleRrf;
pub use report::{RetrievalReport, RoundSummary, SelectedRef, StopReason};
pub use state::{ExecutionContext, ExecutorState};

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::{Map, Value};

use arag_config::{Config, Executor as ExecutorConfig};
use arag_domain::{Candidate, Coverage, Plan, RetrievalMode, RoundFilters};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait Retriever
where
	Self: Send + Sync,
{
	/// Returns hits in backend order. Provenance fields are stamped by the caller.
	fn search<'a>(
		&'a self,
		query: &'a str,
		mode: RetrievalMode,
		k: u32,
		alpha: Option<f32>,
		filters: &'a RoundFilters,
	) -> BoxFuture<'a, color_eyre::Result<Vec<Candidate>>>;
}

pub trait HydeGenerator
where
	Self: Send + Sync,
{
	fn synthesize<'a>(
		&'a self,
		query: &'a str,
		plan: &'a Plan,
	) -> BoxFuture<'a, color_eyre::Result<String>>;

	fn derive_queries<'a>(
		&'a self,
		original_query: &'a str,
		synthetic_answer: &'a str,
		max_queries: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<String>>>;
}

pub trait Reranker
where
	Self: Send + Sync,
{
	/// Returns at most `top_k` candidates sorted by relevance, each with `rerank_score` set.
	fn rerank<'a>(
		&'a self,
		query: &'a str,
		candidates: &'a [Candidate],
		top_k: u32,
		plan: &'a Plan,
	) -> BoxFuture<'a, color_eyre::Result<Vec<Candidate>>>;
}

pub trait Fusion
where
	Self: Send + Sync,
{
	/// Fuses ranked lists into at most `k` candidates, each with `rrf_score` set.
	fn rrf(&self, ranked_lists: &[Vec<Candidate>], k: usize, rrf_k: u32) -> Vec<Candidate>;
}

pub trait CoverageGrader
where
	Self: Send + Sync,
{
	fn grade<'a>(
		&'a self,
		plan: &'a Plan,
		normalized_query: &'a str,
		selected: &'a [Candidate],
		context: &'a Map<String, Value>,
	) -> BoxFuture<'a, color_eyre::Result<Coverage>>;
}

#[derive(Clone)]
pub struct Adapters {
	pub retriever: Arc<dyn Retriever>,
	pub hyde: Arc<dyn HydeGenerator>,
	pub reranker: Arc<dyn Reranker>,
	pub fusion: Arc<dyn Fusion>,
	pub grader: Arc<dyn CoverageGrader>,
}
impl Adapters {
	pub fn new(
		retriever: Arc<dyn Retriever>,
		hyde: Arc<dyn HydeGenerator>,
		reranker: Arc<dyn Reranker>,
		fusion: Arc<dyn Fusion>,
		grader: Arc<dyn CoverageGrader>,
	) -> Self {
		Self { retriever, hyde, reranker, fusion, grader }
	}

	/// Wires the HTTP providers present in `cfg`. Absent providers fail on first use, except
	/// the grader, which falls back to [`NoOpGrader`].
	pub fn from_config(cfg: &Config) -> Self {
		let providers = &cfg.providers;
		let retriever: Arc<dyn Retriever> = match providers.search.clone() {
			Some(search) => Arc::new(HttpRetriever::new(search)),
			None => Arc::new(Unconfigured::new("retriever")),
		};
		let reranker: Arc<dyn Reranker> = match providers.rerank.clone() {
			Some(rerank) => Arc::new(HttpReranker::new(rerank)),
			None => Arc::new(Unconfigured::new("reranker")),
		};
		let (hyde, grader): (Arc<dyn HydeGenerator>, Arc<dyn CoverageGrader>) =
			match providers.llm.clone() {
				Some(llm) =>
					(Arc::new(LlmHyde::new(llm.clone())), Arc::new(LlmCoverageGrader::new(llm))),
				None => (Arc::new(Unconfigured::new("hyde")), Arc::new(NoOpGrader)),
			};

		Self { retriever, hyde, reranker, fusion: Arc::new(SimpleRrf), grader }
	}
}

impl Default for Adapters {
	fn default() -> Self {
		Self {
			retriever: Arc::new(Unconfigured::new("retriever")),
			hyde: Arc::new(Unconfigured::new("hyde")),
			reranker: Arc::new(Unconfigured::new("reranker")),
			fusion: Arc::new(SimpleRrf),
			grader: Arc::new(NoOpGrader),
		}
	}
}

/// Multi-round retrieval loop over injected adapters.
pub struct Executor {
	pub settings: ExecutorConfig,
	pub adapters: Adapters,
}
impl Executor {
	pub fn new(settings: ExecutorConfig) -> Self {
		Self { settings, adapters: Adapters::default() }
	}

	pub fn with_adapters(settings: ExecutorConfig, adapters: Adapters) -> Self {
		Self { settings, adapters }
	}

	pub fn from_config(cfg: &Config) -> Self {
		Self::with_adapters(cfg.executor.clone(), Adapters::from_config(cfg))
	}
}
