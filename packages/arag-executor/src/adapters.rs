use color_eyre::eyre;
use serde_json::{Map, Value};

use arag_config::{LlmProviderConfig, ProviderConfig, SearchProviderConfig};
use arag_domain::{Candidate, Coverage, Plan, RetrievalMode, RoundFilters};
use arag_providers::{grader, hyde, rerank, search};

use crate::{BoxFuture, CoverageGrader, Error, HydeGenerator, Reranker, Retriever};

pub struct HttpRetriever {
	cfg: SearchProviderConfig,
}
impl HttpRetriever {
	pub fn new(cfg: SearchProviderConfig) -> Self {
		Self { cfg }
	}
}

impl Retriever for HttpRetriever {
	fn search<'a>(
		&'a self,
		query: &'a str,
		mode: RetrievalMode,
		k: u32,
		alpha: Option<f32>,
		filters: &'a RoundFilters,
	) -> BoxFuture<'a, color_eyre::Result<Vec<Candidate>>> {
		Box::pin(search::search(&self.cfg, query, mode, k, alpha, filters))
	}
}

pub struct HttpReranker {
	cfg: ProviderConfig,
}
impl HttpReranker {
	pub fn new(cfg: ProviderConfig) -> Self {
		Self { cfg }
	}
}

impl Reranker for HttpReranker {
	fn rerank<'a>(
		&'a self,
		query: &'a str,
		candidates: &'a [Candidate],
		top_k: u32,
		_plan: &'a Plan,
	) -> BoxFuture<'a, color_eyre::Result<Vec<Candidate>>> {
		Box::pin(rerank::rerank_candidates(&self.cfg, query, candidates, top_k))
	}
}

pub struct LlmHyde {
	cfg: LlmProviderConfig,
}
impl LlmHyde {
	pub fn new(cfg: LlmProviderConfig) -> Self {
		Self { cfg }
	}
}

impl HydeGenerator for LlmHyde {
	fn synthesize<'a>(
		&'a self,
		query: &'a str,
		plan: &'a Plan,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(hyde::synthesize(&self.cfg, query, plan))
	}

	fn derive_queries<'a>(
		&'a self,
		original_query: &'a str,
		synthetic_answer: &'a str,
		max_queries: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<String>>> {
		Box::pin(hyde::derive_queries(&self.cfg, original_query, synthetic_answer, max_queries))
	}
}

pub struct LlmCoverageGrader {
	cfg: LlmProviderConfig,
}
impl LlmCoverageGrader {
	pub fn new(cfg: LlmProviderConfig) -> Self {
		Self { cfg }
	}
}

impl CoverageGrader for LlmCoverageGrader {
	fn grade<'a>(
		&'a self,
		plan: &'a Plan,
		normalized_query: &'a str,
		selected: &'a [Candidate],
		context: &'a Map<String, Value>,
	) -> BoxFuture<'a, color_eyre::Result<Coverage>> {
		Box::pin(grader::grade(&self.cfg, plan, normalized_query, selected, context))
	}
}

/// Claims no coverage, so only the round limit and staleness can stop the loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpGrader;

impl CoverageGrader for NoOpGrader {
	fn grade<'a>(
		&'a self,
		plan: &'a Plan,
		_normalized_query: &'a str,
		_selected: &'a [Candidate],
		_context: &'a Map<String, Value>,
	) -> BoxFuture<'a, color_eyre::Result<Coverage>> {
		Box::pin(async move { Ok(Coverage::unassessed(plan)) })
	}
}

/// Stands in for an adapter with no provider behind it. Every call fails.
#[derive(Debug, Clone, Copy)]
pub struct Unconfigured {
	adapter: &'static str,
}
impl Unconfigured {
	pub fn new(adapter: &'static str) -> Self {
		Self { adapter }
	}

	fn fail<'a, T>(&self) -> BoxFuture<'a, color_eyre::Result<T>>
	where
		T: Send + 'a,
	{
		let adapter = self.adapter;

		Box::pin(async move { Err(eyre::Report::new(Error::NotConfigured { adapter })) })
	}
}

impl Retriever for Unconfigured {
	fn search<'a>(
		&'a self,
		_query: &'a str,
		_mode: RetrievalMode,
		_k: u32,
		_alpha: Option<f32>,
		_filters: &'a RoundFilters,
	) -> BoxFuture<'a, color_eyre::Result<Vec<Candidate>>> {
		self.fail()
	}
}

impl HydeGenerator for Unconfigured {
	fn synthesize<'a>(
		&'a self,
		_query: &'a str,
		_plan: &'a Plan,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		self.fail()
	}

	fn derive_queries<'a>(
		&'a self,
		_original_query: &'a str,
		_synthetic_answer: &'a str,
		_max_queries: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<String>>> {
		self.fail()
	}
}

impl Reranker for Unconfigured {
	fn rerank<'a>(
		&'a self,
		_query: &'a str,
		_candidates: &'a [Candidate],
		_top_k: u32,
		_plan: &'a Plan,
	) -> BoxFuture<'a, color_eyre::Result<Vec<Candidate>>> {
		self.fail()
	}
}

impl CoverageGrader for Unconfigured {
	fn grade<'a>(
		&'a self,
		_plan: &'a Plan,
		_normalized_query: &'a str,
		_selected: &'a [Candidate],
		_context: &'a Map<String, Value>,
	) -> BoxFuture<'a, color_eyre::Result<Coverage>> {
		self.fail()
	}
}
