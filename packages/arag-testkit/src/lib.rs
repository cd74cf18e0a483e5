//! Deterministic adapters and fixtures for exercising the executor without any provider.

pub mod fixtures;

use std::{
	collections::HashMap,
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
};

use color_eyre::eyre;
use serde_json::{Map, Value};

use arag_domain::{Candidate, Coverage, Plan, RetrievalMode, RoundFilters, cmp_score_desc};
use arag_executor::{BoxFuture, CoverageGrader, HydeGenerator, Reranker, Retriever};

#[derive(Debug, Clone, PartialEq)]
pub struct SearchCall {
	pub query: String,
	pub mode: RetrievalMode,
	pub k: u32,
	pub alpha: Option<f32>,
}

/// Returns canned hits. Queries without their own list get the default hits.
#[derive(Default)]
pub struct StaticRetriever {
	default_hits: Vec<Candidate>,
	by_query: HashMap<String, Vec<Candidate>>,
	calls: Mutex<Vec<SearchCall>>,
}
impl StaticRetriever {
	pub fn new(default_hits: Vec<Candidate>) -> Self {
		Self { default_hits, ..Self::default() }
	}

	pub fn with_query(mut self, query: impl Into<String>, hits: Vec<Candidate>) -> Self {
		self.by_query.insert(query.into(), hits);

		self
	}

	pub fn calls(&self) -> Vec<SearchCall> {
		self.calls.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}
}

impl Retriever for StaticRetriever {
	fn search<'a>(
		&'a self,
		query: &'a str,
		mode: RetrievalMode,
		k: u32,
		alpha: Option<f32>,
		_filters: &'a RoundFilters,
	) -> BoxFuture<'a, color_eyre::Result<Vec<Candidate>>> {
		self.calls.lock().unwrap_or_else(|err| err.into_inner()).push(SearchCall {
			query: query.to_string(),
			mode,
			k,
			alpha,
		});

		let hits = self.by_query.get(query).unwrap_or(&self.default_hits).clone();

		Box::pin(async move { Ok(hits) })
	}
}

/// Fails the first `failures` calls, then delegates.
pub struct FlakyRetriever {
	inner: Arc<dyn Retriever>,
	failures: usize,
	calls: AtomicUsize,
}
impl FlakyRetriever {
	pub fn new(inner: Arc<dyn Retriever>, failures: usize) -> Self {
		Self { inner, failures, calls: AtomicUsize::new(0) }
	}

	pub fn count(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

impl Retriever for FlakyRetriever {
	fn search<'a>(
		&'a self,
		query: &'a str,
		mode: RetrievalMode,
		k: u32,
		alpha: Option<f32>,
		filters: &'a RoundFilters,
	) -> BoxFuture<'a, color_eyre::Result<Vec<Candidate>>> {
		let call = self.calls.fetch_add(1, Ordering::SeqCst);

		if call < self.failures {
			return Box::pin(async move {
				Err(eyre::eyre!("connection reset").wrap_err(format!("Search call {call} failed.")))
			});
		}

		self.inner.search(query, mode, k, alpha, filters)
	}
}

/// Copies each candidate's best retrieval score into `rerank_score`.
#[derive(Default)]
pub struct ScoreReranker {
	calls: AtomicUsize,
}
impl ScoreReranker {
	pub fn count(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

impl Reranker for ScoreReranker {
	fn rerank<'a>(
		&'a self,
		_query: &'a str,
		candidates: &'a [Candidate],
		top_k: u32,
		_plan: &'a Plan,
	) -> BoxFuture<'a, color_eyre::Result<Vec<Candidate>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let mut scored = candidates
			.iter()
			.map(|candidate| {
				let score = candidate.best_score().unwrap_or(0.0);

				candidate.clone().with_rerank_score(score)
			})
			.collect::<Vec<_>>();

		scored.sort_by(|a, b| cmp_score_desc(a.rerank_score, b.rerank_score));
		scored.truncate(top_k as usize);

		Box::pin(async move { Ok(scored) })
	}
}

/// Plays coverages back in order, repeating the last one once the script runs out.
pub struct ScriptedGrader {
	script: Vec<Coverage>,
	calls: AtomicUsize,
}
impl ScriptedGrader {
	pub fn new(script: Vec<Coverage>) -> Self {
		Self { script, calls: AtomicUsize::new(0) }
	}

	pub fn with_confidences(confidences: &[f64]) -> Self {
		Self::new(
			confidences
				.iter()
				.map(|confidence| Coverage { confidence: *confidence, ..Coverage::empty() })
				.collect(),
		)
	}

	pub fn count(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

impl CoverageGrader for ScriptedGrader {
	fn grade<'a>(
		&'a self,
		_plan: &'a Plan,
		_normalized_query: &'a str,
		_selected: &'a [Candidate],
		_context: &'a Map<String, Value>,
	) -> BoxFuture<'a, color_eyre::Result<Coverage>> {
		let call = self.calls.fetch_add(1, Ordering::SeqCst);
		let coverage = self
			.script
			.get(call)
			.or_else(|| self.script.last())
			.cloned()
			.unwrap_or_else(Coverage::empty);

		Box::pin(async move { Ok(coverage) })
	}
}

/// Always answers with output the executor must treat as unparseable.
#[derive(Default)]
pub struct MalformedGrader {
	calls: AtomicUsize,
}
impl MalformedGrader {
	pub fn count(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

impl CoverageGrader for MalformedGrader {
	fn grade<'a>(
		&'a self,
		_plan: &'a Plan,
		_normalized_query: &'a str,
		_selected: &'a [Candidate],
		_context: &'a Map<String, Value>,
	) -> BoxFuture<'a, color_eyre::Result<Coverage>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			Err(eyre::Report::new(arag_providers::Error::MalformedOutput {
				message: "Coverage does not match schema.".to_string(),
			}))
		})
	}
}

pub struct ScriptedHyde {
	synthetic: String,
	derived: Vec<String>,
	requested_max: Mutex<Vec<u32>>,
}
impl ScriptedHyde {
	pub fn new(synthetic: impl Into<String>, derived: Vec<String>) -> Self {
		Self { synthetic: synthetic.into(), derived, requested_max: Mutex::new(Vec::new()) }
	}

	/// `max_queries` of every `derive_queries` call so far.
	pub fn requested_max(&self) -> Vec<u32> {
		self.requested_max.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}
}

impl HydeGenerator for ScriptedHyde {
	fn synthesize<'a>(
		&'a self,
		_query: &'a str,
		_plan: &'a Plan,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		let synthetic = self.synthetic.clone();

		Box::pin(async move { Ok(synthetic) })
	}

	fn derive_queries<'a>(
		&'a self,
		_original_query: &'a str,
		_synthetic_answer: &'a str,
		max_queries: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<String>>> {
		self.requested_max.lock().unwrap_or_else(|err| err.into_inner()).push(max_queries);

		let derived = self.derived.iter().take(max_queries as usize).cloned().collect::<Vec<_>>();

		Box::pin(async move { Ok(derived) })
	}
}
