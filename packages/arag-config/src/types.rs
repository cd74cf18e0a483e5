use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	#[serde(default)]
	pub executor: Executor,
	#[serde(default)]
	pub providers: Providers,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	/// A `tracing_subscriber::EnvFilter` directive, e.g. "info" or "arag_executor=debug".
	pub log_level: String,
}

/// Process-wide defaults. Values carried by a plan take precedence over these.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Executor {
	/// Attempts per stage are `max(1, max_retries)`.
	pub max_retries: u32,
	pub rrf_k: u32,
	pub rrf_pool_size: u32,
	pub max_total_docs: u32,
	pub max_docs_per_round: u32,
	pub rerank_top_k: u32,
	pub retrieval_k: u32,
	pub hyde_max_queries: u32,
}
impl Default for Executor {
	fn default() -> Self {
		Self {
			max_retries: 2,
			rrf_k: 60,
			rrf_pool_size: 200,
			max_total_docs: 12,
			max_docs_per_round: 8,
			rerank_top_k: 60,
			retrieval_k: 20,
			hyde_max_queries: 4,
		}
	}
}

#[derive(Debug, Default, Deserialize)]
pub struct Providers {
	pub search: Option<SearchProviderConfig>,
	pub rerank: Option<ProviderConfig>,
	pub llm: Option<LlmProviderConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub index: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}
