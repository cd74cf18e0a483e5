mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Executor, LlmProviderConfig, ProviderConfig, Providers, SearchProviderConfig, Service,
};

use std::{fs, path::Path};

use serde_json::{Map, Value};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}

	for (label, value) in [
		("executor.rrf_k", cfg.executor.rrf_k),
		("executor.rrf_pool_size", cfg.executor.rrf_pool_size),
		("executor.max_total_docs", cfg.executor.max_total_docs),
		("executor.max_docs_per_round", cfg.executor.max_docs_per_round),
		("executor.rerank_top_k", cfg.executor.rerank_top_k),
		("executor.retrieval_k", cfg.executor.retrieval_k),
		("executor.hyde_max_queries", cfg.executor.hyde_max_queries),
	] {
		if value == 0 {
			return Err(Error::Validation { message: format!("{label} must be greater than zero.") });
		}
	}

	if cfg.executor.max_docs_per_round > cfg.executor.rrf_pool_size {
		return Err(Error::Validation {
			message: "executor.max_docs_per_round must not exceed executor.rrf_pool_size."
				.to_string(),
		});
	}

	if let Some(search) = cfg.providers.search.as_ref() {
		validate_provider(
			"search",
			&search.api_base,
			&search.api_key,
			search.timeout_ms,
			&search.default_headers,
		)?;

		if search.index.trim().is_empty() {
			return Err(Error::Validation {
				message: "providers.search.index must be non-empty.".to_string(),
			});
		}
	}
	if let Some(rerank) = cfg.providers.rerank.as_ref() {
		validate_provider(
			"rerank",
			&rerank.api_base,
			&rerank.api_key,
			rerank.timeout_ms,
			&rerank.default_headers,
		)?;
	}
	if let Some(llm) = cfg.providers.llm.as_ref() {
		validate_provider("llm", &llm.api_base, &llm.api_key, llm.timeout_ms, &llm.default_headers)?;

		if !llm.temperature.is_finite() || llm.temperature < 0.0 {
			return Err(Error::Validation {
				message: "providers.llm.temperature must be a finite number, zero or greater."
					.to_string(),
			});
		}
	}

	Ok(())
}

fn validate_provider(
	label: &str,
	api_base: &str,
	api_key: &str,
	timeout_ms: u64,
	default_headers: &Map<String, Value>,
) -> Result<()> {
	if api_base.trim().is_empty() {
		return Err(Error::Validation {
			message: format!("providers.{label}.api_base must be non-empty."),
		});
	}
	if api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: format!("providers.{label}.api_key must be non-empty."),
		});
	}
	if timeout_ms == 0 {
		return Err(Error::Validation {
			message: format!("providers.{label}.timeout_ms must be greater than zero."),
		});
	}
	if default_headers.values().any(|value| !value.is_string()) {
		return Err(Error::Validation {
			message: format!("providers.{label}.default_headers values must be strings."),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.service.log_level = cfg.service.log_level.trim().to_string();

	if let Some(search) = cfg.providers.search.as_mut() {
		search.api_base = search.api_base.trim_end_matches('/').to_string();
	}
	if let Some(rerank) = cfg.providers.rerank.as_mut() {
		rerank.api_base = rerank.api_base.trim_end_matches('/').to_string();
	}
	if let Some(llm) = cfg.providers.llm.as_mut() {
		llm.api_base = llm.api_base.trim_end_matches('/').to_string();
	}
}
