use color_eyre::Result;
use serde_json::Value;

use arag_config::ProviderConfig;
use arag_domain::{Candidate, cmp_score_desc};

pub async fn rerank(cfg: &ProviderConfig, query: &str, docs: &[String]) -> Result<Vec<f64>> {
	let client = crate::http_client(cfg.timeout_ms)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({ "model": cfg.model, "query": query, "documents": docs });
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_rerank_response(json, docs.len())
}

/// Scores every candidate, then returns at most `top_k` of them ordered by relevance.
pub async fn rerank_candidates(
	cfg: &ProviderConfig,
	query: &str,
	candidates: &[Candidate],
	top_k: u32,
) -> Result<Vec<Candidate>> {
	if candidates.is_empty() {
		return Ok(Vec::new());
	}

	let docs = candidates.iter().map(|candidate| candidate.text.clone()).collect::<Vec<_>>();
	let scores = rerank(cfg, query, &docs).await?;

	Ok(apply_scores(candidates, &scores, top_k))
}

fn apply_scores(candidates: &[Candidate], scores: &[f64], top_k: u32) -> Vec<Candidate> {
	let mut scored = candidates
		.iter()
		.zip(scores)
		.map(|(candidate, score)| candidate.clone().with_rerank_score(*score))
		.collect::<Vec<_>>();

	scored.sort_by(|a, b| cmp_score_desc(a.rerank_score, b.rerank_score));
	scored.truncate(top_k as usize);

	scored
}

fn parse_rerank_response(json: Value, doc_count: usize) -> Result<Vec<f64>> {
	let mut scores = vec![0.0; doc_count];
	let results = json
		.get("results")
		.or_else(|| json.get("data"))
		.and_then(|v| v.as_array())
		.ok_or_else(|| crate::invalid_response("Rerank response is missing results array."))?;

	for item in results {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.ok_or_else(|| crate::invalid_response("Rerank result missing index."))? as usize;
		let score = item
			.get("relevance_score")
			.or_else(|| item.get("score"))
			.and_then(|v| v.as_f64())
			.ok_or_else(|| crate::invalid_response("Rerank result missing score."))?;

		if let Some(slot) = scores.get_mut(index) {
			*slot = score;
		}
	}

	Ok(scores)
}
