use color_eyre::Result;
use serde_json::Value;

use arag_config::SearchProviderConfig;
use arag_domain::{Candidate, CandidateKey, RetrievalMode, RoundFilters};

pub async fn search(
	cfg: &SearchProviderConfig,
	query: &str,
	mode: RetrievalMode,
	k: u32,
	alpha: Option<f32>,
	filters: &RoundFilters,
) -> Result<Vec<Candidate>> {
	let client = crate::http_client(cfg.timeout_ms)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = search_body(&cfg.index, query, mode, k, alpha, filters);
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_search_response(json, mode)
}

/// Request body for one search call. Empty filters are left out.
fn search_body(
	index: &str,
	query: &str,
	mode: RetrievalMode,
	k: u32,
	alpha: Option<f32>,
	filters: &RoundFilters,
) -> Value {
	let mut body = serde_json::json!({
		"index": index,
		"query": query,
		"mode": mode.as_str(),
		"top": k,
		"alpha": alpha,
	});

	if !filters.is_empty() {
		body["filters"] = serde_json::json!(filters);
	}

	body
}

/// Maps search hits into candidates. A hit's position supplies the rank of the requested mode
/// when the backend omits it; a bare `score` is attributed to that mode as well, with `hybrid`
/// counted as a dense score.
fn parse_search_response(json: Value, mode: RetrievalMode) -> Result<Vec<Candidate>> {
	let hits = json
		.get("hits")
		.or_else(|| json.get("results"))
		.or_else(|| json.get("value"))
		.and_then(|v| v.as_array())
		.ok_or_else(|| crate::invalid_response("Search response is missing hits array."))?;
	let mut out = Vec::with_capacity(hits.len());

	for (idx, hit) in hits.iter().enumerate() {
		let position = idx as u32 + 1;
		let Some(doc_id) = string_field(hit, &["doc_id", "id"]) else {
			tracing::warn!(position, "Search hit is missing doc_id. Skipping.");

			continue;
		};
		let Some(chunk_id) = string_field(hit, &["chunk_id"]) else {
			tracing::warn!(position, doc_id = %doc_id, "Search hit is missing chunk_id. Skipping.");

			continue;
		};
		let Some(text) = string_field(hit, &["text", "content"]) else {
			tracing::warn!(position, doc_id = %doc_id, chunk_id = %chunk_id, "Search hit is missing text. Skipping.");

			continue;
		};
		let metadata = hit.get("metadata").and_then(|v| v.as_object()).cloned().unwrap_or_default();
		let score = hit.get("score").and_then(|v| v.as_f64());
		let mut bm25_rank = rank_field(hit, "bm25_rank");
		let mut vector_rank = rank_field(hit, "vector_rank");
		let mut bm25_score = hit.get("bm25_score").and_then(|v| v.as_f64());
		let mut vector_score = hit.get("vector_score").and_then(|v| v.as_f64());

		match mode {
			RetrievalMode::Bm25 => {
				bm25_rank = bm25_rank.or(Some(position));
				bm25_score = bm25_score.or(score);
			},
			RetrievalMode::Vector => {
				vector_rank = vector_rank.or(Some(position));
				vector_score = vector_score.or(score);
			},
			RetrievalMode::Hybrid => {
				bm25_rank = bm25_rank.or(Some(position));
				vector_rank = vector_rank.or(Some(position));

				if bm25_score.is_none() {
					vector_score = vector_score.or(score);
				}
			},
		}

		out.push(
			Candidate::new(CandidateKey::new(doc_id, chunk_id), text)
				.with_metadata(metadata)
				.with_bm25(bm25_rank, bm25_score)
				.with_vector(vector_rank, vector_score),
		);
	}

	Ok(out)
}

fn string_field(hit: &Value, names: &[&str]) -> Option<String> {
	names.iter().find_map(|name| match hit.get(*name)? {
		Value::String(raw) if !raw.trim().is_empty() => Some(raw.clone()),
		Value::Number(raw) => Some(raw.to_string()),
		_ => None,
	})
}

fn rank_field(hit: &Value, name: &str) -> Option<u32> {
	hit.get(name).and_then(|v| v.as_u64()).and_then(|v| u32::try_from(v).ok()).filter(|v| *v > 0)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn assigns_positional_ranks_for_requested_mode() {
		let json = serde_json::json!({
			"hits": [
				{ "doc_id": "d1", "chunk_id": "c1", "text": "alpha", "score": 3.5 },
				{ "doc_id": "d2", "chunk_id": "c1", "text": "beta", "score": 2.0 }
			]
		});
		let hits = parse_search_response(json, RetrievalMode::Bm25).expect("parse failed");

		assert_eq!(hits.len(), 2);
		assert_eq!(hits[0].bm25_rank, Some(1));
		assert_eq!(hits[1].bm25_rank, Some(2));
		assert_eq!(hits[0].bm25_score, Some(3.5));
		assert_eq!(hits[0].vector_rank, None);
		assert_eq!(hits[0].round_id, None);
	}

	#[test]
	fn keeps_backend_ranks_and_metadata() {
		let json = serde_json::json!({
			"results": [
				{
					"id": 42,
					"chunk_id": "7",
					"content": "gamma",
					"vector_rank": 5,
					"vector_score": 0.8,
					"metadata": { "source": "kb" }
				}
			]
		});
		let hits = parse_search_response(json, RetrievalMode::Vector).expect("parse failed");

		assert_eq!(hits[0].key, CandidateKey::new("42", "7"));
		assert_eq!(hits[0].vector_rank, Some(5));
		assert_eq!(hits[0].vector_score, Some(0.8));
		assert_eq!(hits[0].metadata.get("source"), Some(&Value::String("kb".to_string())));
	}

	#[test]
	fn skips_incomplete_hits() {
		let json = serde_json::json!({
			"hits": [
				{ "doc_id": "d1", "text": "no chunk" },
				{ "doc_id": "d2", "chunk_id": "c1", "text": "ok" }
			]
		});
		let hits = parse_search_response(json, RetrievalMode::Hybrid).expect("parse failed");

		assert_eq!(hits.len(), 1);
		assert_eq!(hits[0].bm25_rank, Some(2));
		assert_eq!(hits[0].vector_rank, Some(2));
	}

	#[test]
	fn rejects_missing_hits_array() {
		let err = parse_search_response(serde_json::json!({ "total": 0 }), RetrievalMode::Bm25)
			.expect_err("Expected invalid response.");

		assert!(matches!(err.downcast_ref::<crate::Error>(), Some(crate::Error::InvalidResponse { .. })));
	}

	#[test]
	fn body_omits_empty_filters() {
		let body = search_body("kb", "q", RetrievalMode::Bm25, 20, None, &RoundFilters::default());

		assert_eq!(body["mode"], "bm25");
		assert_eq!(body["top"], 20);
		assert!(body.get("filters").is_none());

		let filters = RoundFilters { domains: vec!["azure".to_string()], ..RoundFilters::default() };
		let body = search_body("kb", "q", RetrievalMode::Hybrid, 5, Some(0.5), &filters);

		assert_eq!(body["filters"]["domains"], serde_json::json!(["azure"]));
		assert_eq!(body["alpha"], 0.5);
	}
}
