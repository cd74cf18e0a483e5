use std::collections::HashSet;

use color_eyre::Result;
use serde_json::Value;

use arag_config::LlmProviderConfig;
use arag_domain::Plan;

use crate::chat;

const SYNTHESIZE_SYSTEM_PROMPT: &str = "You write short, factual passages that would answer a question \
if they appeared in a knowledge base. Answer in one or two paragraphs of plain prose. \
Do not mention that the passage is hypothetical and do not ask questions.";
const DERIVE_SYSTEM_PROMPT: &str = "You are a query expansion engine for a document retrieval system. \
Output must be valid JSON only and must match the provided schema exactly. \
Generate short search queries that would retrieve passages like the one provided, \
preserving the intent of the original question. Do not add explanations or extra fields.";

/// Writes a hypothetical answer passage for `query`.
pub async fn synthesize(cfg: &LlmProviderConfig, query: &str, plan: &Plan) -> Result<String> {
	let messages = build_synthesize_messages(query, plan);
	let content = chat::complete(cfg, &messages).await?;
	let passage = content.trim();

	if passage.is_empty() {
		return Err(crate::malformed_output("HyDE passage is empty."));
	}

	Ok(passage.to_string())
}

/// Derives at most `max_queries` search queries from a hypothetical answer.
pub async fn derive_queries(
	cfg: &LlmProviderConfig,
	original_query: &str,
	synthetic_answer: &str,
	max_queries: u32,
) -> Result<Vec<String>> {
	let messages = build_derive_messages(original_query, synthetic_answer, max_queries);
	let json = chat::complete_json(cfg, &messages).await?;

	parse_derived_queries(&json, max_queries)
}

fn build_synthesize_messages(query: &str, plan: &Plan) -> Vec<Value> {
	let mut user_prompt = format!("Question:\n{query}");

	if !plan.goal.trim().is_empty() {
		user_prompt.push_str(&format!("\nGoal:\n{}", plan.goal.trim()));
	}

	let entities = &plan.acceptance_criteria.must_cover_entities;

	if !entities.is_empty() {
		user_prompt.push_str(&format!("\nEntities to cover:\n- {}", entities.join("\n- ")));
	}

	vec![chat::system_message(SYNTHESIZE_SYSTEM_PROMPT), chat::user_message(&user_prompt)]
}

fn build_derive_messages(original_query: &str, synthetic_answer: &str, max_queries: u32) -> Vec<Value> {
	let user_prompt = format!(
		"Return JSON matching this exact schema:\n{{\"queries\": [\"string\"]}}\nConstraints:\n- MAX_QUERIES = {max_queries}\nOriginal query:\n{original_query}\nPassage:\n{synthetic_answer}"
	);

	vec![chat::system_message(DERIVE_SYSTEM_PROMPT), chat::user_message(&user_prompt)]
}

fn parse_derived_queries(json: &Value, max_queries: u32) -> Result<Vec<String>> {
	let raw = json
		.get("queries")
		.and_then(|v| v.as_array())
		.ok_or_else(|| crate::malformed_output("HyDE response is missing queries array."))?;
	let queries = raw.iter().filter_map(|v| v.as_str()).map(str::to_string).collect();

	Ok(normalize_queries(queries, max_queries))
}

/// Trims, drops blanks and case-insensitive duplicates, and keeps at most `max_queries`.
pub fn normalize_queries(queries: Vec<String>, max_queries: u32) -> Vec<String> {
	let mut out = Vec::new();
	let mut seen = HashSet::new();

	for query in queries {
		if out.len() >= max_queries as usize {
			break;
		}

		let trimmed = query.trim();

		if trimmed.is_empty() {
			continue;
		}
		if seen.insert(trimmed.to_lowercase()) {
			out.push(trimmed.to_string());
		}
	}

	out
}
