use color_eyre::Result;
use serde_json::{Map, Value};

use arag_config::LlmProviderConfig;
use arag_domain::{Candidate, Coverage, Plan};

use crate::chat;

const SNIPPET_CHARS: usize = 400;
const SYSTEM_PROMPT: &str = "You grade whether retrieved evidence is sufficient to answer a question. \
Output must be valid JSON only and must match the provided schema exactly. \
Judge only from the evidence given. Report contradictions between sources verbatim.";

pub async fn grade(
	cfg: &LlmProviderConfig,
	plan: &Plan,
	query: &str,
	selected: &[Candidate],
	context: &Map<String, Value>,
) -> Result<Coverage> {
	let messages = build_grade_messages(plan, query, selected, context);
	let json = chat::complete_json(cfg, &messages).await?;

	parse_coverage(json)
}

fn build_grade_messages(
	plan: &Plan,
	query: &str,
	selected: &[Candidate],
	context: &Map<String, Value>,
) -> Vec<Value> {
	let schema = serde_json::json!({
		"covered_entities": ["string"],
		"missing_entities": ["string"],
		"covered_subquestions": ["string"],
		"missing_subquestions": ["string"],
		"evidence_quality": "high|medium|low",
		"confidence": 0.0,
		"contradictions": ["string"]
	});
	let evidence = selected
		.iter()
		.enumerate()
		.map(|(idx, candidate)| {
			format!(
				"[{}] {}#{}: {}",
				idx + 1,
				candidate.key.doc_id,
				candidate.key.chunk_id,
				snippet(&candidate.text)
			)
		})
		.collect::<Vec<_>>()
		.join("\n");
	let criteria = serde_json::to_string(&plan.acceptance_criteria).unwrap_or_default();
	let context = serde_json::to_string(context).unwrap_or_default();
	let user_prompt = format!(
		"Return JSON matching this exact schema:\n{schema}\nConfidence is a number between 0 and 1.\nQuestion:\n{query}\nAcceptance criteria:\n{criteria}\nRequest context:\n{context}\nEvidence:\n{evidence}"
	);

	vec![chat::system_message(SYSTEM_PROMPT), chat::user_message(&user_prompt)]
}

fn parse_coverage(json: Value) -> Result<Coverage> {
	let mut coverage: Coverage = serde_json::from_value(json)
		.map_err(|err| crate::malformed_output(format!("Coverage does not match schema: {err}.")))?;

	coverage.confidence =
		if coverage.confidence.is_finite() { coverage.confidence.clamp(0.0, 1.0) } else { 0.0 };

	Ok(coverage)
}

fn snippet(text: &str) -> String {
	match text.char_indices().nth(SNIPPET_CHARS) {
		Some((end, _)) => format!("{}...", &text[..end]),
		None => text.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use arag_domain::{CandidateKey, EvidenceQuality};

	use super::*;

	#[test]
	fn parses_and_clamps_confidence() {
		let json = serde_json::json!({
			"covered_entities": ["Azure OpenAI"],
			"evidence_quality": "high",
			"confidence": 1.7
		});
		let coverage = parse_coverage(json).expect("parse failed");

		assert_eq!(coverage.covered_entities, vec!["Azure OpenAI"]);
		assert_eq!(coverage.evidence_quality, EvidenceQuality::High);
		assert_eq!(coverage.confidence, 1.0);
		assert!(coverage.missing_entities.is_empty());
	}

	#[test]
	fn rejects_unknown_quality() {
		let err = parse_coverage(serde_json::json!({ "evidence_quality": "excellent" }))
			.expect_err("Expected malformed output.");

		assert!(matches!(err.downcast_ref::<crate::Error>(), Some(crate::Error::MalformedOutput { .. })));
	}

	#[test]
	fn snippet_truncates_on_char_boundary() {
		let text = "é".repeat(SNIPPET_CHARS + 5);
		let cut = snippet(&text);

		assert_eq!(cut.chars().count(), SNIPPET_CHARS + 3);
		assert!(cut.ends_with("..."));
	}

	#[test]
	fn prompt_lists_evidence_keys() {
		let selected = vec![Candidate::new(CandidateKey::new("doc-1", "3"), "body")];
		let messages = build_grade_messages(&Plan::default(), "q", &selected, &Map::new());
		let user = messages[1].get("content").and_then(|v| v.as_str()).unwrap_or_default();

		assert!(user.contains("[1] doc-1#3: body"));
	}
}
