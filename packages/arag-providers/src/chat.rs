use color_eyre::Result;
use serde_json::Value;

use arag_config::LlmProviderConfig;

const MAX_JSON_ATTEMPTS: usize = 3;

/// Sends one chat completion request and returns the first choice's message content.
pub async fn complete(cfg: &LlmProviderConfig, messages: &[Value]) -> Result<String> {
	let json = send(cfg, messages).await?;

	message_content(&json)
		.map(str::to_string)
		.ok_or_else(|| crate::invalid_response("Chat response is missing message content."))
}

/// Like [`complete`], but asks again until the content parses as a JSON object.
pub async fn complete_json(cfg: &LlmProviderConfig, messages: &[Value]) -> Result<Value> {
	for attempt in 1..=MAX_JSON_ATTEMPTS {
		let json = send(cfg, messages).await?;

		match parse_json_content(json) {
			Ok(parsed) => return Ok(parsed),
			Err(err) => {
				tracing::warn!(attempt, error = %err, "Chat response is not valid JSON.");
			},
		}
	}

	Err(crate::malformed_output("Chat response is not valid JSON."))
}

async fn send(cfg: &LlmProviderConfig, messages: &[Value]) -> Result<Value> {
	let client = crate::http_client(cfg.timeout_ms)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;

	Ok(res.error_for_status()?.json().await?)
}

fn message_content(json: &Value) -> Option<&str> {
	json.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
}

fn parse_json_content(json: Value) -> Result<Value> {
	if let Some(content) = message_content(&json) {
		let parsed: Value = serde_json::from_str(strip_code_fence(content))
			.map_err(|_| crate::malformed_output("Chat content is not valid JSON."))?;

		if !parsed.is_object() {
			return Err(crate::malformed_output("Chat content is not a JSON object."));
		}

		return Ok(parsed);
	}

	Err(crate::malformed_output("Chat response is missing JSON content."))
}

fn strip_code_fence(content: &str) -> &str {
	let trimmed = content.trim();
	let Some(inner) = trimmed.strip_prefix("```") else {
		return trimmed;
	};
	let inner = inner.strip_prefix("json").unwrap_or(inner);

	inner.strip_suffix("```").unwrap_or(inner).trim()
}

pub(crate) fn system_message(content: &str) -> Value {
	serde_json::json!({ "role": "system", "content": content })
}

pub(crate) fn user_message(content: &str) -> Value {
	serde_json::json!({ "role": "user", "content": content })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_choice_content_json() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "content": "{\"queries\": []}" } }
			]
		});
		let parsed = parse_json_content(json).expect("parse failed");

		assert!(parsed.get("queries").is_some());
	}

	#[test]
	fn parses_fenced_content() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "content": "```json\n{\"confidence\": 0.5}\n```" } }
			]
		});
		let parsed = parse_json_content(json).expect("parse failed");

		assert_eq!(parsed.get("confidence").and_then(|v| v.as_f64()), Some(0.5));
	}

	#[test]
	fn rejects_prose_content() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "content": "Sure, here are some queries." } }
			]
		});
		let err = parse_json_content(json).expect_err("Expected malformed output.");

		assert!(matches!(err.downcast_ref::<crate::Error>(), Some(crate::Error::MalformedOutput { .. })));
	}
}
