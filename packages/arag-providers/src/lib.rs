pub mod chat;
pub mod grader;
pub mod hyde;
pub mod rerank;
pub mod search;

mod error;

pub use error::{Error, Result};

use std::time::Duration;

use color_eyre::eyre;
use reqwest::{
	Client,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

pub fn auth_headers(
	api_key: &str,
	default_headers: &Map<String, Value>,
) -> color_eyre::Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(eyre::Report::new(Error::InvalidConfig {
				message: format!("Default header {key} must be a string."),
			}));
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

pub(crate) fn http_client(timeout_ms: u64) -> color_eyre::Result<Client> {
	Ok(Client::builder().timeout(Duration::from_millis(timeout_ms)).build()?)
}

pub(crate) fn invalid_response(message: impl Into<String>) -> eyre::Report {
	eyre::Report::new(Error::InvalidResponse { message: message.into() })
}

pub(crate) fn malformed_output(message: impl Into<String>) -> eyre::Report {
	eyre::Report::new(Error::MalformedOutput { message: message.into() })
}
