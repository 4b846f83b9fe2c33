//! Shared plumbing for the HTTP-backed adapters.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::{Client, Response};
use tracing::warn;

/// Longest provider error body echoed into an error message.
const ERROR_BODY_LIMIT: usize = 2_000;

/// Read an API credential from the environment.
pub fn api_key_from_env(var: &str) -> Result<String> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(anyhow!("{var} not found in environment variables")),
    }
}

/// Build a blocking client that gives up after `timeout_secs`.
///
/// Clients are built per call: the blocking client owns a runtime and must
/// not be created or dropped on an async executor thread.
pub fn client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("build http client")
}

/// Turn a non-2xx response into an error carrying the provider's message.
pub fn ensure_success(response: Response, provider: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    warn!(provider, status = status.as_u16(), "provider request failed");
    Err(anyhow!(
        "{provider} returned {status}: {}",
        truncate(body.trim(), ERROR_BODY_LIMIT)
    ))
}

/// Join an API root and a path without doubling the separator.
pub fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn truncate(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_names_the_variable() {
        let err = api_key_from_env("CALLCYCLE_TEST_KEY_THAT_IS_NEVER_SET").unwrap_err();
        assert_eq!(
            err.to_string(),
            "CALLCYCLE_TEST_KEY_THAT_IS_NEVER_SET not found in environment variables"
        );
    }

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(
            join_url("https://api.groq.com/openai/v1/", "/chat/completions"),
            "https://api.groq.com/openai/v1/chat/completions"
        );
        assert_eq!(
            join_url("https://api.elevenlabs.io", "v1/text-to-speech/abc"),
            "https://api.elevenlabs.io/v1/text-to-speech/abc"
        );
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "h");
        assert_eq!(truncate("short", 100), "short");
    }
}
