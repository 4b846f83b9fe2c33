//! Language-model analysis adapter.
//!
//! Turns a transcript into an [`InsightRecord`]. The live backend talks to an
//! OpenAI-compatible chat completions endpoint, embeds the record's JSON
//! Schema in the prompt as format instructions, and validates the reply
//! against the same schema before deserializing it.

use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow};
use minijinja::{Environment, context};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::core::types::InsightRecord;
use crate::io::config::AnalysisConfig;
use crate::io::http::{api_key_from_env, client, ensure_success, join_url};

const ANALYSIS_TEMPLATE: &str = include_str!("prompts/analysis.md");
pub const INSIGHT_SCHEMA: &str = include_str!("../../schemas/insight_record.schema.json");

/// Abstraction over transcript analysis backends.
pub trait Analyzer {
    fn analyze(&self, transcript: &str) -> Result<InsightRecord>;
}

impl<A: Analyzer + ?Sized> Analyzer for Box<A> {
    fn analyze(&self, transcript: &str) -> Result<InsightRecord> {
        (**self).analyze(transcript)
    }
}

/// Analyze a transcript, rejecting blank input before any backend call.
#[instrument(skip_all, fields(transcript_len = transcript.len()))]
pub fn analyze_conversation<A: Analyzer + ?Sized>(
    analyzer: &A,
    transcript: &str,
) -> Result<InsightRecord> {
    if transcript.trim().is_empty() {
        return Err(anyhow!("transcript cannot be empty"));
    }
    let insight = analyzer
        .analyze(transcript)
        .map_err(|err| anyhow!("analysis failed: {err:#}"))?;
    debug!(?insight, "parsed insight record");
    Ok(insight)
}

/// Render the analysis prompt for a transcript.
pub fn render_prompt(transcript: &str) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("analysis", ANALYSIS_TEMPLATE)
        .context("register analysis template")?;
    let rendered = env.get_template("analysis")?.render(context! {
        schema => INSIGHT_SCHEMA.trim(),
        transcript => transcript.trim(),
    })?;
    Ok(rendered)
}

/// Parse a model reply into an insight record.
///
/// Accepts a bare JSON object, a fenced code block, or an object embedded in
/// surrounding prose. The object must satisfy [`INSIGHT_SCHEMA`].
pub fn parse_insight(reply: &str) -> Result<InsightRecord> {
    let raw = extract_json_object(reply)
        .ok_or_else(|| anyhow!("model reply contains no JSON object"))?;
    let value: Value = serde_json::from_str(raw).context("parse model reply as json")?;
    validate_insight(&value)?;
    let insight = serde_json::from_value(value).context("deserialize insight record")?;
    Ok(insight)
}

fn extract_json_object(reply: &str) -> Option<&str> {
    static FENCED_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)```(?:json)?\s*(\{.*\})\s*```").expect("fenced json regex is valid")
    });
    if let Some(captures) = FENCED_RE.captures(reply) {
        return captures.get(1).map(|m| m.as_str());
    }
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (start < end).then(|| &reply[start..=end])
}

fn validate_insight(value: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(INSIGHT_SCHEMA).context("parse insight schema")?;
    let validator =
        jsonschema::validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    let messages = validator
        .iter_errors(value)
        .map(|err| err.to_string())
        .collect::<Vec<_>>();
    if !messages.is_empty() {
        return Err(anyhow!(
            "insight schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Analyzer backed by an OpenAI-compatible chat completions API (Groq by default).
#[derive(Debug, Clone)]
pub struct ChatAnalyzer {
    config: AnalysisConfig,
}

impl ChatAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }
}

impl Analyzer for ChatAnalyzer {
    #[instrument(skip_all, fields(model = %self.config.model))]
    fn analyze(&self, transcript: &str) -> Result<InsightRecord> {
        let api_key = api_key_from_env(&self.config.api_key_env)?;
        let prompt = render_prompt(transcript)?;
        let request = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = client(self.config.timeout_secs)?
            .post(join_url(&self.config.base_url, "chat/completions"))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .context("send chat completion request")?;
        let parsed: ChatResponse = ensure_success(response, "analysis model")?
            .json()
            .context("parse chat completion response")?;
        let reply = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("chat completion returned no content"))?;
        debug!(reply_len = reply.len(), "model replied");
        parse_insight(&reply)
    }
}
