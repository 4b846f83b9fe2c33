//! Transcription adapter.
//!
//! Only the callee's side is transcribed; the agent's side is represented by
//! a configured placeholder line.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::multipart::Form;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::transcript::compose_transcript;
use crate::io::config::TranscriptionConfig;
use crate::io::http::{api_key_from_env, client, ensure_success, join_url};

/// Abstraction over speech-to-text backends.
pub trait Transcriber {
    /// Transcribe the callee's audio to plain text.
    fn transcribe(&self, farmer_audio: &Path) -> Result<String>;
}

impl<T: Transcriber + ?Sized> Transcriber for Box<T> {
    fn transcribe(&self, farmer_audio: &Path) -> Result<String> {
        (**self).transcribe(farmer_audio)
    }
}

/// Produce the two-party transcript for one call.
#[instrument(skip_all, fields(agent_audio = %agent_audio.display(), farmer_audio = %farmer_audio.display()))]
pub fn transcribe_call<T: Transcriber + ?Sized>(
    transcriber: &T,
    agent_audio: &Path,
    farmer_audio: &Path,
    agent_placeholder: &str,
) -> Result<String> {
    if !agent_audio.exists() {
        return Err(anyhow!(
            "transcription failed: missing agent audio {}",
            agent_audio.display()
        ));
    }
    let farmer_text = transcriber
        .transcribe(farmer_audio)
        .map_err(|err| anyhow!("transcription failed: {err:#}"))?;
    let transcript = compose_transcript(agent_placeholder, &farmer_text);
    debug!(%transcript, "generated transcript");
    Ok(transcript)
}

/// Returns a canned reply regardless of the audio.
#[derive(Debug, Clone)]
pub struct FixedTranscriber {
    text: String,
}

impl FixedTranscriber {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl Transcriber for FixedTranscriber {
    fn transcribe(&self, _farmer_audio: &Path) -> Result<String> {
        Ok(self.text.clone())
    }
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Transcriber backed by an OpenAI-compatible `audio/transcriptions` endpoint.
#[derive(Debug, Clone)]
pub struct WhisperTranscriber {
    config: TranscriptionConfig,
}

impl WhisperTranscriber {
    pub fn new(config: TranscriptionConfig) -> Self {
        Self { config }
    }
}

impl Transcriber for WhisperTranscriber {
    #[instrument(skip_all, fields(model = %self.config.model))]
    fn transcribe(&self, farmer_audio: &Path) -> Result<String> {
        if !farmer_audio.exists() {
            return Err(anyhow!("missing farmer audio {}", farmer_audio.display()));
        }
        let api_key = api_key_from_env(&self.config.api_key_env)?;
        let form = Form::new()
            .text("model", self.config.model.clone())
            .file("file", farmer_audio)
            .with_context(|| format!("attach audio {}", farmer_audio.display()))?;

        let response = client(self.config.timeout_secs)?
            .post(join_url(&self.config.base_url, "audio/transcriptions"))
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .context("send transcription request")?;
        let parsed: TranscriptionResponse = ensure_success(response, "transcription")?
            .json()
            .context("parse transcription response")?;
        Ok(parsed.text)
    }
}
