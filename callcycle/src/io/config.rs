//! Cycle configuration stored under `.callcycle/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::types::ScriptVariants;

/// Cycle configuration (TOML).
///
/// This file is intended to be edited by humans. Missing fields default to
/// values that reproduce the reference deployment (ElevenLabs, canned
/// transcription, Groq-hosted analysis).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CallcycleConfig {
    pub scripts: ScriptVariants,
    pub synthesis: SynthesisConfig,
    pub transcription: TranscriptionConfig,
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SynthesisConfig {
    /// ElevenLabs-compatible API root.
    pub base_url: String,
    pub voice_id: String,
    pub model_id: String,
    /// Audio encoding requested from the provider (e.g. `mp3_44100_128`).
    pub output_format: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.elevenlabs.io".to_string(),
            voice_id: "21m00Tcm4TlvDq8ikWAM".to_string(),
            model_id: "eleven_multilingual_v2".to_string(),
            output_format: "mp3_44100_128".to_string(),
            api_key_env: "ELEVEN_LABS_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionBackend {
    /// Return `fixed_text` without contacting any service.
    Fixed,
    /// OpenAI-compatible `audio/transcriptions` endpoint.
    Whisper,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub backend: TranscriptionBackend,
    /// Canned callee reply used by the `fixed` backend.
    pub fixed_text: String,
    /// Callee audio, relative to the project root.
    pub farmer_audio: PathBuf,
    /// Stands in for the agent's side of the transcript.
    pub agent_placeholder: String,
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            backend: TranscriptionBackend::Fixed,
            fixed_text: "Okay sounds good, could you tell me what exactly it is about?"
                .to_string(),
            farmer_audio: PathBuf::from("example.mp3"),
            agent_placeholder: "[Agent's opening words]".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "whisper-1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// OpenAI-compatible API root (chat completions).
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            temperature: 0.0,
            api_key_env: "GROQ_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

impl CallcycleConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.scripts.entries() {
            if value.trim().is_empty() {
                return Err(anyhow!("scripts.{name} must be non-empty"));
            }
        }
        require_non_empty("synthesis.base_url", &self.synthesis.base_url)?;
        require_non_empty("synthesis.voice_id", &self.synthesis.voice_id)?;
        require_non_empty("synthesis.model_id", &self.synthesis.model_id)?;
        require_non_empty("synthesis.api_key_env", &self.synthesis.api_key_env)?;
        require_positive("synthesis.timeout_secs", self.synthesis.timeout_secs)?;

        let transcription = &self.transcription;
        require_non_empty("transcription.agent_placeholder", &transcription.agent_placeholder)?;
        require_positive("transcription.timeout_secs", transcription.timeout_secs)?;
        match transcription.backend {
            TranscriptionBackend::Fixed => {
                require_non_empty("transcription.fixed_text", &transcription.fixed_text)?;
            }
            TranscriptionBackend::Whisper => {
                require_non_empty("transcription.base_url", &transcription.base_url)?;
                require_non_empty("transcription.model", &transcription.model)?;
                require_non_empty("transcription.api_key_env", &transcription.api_key_env)?;
                if transcription.farmer_audio.as_os_str().is_empty() {
                    return Err(anyhow!("transcription.farmer_audio must be set"));
                }
            }
        }

        require_non_empty("analysis.base_url", &self.analysis.base_url)?;
        require_non_empty("analysis.model", &self.analysis.model)?;
        require_non_empty("analysis.api_key_env", &self.analysis.api_key_env)?;
        require_positive("analysis.timeout_secs", self.analysis.timeout_secs)?;
        if !(0.0..=2.0).contains(&self.analysis.temperature) {
            return Err(anyhow!("analysis.temperature must be within 0..=2"));
        }
        Ok(())
    }
}

fn require_non_empty(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(anyhow!("{name} must be non-empty"));
    }
    Ok(())
}

fn require_positive(name: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(anyhow!("{name} must be > 0"));
    }
    Ok(())
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `CallcycleConfig::default()`.
pub fn load_config(path: &Path) -> Result<CallcycleConfig> {
    if !path.exists() {
        let cfg = CallcycleConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: CallcycleConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &CallcycleConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
