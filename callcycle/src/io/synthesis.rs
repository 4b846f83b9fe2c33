//! Speech synthesis adapter.
//!
//! The [`Synthesizer`] trait decouples the cycle from the speech backend
//! (currently ElevenLabs). Tests use scripted synthesizers that write a
//! placeholder artifact without any network access.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::io::config::SynthesisConfig;
use crate::io::http::{api_key_from_env, client, ensure_success, join_url};

/// Abstraction over text-to-speech backends.
pub trait Synthesizer {
    /// Render `text` to audio. Must write the artifact to `output_path`.
    fn synthesize(&self, text: &str, output_path: &Path) -> Result<()>;
}

impl<S: Synthesizer + ?Sized> Synthesizer for Box<S> {
    fn synthesize(&self, text: &str, output_path: &Path) -> Result<()> {
        (**self).synthesize(text, output_path)
    }
}

/// Synthesize the agent's audio and return the artifact path.
///
/// Rejects blank text before contacting any backend.
#[instrument(skip_all, fields(output_path = %output_path.display(), chars = text.len()))]
pub fn generate_agent_audio<S: Synthesizer + ?Sized>(
    synthesizer: &S,
    text: &str,
    output_path: &Path,
) -> Result<PathBuf> {
    if text.trim().is_empty() {
        return Err(anyhow!("script text cannot be empty"));
    }
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create audio dir {}", parent.display()))?;
    }
    synthesizer
        .synthesize(text, output_path)
        .map_err(|err| anyhow!("audio generation failed: {err:#}"))?;
    if !output_path.exists() {
        return Err(anyhow!(
            "audio generation failed: missing artifact {}",
            output_path.display()
        ));
    }
    info!("agent audio saved");
    Ok(output_path.to_path_buf())
}

#[derive(Serialize)]
struct TextToSpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

/// Synthesizer backed by the ElevenLabs text-to-speech API.
#[derive(Debug, Clone)]
pub struct ElevenLabsSynthesizer {
    config: SynthesisConfig,
}

impl ElevenLabsSynthesizer {
    pub fn new(config: SynthesisConfig) -> Self {
        Self { config }
    }
}

impl Synthesizer for ElevenLabsSynthesizer {
    #[instrument(skip_all, fields(voice_id = %self.config.voice_id, model_id = %self.config.model_id))]
    fn synthesize(&self, text: &str, output_path: &Path) -> Result<()> {
        let api_key = api_key_from_env(&self.config.api_key_env)?;
        let url = join_url(
            &self.config.base_url,
            &format!("v1/text-to-speech/{}", self.config.voice_id),
        );
        debug!(%url, "requesting speech synthesis");

        let response = client(self.config.timeout_secs)?
            .post(&url)
            .query(&[("output_format", self.config.output_format.as_str())])
            .header("xi-api-key", api_key)
            .header("accept", "audio/mpeg")
            .json(&TextToSpeechRequest {
                text,
                model_id: &self.config.model_id,
            })
            .send()
            .context("send text-to-speech request")?;
        let audio = ensure_success(response, "elevenlabs")?
            .bytes()
            .context("read synthesized audio")?;
        if audio.is_empty() {
            warn!("provider returned no audio");
            return Err(anyhow!("elevenlabs returned an empty audio body"));
        }

        fs::write(output_path, &audio)
            .with_context(|| format!("write audio {}", output_path.display()))?;
        debug!(bytes = audio.len(), "audio written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeSynthesizer {
        write: bool,
    }

    impl Synthesizer for FakeSynthesizer {
        fn synthesize(&self, _text: &str, output_path: &Path) -> Result<()> {
            if self.write {
                fs::write(output_path, b"ID3")?;
            }
            Ok(())
        }
    }

    struct BrokenSynthesizer;

    impl Synthesizer for BrokenSynthesizer {
        fn synthesize(&self, _text: &str, _output_path: &Path) -> Result<()> {
            Err(anyhow!("quota exceeded"))
        }
    }

    #[test]
    fn generate_writes_artifact_and_creates_parent() {
        let temp = tempfile::tempdir().expect("tempdir");
        let output = temp.path().join("audio").join("agent_output.mp3");

        let path = generate_agent_audio(&FakeSynthesizer { write: true }, "Hello", &output)
            .expect("generate");
        assert_eq!(path, output);
        assert_eq!(fs::read(&output).expect("read"), b"ID3");
    }

    #[test]
    fn blank_text_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = generate_agent_audio(
            &FakeSynthesizer { write: true },
            "  \n",
            &temp.path().join("out.mp3"),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "script text cannot be empty");
    }

    #[test]
    fn backend_failure_is_wrapped() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = generate_agent_audio(&BrokenSynthesizer, "Hello", &temp.path().join("out.mp3"))
            .unwrap_err();
        assert_eq!(err.to_string(), "audio generation failed: quota exceeded");
    }

    #[test]
    fn missing_artifact_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = generate_agent_audio(
            &FakeSynthesizer { write: false },
            "Hello",
            &temp.path().join("out.mp3"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("missing artifact"));
    }

    #[test]
    fn live_synthesizer_requires_api_key() {
        let temp = tempfile::tempdir().expect("tempdir");
        let synthesizer = ElevenLabsSynthesizer::new(SynthesisConfig {
            api_key_env: "CALLCYCLE_TEST_ELEVEN_KEY_UNSET".to_string(),
            ..SynthesisConfig::default()
        });
        let err = generate_agent_audio(&synthesizer, "Hello", &temp.path().join("out.mp3"))
            .unwrap_err();
        assert!(
            err.to_string()
                .contains("CALLCYCLE_TEST_ELEVEN_KEY_UNSET not found in environment variables")
        );
    }
}
