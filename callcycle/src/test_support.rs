//! Test-only helpers: scripted adapters and a throwaway project directory.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use tempfile::TempDir;

use crate::core::types::{InsightRecord, ScriptState};
use crate::cycle::Adapters;
use crate::io::analysis::Analyzer;
use crate::io::init::CallcyclePaths;
use crate::io::synthesis::Synthesizer;
use crate::io::transcription::{FixedTranscriber, Transcriber};

/// Build an insight record with deterministic filler for the unused fields.
pub fn insight(sentiment: &str, clarity: &str, outcome: &str) -> InsightRecord {
    InsightRecord {
        farmer_sentiment: sentiment.to_string(),
        interest_level: "moderate".to_string(),
        intro_clarity: clarity.to_string(),
        objections: Vec::new(),
        call_outcome: outcome.to_string(),
    }
}

/// Synthesizer that records the requested text and writes a stub artifact.
pub struct ScriptedSynthesizer {
    failure: Option<String>,
    texts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedSynthesizer {
    pub fn new() -> Self {
        Self {
            failure: None,
            texts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new()
        }
    }

    /// Shared log of every text passed to `synthesize`.
    pub fn texts_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.texts)
    }
}

impl Default for ScriptedSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Synthesizer for ScriptedSynthesizer {
    fn synthesize(&self, text: &str, output_path: &Path) -> Result<()> {
        self.texts
            .lock()
            .map_err(|_| anyhow!("texts lock poisoned"))?
            .push(text.to_string());
        if let Some(message) = &self.failure {
            return Err(anyhow!("{message}"));
        }
        fs::write(output_path, b"ID3 scripted audio")?;
        Ok(())
    }
}

/// Transcriber that always fails with the given message.
pub struct FailingTranscriber(pub String);

impl Transcriber for FailingTranscriber {
    fn transcribe(&self, _farmer_audio: &Path) -> Result<String> {
        Err(anyhow!("{}", self.0))
    }
}

/// Analyzer that replays queued results in order.
pub struct ScriptedAnalyzer {
    responses: Mutex<VecDeque<Result<InsightRecord, String>>>,
    transcripts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedAnalyzer {
    pub fn new(responses: Vec<Result<InsightRecord, String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            transcripts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn returning(insights: Vec<InsightRecord>) -> Self {
        Self::new(insights.into_iter().map(Ok).collect())
    }

    pub fn failing(message: &str) -> Self {
        Self::new(vec![Err(message.to_string())])
    }

    /// Shared log of every transcript passed to `analyze`.
    pub fn transcripts_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.transcripts)
    }
}

impl Analyzer for ScriptedAnalyzer {
    fn analyze(&self, transcript: &str) -> Result<InsightRecord> {
        self.transcripts
            .lock()
            .map_err(|_| anyhow!("transcripts lock poisoned"))?
            .push(transcript.to_string());
        let next = self
            .responses
            .lock()
            .map_err(|_| anyhow!("responses lock poisoned"))?
            .pop_front()
            .ok_or_else(|| anyhow!("scripted analyzer exhausted"))?;
        next.map_err(|message| anyhow!("{message}"))
    }
}

/// Scripted synthesizer, a fixed reply, and the given analyzer.
pub fn scripted_adapters(analyzer: ScriptedAnalyzer) -> Adapters {
    Adapters {
        synthesizer: Box::new(ScriptedSynthesizer::new()),
        transcriber: Box::new(FixedTranscriber::new(
            "Okay sounds good, could you tell me what exactly it is about?",
        )),
        analyzer: Box::new(analyzer),
    }
}

/// Empty project directory, removed on drop. Nothing under `.callcycle/` exists yet.
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn paths(&self) -> CallcyclePaths {
        CallcyclePaths::new(self.dir.path())
    }

    pub fn write_script(&self, state: &ScriptState) -> Result<()> {
        let paths = self.paths();
        fs::create_dir_all(&paths.state_dir)?;
        fs::write(&paths.script_path, serde_json::to_string_pretty(state)?)?;
        Ok(())
    }

    pub fn read_script(&self) -> Result<ScriptState> {
        let contents = fs::read_to_string(self.paths().script_path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}
