//! Orchestration for a single simulation cycle.
//!
//! Load script → synthesize → transcribe → analyze → adapt → save. Each stage
//! depends on the previous one succeeding; the first failure aborts the cycle
//! and is reported as a [`CycleError`]. Side effects of completed stages (the
//! written audio file) are not rolled back.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::core::adapt::{AdaptationEngine, RuleEvaluation, RuleVerdict};
use crate::core::types::{InsightRecord, ScriptState};
use crate::io::analysis::{Analyzer, ChatAnalyzer, analyze_conversation};
use crate::io::config::{CallcycleConfig, TranscriptionBackend};
use crate::io::init::CallcyclePaths;
use crate::io::script_store::ScriptStore;
use crate::io::synthesis::{ElevenLabsSynthesizer, Synthesizer, generate_agent_audio};
use crate::io::transcription::{FixedTranscriber, Transcriber, WhisperTranscriber, transcribe_call};

/// The three external collaborators a cycle drives.
pub struct Adapters {
    pub synthesizer: Box<dyn Synthesizer + Send + Sync>,
    pub transcriber: Box<dyn Transcriber + Send + Sync>,
    pub analyzer: Box<dyn Analyzer + Send + Sync>,
}

impl Adapters {
    /// Live backends selected by config.
    pub fn from_config(cfg: &CallcycleConfig) -> Self {
        let transcriber: Box<dyn Transcriber + Send + Sync> = match cfg.transcription.backend {
            TranscriptionBackend::Fixed => {
                Box::new(FixedTranscriber::new(cfg.transcription.fixed_text.clone()))
            }
            TranscriptionBackend::Whisper => {
                Box::new(WhisperTranscriber::new(cfg.transcription.clone()))
            }
        };
        Self {
            synthesizer: Box::new(ElevenLabsSynthesizer::new(cfg.synthesis.clone())),
            transcriber,
            analyzer: Box::new(ChatAnalyzer::new(cfg.analysis.clone())),
        }
    }
}

/// Stage at which a cycle aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    LoadScript,
    Synthesis,
    Transcription,
    Analysis,
    SaveScript,
}

impl CycleStage {
    pub fn as_str(self) -> &'static str {
        match self {
            CycleStage::LoadScript => "load_script",
            CycleStage::Synthesis => "synthesis",
            CycleStage::Transcription => "transcription",
            CycleStage::Analysis => "analysis",
            CycleStage::SaveScript => "save_script",
        }
    }
}

/// A cycle failed; no partial result is reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError {
    pub stage: CycleStage,
    /// Full message chain of the originating error.
    pub message: String,
}

impl CycleError {
    fn at(stage: CycleStage) -> impl FnOnce(anyhow::Error) -> CycleError {
        move |err| {
            tracing::error!(stage = stage.as_str(), err = %format!("{err:#}"), "cycle aborted");
            CycleError {
                stage,
                message: format!("{err:#}"),
            }
        }
    }
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "simulation cycle failed: {}", self.message)
    }
}

impl std::error::Error for CycleError {}

/// Result of a completed cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    pub analysis: InsightRecord,
    pub next_script: ScriptState,
    pub rules: Vec<RuleEvaluation>,
    pub agent_audio: PathBuf,
}

/// Run one full cycle against the project at `root`.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn run_cycle(
    root: &Path,
    cfg: &CallcycleConfig,
    adapters: &Adapters,
) -> Result<CycleOutcome, CycleError> {
    let paths = CallcyclePaths::new(root);
    let store = ScriptStore::new(&paths.script_path, cfg.scripts.clone());
    let engine = AdaptationEngine::new(cfg.scripts.clone());

    let current = store.load().map_err(CycleError::at(CycleStage::LoadScript))?;
    debug!(?current, "loaded script state");

    let agent_audio = generate_agent_audio(
        adapters.synthesizer.as_ref(),
        &current.full_text(),
        &paths.agent_audio_path,
    )
    .map_err(CycleError::at(CycleStage::Synthesis))?;

    let farmer_audio = paths.resolve(&cfg.transcription.farmer_audio);
    let transcript = transcribe_call(
        adapters.transcriber.as_ref(),
        &agent_audio,
        &farmer_audio,
        &cfg.transcription.agent_placeholder,
    )
    .map_err(CycleError::at(CycleStage::Transcription))?;

    let analysis = analyze_conversation(adapters.analyzer.as_ref(), &transcript)
        .map_err(CycleError::at(CycleStage::Analysis))?;
    info!(
        sentiment = %analysis.farmer_sentiment,
        clarity = %analysis.intro_clarity,
        outcome = %analysis.call_outcome,
        objections = analysis.objections.len(),
        "call analysis complete"
    );

    let adaptation = engine.adapt(&current, &analysis);
    for evaluation in &adaptation.evaluations {
        log_evaluation(evaluation);
    }

    store
        .save(&adaptation.next)
        .map_err(CycleError::at(CycleStage::SaveScript))?;
    info!(path = %store.path().display(), "saved next script state");

    Ok(CycleOutcome {
        analysis,
        next_script: adaptation.next,
        rules: adaptation.evaluations,
        agent_audio,
    })
}

fn log_evaluation(evaluation: &RuleEvaluation) {
    let rule = evaluation.rule;
    match evaluation.verdict {
        RuleVerdict::Applied => info!(?rule, action = rule.action(), "rule applied"),
        RuleVerdict::Observed => info!(?rule, action = rule.action(), "rule observed"),
        RuleVerdict::NotMatched => debug!(?rule, "rule not matched"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::adapt::Rule;
    use crate::test_support::{ScriptedAnalyzer, TestWorkspace, insight, scripted_adapters};
    use std::fs;

    #[test]
    fn cycle_persists_adapted_script() {
        let workspace = TestWorkspace::new().expect("workspace");
        let cfg = CallcycleConfig::default();
        let adapters = scripted_adapters(ScriptedAnalyzer::returning(vec![insight(
            "neutral",
            "confused",
            "rejection",
        )]));

        let outcome = run_cycle(workspace.path(), &cfg, &adapters).expect("cycle");

        assert_eq!(outcome.next_script.intro, cfg.scripts.simple_intro);
        assert_eq!(outcome.next_script.benefits, cfg.scripts.default_benefits);
        assert_eq!(outcome.next_script.cta, cfg.scripts.yes_no_cta);
        assert_eq!(workspace.read_script().expect("read"), outcome.next_script);
        assert!(outcome.agent_audio.exists());
        assert_eq!(outcome.rules.len(), Rule::ORDER.len());
    }

    #[test]
    fn cycle_synthesizes_full_script_text_and_sends_transcript() {
        let workspace = TestWorkspace::new().expect("workspace");
        workspace
            .write_script(&ScriptState {
                intro: "Hi".to_string(),
                benefits: "Great plan".to_string(),
                cta: "Buy now?".to_string(),
            })
            .expect("write");
        let analyzer = ScriptedAnalyzer::returning(vec![insight("positive", "understood", "success")]);
        let transcripts = analyzer.transcripts_handle();
        let synthesizer = crate::test_support::ScriptedSynthesizer::new();
        let texts = synthesizer.texts_handle();
        let adapters = Adapters {
            synthesizer: Box::new(synthesizer),
            transcriber: Box::new(FixedTranscriber::new("Sounds good.")),
            analyzer: Box::new(analyzer),
        };

        run_cycle(workspace.path(), &CallcycleConfig::default(), &adapters).expect("cycle");

        assert_eq!(
            texts.lock().expect("lock").as_slice(),
            ["Hi Great plan Buy now?".to_string()]
        );
        assert_eq!(
            transcripts.lock().expect("lock").as_slice(),
            ["Agent: [Agent's opening words]\nFarmer: Sounds good.".to_string()]
        );
    }

    #[test]
    fn synthesis_failure_aborts_without_saving() {
        let workspace = TestWorkspace::new().expect("workspace");
        let adapters = Adapters {
            synthesizer: Box::new(crate::test_support::ScriptedSynthesizer::failing(
                "voice not found",
            )),
            ..scripted_adapters(ScriptedAnalyzer::returning(Vec::new()))
        };

        let err = run_cycle(workspace.path(), &CallcycleConfig::default(), &adapters).unwrap_err();
        assert_eq!(err.stage, CycleStage::Synthesis);
        assert_eq!(
            err.to_string(),
            "simulation cycle failed: audio generation failed: voice not found"
        );
        assert!(!workspace.paths().script_path.exists());
    }

    #[test]
    fn analysis_failure_keeps_audio_but_not_state() {
        let workspace = TestWorkspace::new().expect("workspace");
        let adapters = scripted_adapters(ScriptedAnalyzer::failing("rate limited"));

        let err = run_cycle(workspace.path(), &CallcycleConfig::default(), &adapters).unwrap_err();
        assert_eq!(err.stage, CycleStage::Analysis);
        assert!(err.message.contains("rate limited"));
        assert!(workspace.paths().agent_audio_path.exists());
        assert!(!workspace.paths().script_path.exists());
    }

    #[test]
    fn corrupt_state_fails_at_load() {
        let workspace = TestWorkspace::new().expect("workspace");
        let paths = workspace.paths();
        fs::create_dir_all(&paths.state_dir).expect("mkdir");
        fs::write(&paths.script_path, "not json").expect("write");
        let adapters = scripted_adapters(ScriptedAnalyzer::returning(Vec::new()));

        let err = run_cycle(workspace.path(), &CallcycleConfig::default(), &adapters).unwrap_err();
        assert_eq!(err.stage, CycleStage::LoadScript);
        assert_eq!(fs::read_to_string(&paths.script_path).expect("read"), "not json");
    }

    #[test]
    fn unwritable_state_fails_at_save() {
        let workspace = TestWorkspace::new().expect("workspace");
        let paths = workspace.paths();
        // A directory where the temp file would go makes the write fail.
        fs::create_dir_all(paths.script_path.with_extension("json.tmp")).expect("mkdir");
        let adapters = scripted_adapters(ScriptedAnalyzer::returning(vec![insight(
            "positive",
            "understood",
            "success",
        )]));

        let err = run_cycle(workspace.path(), &CallcycleConfig::default(), &adapters).unwrap_err();
        assert_eq!(err.stage, CycleStage::SaveScript);
        assert!(err.message.contains("write temp script state"));
    }
}
