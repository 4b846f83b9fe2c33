//! Script state storage (`.callcycle/state/current_script.json`).

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::core::types::{ScriptState, ScriptVariants};

/// On-disk shape: any field may be missing and is filled from defaults.
#[derive(Debug, Deserialize)]
struct StoredScript {
    intro: Option<String>,
    benefits: Option<String>,
    cta: Option<String>,
}

/// Flat-file store for the mutable call script.
#[derive(Debug, Clone)]
pub struct ScriptStore {
    path: PathBuf,
    defaults: ScriptVariants,
}

impl ScriptStore {
    pub fn new(path: impl Into<PathBuf>, defaults: ScriptVariants) -> Self {
        Self {
            path: path.into(),
            defaults,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted script.
    ///
    /// A missing file yields the default script. A file that exists but is not
    /// a JSON object of strings is an error; it is never silently replaced.
    pub fn load(&self) -> Result<ScriptState> {
        debug!(path = %self.path.display(), "loading script state");
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("script state missing, using defaults");
                return Ok(ScriptState::from_defaults(&self.defaults));
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("read script state {}", self.path.display()));
            }
        };
        let value: Value = serde_json::from_str(&contents)
            .with_context(|| format!("parse script state {}", self.path.display()))?;
        // Derived struct deserializers also accept sequences; only objects are valid.
        if !value.is_object() {
            return Err(anyhow!(
                "parse script state {}: expected a JSON object",
                self.path.display()
            ));
        }
        let stored: StoredScript = serde_json::from_value(value)
            .with_context(|| format!("parse script state {}", self.path.display()))?;
        let state = ScriptState {
            intro: stored
                .intro
                .unwrap_or_else(|| self.defaults.default_intro.clone()),
            benefits: stored
                .benefits
                .unwrap_or_else(|| self.defaults.default_benefits.clone()),
            cta: stored
                .cta
                .unwrap_or_else(|| self.defaults.default_cta.clone()),
        };
        Ok(state)
    }

    /// Atomically overwrite the persisted script (temp file + rename).
    pub fn save(&self, state: &ScriptState) -> Result<()> {
        debug!(path = %self.path.display(), "writing script state");
        let mut buf = serde_json::to_string_pretty(state).context("serialize script state")?;
        buf.push('\n');
        write_atomic(&self.path, &buf)
    }
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("script state path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp script state {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .with_context(|| format!("replace script state {}", path.display()))?;
    Ok(())
}
