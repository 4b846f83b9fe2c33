//! Initialization helpers for `.callcycle/` scaffolding.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use super::config::{CallcycleConfig, load_config, write_config};
use super::script_store::ScriptStore;
use crate::core::types::ScriptState;

/// All canonical paths within `.callcycle/` for a project root.
#[derive(Debug, Clone)]
pub struct CallcyclePaths {
    pub root: PathBuf,
    pub callcycle_dir: PathBuf,
    pub state_dir: PathBuf,
    pub audio_dir: PathBuf,
    pub config_path: PathBuf,
    pub script_path: PathBuf,
    pub agent_audio_path: PathBuf,
}

impl CallcyclePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let callcycle_dir = root.join(".callcycle");
        let state_dir = callcycle_dir.join("state");
        let audio_dir = callcycle_dir.join("audio");
        Self {
            root: root.clone(),
            callcycle_dir: callcycle_dir.clone(),
            state_dir: state_dir.clone(),
            audio_dir: audio_dir.clone(),
            config_path: callcycle_dir.join("config.toml"),
            script_path: state_dir.join("current_script.json"),
            agent_audio_path: audio_dir.join("agent_output.mp3"),
        }
    }

    /// Resolve a config-relative path against the project root.
    pub fn resolve(&self, path: &std::path::Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Options for `init_workspace`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite existing config and script state.
    pub force: bool,
}

/// Create `.callcycle/` with a default config and the initial script state.
///
/// Existing files are kept unless `force` is set. The script state is seeded
/// from the (possibly pre-existing) config's default variants.
pub fn init_workspace(root: impl Into<PathBuf>, options: &InitOptions) -> Result<CallcyclePaths> {
    let paths = CallcyclePaths::new(root);
    fs::create_dir_all(&paths.state_dir)
        .with_context(|| format!("create {}", paths.state_dir.display()))?;
    fs::create_dir_all(&paths.audio_dir)
        .with_context(|| format!("create {}", paths.audio_dir.display()))?;

    if options.force || !paths.config_path.exists() {
        write_config(&paths.config_path, &CallcycleConfig::default())?;
        info!(path = %paths.config_path.display(), "wrote default config");
    }
    let cfg = load_config(&paths.config_path)?;

    if options.force || !paths.script_path.exists() {
        let store = ScriptStore::new(&paths.script_path, cfg.scripts.clone());
        store.save(&ScriptState::from_defaults(&cfg.scripts))?;
        info!(path = %paths.script_path.display(), "wrote initial script state");
    }

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_config_and_default_script() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_workspace(temp.path(), &InitOptions { force: false }).expect("init");

        assert!(paths.config_path.exists());
        assert!(paths.audio_dir.is_dir());
        let cfg = load_config(&paths.config_path).expect("config");
        let state = ScriptStore::new(&paths.script_path, cfg.scripts.clone())
            .load()
            .expect("load");
        assert_eq!(state, ScriptState::from_defaults(&cfg.scripts));
    }

    #[test]
    fn init_without_force_keeps_existing_state() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_workspace(temp.path(), &InitOptions { force: false }).expect("init");
        fs::write(
            &paths.script_path,
            "{\"intro\":\"a\",\"benefits\":\"b\",\"cta\":\"c\"}\n",
        )
        .expect("write");

        init_workspace(temp.path(), &InitOptions { force: false }).expect("re-init");
        let contents = fs::read_to_string(&paths.script_path).expect("read");
        assert!(contents.contains("\"intro\":\"a\""));

        init_workspace(temp.path(), &InitOptions { force: true }).expect("force init");
        let contents = fs::read_to_string(&paths.script_path).expect("read");
        assert!(!contents.contains("\"intro\":\"a\""));
    }

    #[test]
    fn resolve_joins_relative_paths_onto_root() {
        let paths = CallcyclePaths::new("/srv/project");
        assert_eq!(
            paths.resolve(std::path::Path::new("example.mp3")),
            PathBuf::from("/srv/project/example.mp3")
        );
        assert_eq!(
            paths.resolve(std::path::Path::new("/tmp/reply.mp3")),
            PathBuf::from("/tmp/reply.mp3")
        );
    }
}
