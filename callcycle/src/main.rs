//! Outbound-call simulation loop.
//!
//! Keeps the call script in `.callcycle/state/current_script.json` and
//! rewrites it after every simulated call based on the analyzed transcript.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use callcycle::core::adapt::{AdaptationEngine, RuleEvaluation};
use callcycle::core::types::{InsightRecord, ScriptState};
use callcycle::cycle::{Adapters, CycleError, run_cycle};
use callcycle::exit_codes;
use callcycle::io::config::load_config;
use callcycle::io::init::{CallcyclePaths, InitOptions, init_workspace};
use callcycle::io::script_store::ScriptStore;
use callcycle::logging;

#[derive(Parser)]
#[command(
    name = "callcycle",
    version,
    about = "Iterative outbound-call script simulation"
)]
struct Cli {
    /// Project directory (contains .callcycle/).
    #[arg(long, global = true, default_value = ".")]
    project_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create `.callcycle/config.toml` and the initial script state if missing.
    Init {
        /// Overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },
    /// Print the current script state as JSON.
    Show,
    /// Apply an insight record to the current script without saving.
    Adapt {
        /// JSON file holding an insight record.
        #[arg(long)]
        insight: PathBuf,
    },
    /// Run one synthesize → transcribe → analyze → adapt cycle.
    Cycle,
}

#[derive(Serialize)]
struct AdaptReport {
    rules: Vec<RuleEvaluation>,
    next_script: ScriptState,
}

fn main() {
    logging::init("warn");
    let cli = Cli::parse();
    let code = match run(&cli) {
        Ok(()) => exit_codes::OK,
        Err(err) => {
            eprintln!("{:#}", err);
            if err.downcast_ref::<CycleError>().is_some() {
                exit_codes::CYCLE_FAILED
            } else {
                exit_codes::INVALID
            }
        }
    };
    std::process::exit(code);
}

fn run(cli: &Cli) -> Result<()> {
    let root = cli.project_dir.as_path();
    match &cli.command {
        Command::Init { force } => cmd_init(root, *force),
        Command::Show => cmd_show(root),
        Command::Adapt { insight } => cmd_adapt(root, insight),
        Command::Cycle => cmd_cycle(root),
    }
}

fn cmd_init(root: &Path, force: bool) -> Result<()> {
    let paths = init_workspace(root, &InitOptions { force })?;
    println!("{}", paths.callcycle_dir.display());
    Ok(())
}

fn cmd_show(root: &Path) -> Result<()> {
    let state = load_store(root)?.load()?;
    print_json(&state)
}

fn cmd_adapt(root: &Path, insight_path: &Path) -> Result<()> {
    let raw = fs::read_to_string(insight_path)
        .with_context(|| format!("read insight {}", insight_path.display()))?;
    let insight: InsightRecord = serde_json::from_str(&raw)
        .with_context(|| format!("parse insight {}", insight_path.display()))?;

    let paths = CallcyclePaths::new(root);
    let cfg = load_config(&paths.config_path)?;
    let current = ScriptStore::new(&paths.script_path, cfg.scripts.clone()).load()?;
    let adaptation = AdaptationEngine::new(cfg.scripts).adapt(&current, &insight);
    print_json(&AdaptReport {
        rules: adaptation.evaluations,
        next_script: adaptation.next,
    })
}

fn cmd_cycle(root: &Path) -> Result<()> {
    let paths = CallcyclePaths::new(root);
    let cfg = load_config(&paths.config_path)?;
    let adapters = Adapters::from_config(&cfg);
    let outcome = run_cycle(root, &cfg, &adapters)?;
    print_json(&outcome)
}

fn load_store(root: &Path) -> Result<ScriptStore> {
    let paths = CallcyclePaths::new(root);
    let cfg = load_config(&paths.config_path)?;
    Ok(ScriptStore::new(paths.script_path, cfg.scripts))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{payload}");
    Ok(())
}
