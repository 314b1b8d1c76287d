//! canvas-replay: run a scripted sequence of canvas inputs against a workflow
//!
//! Loads a workflow graph from JSON, feeds it the pointer, wheel, keyboard
//! and drop events from a script (plus any direct actions), and prints the
//! final canvas snapshot, including the execution order, as JSON.

mod replay;

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use workflow_canvas::{CanvasConfig, Size};

use crate::replay::{load_script, load_workflow, parse_viewport_size, replay, ReplayError};

/// Replay canvas input against a workflow and print the resulting snapshot
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the workflow graph JSON file
    workflow: PathBuf,

    /// Path to a JSON array of inputs and actions to replay
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Path to the canvas configuration JSON file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Canvas element size in pixels, as WIDTHxHEIGHT
    #[arg(long, default_value = "1280x720", value_parser = parse_size)]
    viewport: Size,

    /// Include the emitted canvas events in the output
    #[arg(long)]
    events: bool,

    /// Print compact JSON instead of pretty-printed
    #[arg(long)]
    compact: bool,
}

fn parse_size(value: &str) -> Result<Size, String> {
    parse_viewport_size(value).map_err(|e| e.to_string())
}

fn run(cli: Cli) -> Result<(), ReplayError> {
    let config = match &cli.config {
        Some(path) => CanvasConfig::load(path)?,
        None => CanvasConfig::default(),
    };
    let graph = load_workflow(&cli.workflow)?;
    let steps = match &cli.script {
        Some(path) => load_script(path)?,
        None => Vec::new(),
    };

    let report = replay(graph, config, cli.viewport, steps, cli.events)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let written = if cli.compact {
        serde_json::to_writer(&mut out, &report)
    } else {
        serde_json::to_writer_pretty(&mut out, &report)
    };
    written.map_err(|e| ReplayError::Canvas(e.into()))?;
    writeln!(out).map_err(|e| ReplayError::Canvas(e.into()))?;
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    log::debug!("Arguments: {:?}", cli);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
