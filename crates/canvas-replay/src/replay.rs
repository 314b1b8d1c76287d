//! Script loading and replay against a canvas controller

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use workflow_canvas::minimap::MinimapProjection;
use workflow_canvas::{
    CanvasAction, CanvasConfig, CanvasController, CanvasError, CanvasEvent, CanvasInput,
    CanvasSnapshot, ConfigError, Size, VecEventSink, WorkflowGraph,
};

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Canvas error: {0}")]
    Canvas(#[from] CanvasError),

    #[error("Step {index} failed: {source}")]
    Step { index: usize, source: CanvasError },

    #[error("Invalid viewport size '{0}', expected WIDTHxHEIGHT")]
    ViewportSize(String),
}

/// One scripted step: a raw input event or a direct action
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptStep {
    Input(CanvasInput),
    Action(CanvasAction),
}

/// Result of a replay run
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub snapshot: CanvasSnapshot,
    pub minimap: MinimapProjection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<CanvasEvent>>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ReplayError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ReplayError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ReplayError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_workflow(path: &Path) -> Result<WorkflowGraph, ReplayError> {
    let graph: WorkflowGraph = read_json(path)?;
    log::info!(
        "Loaded workflow '{}' ({} nodes, {} connections)",
        graph.name,
        graph.nodes.len(),
        graph.connections.len()
    );
    Ok(graph)
}

pub fn load_script(path: &Path) -> Result<Vec<ScriptStep>, ReplayError> {
    let steps: Vec<ScriptStep> = read_json(path)?;
    log::info!("Loaded {} script step(s) from {:?}", steps.len(), path);
    Ok(steps)
}

/// Parse `WIDTHxHEIGHT`, e.g. `1280x720`
pub fn parse_viewport_size(value: &str) -> Result<Size, ReplayError> {
    let invalid = || ReplayError::ViewportSize(value.to_string());
    let (width, height) = value.split_once(['x', 'X']).ok_or_else(invalid)?;
    let width: f64 = width.trim().parse().map_err(|_| invalid())?;
    let height: f64 = height.trim().parse().map_err(|_| invalid())?;
    if !(width > 0.0 && height > 0.0) {
        return Err(invalid());
    }
    Ok(Size::new(width, height))
}

/// Replay `steps` against `graph` and report the final canvas
pub fn replay(
    graph: WorkflowGraph,
    config: CanvasConfig,
    viewport_size: Size,
    steps: Vec<ScriptStep>,
    collect_events: bool,
) -> Result<ReplayReport, ReplayError> {
    let sink = Arc::new(VecEventSink::new());
    let mut canvas = CanvasController::in_memory(graph, config)?.with_event_sink(Box::new(sink.clone()));
    canvas.handle_input(CanvasInput::Resize {
        size: viewport_size,
    })?;

    for (index, step) in steps.into_iter().enumerate() {
        log::debug!("Step {}: {:?}", index, step);
        let result = match step {
            ScriptStep::Input(input) => canvas.handle_input(input),
            ScriptStep::Action(action) => canvas.dispatch(action),
        };
        result.map_err(|source| ReplayError::Step { index, source })?;
    }

    let snapshot = canvas.snapshot();
    let minimap = canvas.minimap();
    let events = sink.drain();
    log::info!("Replay finished with {} event(s)", events.len());

    Ok(ReplayReport {
        snapshot,
        minimap,
        events: collect_events.then_some(events),
    })
}
