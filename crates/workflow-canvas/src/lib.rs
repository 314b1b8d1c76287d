//! Workflow Canvas - headless node/connection graph editor core
//!
//! This crate holds everything behind a workflow builder canvas except the
//! pixels. It supports:
//!
//! - Pan, zoom, box selection, node drags and port-to-port connection drags
//! - Connection validation with output-to-input direction normalization
//! - Deterministic execution order inferred from trigger nodes
//! - Keyboard shortcuts, clipboard and compressed snapshot undo/redo
//! - A minimap projection and background grid phase for the renderer
//!
//! # Architecture
//!
//! The host feeds raw events in and paints snapshots out:
//!
//! - `CanvasInput` -> `GestureInterpreter` / `shortcut_for` -> `CanvasAction`
//! - `CanvasController::dispatch` applies actions to the `GraphStore` and
//!   `CanvasState`, emitting `CanvasEvent`s to an `EventSink`
//! - `CanvasController::snapshot` returns graph, state, execution order,
//!   connection preview and grid in one serializable value
//!
//! # Example
//!
//! ```
//! use workflow_canvas::{CanvasAction, CanvasConfig, CanvasController, WorkflowBuilder};
//!
//! let graph = WorkflowBuilder::new("wf-1", "Nightly report")
//!     .add_node("cron", "schedule-trigger", (0.0, 0.0))
//!     .add_node("fetch", "http-request", (300.0, 0.0))
//!     .connect("cron", "out", "fetch", "in")
//!     .build();
//!
//! let mut canvas = CanvasController::in_memory(graph, CanvasConfig::default()).unwrap();
//! canvas.dispatch(CanvasAction::SelectAll).unwrap();
//!
//! let snapshot = canvas.snapshot();
//! assert_eq!(snapshot.execution_order["fetch"], 2);
//! ```

pub mod builder;
pub mod config;
pub mod connection;
pub mod constants;
pub mod controller;
pub mod error;
pub mod events;
pub mod execution_order;
pub mod geometry;
pub mod gesture;
pub mod input;
pub mod keyboard;
pub mod minimap;
pub mod state;
pub mod store;
pub mod types;
pub mod undo;
pub mod viewport;

// Re-export key types
pub use builder::WorkflowBuilder;
pub use config::{CanvasConfig, ConfigError};
pub use connection::{try_connect, ConnectionPreview, ConnectionRejection};
pub use controller::{CanvasController, CanvasSnapshot};
pub use error::{CanvasError, Result};
pub use events::{CanvasEvent, EventSink, NullEventSink, VecEventSink};
pub use execution_order::{calculate_execution_order, ExecutionOrderMap, OrderNumbering};
pub use geometry::{Position, Rect, Size};
pub use input::{CanvasInput, DragPayload, Modifiers, PointerButton, PointerDown, PointerTarget};
pub use keyboard::{shortcut_for, Key, KeyEvent, Shortcut};
pub use state::{CanvasAction, CanvasState};
pub use store::{GraphStore, InMemoryGraphStore};
pub use types::{CanvasNode, Connection, PortRef, PortType, WorkflowGraph};
pub use viewport::{logical_to_screen, screen_to_logical, Viewport};
