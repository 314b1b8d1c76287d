//! Notifications emitted by the canvas controller
//!
//! Hosts subscribe through an [`EventSink`] to persist edits, refresh side
//! panels, or surface rejected connections. Delivery is best effort: a
//! failing sink is logged and never interrupts a gesture.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::connection::ConnectionRejection;
use crate::geometry::Position;
use crate::types::{ConnectionId, NodeId};

/// Receiver for canvas events
pub trait EventSink: Send + Sync {
    fn send(&self, event: CanvasEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone, thiserror::Error)]
#[error("Event error: {message}")]
pub struct EventError {
    pub message: String,
}

impl EventError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn channel_closed() -> Self {
        Self::new("Channel closed")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CanvasEvent {
    #[serde(rename_all = "camelCase")]
    WorkflowLoaded {
        workflow_id: String,
        node_count: usize,
        connection_count: usize,
    },

    #[serde(rename_all = "camelCase")]
    NodeAdded { node_id: NodeId, node_type: String },

    #[serde(rename_all = "camelCase")]
    NodesDeleted {
        node_ids: Vec<NodeId>,
        connection_ids: Vec<ConnectionId>,
    },

    /// Emitted once per node when a drag ends
    #[serde(rename_all = "camelCase")]
    NodeMoved { node_id: NodeId, position: Position },

    #[serde(rename_all = "camelCase")]
    ConnectionCreated { connection_id: ConnectionId },

    ConnectionRejected { reason: ConnectionRejection },

    #[serde(rename_all = "camelCase")]
    ConnectionDeleted { connection_id: ConnectionId },

    #[serde(rename_all = "camelCase")]
    SelectionChanged {
        node_ids: Vec<NodeId>,
        connection_ids: Vec<ConnectionId>,
    },

    ViewportChanged { pan: Position, zoom: f64 },

    /// Undo or redo replaced the graph
    #[serde(rename_all = "camelCase")]
    HistoryRestored { can_undo: bool, can_redo: bool },
}

/// Discards every event
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: CanvasEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// Collects events in memory, mostly for tests and replay
#[derive(Default)]
pub struct VecEventSink {
    events: Mutex<Vec<CanvasEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CanvasEvent> {
        self.events.lock().clone()
    }

    /// Remove and return everything collected so far
    pub fn drain(&self) -> Vec<CanvasEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: CanvasEvent) -> Result<(), EventError> {
        self.events.lock().push(event);
        Ok(())
    }
}

impl<T: EventSink + ?Sized> EventSink for std::sync::Arc<T> {
    fn send(&self, event: CanvasEvent) -> Result<(), EventError> {
        (**self).send(event)
    }
}
