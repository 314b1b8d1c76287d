//! Canvas UI state and the actions that mutate it
//!
//! `CanvasState` is the per-workflow interaction state: viewport, selection,
//! hover, and the transient gesture markers the renderer needs. It is
//! re-created whenever a different workflow is loaded.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::geometry::{Position, Rect, Size};
use crate::types::{ConnectionId, NodeId, PortRef, WorkflowGraph};
use crate::viewport::Viewport;

/// Live rubber-band rectangle, in logical coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionBox {
    pub start: Position,
    pub end: Position,
}

impl SelectionBox {
    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.start, self.end)
    }
}

/// Interaction state for one open workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasState {
    pub viewport: Viewport,
    /// Size of the canvas element in screen pixels
    pub viewport_size: Size,
    pub selected_node_ids: BTreeSet<NodeId>,
    pub selected_connection_ids: BTreeSet<ConnectionId>,
    pub hovered_node_id: Option<NodeId>,
    pub hovered_port: Option<PortRef>,
    /// Port a connection drag started from
    pub connecting_from: Option<PortRef>,
    pub is_selecting: bool,
    pub selection_box: Option<SelectionBox>,
    pub is_dragging: bool,
    /// Last known pointer position, logical
    pub pointer: Option<Position>,
}

impl CanvasState {
    pub fn new(viewport: Viewport, viewport_size: Size) -> Self {
        Self {
            viewport,
            viewport_size,
            selected_node_ids: BTreeSet::new(),
            selected_connection_ids: BTreeSet::new(),
            hovered_node_id: None,
            hovered_port: None,
            connecting_from: None,
            is_selecting: false,
            selection_box: None,
            is_dragging: false,
            pointer: None,
        }
    }

    pub fn has_selection(&self) -> bool {
        !self.selected_node_ids.is_empty() || !self.selected_connection_ids.is_empty()
    }

    /// Drop every reference to nodes or connections missing from `graph`
    ///
    /// Returns true when the selection changed.
    pub fn retain_existing(&mut self, graph: &WorkflowGraph) -> bool {
        let before = (
            self.selected_node_ids.len(),
            self.selected_connection_ids.len(),
        );
        self.selected_node_ids.retain(|id| graph.contains_node(id));
        self.selected_connection_ids
            .retain(|id| graph.find_connection(id).is_some());

        if let Some(hovered) = &self.hovered_node_id {
            if !graph.contains_node(hovered) {
                self.hovered_node_id = None;
            }
        }
        if let Some(port) = &self.hovered_port {
            if !graph.contains_node(&port.node_id) {
                self.hovered_port = None;
            }
        }
        if let Some(origin) = &self.connecting_from {
            if !graph.contains_node(&origin.node_id) {
                self.connecting_from = None;
            }
        }

        before
            != (
                self.selected_node_ids.len(),
                self.selected_connection_ids.len(),
            )
    }
}

/// Every state and graph mutation the canvas performs
///
/// The controller's `dispatch` is the only place these are applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CanvasAction {
    // Graph
    #[serde(rename_all = "camelCase")]
    AddNode { node_type: String, position: Position },
    #[serde(rename_all = "camelCase")]
    AddConnection {
        source_node_id: NodeId,
        source_port_id: String,
        target_node_id: NodeId,
        target_port_id: String,
    },
    /// Validate a port-to-port drag and commit it if legal
    CompleteConnection { from: PortRef, to: PortRef },
    /// Delete selected nodes (cascading) and selected connections
    DeleteSelection,
    DeleteNode { id: NodeId },
    DeleteConnection { id: ConnectionId },
    UpdateNodePosition { id: NodeId, position: Position },
    /// Translate nodes by a logical offset
    MoveNodes { ids: Vec<NodeId>, delta: Position },
    /// Close a node drag that moved something (one undo step)
    CommitNodeMoves { ids: Vec<NodeId> },
    Copy,
    Paste,
    Cut,
    Undo,
    Redo,
    LoadWorkflow { graph: WorkflowGraph },

    // Viewport
    SetZoom { zoom: f64 },
    SetPan { pan: Position },
    ZoomIn,
    ZoomOut,
    ResetView,
    FitToScreen,
    SetViewportSize { size: Size },

    // Selection
    SelectNode { id: NodeId, additive: bool },
    SelectNodes { ids: Vec<NodeId> },
    SelectConnection { id: ConnectionId, additive: bool },
    SelectAll,
    DeselectAll,
    StartSelection { position: Position },
    UpdateSelection { position: Position },
    EndSelection,

    // Transient interaction markers
    SetHoveredNode { id: Option<NodeId> },
    SetHoveredPort { port: Option<PortRef> },
    SetDragging { dragging: bool },
    StartConnecting { origin: PortRef },
    CancelConnecting,
    TrackPointer { position: Position },
}

impl CanvasAction {
    /// Markers that end a pointer session and must apply even after a failure
    pub fn closes_session(&self) -> bool {
        matches!(
            self,
            Self::SetDragging { dragging: false } | Self::EndSelection | Self::CancelConnecting
        )
    }
}
