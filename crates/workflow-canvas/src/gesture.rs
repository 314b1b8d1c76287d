//! Pointer gesture state machine
//!
//! One pointer session runs from pointer-down to pointer-up (or
//! pointer-leave, which ends it the same way). The interpreter never touches
//! the graph or the canvas state directly; it reads them and returns the
//! actions the controller should dispatch.
//!
//! ```text
//! Idle -> Panning | BoxSelecting | Dragging | ConnectingFromPort -> Idle
//! ```

use std::collections::BTreeSet;

use crate::config::ZoomConfig;
use crate::geometry::{Position, Rect};
use crate::input::{DragPayload, PointerButton, PointerDown, PointerTarget};
use crate::state::{CanvasAction, CanvasState};
use crate::types::{NodeId, PortRef, WorkflowGraph};

/// Current phase of the pointer session
#[derive(Debug, Clone, Default, PartialEq)]
pub enum GestureState {
    #[default]
    Idle,
    /// Background drag moving the viewport
    Panning {
        /// Pointer minus pan at pointer-down, screen pixels
        start_offset: Position,
    },
    /// Shift-drag on the background drawing a selection rectangle
    BoxSelecting,
    /// Node body drag
    Dragging {
        node_id: NodeId,
        /// Logical pointer position at the last applied move
        last: Position,
        /// Nodes moved so far in this drag
        moved: BTreeSet<NodeId>,
    },
    /// Drag that started on a port handle
    ConnectingFromPort {
        origin: PortRef,
        /// Logical pointer position at pointer-down
        anchor: Position,
    },
}

#[derive(Debug, Default)]
pub struct GestureInterpreter {
    state: GestureState,
}

impl GestureInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == GestureState::Idle
    }

    /// Where the connection preview line starts, while connecting
    pub fn connection_anchor(&self) -> Option<Position> {
        match &self.state {
            GestureState::ConnectingFromPort { anchor, .. } => Some(*anchor),
            _ => None,
        }
    }

    /// Forget any gesture in progress without emitting actions
    pub fn reset(&mut self) {
        self.state = GestureState::Idle;
    }

    /// Abandon a connection drag (Escape); other gestures continue
    pub fn cancel_connecting(&mut self) {
        if matches!(self.state, GestureState::ConnectingFromPort { .. }) {
            self.state = GestureState::Idle;
        }
    }

    pub fn pointer_down(&mut self, down: &PointerDown, canvas: &CanvasState) -> Vec<CanvasAction> {
        let logical = canvas.viewport.screen_to_logical(down.screen);
        let primary = down.button == PointerButton::Primary;

        // Callers close a stale session with `abandon` before this
        if !self.is_idle() {
            self.reset();
        }

        match &down.target {
            PointerTarget::Background => {
                if down.button == PointerButton::Middle || (primary && down.modifiers.alt) {
                    self.state = GestureState::Panning {
                        start_offset: down.screen - canvas.viewport.pan,
                    };
                    Vec::new()
                } else if primary && down.modifiers.shift {
                    self.state = GestureState::BoxSelecting;
                    vec![CanvasAction::StartSelection { position: logical }]
                } else if primary {
                    vec![CanvasAction::DeselectAll]
                } else {
                    Vec::new()
                }
            }
            PointerTarget::Port { port } if primary => {
                self.state = GestureState::ConnectingFromPort {
                    origin: port.clone(),
                    anchor: logical,
                };
                vec![
                    CanvasAction::StartConnecting {
                        origin: port.clone(),
                    },
                    CanvasAction::TrackPointer { position: logical },
                ]
            }
            PointerTarget::Node { node_id } if primary => {
                self.state = GestureState::Dragging {
                    node_id: node_id.clone(),
                    last: logical,
                    moved: BTreeSet::new(),
                };

                let mut actions = Vec::new();
                let additive = down.modifiers.shift;
                if additive || !canvas.selected_node_ids.contains(node_id) {
                    actions.push(CanvasAction::SelectNode {
                        id: node_id.clone(),
                        additive,
                    });
                }
                actions.push(CanvasAction::SetDragging { dragging: true });
                actions
            }
            PointerTarget::Port { .. } | PointerTarget::Node { .. } => Vec::new(),
        }
    }

    pub fn pointer_move(&mut self, screen: Position, canvas: &CanvasState) -> Vec<CanvasAction> {
        let logical = canvas.viewport.screen_to_logical(screen);
        let mut actions = vec![CanvasAction::TrackPointer { position: logical }];

        match &mut self.state {
            GestureState::Idle | GestureState::ConnectingFromPort { .. } => {}
            GestureState::Panning { start_offset } => {
                actions.push(CanvasAction::SetPan {
                    pan: screen - *start_offset,
                });
            }
            GestureState::BoxSelecting => {
                actions.push(CanvasAction::UpdateSelection { position: logical });
            }
            GestureState::Dragging {
                node_id,
                last,
                moved,
            } => {
                let delta = logical - *last;
                if delta != Position::ORIGIN {
                    let mut ids: BTreeSet<NodeId> = canvas.selected_node_ids.clone();
                    ids.insert(node_id.clone());
                    moved.extend(ids.iter().cloned());
                    *last = logical;
                    actions.push(CanvasAction::MoveNodes {
                        ids: ids.into_iter().collect(),
                        delta,
                    });
                }
            }
        }

        actions
    }

    /// End the pointer session
    pub fn pointer_up(&mut self, canvas: &CanvasState, graph: &WorkflowGraph) -> Vec<CanvasAction> {
        let mut actions = Vec::new();

        match std::mem::take(&mut self.state) {
            GestureState::Idle | GestureState::Panning { .. } => {}
            GestureState::BoxSelecting => {
                let ids = match &canvas.selection_box {
                    Some(selection) => enclosed_nodes(graph, &selection.rect()),
                    None => Vec::new(),
                };
                actions.push(CanvasAction::SelectNodes { ids });
                actions.push(CanvasAction::EndSelection);
            }
            GestureState::Dragging { moved, .. } => {
                if !moved.is_empty() {
                    actions.push(CanvasAction::CommitNodeMoves {
                        ids: moved.into_iter().collect(),
                    });
                }
            }
            GestureState::ConnectingFromPort { origin, .. } => match &canvas.hovered_port {
                Some(port) => actions.push(CanvasAction::CompleteConnection {
                    from: origin,
                    to: port.clone(),
                }),
                None => actions.push(CanvasAction::CancelConnecting),
            },
        }

        actions.push(CanvasAction::SetDragging { dragging: false });
        actions
    }

    /// Close a session whose pointer-up never arrived
    ///
    /// Moves made so far are committed; a half-drawn selection box or
    /// connection is dropped without selecting or connecting anything.
    pub fn abandon(&mut self) -> Vec<CanvasAction> {
        let stale = std::mem::take(&mut self.state);
        log::debug!("Abandoning stale gesture {:?}", stale);

        let mut actions = Vec::new();
        match stale {
            GestureState::Idle | GestureState::Panning { .. } => {}
            GestureState::BoxSelecting => actions.push(CanvasAction::EndSelection),
            GestureState::Dragging { moved, .. } => {
                if !moved.is_empty() {
                    actions.push(CanvasAction::CommitNodeMoves {
                        ids: moved.into_iter().collect(),
                    });
                }
            }
            GestureState::ConnectingFromPort { .. } => actions.push(CanvasAction::CancelConnecting),
        }
        actions.push(CanvasAction::SetDragging { dragging: false });
        actions
    }

    /// Pointer left the canvas element
    pub fn pointer_leave(&mut self, canvas: &CanvasState, graph: &WorkflowGraph) -> Vec<CanvasAction> {
        self.pointer_up(canvas, graph)
    }

    /// One wheel tick: down zooms out, up zooms in, by exactly one step
    ///
    /// The result is not clamped here; the viewport clamps on dispatch.
    pub fn wheel(&self, delta_y: f64, canvas: &CanvasState, zoom: &ZoomConfig) -> Vec<CanvasAction> {
        if delta_y == 0.0 || delta_y.is_nan() {
            return Vec::new();
        }
        let step = if delta_y > 0.0 { -zoom.step } else { zoom.step };
        vec![CanvasAction::SetZoom {
            zoom: canvas.viewport.zoom + step,
        }]
    }

    /// Palette drop: add a node of the carried type under the pointer
    pub fn drop_payload(
        &self,
        screen: Position,
        payload: &DragPayload,
        canvas: &CanvasState,
    ) -> Vec<CanvasAction> {
        match payload.node_type_tag() {
            Some(node_type) => vec![CanvasAction::AddNode {
                node_type: node_type.to_string(),
                position: canvas.viewport.screen_to_logical(screen),
            }],
            None => {
                log::debug!("Drop without a node type tag ignored");
                Vec::new()
            }
        }
    }
}

/// Nodes whose full bounding box lies inside `rect`
pub fn enclosed_nodes(graph: &WorkflowGraph, rect: &Rect) -> Vec<NodeId> {
    graph
        .nodes
        .iter()
        .filter(|node| rect.contains_rect(&node.bounds()))
        .map(|node| node.id.clone())
        .collect()
}
