//! Canvas controller
//!
//! Owns the graph store, the interaction state and the gesture session.
//! Every change goes through [`CanvasController::dispatch`]; raw input is
//! turned into actions by [`CanvasController::handle_input`] and then
//! dispatched the same way, so keyboard shortcuts, pointer gestures and host
//! calls all observe one consistent state.

use serde::{Deserialize, Serialize};

use crate::config::CanvasConfig;
use crate::connection::{validate_against_graph, ConnectionPreview};
use crate::error::{CanvasError, Result};
use crate::events::{CanvasEvent, EventSink, NullEventSink};
use crate::execution_order::{ExecutionOrderCache, ExecutionOrderMap, ExecutionOrderResolver};
use crate::geometry::{Position, Size};
use crate::gesture::{GestureInterpreter, GestureState};
use crate::input::CanvasInput;
use crate::keyboard::shortcut_for;
use crate::minimap::MinimapProjection;
use crate::state::{CanvasAction, CanvasState, SelectionBox};
use crate::store::{DeletedItems, GraphStore, InMemoryGraphStore};
use crate::types::{NodeId, PortRef, WorkflowGraph};
use crate::viewport::{GridPattern, Viewport};

/// Everything a renderer needs to paint one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasSnapshot {
    pub graph: WorkflowGraph,
    pub state: CanvasState,
    pub execution_order: ExecutionOrderMap,
    pub connection_preview: Option<ConnectionPreview>,
    pub grid: GridPattern,
}

pub struct CanvasController<S: GraphStore = InMemoryGraphStore> {
    store: S,
    state: CanvasState,
    gesture: GestureInterpreter,
    config: CanvasConfig,
    resolver: ExecutionOrderResolver,
    order_cache: ExecutionOrderCache,
    events: Box<dyn EventSink>,
}

impl CanvasController<InMemoryGraphStore> {
    /// Controller over an in-memory store seeded with `graph`
    pub fn in_memory(graph: WorkflowGraph, config: CanvasConfig) -> Result<Self> {
        let store = InMemoryGraphStore::new(graph, &config)?;
        Self::new(store, config)
    }
}

impl<S: GraphStore> CanvasController<S> {
    /// Controller over `store`; fails when `config` does not validate
    pub fn new(store: S, config: CanvasConfig) -> Result<Self> {
        config.validate()?;
        let resolver = ExecutionOrderResolver::new(config.trigger_types.iter().cloned(), config.ordering);
        let state = CanvasState::new(initial_viewport(&config), Size::new(0.0, 0.0));
        Ok(Self {
            store,
            state,
            gesture: GestureInterpreter::new(),
            config,
            resolver,
            order_cache: ExecutionOrderCache::new(),
            events: Box::new(NullEventSink),
        })
    }

    /// Replace the event sink
    pub fn with_event_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    pub fn graph(&self) -> &WorkflowGraph {
        self.store.graph()
    }

    pub fn state(&self) -> &CanvasState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn gesture_state(&self) -> &GestureState {
        self.gesture.state()
    }

    /// Execution order for the current graph, recomputed only after structural edits
    pub fn execution_order(&mut self) -> &ExecutionOrderMap {
        let graph = self.store.graph();
        self.order_cache.get_or_compute(
            self.store.structure_revision(),
            &self.resolver,
            &graph.nodes,
            &graph.connections,
        )
    }

    /// Line to draw while a connection drag is in progress
    pub fn connection_preview(&self) -> Option<ConnectionPreview> {
        let origin = self.state.connecting_from.clone()?;
        let from = self.gesture.connection_anchor().or(self.state.pointer)?;
        Some(ConnectionPreview {
            origin,
            from,
            to: self.state.pointer.unwrap_or(from),
        })
    }

    pub fn snapshot(&mut self) -> CanvasSnapshot {
        let execution_order = self.execution_order().clone();
        CanvasSnapshot {
            graph: self.store.graph().clone(),
            state: self.state.clone(),
            execution_order,
            connection_preview: self.connection_preview(),
            grid: self.state.viewport.grid(self.config.grid.size),
        }
    }

    pub fn minimap(&self) -> MinimapProjection {
        MinimapProjection::new(
            self.store.graph(),
            &self.state.viewport,
            self.state.viewport_size,
            &self.config.minimap,
        )
    }

    /// Centre the viewport on a point clicked or dragged in the minimap
    pub fn pan_to_minimap_point(&mut self, point: Position) -> Result<()> {
        let pan = self.minimap().pan_for_minimap_point(
            point,
            self.state.viewport.zoom,
            self.state.viewport_size,
        );
        self.dispatch(CanvasAction::SetPan { pan })
    }

    /// Interpret one raw input event and apply the resulting actions
    pub fn handle_input(&mut self, input: CanvasInput) -> Result<()> {
        let actions = match input {
            CanvasInput::PointerDown(down) => {
                // A down without a matching up; close the stale session first
                if !self.gesture.is_idle() {
                    let stale = self.gesture.abandon();
                    self.dispatch_all(stale)?;
                }
                self.gesture.pointer_down(&down, &self.state)
            }
            CanvasInput::PointerMove { screen } => self.gesture.pointer_move(screen, &self.state),
            CanvasInput::PointerUp => self.gesture.pointer_up(&self.state, self.store.graph()),
            CanvasInput::PointerLeave => self.gesture.pointer_leave(&self.state, self.store.graph()),
            CanvasInput::Wheel { delta_y } => self.gesture.wheel(delta_y, &self.state, &self.config.zoom),
            CanvasInput::Key(event) => match shortcut_for(&event) {
                Some(shortcut) => {
                    log::trace!("Key {:?} -> {:?}", event.key, shortcut);
                    shortcut.actions()
                }
                None => Vec::new(),
            },
            CanvasInput::HoverPort { port } => vec![CanvasAction::SetHoveredPort { port }],
            CanvasInput::HoverNode { node_id } => vec![CanvasAction::SetHoveredNode { id: node_id }],
            CanvasInput::Drop { screen, payload } => {
                self.gesture.drop_payload(screen, &payload, &self.state)
            }
            CanvasInput::Resize { size } => vec![CanvasAction::SetViewportSize { size }],
        };

        self.dispatch_all(actions)
    }

    /// Dispatch in order, stopping at the first error
    ///
    /// Session-closing markers after a failure still apply so the gesture
    /// never leaves the state half-open.
    fn dispatch_all(&mut self, actions: Vec<CanvasAction>) -> Result<()> {
        let mut failure = None;
        for action in actions {
            if failure.is_some() && !action.closes_session() {
                continue;
            }
            if let Err(e) = self.dispatch(action) {
                if failure.is_none() {
                    failure = Some(e);
                }
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Apply one action; the only path that mutates the graph or the state
    pub fn dispatch(&mut self, action: CanvasAction) -> Result<()> {
        match action {
            CanvasAction::AddNode {
                node_type,
                position,
            } => {
                let node = self.store.add_node(&node_type, position)?;
                self.emit(CanvasEvent::NodeAdded {
                    node_id: node.id,
                    node_type: node.node_type,
                });
            }
            CanvasAction::AddConnection {
                source_node_id,
                source_port_id,
                target_node_id,
                target_port_id,
            } => {
                let from = PortRef::output(source_node_id, source_port_id);
                let to = PortRef::input(target_node_id, target_port_id);
                self.connect(&from, &to)?;
            }
            CanvasAction::CompleteConnection { from, to } => {
                self.state.connecting_from = None;
                match self.connect(&from, &to) {
                    // A refused drag is a silent cancel
                    Err(CanvasError::InvalidConnection(_)) => {}
                    other => other?,
                }
            }
            CanvasAction::DeleteSelection => {
                if !self.state.has_selection() {
                    return Ok(());
                }
                let nodes: Vec<NodeId> = self.state.selected_node_ids.iter().cloned().collect();
                let connections: Vec<_> = self.state.selected_connection_ids.iter().cloned().collect();
                let deleted = self.store.delete_items(&nodes, &connections)?;
                self.after_delete(deleted);
            }
            CanvasAction::DeleteNode { id } => {
                let deleted = self.store.delete_nodes(std::slice::from_ref(&id))?;
                if deleted.nodes.is_empty() {
                    return Err(CanvasError::node_not_found(id));
                }
                self.after_delete(deleted);
            }
            CanvasAction::DeleteConnection { id } => {
                let connection = self.store.delete_connection(&id)?;
                self.prune_state();
                self.emit(CanvasEvent::ConnectionDeleted {
                    connection_id: connection.id,
                });
            }
            CanvasAction::UpdateNodePosition { id, position } => {
                self.store.update_node_position(&id, position)?;
            }
            CanvasAction::MoveNodes { ids, delta } => {
                for id in ids {
                    // Nodes deleted mid-drag are skipped
                    let Some(node) = self.store.graph().find_node(&id) else {
                        continue;
                    };
                    let position = node.position + delta;
                    self.store.update_node_position(&id, position)?;
                }
            }
            CanvasAction::CommitNodeMoves { ids } => {
                // Nodes deleted mid-drag have nothing left to commit
                let moved: Vec<(NodeId, Position)> = ids
                    .into_iter()
                    .filter_map(|id| {
                        let position = self.store.graph().find_node(&id)?.position;
                        Some((id, position))
                    })
                    .collect();
                if moved.is_empty() {
                    return Ok(());
                }
                self.store.checkpoint()?;
                for (node_id, position) in moved {
                    self.emit(CanvasEvent::NodeMoved { node_id, position });
                }
            }
            CanvasAction::Copy => {
                let ids = self.selected_nodes();
                if !ids.is_empty() {
                    self.store.copy_nodes(&ids);
                }
            }
            CanvasAction::Paste => {
                let ids = self.store.paste_nodes()?;
                if ids.is_empty() {
                    return Ok(());
                }
                for id in &ids {
                    if let Some(node) = self.store.graph().find_node(id) {
                        let event = CanvasEvent::NodeAdded {
                            node_id: node.id.clone(),
                            node_type: node.node_type.clone(),
                        };
                        self.emit(event);
                    }
                }
                self.update_selection(|state| {
                    state.selected_connection_ids.clear();
                    state.selected_node_ids = ids.into_iter().collect();
                });
            }
            CanvasAction::Cut => {
                let ids = self.selected_nodes();
                if ids.is_empty() {
                    return Ok(());
                }
                let deleted = self.store.cut_nodes(&ids)?;
                self.after_delete(deleted);
            }
            CanvasAction::Undo => {
                if self.store.undo()? {
                    self.after_history_restore();
                }
            }
            CanvasAction::Redo => {
                if self.store.redo()? {
                    self.after_history_restore();
                }
            }
            CanvasAction::LoadWorkflow { graph } => {
                let event = CanvasEvent::WorkflowLoaded {
                    workflow_id: graph.id.clone(),
                    node_count: graph.nodes.len(),
                    connection_count: graph.connections.len(),
                };
                self.store.load(graph)?;
                self.state = CanvasState::new(initial_viewport(&self.config), self.state.viewport_size);
                self.gesture.reset();
                self.order_cache.invalidate();
                log::info!("Loaded workflow into canvas");
                self.emit(event);
            }

            CanvasAction::SetZoom { zoom } => {
                self.update_viewport(|viewport, config, _| viewport.set_zoom(zoom, &config.zoom));
            }
            CanvasAction::SetPan { pan } => {
                self.update_viewport(|viewport, _, _| viewport.pan = pan);
            }
            CanvasAction::ZoomIn => {
                self.update_viewport(|viewport, config, _| viewport.zoom_in(&config.zoom));
            }
            CanvasAction::ZoomOut => {
                self.update_viewport(|viewport, config, _| viewport.zoom_out(&config.zoom));
            }
            CanvasAction::ResetView => {
                self.update_viewport(|viewport, config, _| viewport.reset(&config.zoom));
            }
            CanvasAction::FitToScreen => {
                let Some(bounds) = self.store.graph().bounds() else {
                    return Ok(());
                };
                self.update_viewport(|viewport, config, size| {
                    viewport.fit_to_bounds(bounds, size, config.fit.padding, &config.zoom)
                });
            }
            CanvasAction::SetViewportSize { size } => {
                self.state.viewport_size = size;
            }

            CanvasAction::SelectNode { id, additive } => {
                if !self.store.graph().contains_node(&id) {
                    log::debug!("Ignoring selection of unknown node {}", id);
                    return Ok(());
                }
                self.update_selection(|state| {
                    if !additive {
                        state.selected_node_ids.clear();
                        state.selected_connection_ids.clear();
                    }
                    state.selected_node_ids.insert(id);
                });
            }
            CanvasAction::SelectNodes { ids } => {
                let graph = self.store.graph();
                let ids: Vec<NodeId> = ids.into_iter().filter(|id| graph.contains_node(id)).collect();
                self.update_selection(|state| {
                    state.selected_connection_ids.clear();
                    state.selected_node_ids = ids.into_iter().collect();
                });
            }
            CanvasAction::SelectConnection { id, additive } => {
                if self.store.graph().find_connection(&id).is_none() {
                    log::debug!("Ignoring selection of unknown connection {}", id);
                    return Ok(());
                }
                self.update_selection(|state| {
                    if !additive {
                        state.selected_node_ids.clear();
                        state.selected_connection_ids.clear();
                    }
                    state.selected_connection_ids.insert(id);
                });
            }
            CanvasAction::SelectAll => {
                let ids: Vec<NodeId> = self.store.graph().nodes.iter().map(|n| n.id.clone()).collect();
                self.update_selection(|state| state.selected_node_ids = ids.into_iter().collect());
            }
            CanvasAction::DeselectAll => {
                self.update_selection(|state| {
                    state.selected_node_ids.clear();
                    state.selected_connection_ids.clear();
                });
            }
            CanvasAction::StartSelection { position } => {
                self.state.is_selecting = true;
                self.state.selection_box = Some(SelectionBox {
                    start: position,
                    end: position,
                });
            }
            CanvasAction::UpdateSelection { position } => {
                if let Some(selection) = &mut self.state.selection_box {
                    selection.end = position;
                }
            }
            CanvasAction::EndSelection => {
                self.state.is_selecting = false;
                self.state.selection_box = None;
            }

            CanvasAction::SetHoveredNode { id } => self.state.hovered_node_id = id,
            CanvasAction::SetHoveredPort { port } => self.state.hovered_port = port,
            CanvasAction::SetDragging { dragging } => self.state.is_dragging = dragging,
            CanvasAction::StartConnecting { origin } => self.state.connecting_from = Some(origin),
            CanvasAction::CancelConnecting => {
                self.state.connecting_from = None;
                self.gesture.cancel_connecting();
            }
            CanvasAction::TrackPointer { position } => self.state.pointer = Some(position),
        }
        Ok(())
    }

    fn connect(&mut self, from: &PortRef, to: &PortRef) -> Result<()> {
        let graph = self.store.graph();
        match validate_against_graph(from, to, graph, &self.config.connections) {
            Ok(request) => {
                let connection = self.store.add_connection(request)?;
                self.emit(CanvasEvent::ConnectionCreated {
                    connection_id: connection.id,
                });
                Ok(())
            }
            Err(reason) => {
                log::debug!("Connection {:?} -> {:?} rejected: {}", from, to, reason);
                self.emit(CanvasEvent::ConnectionRejected { reason });
                Err(reason.into())
            }
        }
    }

    fn selected_nodes(&self) -> Vec<NodeId> {
        self.state.selected_node_ids.iter().cloned().collect()
    }

    fn after_delete(&mut self, deleted: DeletedItems) {
        if deleted.is_empty() {
            return;
        }
        self.prune_state();
        self.emit(CanvasEvent::NodesDeleted {
            node_ids: deleted.nodes,
            connection_ids: deleted.connections,
        });
    }

    fn after_history_restore(&mut self) {
        self.prune_state();
        self.emit(CanvasEvent::HistoryRestored {
            can_undo: self.store.can_undo(),
            can_redo: self.store.can_redo(),
        });
    }

    /// Drop selection and hover references the graph no longer backs
    fn prune_state(&mut self) {
        if self.state.retain_existing(self.store.graph()) {
            self.emit_selection();
        }
        if self.state.connecting_from.is_none() {
            self.gesture.cancel_connecting();
        }
    }

    fn update_selection(&mut self, change: impl FnOnce(&mut CanvasState)) {
        let before = (
            self.state.selected_node_ids.clone(),
            self.state.selected_connection_ids.clone(),
        );
        change(&mut self.state);
        if before.0 != self.state.selected_node_ids || before.1 != self.state.selected_connection_ids {
            self.emit_selection();
        }
    }

    fn update_viewport(&mut self, change: impl FnOnce(&mut Viewport, &CanvasConfig, Size)) {
        let before = self.state.viewport;
        change(&mut self.state.viewport, &self.config, self.state.viewport_size);
        if self.state.viewport != before {
            self.emit(CanvasEvent::ViewportChanged {
                pan: self.state.viewport.pan,
                zoom: self.state.viewport.zoom,
            });
        }
    }

    fn emit_selection(&self) {
        self.emit(CanvasEvent::SelectionChanged {
            node_ids: self.state.selected_node_ids.iter().cloned().collect(),
            connection_ids: self.state.selected_connection_ids.iter().cloned().collect(),
        });
    }

    fn emit(&self, event: CanvasEvent) {
        if let Err(e) = self.events.send(event) {
            log::warn!("Failed to deliver canvas event: {}", e);
        }
    }
}

fn initial_viewport(config: &CanvasConfig) -> Viewport {
    Viewport::new(Position::ORIGIN, config.zoom.default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::builder::WorkflowBuilder;
    use crate::connection::ConnectionRejection;
    use crate::events::{EventError, VecEventSink};
    use crate::input::{DragPayload, Modifiers, PointerButton, PointerDown, PointerTarget};
    use crate::keyboard::KeyEvent;

    fn sample_graph() -> WorkflowGraph {
        WorkflowBuilder::new("wf", "Sample")
            .add_node("trigger", "manual-trigger", (0.0, 0.0))
            .add_node("a", "action", (300.0, 0.0))
            .add_node("b", "action", (600.0, 0.0))
            .connect("trigger", "out", "a", "in")
            .build()
    }

    fn controller(graph: WorkflowGraph) -> (CanvasController, Arc<VecEventSink>) {
        let sink = Arc::new(VecEventSink::new());
        let controller = CanvasController::in_memory(graph, CanvasConfig::default())
            .unwrap()
            .with_event_sink(Box::new(sink.clone()));
        (controller, sink)
    }

    fn pointer_down(x: f64, y: f64, target: PointerTarget, modifiers: Modifiers) -> CanvasInput {
        CanvasInput::PointerDown(PointerDown {
            screen: Position::new(x, y),
            button: PointerButton::Primary,
            modifiers,
            target,
        })
    }

    fn pointer_move(x: f64, y: f64) -> CanvasInput {
        CanvasInput::PointerMove {
            screen: Position::new(x, y),
        }
    }

    fn node_target(id: &str) -> PointerTarget {
        PointerTarget::Node {
            node_id: id.to_string(),
        }
    }

    #[test]
    fn test_pointer_leave_ends_panning() {
        let (mut canvas, _) = controller(sample_graph());

        canvas
            .handle_input(pointer_down(100.0, 100.0, PointerTarget::Background, Modifiers::alt()))
            .unwrap();
        canvas.handle_input(pointer_move(150.0, 120.0)).unwrap();
        assert_eq!(canvas.state().viewport.pan, Position::new(50.0, 20.0));

        canvas.handle_input(CanvasInput::PointerLeave).unwrap();
        assert_eq!(canvas.gesture_state(), &GestureState::Idle);

        canvas.handle_input(pointer_move(400.0, 400.0)).unwrap();
        assert_eq!(canvas.state().viewport.pan, Position::new(50.0, 20.0));
    }

    #[test]
    fn test_box_selection_through_input() {
        let graph = WorkflowBuilder::new("wf", "Boxes")
            .add_node("straddling", "action", (50.0, 50.0))
            .with_size(80.0, 80.0)
            .add_node("inside", "action", (10.0, 10.0))
            .with_size(50.0, 50.0)
            .build();
        let (mut canvas, _) = controller(graph);

        canvas
            .handle_input(pointer_down(0.0, 0.0, PointerTarget::Background, Modifiers::shift()))
            .unwrap();
        assert!(canvas.state().is_selecting);
        canvas.handle_input(pointer_move(100.0, 100.0)).unwrap();
        canvas.handle_input(CanvasInput::PointerUp).unwrap();

        let selected: Vec<_> = canvas.state().selected_node_ids.iter().cloned().collect();
        assert_eq!(selected, vec!["inside".to_string()]);
        assert!(!canvas.state().is_selecting);
        assert!(canvas.state().selection_box.is_none());
    }

    #[test]
    fn test_wheel_ticks_and_clamping() {
        let (mut canvas, _) = controller(sample_graph());

        canvas.handle_input(CanvasInput::Wheel { delta_y: 100.0 }).unwrap();
        assert_eq!(canvas.state().viewport.zoom, 1.0 - 0.05);

        canvas.dispatch(CanvasAction::SetZoom { zoom: 2.0 }).unwrap();
        canvas.handle_input(CanvasInput::Wheel { delta_y: -100.0 }).unwrap();
        assert_eq!(canvas.state().viewport.zoom, 2.0 + 0.05);

        canvas.dispatch(CanvasAction::SetZoom { zoom: 4.0 }).unwrap();
        canvas.handle_input(CanvasInput::Wheel { delta_y: -100.0 }).unwrap();
        assert_eq!(canvas.state().viewport.zoom, canvas.config().zoom.max);
    }

    #[test]
    fn test_connection_drag_from_input_port() {
        let (mut canvas, sink) = controller(sample_graph());

        canvas
            .handle_input(pointer_down(
                600.0,
                40.0,
                PointerTarget::Port {
                    port: PortRef::input("b", "in"),
                },
                Modifiers::NONE,
            ))
            .unwrap();
        canvas.handle_input(pointer_move(500.0, 40.0)).unwrap();

        let preview = canvas.connection_preview().unwrap();
        assert_eq!(preview.from, Position::new(600.0, 40.0));
        assert_eq!(preview.to, Position::new(500.0, 40.0));

        canvas
            .handle_input(CanvasInput::HoverPort {
                port: Some(PortRef::output("a", "out")),
            })
            .unwrap();
        canvas.handle_input(CanvasInput::PointerUp).unwrap();

        let created = canvas.graph().connections.last().unwrap();
        assert_eq!(created.source_node_id, "a");
        assert_eq!(created.target_node_id, "b");
        assert!(canvas.state().connecting_from.is_none());
        assert!(canvas.connection_preview().is_none());
        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(e, CanvasEvent::ConnectionCreated { .. })));
    }

    #[test]
    fn test_rejected_connection_is_silent() {
        let (mut canvas, sink) = controller(sample_graph());
        let before = canvas.graph().connections.len();

        canvas
            .handle_input(pointer_down(
                0.0,
                0.0,
                PointerTarget::Port {
                    port: PortRef::output("a", "out"),
                },
                Modifiers::NONE,
            ))
            .unwrap();
        canvas
            .handle_input(CanvasInput::HoverPort {
                port: Some(PortRef::input("a", "in")),
            })
            .unwrap();
        canvas.handle_input(CanvasInput::PointerUp).unwrap();

        assert_eq!(canvas.graph().connections.len(), before);
        assert!(canvas.state().connecting_from.is_none());
        assert!(sink.events().contains(&CanvasEvent::ConnectionRejected {
            reason: ConnectionRejection::SelfConnection
        }));
    }

    #[test]
    fn test_direct_add_connection_reports_rejection() {
        let (mut canvas, _) = controller(sample_graph());
        let result = canvas.dispatch(CanvasAction::AddConnection {
            source_node_id: "a".to_string(),
            source_port_id: "out".to_string(),
            target_node_id: "a".to_string(),
            target_port_id: "in".to_string(),
        });
        assert!(matches!(
            result,
            Err(CanvasError::InvalidConnection(ConnectionRejection::SelfConnection))
        ));
    }

    #[test]
    fn test_escape_clears_selection_and_connection() {
        let (mut canvas, _) = controller(sample_graph());
        canvas
            .dispatch(CanvasAction::SelectNode {
                id: "a".to_string(),
                additive: false,
            })
            .unwrap();
        canvas
            .handle_input(pointer_down(
                0.0,
                0.0,
                PointerTarget::Port {
                    port: PortRef::output("a", "out"),
                },
                Modifiers::NONE,
            ))
            .unwrap();

        canvas
            .handle_input(CanvasInput::Key(KeyEvent::plain("Escape")))
            .unwrap();

        assert!(!canvas.state().has_selection());
        assert!(canvas.state().connecting_from.is_none());
        assert_eq!(canvas.gesture_state(), &GestureState::Idle);
    }

    #[test]
    fn test_delete_with_empty_selection_is_noop() {
        let (mut canvas, sink) = controller(sample_graph());
        let revision = canvas.store().structure_revision();

        canvas
            .handle_input(CanvasInput::Key(KeyEvent::plain("Delete")))
            .unwrap();

        assert_eq!(canvas.graph().nodes.len(), 3);
        assert_eq!(canvas.store().structure_revision(), revision);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_delete_selection_cascades_and_prunes() {
        let (mut canvas, sink) = controller(sample_graph());
        canvas
            .dispatch(CanvasAction::SelectNode {
                id: "trigger".to_string(),
                additive: false,
            })
            .unwrap();

        canvas
            .handle_input(CanvasInput::Key(KeyEvent::plain("Backspace")))
            .unwrap();

        assert!(!canvas.graph().contains_node("trigger"));
        assert!(canvas.graph().connections.is_empty());
        assert!(canvas.state().selected_node_ids.is_empty());
        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(e, CanvasEvent::NodesDeleted { node_ids, .. } if node_ids == &vec!["trigger".to_string()])));
    }

    #[test]
    fn test_delete_connection_selection() {
        let (mut canvas, _) = controller(sample_graph());
        canvas
            .dispatch(CanvasAction::SelectConnection {
                id: "conn-1".to_string(),
                additive: false,
            })
            .unwrap();
        canvas.dispatch(CanvasAction::DeleteSelection).unwrap();

        assert!(canvas.graph().connections.is_empty());
        assert_eq!(canvas.graph().nodes.len(), 3);
        assert!(canvas.state().selected_connection_ids.is_empty());
    }

    #[test]
    fn test_undo_redo_restores_graph_and_prunes_selection() {
        let (mut canvas, _) = controller(sample_graph());
        canvas
            .handle_input(CanvasInput::Drop {
                screen: Position::new(50.0, 300.0),
                payload: DragPayload::node_type("delay"),
            })
            .unwrap();
        assert_eq!(canvas.graph().nodes.len(), 4);
        let dropped = canvas.graph().nodes[3].id.clone();
        canvas
            .dispatch(CanvasAction::SelectNode {
                id: dropped.clone(),
                additive: false,
            })
            .unwrap();

        canvas
            .handle_input(CanvasInput::Key(KeyEvent::command("z")))
            .unwrap();
        assert_eq!(canvas.graph().nodes.len(), 3);
        assert!(canvas.state().selected_node_ids.is_empty());

        canvas
            .handle_input(CanvasInput::Key(KeyEvent::command("y")))
            .unwrap();
        assert!(canvas.graph().contains_node(&dropped));
    }

    #[test]
    fn test_copy_paste_selects_new_nodes() {
        let (mut canvas, _) = controller(sample_graph());
        canvas
            .dispatch(CanvasAction::SelectNodes {
                ids: vec!["trigger".to_string(), "a".to_string()],
            })
            .unwrap();

        canvas.handle_input(CanvasInput::Key(KeyEvent::command("c"))).unwrap();
        canvas.handle_input(CanvasInput::Key(KeyEvent::command("v"))).unwrap();

        assert_eq!(canvas.graph().nodes.len(), 5);
        assert_eq!(canvas.graph().connections.len(), 2);
        assert_eq!(canvas.state().selected_node_ids.len(), 2);
        assert!(!canvas.state().selected_node_ids.contains("trigger"));
    }

    #[test]
    fn test_cut_removes_selection() {
        let (mut canvas, _) = controller(sample_graph());
        canvas
            .dispatch(CanvasAction::SelectNode {
                id: "b".to_string(),
                additive: false,
            })
            .unwrap();
        canvas.handle_input(CanvasInput::Key(KeyEvent::command("x"))).unwrap();

        assert!(!canvas.graph().contains_node("b"));
        assert!(canvas.state().selected_node_ids.is_empty());
    }

    #[test]
    fn test_drag_moves_node_and_is_one_undo_step() {
        let (mut canvas, sink) = controller(sample_graph());

        canvas
            .handle_input(pointer_down(310.0, 10.0, node_target("a"), Modifiers::NONE))
            .unwrap();
        assert!(canvas.state().is_dragging);
        canvas.handle_input(pointer_move(330.0, 20.0)).unwrap();
        canvas.handle_input(pointer_move(360.0, 30.0)).unwrap();
        canvas.handle_input(CanvasInput::PointerUp).unwrap();

        assert!(!canvas.state().is_dragging);
        assert_eq!(canvas.graph().find_node("a").unwrap().position, Position::new(350.0, 20.0));
        assert!(sink.events().contains(&CanvasEvent::NodeMoved {
            node_id: "a".to_string(),
            position: Position::new(350.0, 20.0),
        }));

        canvas.dispatch(CanvasAction::Undo).unwrap();
        assert_eq!(canvas.graph().find_node("a").unwrap().position, Position::new(300.0, 0.0));
    }

    #[test]
    fn test_delete_mid_drag_is_deterministic() {
        let (mut canvas, sink) = controller(sample_graph());

        canvas
            .handle_input(pointer_down(310.0, 10.0, node_target("a"), Modifiers::NONE))
            .unwrap();
        canvas
            .handle_input(CanvasInput::Key(KeyEvent::plain("Delete")))
            .unwrap();
        canvas.handle_input(pointer_move(400.0, 40.0)).unwrap();
        canvas.handle_input(CanvasInput::PointerUp).unwrap();

        assert!(!canvas.graph().contains_node("a"));
        assert_eq!(canvas.gesture_state(), &GestureState::Idle);
        assert!(!sink
            .events()
            .iter()
            .any(|e| matches!(e, CanvasEvent::NodeMoved { .. })));

        // The delete is the latest undo step, not an empty drag commit
        canvas.dispatch(CanvasAction::Undo).unwrap();
        assert!(canvas.graph().contains_node("a"));
    }

    #[test]
    fn test_pointer_down_closes_stale_session() {
        let (mut canvas, _) = controller(sample_graph());
        let port = PortRef::output("a", "out");

        canvas
            .handle_input(pointer_down(
                500.0,
                10.0,
                PointerTarget::Port { port: port.clone() },
                Modifiers::NONE,
            ))
            .unwrap();
        assert_eq!(canvas.state().connecting_from, Some(port));

        // Pointer-up lost; the next session starts on the background
        canvas
            .handle_input(pointer_down(50.0, 300.0, PointerTarget::Background, Modifiers::NONE))
            .unwrap();
        canvas.handle_input(CanvasInput::PointerUp).unwrap();
        assert!(canvas.state().connecting_from.is_none());
        assert!(canvas.connection_preview().is_none());
        assert_eq!(canvas.graph().connections.len(), 1);

        canvas
            .handle_input(pointer_down(50.0, 300.0, PointerTarget::Background, Modifiers::shift()))
            .unwrap();
        canvas.handle_input(pointer_move(700.0, 500.0)).unwrap();
        assert!(canvas.state().is_selecting);

        canvas
            .handle_input(pointer_down(310.0, 10.0, node_target("a"), Modifiers::NONE))
            .unwrap();
        canvas.handle_input(CanvasInput::PointerUp).unwrap();
        assert!(!canvas.state().is_selecting);
        assert!(canvas.state().selection_box.is_none());
        assert!(!canvas.state().is_dragging);
        assert_eq!(canvas.state().selected_node_ids.len(), 1);
    }

    #[test]
    fn test_stale_drag_is_committed_before_next_session() {
        let (mut canvas, _) = controller(sample_graph());

        canvas
            .handle_input(pointer_down(310.0, 10.0, node_target("a"), Modifiers::NONE))
            .unwrap();
        canvas.handle_input(pointer_move(330.0, 10.0)).unwrap();
        canvas
            .handle_input(pointer_down(50.0, 300.0, PointerTarget::Background, Modifiers::NONE))
            .unwrap();
        assert!(!canvas.state().is_dragging);

        canvas.dispatch(CanvasAction::Undo).unwrap();
        assert_eq!(canvas.graph().find_node("a").unwrap().position, Position::new(300.0, 0.0));
    }

    /// In-memory store whose undo checkpoints always fail
    struct BrokenHistoryStore(InMemoryGraphStore);

    impl GraphStore for BrokenHistoryStore {
        fn graph(&self) -> &WorkflowGraph {
            self.0.graph()
        }
        fn structure_revision(&self) -> u64 {
            self.0.structure_revision()
        }
        fn load(&mut self, graph: WorkflowGraph) -> Result<()> {
            self.0.load(graph)
        }
        fn add_node(&mut self, node_type: &str, position: Position) -> Result<crate::types::CanvasNode> {
            self.0.add_node(node_type, position)
        }
        fn add_connection(
            &mut self,
            request: crate::connection::ConnectionRequest,
        ) -> Result<crate::types::Connection> {
            self.0.add_connection(request)
        }
        fn delete_items(
            &mut self,
            nodes: &[NodeId],
            connections: &[crate::types::ConnectionId],
        ) -> Result<DeletedItems> {
            self.0.delete_items(nodes, connections)
        }
        fn update_node_position(&mut self, id: &str, position: Position) -> Result<()> {
            self.0.update_node_position(id, position)
        }
        fn copy_nodes(&mut self, ids: &[NodeId]) -> usize {
            self.0.copy_nodes(ids)
        }
        fn paste_nodes(&mut self) -> Result<Vec<NodeId>> {
            self.0.paste_nodes()
        }
        fn checkpoint(&mut self) -> Result<()> {
            Err(CanvasError::Compression("out of space".to_string()))
        }
        fn undo(&mut self) -> Result<bool> {
            self.0.undo()
        }
        fn redo(&mut self) -> Result<bool> {
            self.0.redo()
        }
        fn can_undo(&self) -> bool {
            self.0.can_undo()
        }
        fn can_redo(&self) -> bool {
            self.0.can_redo()
        }
    }

    #[test]
    fn test_failed_drag_commit_still_ends_drag() {
        let config = CanvasConfig::default();
        let store = BrokenHistoryStore(InMemoryGraphStore::new(sample_graph(), &config).unwrap());
        let mut canvas = CanvasController::new(store, config).unwrap();

        canvas
            .handle_input(pointer_down(310.0, 10.0, node_target("a"), Modifiers::NONE))
            .unwrap();
        canvas.handle_input(pointer_move(330.0, 10.0)).unwrap();

        let err = canvas.handle_input(CanvasInput::PointerUp).unwrap_err();
        assert!(matches!(err, CanvasError::Compression(_)));
        assert!(!canvas.state().is_dragging);
        assert_eq!(canvas.gesture_state(), &GestureState::Idle);
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let mut config = CanvasConfig::default();
        config.zoom.min = 3.0;
        config.zoom.max = 1.0;

        let result = CanvasController::in_memory(sample_graph(), config);
        assert!(matches!(result, Err(CanvasError::Config(_))));
    }

    #[test]
    fn test_drop_converts_to_logical_coordinates() {
        let (mut canvas, sink) = controller(WorkflowGraph::default());
        canvas
            .dispatch(CanvasAction::SetPan {
                pan: Position::new(100.0, 50.0),
            })
            .unwrap();
        canvas.dispatch(CanvasAction::SetZoom { zoom: 2.0 }).unwrap();

        canvas
            .handle_input(CanvasInput::Drop {
                screen: Position::new(300.0, 250.0),
                payload: DragPayload::node_type("send-email"),
            })
            .unwrap();

        let node = &canvas.graph().nodes[0];
        assert_eq!(node.node_type, "send-email");
        assert_eq!(node.position, Position::new(100.0, 100.0));
        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(e, CanvasEvent::NodeAdded { node_type, .. } if node_type == "send-email")));

        canvas
            .handle_input(CanvasInput::Drop {
                screen: Position::ORIGIN,
                payload: DragPayload::default(),
            })
            .unwrap();
        assert_eq!(canvas.graph().nodes.len(), 1);
    }

    #[test]
    fn test_load_workflow_resets_state() {
        let (mut canvas, sink) = controller(sample_graph());
        canvas.dispatch(CanvasAction::SetZoom { zoom: 2.5 }).unwrap();
        canvas.dispatch(CanvasAction::SelectAll).unwrap();

        let other = WorkflowBuilder::new("wf-2", "Other")
            .add_node("x", "webhook-trigger", (0.0, 0.0))
            .build();
        canvas.dispatch(CanvasAction::LoadWorkflow { graph: other }).unwrap();

        assert_eq!(canvas.state().viewport, Viewport::default());
        assert!(!canvas.state().has_selection());
        assert!(!canvas.store().can_undo());
        assert_eq!(canvas.execution_order().get("x"), Some(&1));
        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(e, CanvasEvent::WorkflowLoaded { workflow_id, .. } if workflow_id == "wf-2")));
    }

    #[test]
    fn test_snapshot_carries_execution_order() {
        let (mut canvas, _) = controller(sample_graph());
        let snapshot = canvas.snapshot();

        assert_eq!(snapshot.execution_order.get("trigger"), Some(&1));
        assert_eq!(snapshot.execution_order.get("b"), Some(&2));
        assert_eq!(snapshot.execution_order.get("a"), Some(&3));
        assert_eq!(snapshot.grid.cell_pitch, 20.0);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["executionOrder"]["trigger"], 1);
    }

    #[test]
    fn test_order_follows_structural_edits() {
        let (mut canvas, _) = controller(sample_graph());
        assert_eq!(canvas.execution_order().get("b"), Some(&2));

        canvas
            .dispatch(CanvasAction::AddConnection {
                source_node_id: "a".to_string(),
                source_port_id: "out".to_string(),
                target_node_id: "b".to_string(),
                target_port_id: "in".to_string(),
            })
            .unwrap();
        let order = canvas.execution_order();
        assert_eq!(order.get("a"), Some(&2));
        assert_eq!(order.get("b"), Some(&3));
    }

    #[test]
    fn test_fit_to_screen_and_keyboard_view_keys() {
        let (mut canvas, _) = controller(sample_graph());
        canvas
            .handle_input(CanvasInput::Resize {
                size: Size::new(1000.0, 400.0),
            })
            .unwrap();
        canvas.dispatch(CanvasAction::FitToScreen).unwrap();

        let bounds = canvas.graph().bounds().unwrap();
        let visible = canvas.state().viewport.visible_bounds(Size::new(1000.0, 400.0));
        assert!(visible.contains_rect(&bounds));

        canvas.handle_input(CanvasInput::Key(KeyEvent::plain("0"))).unwrap();
        assert_eq!(canvas.state().viewport, Viewport::default());

        canvas.handle_input(CanvasInput::Key(KeyEvent::plain("="))).unwrap();
        assert!((canvas.state().viewport.zoom - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_minimap_click_pans_viewport() {
        let (mut canvas, _) = controller(sample_graph());
        canvas
            .handle_input(CanvasInput::Resize {
                size: Size::new(800.0, 600.0),
            })
            .unwrap();

        let minimap = canvas.minimap();
        assert_eq!(minimap.nodes.len(), 3);

        let target = Position::new(700.0, 40.0);
        canvas.pan_to_minimap_point(minimap.project(target)).unwrap();
        let centre = canvas
            .state()
            .viewport
            .screen_to_logical(Position::new(400.0, 300.0));
        assert!((centre.x - target.x).abs() < 1e-9);
        assert!((centre.y - target.y).abs() < 1e-9);
    }

    struct FailingSink;

    impl EventSink for FailingSink {
        fn send(&self, _event: CanvasEvent) -> std::result::Result<(), EventError> {
            Err(EventError::channel_closed())
        }
    }

    #[test]
    fn test_failing_sink_does_not_abort_actions() {
        let mut canvas = CanvasController::in_memory(sample_graph(), CanvasConfig::default())
            .unwrap()
            .with_event_sink(Box::new(FailingSink));
        canvas
            .dispatch(CanvasAction::AddNode {
                node_type: "delay".to_string(),
                position: Position::ORIGIN,
            })
            .unwrap();
        assert_eq!(canvas.graph().nodes.len(), 4);
    }
}
