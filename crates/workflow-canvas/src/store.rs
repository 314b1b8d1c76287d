//! Graph store
//!
//! The canvas never edits a `WorkflowGraph` in place; it goes through a
//! [`GraphStore`]. Hosts with their own document model implement the trait,
//! everyone else uses [`InMemoryGraphStore`].

use std::collections::HashMap;

use crate::config::CanvasConfig;
use crate::connection::{ConnectionRejection, ConnectionRequest};
use crate::error::{CanvasError, Result};
use crate::geometry::Position;
use crate::types::{CanvasNode, Connection, ConnectionId, NodeId, WorkflowGraph};
use crate::undo::UndoStack;

/// What a delete actually removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletedItems {
    pub nodes: Vec<NodeId>,
    /// Explicitly deleted connections plus those cascaded from deleted nodes
    pub connections: Vec<ConnectionId>,
}

impl DeletedItems {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.connections.is_empty()
    }
}

/// Owner of the graph the canvas edits
///
/// Structural edits (anything changing the node or connection set) bump
/// `structure_revision` and record an undo step. Position updates do
/// neither; callers close a drag with `checkpoint`.
pub trait GraphStore {
    fn graph(&self) -> &WorkflowGraph;

    /// Counter that changes whenever the node or connection set changes
    fn structure_revision(&self) -> u64;

    /// Replace the graph and forget all history
    fn load(&mut self, graph: WorkflowGraph) -> Result<()>;

    fn add_node(&mut self, node_type: &str, position: Position) -> Result<CanvasNode>;

    /// Append an already-validated connection
    fn add_connection(&mut self, request: ConnectionRequest) -> Result<Connection>;

    /// Delete nodes (with their connections) and connections as one edit
    ///
    /// Unknown ids are skipped. Nothing is recorded when nothing matched.
    fn delete_items(&mut self, nodes: &[NodeId], connections: &[ConnectionId]) -> Result<DeletedItems>;

    fn delete_nodes(&mut self, ids: &[NodeId]) -> Result<DeletedItems> {
        self.delete_items(ids, &[])
    }

    fn delete_connection(&mut self, id: &str) -> Result<Connection> {
        let connection = self
            .graph()
            .find_connection(id)
            .cloned()
            .ok_or_else(|| CanvasError::connection_not_found(id))?;
        self.delete_items(&[], &[connection.id.clone()])?;
        Ok(connection)
    }

    fn update_node_position(&mut self, id: &str, position: Position) -> Result<()>;

    /// Put the given nodes and the connections among them on the clipboard
    ///
    /// Returns how many nodes were copied.
    fn copy_nodes(&mut self, ids: &[NodeId]) -> usize;

    /// Insert a fresh copy of the clipboard; returns the new node ids
    fn paste_nodes(&mut self) -> Result<Vec<NodeId>>;

    fn cut_nodes(&mut self, ids: &[NodeId]) -> Result<DeletedItems> {
        if self.copy_nodes(ids) == 0 {
            return Ok(DeletedItems::default());
        }
        self.delete_nodes(ids)
    }

    /// Record the current graph as one undo step
    fn checkpoint(&mut self) -> Result<()>;

    /// Returns false when there was nothing to undo
    fn undo(&mut self) -> Result<bool>;

    /// Returns false when there was nothing to redo
    fn redo(&mut self) -> Result<bool>;

    fn can_undo(&self) -> bool;

    fn can_redo(&self) -> bool;
}

#[derive(Debug, Default)]
struct Clipboard {
    nodes: Vec<CanvasNode>,
    connections: Vec<Connection>,
    /// Pastes since the last copy; each one lands a step further away
    pastes: u32,
}

/// In-process store with uuid ids, snapshot history and a clipboard
pub struct InMemoryGraphStore {
    graph: WorkflowGraph,
    history: UndoStack,
    clipboard: Clipboard,
    paste_offset: f64,
    revision: u64,
}

impl InMemoryGraphStore {
    pub fn new(graph: WorkflowGraph, config: &CanvasConfig) -> Result<Self> {
        let mut history = UndoStack::new(config.history.max_snapshots);
        history.reset(&graph)?;
        Ok(Self {
            graph,
            history,
            clipboard: Clipboard::default(),
            paste_offset: config.clipboard.paste_offset,
            revision: 0,
        })
    }

    fn commit_structure(&mut self) -> Result<()> {
        self.revision += 1;
        self.history.record(&self.graph)
    }

    fn restore(&mut self, restored: Option<Result<WorkflowGraph>>) -> Result<bool> {
        match restored {
            Some(graph) => {
                self.graph = graph?;
                self.revision += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn new_node_id() -> NodeId {
    format!("node-{}", uuid::Uuid::new_v4())
}

fn new_connection_id() -> ConnectionId {
    format!("conn-{}", uuid::Uuid::new_v4())
}

impl GraphStore for InMemoryGraphStore {
    fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    fn structure_revision(&self) -> u64 {
        self.revision
    }

    fn load(&mut self, graph: WorkflowGraph) -> Result<()> {
        self.history.reset(&graph)?;
        self.graph = graph;
        self.clipboard = Clipboard::default();
        self.revision += 1;
        Ok(())
    }

    fn add_node(&mut self, node_type: &str, position: Position) -> Result<CanvasNode> {
        let node = CanvasNode::new(new_node_id(), node_type, position);
        self.graph.nodes.push(node.clone());
        self.commit_structure()?;
        log::debug!("Added node {} ({})", node.id, node.node_type);
        Ok(node)
    }

    fn add_connection(&mut self, request: ConnectionRequest) -> Result<Connection> {
        if !self.graph.contains_node(&request.source_node_id)
            || !self.graph.contains_node(&request.target_node_id)
        {
            return Err(ConnectionRejection::UnknownNode.into());
        }

        let connection = request.into_connection(new_connection_id());
        self.graph.connections.push(connection.clone());
        self.commit_structure()?;
        log::debug!(
            "Connected {}:{} -> {}:{}",
            connection.source_node_id,
            connection.source_port_id,
            connection.target_node_id,
            connection.target_port_id
        );
        Ok(connection)
    }

    fn delete_items(&mut self, nodes: &[NodeId], connections: &[ConnectionId]) -> Result<DeletedItems> {
        let mut deleted = DeletedItems::default();

        for id in connections {
            if let Some(connection) = self.graph.remove_connection(id) {
                deleted.connections.push(connection.id);
            }
        }
        for id in nodes {
            let cascaded: Vec<ConnectionId> = self
                .graph
                .connections
                .iter()
                .filter(|c| c.touches(id))
                .map(|c| c.id.clone())
                .collect();
            if self.graph.remove_node(id).is_some() {
                deleted.nodes.push(id.clone());
                deleted.connections.extend(cascaded);
            }
        }

        if !deleted.is_empty() {
            self.commit_structure()?;
            log::debug!(
                "Deleted {} node(s), {} connection(s)",
                deleted.nodes.len(),
                deleted.connections.len()
            );
        }
        Ok(deleted)
    }

    fn update_node_position(&mut self, id: &str, position: Position) -> Result<()> {
        let node = self
            .graph
            .find_node_mut(id)
            .ok_or_else(|| CanvasError::node_not_found(id))?;
        node.position = position;
        Ok(())
    }

    fn copy_nodes(&mut self, ids: &[NodeId]) -> usize {
        let nodes: Vec<CanvasNode> = self
            .graph
            .nodes
            .iter()
            .filter(|n| ids.contains(&n.id))
            .cloned()
            .collect();
        if nodes.is_empty() {
            return 0;
        }

        let connections = self
            .graph
            .connections
            .iter()
            .filter(|c| ids.contains(&c.source_node_id) && ids.contains(&c.target_node_id))
            .cloned()
            .collect();

        let count = nodes.len();
        self.clipboard = Clipboard {
            nodes,
            connections,
            pastes: 0,
        };
        log::debug!("Copied {} node(s) to clipboard", count);
        count
    }

    fn paste_nodes(&mut self) -> Result<Vec<NodeId>> {
        if self.clipboard.nodes.is_empty() {
            return Ok(Vec::new());
        }

        self.clipboard.pastes += 1;
        let shift = self.paste_offset * f64::from(self.clipboard.pastes);
        let offset = Position::new(shift, shift);

        let mut remap: HashMap<&str, NodeId> = HashMap::new();
        let mut pasted = Vec::with_capacity(self.clipboard.nodes.len());
        for node in &self.clipboard.nodes {
            let id = new_node_id();
            remap.insert(node.id.as_str(), id.clone());
            pasted.push(CanvasNode {
                id,
                position: node.position + offset,
                ..node.clone()
            });
        }

        let connections: Vec<Connection> = self
            .clipboard
            .connections
            .iter()
            .filter_map(|c| {
                let source = remap.get(c.source_node_id.as_str())?;
                let target = remap.get(c.target_node_id.as_str())?;
                Some(Connection {
                    id: new_connection_id(),
                    source_node_id: source.clone(),
                    source_port_id: c.source_port_id.clone(),
                    target_node_id: target.clone(),
                    target_port_id: c.target_port_id.clone(),
                })
            })
            .collect();

        let ids: Vec<NodeId> = pasted.iter().map(|n| n.id.clone()).collect();
        self.graph.nodes.extend(pasted);
        self.graph.connections.extend(connections);
        self.commit_structure()?;
        log::debug!("Pasted {} node(s)", ids.len());
        Ok(ids)
    }

    fn checkpoint(&mut self) -> Result<()> {
        self.history.record(&self.graph)
    }

    fn undo(&mut self) -> Result<bool> {
        let restored = self.history.undo();
        self.restore(restored)
    }

    fn redo(&mut self) -> Result<bool> {
        let restored = self.history.redo();
        self.restore(restored)
    }

    fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    fn can_redo(&self) -> bool {
        self.history.can_redo()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::WorkflowBuilder;

    fn store() -> InMemoryGraphStore {
        let graph = WorkflowBuilder::new("wf", "Test")
            .add_node("a", "manual-trigger", (0.0, 0.0))
            .add_node("b", "action", (300.0, 0.0))
            .add_node("c", "action", (600.0, 0.0))
            .connect("a", "out", "b", "in")
            .connect("b", "out", "c", "in")
            .build();
        InMemoryGraphStore::new(graph, &CanvasConfig::default()).unwrap()
    }

    fn request(source: &str, target: &str) -> ConnectionRequest {
        ConnectionRequest {
            source_node_id: source.to_string(),
            source_port_id: "out".to_string(),
            target_node_id: target.to_string(),
            target_port_id: "in".to_string(),
        }
    }

    #[test]
    fn test_add_node_generates_prefixed_ids() {
        let mut store = store();
        let first = store.add_node("delay", Position::new(5.0, 5.0)).unwrap();
        let second = store.add_node("delay", Position::new(5.0, 5.0)).unwrap();

        assert!(first.id.starts_with("node-"));
        assert_ne!(first.id, second.id);
        assert_eq!(store.graph().nodes.len(), 5);
        assert_eq!(store.structure_revision(), 2);
    }

    #[test]
    fn test_add_connection_rejects_unknown_node() {
        let mut store = store();
        let err = store.add_connection(request("a", "ghost")).unwrap_err();
        assert!(matches!(
            err,
            CanvasError::InvalidConnection(ConnectionRejection::UnknownNode)
        ));

        let connection = store.add_connection(request("a", "c")).unwrap();
        assert!(connection.id.starts_with("conn-"));
    }

    #[test]
    fn test_delete_node_cascades() {
        let mut store = store();
        let deleted = store.delete_nodes(&["b".to_string()]).unwrap();

        assert_eq!(deleted.nodes, vec!["b".to_string()]);
        assert_eq!(deleted.connections.len(), 2);
        assert!(store.graph().connections.is_empty());
    }

    #[test]
    fn test_delete_unknown_is_noop() {
        let mut store = store();
        let deleted = store.delete_nodes(&["ghost".to_string()]).unwrap();
        assert!(deleted.is_empty());
        assert_eq!(store.structure_revision(), 0);
        assert!(!store.can_undo());
    }

    #[test]
    fn test_delete_connection() {
        let mut store = store();
        let removed = store.delete_connection("conn-1").unwrap();
        assert_eq!(removed.source_node_id, "a");
        assert_eq!(store.graph().connections.len(), 1);

        assert!(matches!(
            store.delete_connection("conn-1"),
            Err(CanvasError::ConnectionNotFound(_))
        ));
    }

    #[test]
    fn test_position_update_does_not_bump_revision() {
        let mut store = store();
        store.update_node_position("a", Position::new(40.0, 40.0)).unwrap();
        assert_eq!(store.structure_revision(), 0);
        assert_eq!(store.graph().find_node("a").unwrap().position, Position::new(40.0, 40.0));

        assert!(matches!(
            store.update_node_position("ghost", Position::ORIGIN),
            Err(CanvasError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_paste_remaps_internal_connections() {
        let mut store = store();
        assert_eq!(store.copy_nodes(&["a".to_string(), "b".to_string()]), 2);

        let first = store.paste_nodes().unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(store.graph().nodes.len(), 5);
        // Only a->b is internal to the copied set
        assert_eq!(store.graph().connections.len(), 3);

        let pasted_a = store.graph().find_node(&first[0]).unwrap();
        assert_eq!(pasted_a.position, Position::new(20.0, 20.0));
        let pasted_conn = store.graph().connections.last().unwrap();
        assert_eq!(pasted_conn.source_node_id, first[0]);
        assert_eq!(pasted_conn.target_node_id, first[1]);

        let second = store.paste_nodes().unwrap();
        let pasted_again = store.graph().find_node(&second[0]).unwrap();
        assert_eq!(pasted_again.position, Position::new(40.0, 40.0));
    }

    #[test]
    fn test_paste_with_empty_clipboard() {
        let mut store = store();
        assert!(store.paste_nodes().unwrap().is_empty());
        assert_eq!(store.copy_nodes(&["ghost".to_string()]), 0);
        assert!(store.paste_nodes().unwrap().is_empty());
    }

    #[test]
    fn test_cut_then_paste_restores_nodes() {
        let mut store = store();
        let deleted = store.cut_nodes(&["c".to_string()]).unwrap();
        assert_eq!(deleted.nodes, vec!["c".to_string()]);
        assert_eq!(store.graph().nodes.len(), 2);

        let pasted = store.paste_nodes().unwrap();
        assert_eq!(pasted.len(), 1);
        assert_eq!(store.graph().find_node(&pasted[0]).unwrap().node_type, "action");
    }

    #[test]
    fn test_undo_redo_structural_edits() {
        let mut store = store();
        store.add_node("delay", Position::ORIGIN).unwrap();
        store.delete_nodes(&["a".to_string()]).unwrap();

        assert!(store.undo().unwrap());
        assert_eq!(store.graph().nodes.len(), 4);
        assert!(store.graph().contains_node("a"));

        assert!(store.undo().unwrap());
        assert_eq!(store.graph().nodes.len(), 3);
        assert!(!store.undo().unwrap());

        assert!(store.redo().unwrap());
        assert_eq!(store.graph().nodes.len(), 4);
    }

    #[test]
    fn test_checkpoint_makes_drag_undoable() {
        let mut store = store();
        store.update_node_position("a", Position::new(99.0, 0.0)).unwrap();
        store.checkpoint().unwrap();

        assert!(store.undo().unwrap());
        assert_eq!(store.graph().find_node("a").unwrap().position, Position::ORIGIN);
    }

    #[test]
    fn test_load_resets_history_and_clipboard() {
        let mut store = store();
        store.add_node("delay", Position::ORIGIN).unwrap();
        store.copy_nodes(&["a".to_string()]);

        store.load(WorkflowGraph::new("other", "Other")).unwrap();
        assert!(!store.can_undo());
        assert!(store.paste_nodes().unwrap().is_empty());
        assert!(store.graph().nodes.is_empty());
    }
}
