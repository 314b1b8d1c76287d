//! Core types for workflow graphs on the canvas
//!
//! These types define the graph the canvas edits: positioned nodes, typed
//! ports, and the connections between them.

use serde::{Deserialize, Serialize};

use crate::geometry::{Position, Rect, Size};

/// Unique identifier for a node
pub type NodeId = String;

/// Unique identifier for a connection
pub type ConnectionId = String;

/// Identifier of a port, unique within its node
pub type PortId = String;

/// Direction of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortType {
    Input,
    Output,
}

/// Reference to one port of one node
///
/// Ports are not standalone entities; connections, hover state and the
/// in-progress connection drag all point at them through this triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRef {
    pub node_id: NodeId,
    pub port_id: PortId,
    pub port_type: PortType,
}

impl PortRef {
    pub fn new(node_id: impl Into<String>, port_id: impl Into<String>, port_type: PortType) -> Self {
        Self {
            node_id: node_id.into(),
            port_id: port_id.into(),
            port_type,
        }
    }

    pub fn input(node_id: impl Into<String>, port_id: impl Into<String>) -> Self {
        Self::new(node_id, port_id, PortType::Input)
    }

    pub fn output(node_id: impl Into<String>, port_id: impl Into<String>) -> Self {
        Self::new(node_id, port_id, PortType::Output)
    }
}

/// A node placed on the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasNode {
    /// Unique identifier for this node
    pub id: NodeId,
    /// Type tag identifying the node's behavior (e.g. "manual-trigger")
    #[serde(rename = "type")]
    pub node_type: String,
    /// Top-left corner in logical canvas coordinates
    pub position: Position,
    /// Explicit size; `None` means the default 200x80
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    /// Node configuration, opaque to the canvas
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

impl CanvasNode {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            position,
            size: None,
            data: serde_json::Value::Null,
        }
    }

    /// Size used for hit testing and selection
    pub fn effective_size(&self) -> Size {
        self.size.unwrap_or_default()
    }

    /// Bounding box in logical coordinates
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, self.effective_size())
    }
}

/// A directed connection from an output port to an input port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Unique identifier for this connection
    pub id: ConnectionId,
    pub source_node_id: NodeId,
    pub source_port_id: PortId,
    pub target_node_id: NodeId,
    pub target_port_id: PortId,
}

impl Connection {
    /// Whether either endpoint is the given node
    pub fn touches(&self, node_id: &str) -> bool {
        self.source_node_id == node_id || self.target_node_id == node_id
    }
}

/// A complete workflow graph as seen by the canvas
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowGraph {
    /// Unique identifier for this workflow
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Nodes on the canvas
    pub nodes: Vec<CanvasNode>,
    /// Connections between node ports
    pub connections: Vec<Connection>,
}

impl WorkflowGraph {
    /// Create a new empty graph
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            nodes: Vec::new(),
            connections: Vec::new(),
        }
    }

    /// Find a node by ID
    pub fn find_node(&self, id: &str) -> Option<&CanvasNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Find a node by ID (mutable)
    pub fn find_node_mut(&mut self, id: &str) -> Option<&mut CanvasNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Find a connection by ID
    pub fn find_connection(&self, id: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.find_node(id).is_some()
    }

    /// Connections leaving a node
    pub fn outgoing_connections<'a>(
        &'a self,
        node_id: &'a str,
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| c.source_node_id == node_id)
    }

    /// Whether `to` can be reached from `from` by following connections forward
    pub fn is_reachable(&self, from: &str, to: &str) -> bool {
        let mut stack = vec![from];
        let mut seen = std::collections::HashSet::new();
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            stack.extend(
                self.outgoing_connections(current)
                    .map(|c| c.target_node_id.as_str()),
            );
        }
        false
    }

    /// Remove a node together with every connection attached to it
    ///
    /// Returns the removed node, or `None` if it did not exist.
    pub fn remove_node(&mut self, id: &str) -> Option<CanvasNode> {
        let pos = self.nodes.iter().position(|n| n.id == id)?;
        let node = self.nodes.remove(pos);
        self.connections.retain(|c| !c.touches(id));
        Some(node)
    }

    /// Remove a connection by ID
    pub fn remove_connection(&mut self, id: &str) -> Option<Connection> {
        let pos = self.connections.iter().position(|c| c.id == id)?;
        Some(self.connections.remove(pos))
    }

    /// Union of all node bounding boxes, `None` for an empty graph
    pub fn bounds(&self) -> Option<Rect> {
        self.nodes
            .iter()
            .map(CanvasNode::bounds)
            .reduce(|acc, rect| acc.union(&rect))
    }
}
