//! Fluent builder for workflow graphs
//!
//! Provides a compact way to lay out a graph in code, used by hosts that
//! seed a canvas and throughout the tests.

use crate::geometry::{Position, Size};
use crate::types::{CanvasNode, Connection, WorkflowGraph};

/// Fluent builder for constructing workflow graphs
///
/// # Example
///
/// ```
/// use workflow_canvas::WorkflowBuilder;
///
/// let graph = WorkflowBuilder::new("wf-1", "Welcome mail")
///     .add_node("trigger", "webhook-trigger", (0.0, 0.0))
///     .add_node("send", "send-email", (300.0, 0.0))
///     .with_data(serde_json::json!({"template": "welcome"}))
///     .connect("trigger", "out", "send", "in")
///     .build();
///
/// assert_eq!(graph.connections[0].id, "conn-1");
/// ```
pub struct WorkflowBuilder {
    id: String,
    name: String,
    nodes: Vec<CanvasNode>,
    connections: Vec<Connection>,
    connection_counter: usize,
}

impl WorkflowBuilder {
    /// Create a new workflow builder
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            nodes: Vec::new(),
            connections: Vec::new(),
            connection_counter: 0,
        }
    }

    /// Add a node to the graph
    pub fn add_node(
        mut self,
        id: impl Into<String>,
        node_type: impl Into<String>,
        position: (f64, f64),
    ) -> Self {
        self.nodes.push(CanvasNode::new(
            id,
            node_type,
            Position::new(position.0, position.1),
        ));
        self
    }

    /// Set an explicit size on the most recently added node
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        if let Some(node) = self.nodes.last_mut() {
            node.size = Some(Size::new(width, height));
        }
        self
    }

    /// Set configuration data on the most recently added node
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        if let Some(node) = self.nodes.last_mut() {
            node.data = data;
        }
        self
    }

    /// Connect an output port to an input port (auto-generates the ID)
    pub fn connect(
        mut self,
        source: impl Into<String>,
        source_port: impl Into<String>,
        target: impl Into<String>,
        target_port: impl Into<String>,
    ) -> Self {
        self.connection_counter += 1;
        let id = format!("conn-{}", self.connection_counter);
        self.connections.push(Connection {
            id,
            source_node_id: source.into(),
            source_port_id: source_port.into(),
            target_node_id: target.into(),
            target_port_id: target_port.into(),
        });
        self
    }

    /// Connect two ports with an explicit connection ID
    pub fn connect_with_id(
        mut self,
        connection_id: impl Into<String>,
        source: impl Into<String>,
        source_port: impl Into<String>,
        target: impl Into<String>,
        target_port: impl Into<String>,
    ) -> Self {
        self.connections.push(Connection {
            id: connection_id.into(),
            source_node_id: source.into(),
            source_port_id: source_port.into(),
            target_node_id: target.into(),
            target_port_id: target_port.into(),
        });
        self
    }

    /// Build the graph without validation
    pub fn build(self) -> WorkflowGraph {
        let mut graph = WorkflowGraph::new(self.id, self.name);
        graph.nodes = self.nodes;
        graph.connections = self.connections;
        graph
    }
}
