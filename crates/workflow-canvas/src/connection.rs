//! Connection validation and normalization
//!
//! Decides whether a drag between two ports may become a connection and, if
//! so, which end is the source. Rules are checked in order and the first
//! failure wins:
//!
//! 1. Both ports belong to different nodes.
//! 2. The ports have opposite types.
//! 3. (opt-in) No identical connection exists already.
//! 4. (opt-in) The new connection does not close a cycle.
//!
//! Whatever end the user started dragging from, the result always flows
//! output to input.

use serde::{Deserialize, Serialize};

use crate::config::ConnectionPolicy;
use crate::geometry::Position;
use crate::types::{Connection, PortRef, PortType, WorkflowGraph};

/// Why a connection attempt was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionRejection {
    /// Both ends are on the same node
    SelfConnection,
    /// Both ends are inputs, or both are outputs
    SamePortType,
    /// An identical connection already exists
    DuplicateConnection,
    /// The target can already reach the source
    WouldCreateCycle,
    /// An endpoint references a node that is not in the graph
    UnknownNode,
}

impl std::fmt::Display for ConnectionRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelfConnection => write!(f, "a node cannot connect to itself"),
            Self::SamePortType => write!(f, "ports must be of opposite types"),
            Self::DuplicateConnection => write!(f, "these ports are already connected"),
            Self::WouldCreateCycle => write!(f, "connection would create a cycle"),
            Self::UnknownNode => write!(f, "connection references an unknown node"),
        }
    }
}

impl std::error::Error for ConnectionRejection {}

/// A validated connection that has not been assigned an ID yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    pub source_node_id: String,
    pub source_port_id: String,
    pub target_node_id: String,
    pub target_port_id: String,
}

impl ConnectionRequest {
    pub fn into_connection(self, id: impl Into<String>) -> Connection {
        Connection {
            id: id.into(),
            source_node_id: self.source_node_id,
            source_port_id: self.source_port_id,
            target_node_id: self.target_node_id,
            target_port_id: self.target_port_id,
        }
    }

    fn matches(&self, conn: &Connection) -> bool {
        self.source_node_id == conn.source_node_id
            && self.source_port_id == conn.source_port_id
            && self.target_node_id == conn.target_node_id
            && self.target_port_id == conn.target_port_id
    }
}

/// Apply the mandatory rules and normalize direction
///
/// `from` is where the drag started and `to` where it was released; either
/// may be the output end.
pub fn try_connect(from: &PortRef, to: &PortRef) -> Result<ConnectionRequest, ConnectionRejection> {
    if from.node_id == to.node_id {
        return Err(ConnectionRejection::SelfConnection);
    }
    if from.port_type == to.port_type {
        return Err(ConnectionRejection::SamePortType);
    }

    let (source, target) = match from.port_type {
        PortType::Output => (from, to),
        PortType::Input => (to, from),
    };

    Ok(ConnectionRequest {
        source_node_id: source.node_id.clone(),
        source_port_id: source.port_id.clone(),
        target_node_id: target.node_id.clone(),
        target_port_id: target.port_id.clone(),
    })
}

/// Mandatory rules followed by the graph-aware checks enabled in `policy`
pub fn validate_against_graph(
    from: &PortRef,
    to: &PortRef,
    graph: &WorkflowGraph,
    policy: &ConnectionPolicy,
) -> Result<ConnectionRequest, ConnectionRejection> {
    let request = try_connect(from, to)?;

    if !graph.contains_node(&request.source_node_id) || !graph.contains_node(&request.target_node_id)
    {
        return Err(ConnectionRejection::UnknownNode);
    }
    if policy.reject_duplicates && graph.connections.iter().any(|c| request.matches(c)) {
        return Err(ConnectionRejection::DuplicateConnection);
    }
    if policy.reject_cycles && graph.is_reachable(&request.target_node_id, &request.source_node_id) {
        return Err(ConnectionRejection::WouldCreateCycle);
    }

    Ok(request)
}

/// Transient line drawn while a connection is being dragged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPreview {
    /// Port the drag started from
    pub origin: PortRef,
    /// Logical position of the drag start
    pub from: Position,
    /// Logical position of the pointer
    pub to: Position,
}

impl ConnectionPreview {
    /// Control points for a horizontal S-curve between the two ends
    ///
    /// Outputs sit on the right edge of a node, so the curve leaves an output
    /// to the right and enters an input from the left.
    pub fn bezier_control_points(&self) -> (Position, Position) {
        let (start, end) = match self.origin.port_type {
            PortType::Output => (self.from, self.to),
            PortType::Input => (self.to, self.from),
        };
        let reach = ((end.x - start.x).abs() / 2.0).max(50.0);
        (
            Position::new(start.x + reach, start.y),
            Position::new(end.x - reach, end.y),
        )
    }
}
