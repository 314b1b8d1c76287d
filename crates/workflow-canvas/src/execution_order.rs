//! Execution order inference
//!
//! Assigns every node a 1-based order number by breadth-first traversal from
//! the workflow's entry points. The numbers feed the order badge on each node;
//! they describe traversal sequence, not a runtime schedule.
//!
//! # Entry points
//!
//! A node is a root when its type tag is one of the configured trigger types
//! or when no connection arrives at it. Orphan nodes therefore still receive
//! a number instead of being skipped.
//!
//! # Numbering
//!
//! - [`OrderNumbering::EnqueueSequence`]: roots are numbered by their position
//!   in the root list, every other node by a counter shared across the whole
//!   traversal that increments on each enqueue. Two siblings found from
//!   different parents get unrelated numbers; the value is a sequence number,
//!   not a depth.
//! - [`OrderNumbering::DepthLayer`]: roots are 1 and every node gets its BFS
//!   parent's number plus one, so nodes in the same wave share a number.
//!
//! In both modes the first dequeued entry for a node wins.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::types::{CanvasNode, Connection, NodeId};

/// Node id to 1-based execution order
pub type ExecutionOrderMap = BTreeMap<NodeId, u32>;

/// Strategy for turning traversal into order numbers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderNumbering {
    /// Global enqueue sequence
    #[default]
    EnqueueSequence,
    /// BFS depth from the nearest root
    DepthLayer,
}

/// Computes execution order maps for a fixed trigger set and numbering
#[derive(Debug, Clone)]
pub struct ExecutionOrderResolver {
    trigger_types: HashSet<String>,
    numbering: OrderNumbering,
}

impl Default for ExecutionOrderResolver {
    fn default() -> Self {
        Self::new(
            [
                constants::triggers::MANUAL,
                constants::triggers::SCHEDULE,
                constants::triggers::WEBHOOK,
                constants::triggers::EVENT,
            ],
            OrderNumbering::default(),
        )
    }
}

impl ExecutionOrderResolver {
    pub fn new<I, S>(trigger_types: I, numbering: OrderNumbering) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            trigger_types: trigger_types.into_iter().map(Into::into).collect(),
            numbering,
        }
    }

    pub fn numbering(&self) -> OrderNumbering {
        self.numbering
    }

    /// Compute the order map for a node list and its connections
    ///
    /// Pure and deterministic. Connections whose endpoints are not in `nodes`
    /// are ignored. The result has an entry for every node in `nodes`.
    pub fn resolve(&self, nodes: &[CanvasNode], connections: &[Connection]) -> ExecutionOrderMap {
        let known: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();

        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
        for conn in connections {
            let source = conn.source_node_id.as_str();
            let target = conn.target_node_id.as_str();
            if !known.contains(source) || !known.contains(target) {
                continue;
            }
            *in_degree.entry(target).or_insert(0) += 1;
            outgoing.entry(source).or_default().push(target);
        }

        let roots: Vec<&str> = nodes
            .iter()
            .filter(|n| {
                self.trigger_types.contains(&n.node_type)
                    || in_degree.get(n.id.as_str()).copied().unwrap_or(0) == 0
            })
            .map(|n| n.id.as_str())
            .collect();

        let mut traversal = Traversal {
            outgoing: &outgoing,
            numbering: self.numbering,
            queue: VecDeque::new(),
            visited: HashSet::new(),
            order: ExecutionOrderMap::new(),
            counter: roots.len() as u32,
        };

        for (index, &root) in roots.iter().enumerate() {
            let seed = match self.numbering {
                OrderNumbering::EnqueueSequence => index as u32 + 1,
                OrderNumbering::DepthLayer => 1,
            };
            traversal.queue.push_back((root, seed));
        }
        traversal.drain();

        // Only root-less cycles survive the first pass; promote them so the
        // map stays total over the node list.
        for node in nodes {
            if traversal.visited.contains(node.id.as_str()) {
                continue;
            }
            let seed = match self.numbering {
                OrderNumbering::EnqueueSequence => traversal.next_sequence(),
                OrderNumbering::DepthLayer => 1,
            };
            log::debug!(
                "Node '{}' unreachable from any root, ordering it as a secondary root",
                node.id
            );
            traversal.queue.push_back((node.id.as_str(), seed));
            traversal.drain();
        }

        traversal.order
    }
}

struct Traversal<'a> {
    outgoing: &'a HashMap<&'a str, Vec<&'a str>>,
    numbering: OrderNumbering,
    queue: VecDeque<(&'a str, u32)>,
    visited: HashSet<&'a str>,
    order: ExecutionOrderMap,
    counter: u32,
}

impl<'a> Traversal<'a> {
    fn next_sequence(&mut self) -> u32 {
        self.counter += 1;
        self.counter
    }

    fn drain(&mut self) {
        let outgoing = self.outgoing;
        while let Some((node_id, order)) = self.queue.pop_front() {
            if !self.visited.insert(node_id) {
                continue;
            }
            self.order.entry(node_id.to_string()).or_insert(order);

            let Some(targets) = outgoing.get(node_id) else {
                continue;
            };
            for &target in targets {
                if self.visited.contains(target) {
                    continue;
                }
                let next = match self.numbering {
                    OrderNumbering::EnqueueSequence => self.next_sequence(),
                    OrderNumbering::DepthLayer => order + 1,
                };
                self.queue.push_back((target, next));
            }
        }
    }
}

/// Compute execution order with the default trigger tags and numbering
pub fn calculate_execution_order(
    nodes: &[CanvasNode],
    connections: &[Connection],
) -> ExecutionOrderMap {
    ExecutionOrderResolver::default().resolve(nodes, connections)
}

/// Memoizes the order map against the graph's structure revision
///
/// Position changes do not bump the revision, so dragging nodes around never
/// triggers a recomputation.
#[derive(Debug, Default)]
pub struct ExecutionOrderCache {
    key: Option<(u64, OrderNumbering)>,
    map: ExecutionOrderMap,
}

impl ExecutionOrderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached map, recomputing when the revision or numbering changed
    pub fn get_or_compute(
        &mut self,
        revision: u64,
        resolver: &ExecutionOrderResolver,
        nodes: &[CanvasNode],
        connections: &[Connection],
    ) -> &ExecutionOrderMap {
        let key = (revision, resolver.numbering());
        if self.key != Some(key) {
            self.map = resolver.resolve(nodes, connections);
            self.key = Some(key);
        }
        &self.map
    }

    pub fn invalidate(&mut self) {
        self.key = None;
    }
}
