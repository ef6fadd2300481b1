//! The validated graph container and position-ordered successor lookup.

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

use super::model::{FlowEdge, FlowNode};
use crate::types::NodeId;

/// Successors whose vertical positions differ by at most this much are
/// considered to be on the same row and are ordered by `x` instead.
pub const POSITION_EPSILON: f64 = 1.0;

/// Structural errors detected when adopting an editor snapshot.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("graph has no wallet root node")]
    #[diagnostic(
        code(ledgerflow::graph::missing_root),
        help("Every flow starts at exactly one wallet node; the editor should never produce a rootless snapshot.")
    )]
    MissingRoot,

    #[error("graph has {count} wallet root nodes, expected exactly one")]
    #[diagnostic(code(ledgerflow::graph::multiple_roots))]
    MultipleRoots { count: usize },

    #[error("edge {edge} references unknown node {node}")]
    #[diagnostic(code(ledgerflow::graph::dangling_edge))]
    DanglingEdge { edge: String, node: NodeId },
}

/// Read-only snapshot of the editor's graph.
///
/// Construction validates the structural invariants (single root, no dangling
/// edges); everything downstream can then rely on them. The engine never
/// mutates a `FlowGraph` — nodes and edges are created and changed only by
/// the editor.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "GraphSnapshot", into = "GraphSnapshot")]
pub struct FlowGraph {
    nodes: Vec<FlowNode>,
    edges: Vec<FlowEdge>,
    index: FxHashMap<NodeId, usize>,
    root: NodeId,
}

/// Wire form of a graph snapshot, as the editor exports it.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct GraphSnapshot {
    nodes: Vec<FlowNode>,
    edges: Vec<FlowEdge>,
}

impl TryFrom<GraphSnapshot> for FlowGraph {
    type Error = GraphError;

    fn try_from(snapshot: GraphSnapshot) -> Result<Self, Self::Error> {
        FlowGraph::new(snapshot.nodes, snapshot.edges)
    }
}

impl From<FlowGraph> for GraphSnapshot {
    fn from(graph: FlowGraph) -> Self {
        GraphSnapshot {
            nodes: graph.nodes,
            edges: graph.edges,
        }
    }
}

impl FlowGraph {
    /// Adopt an editor snapshot, validating structural invariants.
    pub fn new(nodes: Vec<FlowNode>, edges: Vec<FlowEdge>) -> Result<Self, GraphError> {
        let mut index = FxHashMap::default();
        for (i, node) in nodes.iter().enumerate() {
            index.insert(node.id.clone(), i);
        }

        let roots: Vec<&FlowNode> = nodes.iter().filter(|n| n.spec.is_root()).collect();
        let root = match roots.as_slice() {
            [] => return Err(GraphError::MissingRoot),
            [only] => only.id.clone(),
            many => {
                return Err(GraphError::MultipleRoots { count: many.len() });
            }
        };

        for edge in &edges {
            for endpoint in [&edge.source, &edge.target] {
                if !index.contains_key(endpoint) {
                    return Err(GraphError::DanglingEdge {
                        edge: edge.id.clone(),
                        node: endpoint.clone(),
                    });
                }
            }
        }

        Ok(Self {
            nodes,
            edges,
            index,
            root,
        })
    }

    /// The single wallet root.
    #[must_use]
    pub fn root(&self) -> &FlowNode {
        self.node(&self.root)
            .expect("validated root is always present")
    }

    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&FlowNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    #[must_use]
    pub fn nodes(&self) -> &[FlowNode] {
        &self.nodes
    }

    #[must_use]
    pub fn edges(&self) -> &[FlowEdge] {
        &self.edges
    }

    /// Successors of `id`, ordered by target position: ascending `y`, then
    /// ascending `x` within [`POSITION_EPSILON`].
    ///
    /// This ordering is what makes compilation reproducible and consistent
    /// with what the user sees on the canvas, independent of the order edges
    /// were drawn in.
    #[must_use]
    pub fn successors(&self, id: &NodeId) -> Vec<&FlowNode> {
        let mut out: Vec<&FlowNode> = self
            .edges
            .iter()
            .filter(|e| &e.source == id)
            .filter_map(|e| self.node(&e.target))
            .collect();
        out.sort_by(|a, b| canvas_order(a, b));
        out
    }
}

/// Vertical-first canvas ordering with an epsilon band for "same row".
fn canvas_order(a: &FlowNode, b: &FlowNode) -> Ordering {
    let (pa, pb) = (a.position, b.position);
    if (pa.y - pb.y).abs() <= POSITION_EPSILON {
        pa.x.total_cmp(&pb.x)
    } else {
        pa.y.total_cmp(&pb.y)
    }
}
