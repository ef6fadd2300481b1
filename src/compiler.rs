//! Deterministic linearization of a flow graph into an ordered step plan.
//!
//! The traversal is an explicit-stack depth-first walk from the wallet root,
//! so termination and ordering are independent of call-stack depth:
//!
//! - passthrough nodes (wallet, selector) are traversed but never emitted
//! - branch nodes are emitted (the execution summary displays them) but
//!   contribute no ledger operation
//! - every other node is emitted as an operation step
//! - fan-out is ordered by successor canvas position (ascending `y`, then
//!   ascending `x` within an epsilon band), see
//!   [`FlowGraph::successors`](crate::graph::FlowGraph::successors)
//! - a visited set keyed by node id bounds the walk on cyclic or diamond
//!   graphs; a node reachable via two paths is emitted once, at its first
//!   visit in traversal order

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::graph::FlowGraph;
use crate::types::NodeId;

/// One position in the compiled execution plan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub index: usize,
    pub node: NodeId,
    /// Set only by branch evaluation, never by the compiler.
    pub skipped: bool,
}

/// The compiled, ordered, deduplicated step list for one run.
///
/// Created fresh per execution call and discarded when the call completes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Plan {
    steps: Vec<Step>,
    by_node: FxHashMap<NodeId, usize>,
}

impl Plan {
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Plan position of a node, if it was emitted.
    #[must_use]
    pub fn position_of(&self, node: &NodeId) -> Option<usize> {
        self.by_node.get(node).copied()
    }

    /// Steps that survived branch evaluation.
    pub fn live_steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(|s| !s.skipped)
    }

    /// Apply a skip mark. Marks are monotonic: once a step is skipped it can
    /// never be un-skipped within the same run. Returns whether the step was
    /// newly marked.
    pub(crate) fn mark_skipped(&mut self, node: &NodeId) -> bool {
        match self.by_node.get(node) {
            Some(&i) if !self.steps[i].skipped => {
                self.steps[i].skipped = true;
                true
            }
            _ => false,
        }
    }

    fn push(&mut self, node: NodeId) {
        let index = self.steps.len();
        self.by_node.insert(node.clone(), index);
        self.steps.push(Step {
            index,
            node,
            skipped: false,
        });
    }
}

/// Compile a validated graph into an ordered plan.
///
/// Purely structural: branch predicates are not consulted here. The returned
/// order is stable for a given set of node positions, regardless of edge
/// insertion order.
#[must_use]
pub fn compile(graph: &FlowGraph) -> Plan {
    let mut plan = Plan::default();
    let mut visited: FxHashSet<NodeId> = FxHashSet::default();
    let mut stack: Vec<NodeId> = vec![graph.root().id.clone()];

    while let Some(id) = stack.pop() {
        if !visited.insert(id.clone()) {
            continue;
        }
        // Validated graph: every id on the stack resolves.
        let Some(node) = graph.node(&id) else {
            continue;
        };

        if !node.spec.is_passthrough() {
            plan.push(id.clone());
        }

        // Successors come back position-ordered; push in reverse so the
        // first-ordered successor is popped (and emitted) first.
        for succ in graph.successors(&id).into_iter().rev() {
            if !visited.contains(&succ.id) {
                stack.push(succ.id.clone());
            }
        }
    }

    tracing::debug!(steps = plan.len(), "compiled flow graph");
    plan
}
