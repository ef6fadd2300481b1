//! Effective-balance projection for the editor.
//!
//! Answers "how much of asset X has this flow already committed by the time
//! it reaches node N", so the editor can warn about over-allocation while a
//! graph is being drawn. Advisory only: it shares the compiler's traversal
//! but has no authority over assembly, which enforces balances for real.

use rustc_hash::FxHashSet;

use crate::graph::{FlowGraph, NodeSpec};
use crate::types::{AssetKey, NodeId};

/// Signed delta of `asset` accumulated over every step strictly before
/// `target` on its path from the root.
///
/// Only explicit same-asset consumption is aggregated: a step consuming
/// `asset` subtracts its amount, while produced value (a swap's output, a
/// withdrawal) does not add by itself. This matches the assembler's
/// per-asset cumulative draw tracking, so a negative result predicts an
/// insufficient-balance abort.
///
/// The target's own delta is not counted. Nodes are reached in the
/// compiler's deterministic order (same epsilon tie-break, see
/// [`POSITION_EPSILON`](crate::graph::POSITION_EPSILON)); an unreachable
/// target yields `0`.
#[must_use]
pub fn estimate_at(graph: &FlowGraph, target: &NodeId, asset: &AssetKey) -> i128 {
    let mut visited: FxHashSet<NodeId> = FxHashSet::default();
    let mut stack: Vec<(NodeId, i128)> = vec![(graph.root().id.clone(), 0)];

    while let Some((id, delta)) = stack.pop() {
        if !visited.insert(id.clone()) {
            continue;
        }
        if &id == target {
            return delta;
        }

        let Some(node) = graph.node(&id) else {
            continue;
        };
        let delta = delta + node_delta(&node.spec, asset);

        // Reverse push so the first-ordered successor is explored first.
        for succ in graph.successors(&id).into_iter().rev() {
            if !visited.contains(&succ.id) {
                stack.push((succ.id.clone(), delta));
            }
        }
    }

    0
}

fn node_delta(spec: &NodeSpec, asset: &AssetKey) -> i128 {
    let Some(op) = spec.as_op() else {
        return 0;
    };
    match (op.consumed_asset(), op.amount()) {
        (Some(consumed), Some(amount)) if consumed == asset => -i128::from(amount),
        _ => 0,
    }
}
