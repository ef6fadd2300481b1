//! Branch predicates and skip-mark propagation.
//!
//! Each branch step is evaluated once, in plan order, before any assembly
//! begins. A predicate compares an externally fetched scalar (an address's
//! balance of an asset, or the first scalar return of a read-only contract
//! query) against a threshold.
//!
//! Two outcomes are deliberately *not* errors:
//!
//! - the predicate holds: downstream steps stay live
//! - the predicate fails, or the branch is missing configuration: every node
//!   transitively reachable from the branch is marked skipped (fail closed)
//!
//! Only predicate *fetch* failures (network, malformed address) abort the
//! run, with the offending step index. Skip marks are monotonic: a later
//! branch evaluation can never un-skip a node.

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compiler::Plan;
use crate::graph::{FlowGraph, NodeSpec};
use crate::types::{Address, AssetKey, NodeId};

/// Absolute tolerance used by [`Comparator::Eq`] on display-unit balances.
pub const EQ_TOLERANCE: f64 = 1e-4;

/// Comparison operator between the fetched scalar and the threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

impl Comparator {
    /// Whether `value <op> threshold` holds. Equality carries a `1e-4`
    /// absolute tolerance; inequality is its exact complement.
    #[must_use]
    pub fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            Comparator::Gt => value > threshold,
            Comparator::Ge => value >= threshold,
            Comparator::Lt => value < threshold,
            Comparator::Le => value <= threshold,
            Comparator::Eq => (value - threshold).abs() <= EQ_TOLERANCE,
            Comparator::Ne => (value - threshold).abs() > EQ_TOLERANCE,
        }
    }
}

/// A read-only contract query whose first scalar return value is compared.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateQuery {
    pub target: Address,
    pub function: String,
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
}

/// Branch predicate payload. Editor-fillable fields are `Option`: a branch
/// with missing configuration silently evaluates to unsatisfied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "predicate", rename_all = "snake_case")]
pub enum Predicate {
    Balance {
        address: Option<Address>,
        asset: Option<AssetKey>,
        comparator: Comparator,
        threshold: Option<f64>,
    },
    ContractState {
        query: Option<StateQuery>,
        comparator: Comparator,
        threshold: Option<f64>,
    },
}

/// Failure while fetching the external value a predicate compares against.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct PredicateFetchError {
    pub message: String,
}

impl PredicateFetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// External capability that resolves predicate inputs.
///
/// Implemented by the caller over whatever RPC surface the ledger offers;
/// the engine only sees display-unit scalars.
#[async_trait]
pub trait PredicateSource: Send + Sync {
    async fn balance_of(
        &self,
        address: &Address,
        asset: &AssetKey,
    ) -> Result<f64, PredicateFetchError>;

    async fn read_state(&self, query: &StateQuery) -> Result<f64, PredicateFetchError>;
}

/// Predicate-fetch failures abort the run with the branch's step index; a
/// "condition not met" outcome is not an error and never appears here.
#[derive(Debug, Error, Diagnostic)]
pub enum EvalError {
    #[error("branch predicate at step {step} failed to evaluate: {source}")]
    #[diagnostic(
        code(ledgerflow::condition::predicate),
        help("Predicate fetch errors abort the whole run before any ledger call is made.")
    )]
    Predicate {
        step: usize,
        #[source]
        source: PredicateFetchError,
    },
}

/// Evaluate every branch step in plan order, marking unsatisfied subtrees.
///
/// Branches whose upstream was already skipped are not fetched at all: their
/// downstream marks would be redundant and fetching would waste I/O on a
/// subtree that cannot execute.
pub async fn evaluate_branches(
    graph: &FlowGraph,
    plan: &mut Plan,
    source: &dyn PredicateSource,
) -> Result<(), EvalError> {
    // Collect branch steps up front; marking mutates the plan as we go.
    let branch_steps: Vec<(usize, NodeId)> = plan
        .steps()
        .iter()
        .filter_map(|s| match graph.node(&s.node).map(|n| &n.spec) {
            Some(NodeSpec::Branch(_)) => Some((s.index, s.node.clone())),
            _ => None,
        })
        .collect();

    for (step_index, node_id) in branch_steps {
        let already_skipped = plan
            .steps()
            .get(step_index)
            .map(|s| s.skipped)
            .unwrap_or(false);
        if already_skipped {
            continue;
        }

        let Some(NodeSpec::Branch(predicate)) = graph.node(&node_id).map(|n| &n.spec) else {
            continue;
        };

        let satisfied = evaluate_predicate(predicate, source)
            .await
            .map_err(|source| EvalError::Predicate {
                step: step_index,
                source,
            })?;

        tracing::debug!(step = step_index, node = %node_id, satisfied, "branch evaluated");

        if !satisfied {
            mark_downstream(graph, plan, &node_id);
        }
    }

    Ok(())
}

/// Resolve one predicate. `Ok(false)` covers both "condition not met" and
/// "insufficient configuration"; only fetch failures are errors.
async fn evaluate_predicate(
    predicate: &Predicate,
    source: &dyn PredicateSource,
) -> Result<bool, PredicateFetchError> {
    match predicate {
        Predicate::Balance {
            address,
            asset,
            comparator,
            threshold,
        } => {
            let (Some(address), Some(asset), Some(threshold)) = (address, asset, threshold) else {
                tracing::warn!("balance predicate not fully configured; failing closed");
                return Ok(false);
            };
            let value = source.balance_of(address, asset).await?;
            Ok(comparator.holds(value, *threshold))
        }
        Predicate::ContractState {
            query,
            comparator,
            threshold,
        } => {
            let (Some(query), Some(threshold)) = (query, threshold) else {
                tracing::warn!("contract-state predicate not fully configured; failing closed");
                return Ok(false);
            };
            let value = source.read_state(query).await?;
            Ok(comparator.holds(value, *threshold))
        }
    }
}

/// Mark every node transitively reachable from `from` (excluding `from`
/// itself) as skipped. Passthrough nodes carry no step but are traversed.
fn mark_downstream(graph: &FlowGraph, plan: &mut Plan, from: &NodeId) {
    let mut visited: FxHashSet<NodeId> = FxHashSet::default();
    visited.insert(from.clone());
    let mut stack: Vec<NodeId> = graph
        .successors(from)
        .into_iter()
        .map(|n| n.id.clone())
        .collect();

    while let Some(id) = stack.pop() {
        if !visited.insert(id.clone()) {
            continue;
        }
        plan.mark_skipped(&id);
        for succ in graph.successors(&id) {
            if !visited.contains(&succ.id) {
                stack.push(succ.id.clone());
            }
        }
    }
}
