//! Flow graph model: the read-only view of the editor's nodes and edges.
//!
//! The visual editor owns node placement and mutation; this module only
//! provides typed access plus the structural invariants the rest of the crate
//! relies on:
//!
//! - exactly one root ([`NodeSpec::Wallet`]) per graph
//! - every edge connects two existing nodes
//!
//! Node payloads are a tagged union per node kind ([`NodeSpec`] / [`OpSpec`]),
//! so every place that interprets a step can match exhaustively instead of
//! poking at a loosely-typed data blob. Editor-fillable operation fields
//! (amounts, recipients) stay `Option` here; the assembler's validation pass
//! is where "missing" becomes a step-indexed error.

mod flow;
mod model;

pub use flow::{FlowGraph, GraphError, POSITION_EPSILON};
pub use model::{
    FlowEdge, FlowNode, LendAction, NodeSpec, OpKind, OpSpec, Position, Recipient, StakeAction,
};
