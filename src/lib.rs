//! # Ledgerflow: Sequence Compiler & Execution Engine for Node-Graph Flows
//!
//! Ledgerflow turns a user-drawn directed graph of financial operations
//! (transfer, swap, lend/borrow, stake, bridge, conditional branch) into a
//! deterministic, ordered execution plan and runs it against a ledger.
//!
//! ## Core Concepts
//!
//! - **Flow graph**: read-only snapshot of nodes and edges supplied by the
//!   visual editor, rooted at a single wallet node
//! - **Plan**: the compiled, ordered, deduplicated step list
//! - **Skip marks**: monotonic flags applied by branch-condition evaluation
//! - **Resource pool**: in-transaction holding area that threads value
//!   produced by one step into a later step without an external round trip
//! - **Bridge orchestration**: cross-chain steps executed outside the atomic
//!   transaction, with bounded retry, provider denylisting, and a live
//!   status state machine
//!
//! ## Execution Model
//!
//! One call to [`engine::Engine::run`] performs the whole pipeline:
//!
//! 1. [`compiler::compile`] linearizes the graph into a [`compiler::Plan`]
//!    via a deterministic, position-ordered depth-first traversal.
//! 2. [`condition::evaluate_branches`] resolves every branch predicate in
//!    plan order and marks unsatisfied subtrees as skipped.
//! 3. [`assembler::assemble`] builds one all-or-nothing transaction for all
//!    live same-chain steps, sourcing inputs pool-first.
//! 4. The same-chain transaction is signed and submitted through the
//!    caller-supplied [`ledger::Wallet`].
//! 5. [`bridge`] steps run sequentially afterwards, each with its own retry
//!    loop and [`bridge::BridgeStatus`] published on the event bus.
//!
//! Same-chain failure semantics are atomic: validation, resource, and
//! predicate errors abort before anything is submitted. Bridge failures are
//! scoped to their own step and never roll back a submitted transaction.
//!
//! ## Module Guide
//!
//! - [`graph`] - flow graph model and structural validation
//! - [`compiler`] - deterministic linearization into a step plan
//! - [`condition`] - branch predicates and skip-mark propagation
//! - [`assembler`] - atomic transaction assembly and the resource pool
//! - [`adapters`] - pluggable per-protocol operation builders
//! - [`bridge`] - cross-chain orchestration and retry state machine
//! - [`estimator`] - advisory per-asset balance projection
//! - [`engine`] - the run pipeline and in-progress guard
//! - [`events`] - live status event bus with pluggable sinks
//! - [`ledger`] - external wallet / coin / name-service interfaces

pub mod adapters;
pub mod assembler;
pub mod bridge;
pub mod compiler;
pub mod condition;
pub mod engine;
pub mod estimator;
pub mod events;
pub mod graph;
pub mod ledger;
pub mod telemetry;
pub mod types;
