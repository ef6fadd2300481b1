//! Run orchestration: compile, prune, assemble, submit, bridge.
//!
//! [`Engine`] owns the injected collaborators (wallet, ledger reads, name
//! service, predicate source, bridge router, adapter registry) and drives one
//! flow graph through the full pipeline:
//!
//! 1. compile the graph into a deterministic plan
//! 2. evaluate branch predicates and mark skipped subtrees
//! 3. assemble every live same-chain step into one atomic transaction
//! 4. sign and submit that transaction (all-or-nothing)
//! 5. run bridge steps sequentially, each to a terminal outcome
//!
//! One run per signer at a time: a second concurrent `run` call fails fast
//! with [`RunError::AlreadyRunning`] instead of racing coin selection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use miette::Diagnostic;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::instrument;

use crate::adapters::AdapterRegistry;
use crate::assembler::{AssembleError, assemble};
use crate::bridge::{BridgeOutcome, BridgeRouter, RouteRequest, run_bridge_step};
use crate::compiler::compile;
use crate::condition::{EvalError, PredicateSource, evaluate_branches};
use crate::events::{Event, EventBus};
use crate::graph::{FlowGraph, NodeSpec, OpSpec};
use crate::ledger::{AddressResolver, CoinSource, SubmitError, Wallet};
use crate::types::{Address, TxId};

/// Run failure. Everything here aborts before (or during) submission; bridge
/// step failures are per-step outcomes, not run errors.
#[derive(Debug, Error, Diagnostic)]
pub enum RunError {
    #[error("a run is already in progress for this signer")]
    #[diagnostic(
        code(ledgerflow::engine::already_running),
        help("Wait for the active run to finish; concurrent runs would race coin selection.")
    )]
    AlreadyRunning,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Assemble(#[from] AssembleError),

    /// The user declined the signature prompt. A deliberate action, not a
    /// fault; callers should not surface it as an error toast.
    #[error("signature rejected by user")]
    #[diagnostic(code(ledgerflow::engine::signature_rejected))]
    SignatureRejected,

    #[error("transaction submission failed: {message}")]
    #[diagnostic(code(ledgerflow::engine::submission))]
    Submission { message: String },
}

/// What one completed run produced.
#[derive(Debug)]
pub struct ExecutionResult {
    /// Identifier of the submitted same-chain transaction, `None` when there
    /// was nothing to sign.
    pub tx: Option<TxId>,
    /// Live operation steps executed (same-chain plus bridge; branch steps
    /// are not counted).
    pub step_count: usize,
    /// Terminal outcome of each live bridge step, in plan order.
    pub bridges: Vec<BridgeOutcome>,
}

/// A collaborator the builder still needs.
#[derive(Debug, Error, Diagnostic)]
#[error("engine is missing a collaborator: {name}")]
#[diagnostic(
    code(ledgerflow::engine::incomplete),
    help("Every collaborator must be injected before build(); there are no defaults.")
)]
pub struct BuildError {
    pub name: &'static str,
}

/// Builder for [`Engine`]. All collaborators are mandatory except the
/// adapter registry (defaults to the built-ins) and the event bus (defaults
/// to a tracing sink).
#[derive(Default)]
pub struct EngineBuilder {
    wallet: Option<Arc<dyn Wallet>>,
    coins: Option<Arc<dyn CoinSource>>,
    resolver: Option<Arc<dyn AddressResolver>>,
    predicates: Option<Arc<dyn PredicateSource>>,
    router: Option<Arc<dyn BridgeRouter>>,
    adapters: Option<AdapterRegistry>,
    bus: Option<EventBus>,
}

impl EngineBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_wallet(mut self, wallet: Arc<dyn Wallet>) -> Self {
        self.wallet = Some(wallet);
        self
    }

    #[must_use]
    pub fn with_coin_source(mut self, coins: Arc<dyn CoinSource>) -> Self {
        self.coins = Some(coins);
        self
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn AddressResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn with_predicate_source(mut self, predicates: Arc<dyn PredicateSource>) -> Self {
        self.predicates = Some(predicates);
        self
    }

    #[must_use]
    pub fn with_router(mut self, router: Arc<dyn BridgeRouter>) -> Self {
        self.router = Some(router);
        self
    }

    #[must_use]
    pub fn with_adapters(mut self, adapters: AdapterRegistry) -> Self {
        self.adapters = Some(adapters);
        self
    }

    #[must_use]
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn build(self) -> Result<Engine, BuildError> {
        let missing = |name| BuildError { name };
        Ok(Engine {
            wallet: self.wallet.ok_or(missing("wallet"))?,
            coins: self.coins.ok_or(missing("coin source"))?,
            resolver: self.resolver.ok_or(missing("address resolver"))?,
            predicates: self.predicates.ok_or(missing("predicate source"))?,
            router: self.router.ok_or(missing("bridge router"))?,
            adapters: self.adapters.unwrap_or_else(AdapterRegistry::with_builtins),
            bus: self.bus.unwrap_or_default(),
            in_progress: AtomicBool::new(false),
        })
    }
}

/// The execution engine. Construct once per signer via [`Engine::builder`],
/// then [`run`](Engine::run) graphs against it.
pub struct Engine {
    wallet: Arc<dyn Wallet>,
    coins: Arc<dyn CoinSource>,
    resolver: Arc<dyn AddressResolver>,
    predicates: Arc<dyn PredicateSource>,
    router: Arc<dyn BridgeRouter>,
    adapters: AdapterRegistry,
    bus: EventBus,
    in_progress: AtomicBool,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("in_progress", &self.in_progress)
            .finish_non_exhaustive()
    }
}

impl Engine {
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Whether a run is currently executing.
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Subscribe to status events; events emitted after this call are
    /// forwarded to the returned receiver.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Event> {
        self.bus.subscribe()
    }

    /// Stop the event listener after draining in-flight events. Call when
    /// tearing the engine down; runs started afterwards restart it.
    pub async fn stop_events(&self) {
        self.bus.stop_listener().await;
    }

    /// Execute one flow graph end to end.
    #[instrument(skip_all, fields(nodes = graph.nodes().len()))]
    pub async fn run(&self, graph: &FlowGraph) -> Result<ExecutionResult, RunError> {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RunError::AlreadyRunning);
        }
        let _guard = RunGuard(&self.in_progress);

        self.bus.listen_for_events();
        let events = self.bus.get_sender();
        let signer = self.wallet.address();

        let _ = events.send(Event::diagnostic("run", "run started"));

        let mut plan = compile(graph);
        evaluate_branches(graph, &mut plan, self.predicates.as_ref()).await?;

        let assembly = assemble(
            graph,
            &plan,
            &signer,
            self.coins.as_ref(),
            self.resolver.as_ref(),
            &self.adapters,
        )
        .await?;

        let bridge_steps = bridge_requests(graph, &plan, &signer, &assembly);
        let step_count = assembly.live_steps + bridge_steps.len();

        if assembly.tx.is_none() && bridge_steps.is_empty() {
            tracing::info!("all operations were skipped; nothing to execute");
            let _ = events.send(Event::diagnostic(
                "run",
                "all operations were skipped; nothing to execute",
            ));
            return Ok(ExecutionResult {
                tx: None,
                step_count: 0,
                bridges: Vec::new(),
            });
        }

        let tx = match assembly.tx {
            Some(tx) => {
                let id = self.wallet.sign_and_submit(tx).await.map_err(|e| match e {
                    SubmitError::Rejected => RunError::SignatureRejected,
                    SubmitError::Ledger { message } => RunError::Submission { message },
                })?;
                tracing::info!(tx = %id, steps = assembly.live_steps, "atomic transaction confirmed");
                for step in plan.live_steps() {
                    if let Some(NodeSpec::Op(op)) = graph.node(&step.node).map(|n| &n.spec) {
                        if !op.is_bridge() {
                            let _ = events.send(Event::step(
                                step.index,
                                step.node.clone(),
                                format!("confirmed in {id}"),
                            ));
                        }
                    }
                }
                Some(id)
            }
            None => None,
        };

        // Bridge steps run strictly after the atomic transaction, one at a
        // time. A failed step does not stop later steps and never touches
        // the already-submitted transaction.
        let mut bridges = Vec::with_capacity(bridge_steps.len());
        for (step, request) in bridge_steps {
            let outcome = run_bridge_step(self.router.as_ref(), step, request, &events).await;
            tracing::info!(step, phase = ?outcome.phase(), "bridge step finished");
            bridges.push(outcome);
        }

        let _ = events.send(Event::diagnostic("run", "run finished"));
        Ok(ExecutionResult {
            tx,
            step_count,
            bridges,
        })
    }
}

/// Route requests for every live bridge step, in plan order.
///
/// Field presence and alias resolution were already enforced by pre-assembly
/// validation, so a malformed step here is a bug; it is logged and skipped
/// rather than crashing a run that already submitted.
fn bridge_requests(
    graph: &FlowGraph,
    plan: &crate::compiler::Plan,
    signer: &Address,
    assembly: &crate::assembler::Assembly,
) -> Vec<(usize, RouteRequest)> {
    let mut requests = Vec::new();
    for step in plan.live_steps() {
        let Some(NodeSpec::Op(op)) = graph.node(&step.node).map(|n| &n.spec) else {
            continue;
        };
        let OpSpec::Bridge {
            from_asset,
            to_asset,
            amount,
            from_chain,
            to_chain,
            recipient,
        } = op
        else {
            continue;
        };
        let Some(amount) = *amount else {
            tracing::error!(step = step.index, "bridge step passed validation without an amount");
            continue;
        };
        let recipient = match recipient {
            Some(r) => match assembly.canonical(r) {
                Some(address) => address,
                None => {
                    tracing::error!(step = step.index, "bridge recipient alias was never resolved");
                    continue;
                }
            },
            // Default destination is the signer on the target chain.
            None => signer.clone(),
        };
        requests.push((
            step.index,
            RouteRequest {
                from_asset: from_asset.clone(),
                to_asset: to_asset.clone(),
                from_chain: from_chain.clone(),
                to_chain: to_chain.clone(),
                amount,
                owner: signer.clone(),
                recipient,
                denied_providers: Vec::new(),
            },
        ));
    }
    requests
}

struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
