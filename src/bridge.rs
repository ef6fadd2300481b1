//! Cross-chain bridge orchestration.
//!
//! Bridge steps run outside the atomic transaction, strictly after it has
//! been submitted, and sequentially with respect to each other (each depends
//! on the prior step's resolved destination and on the signer being idle).
//!
//! Per step the orchestrator drives a small state machine,
//! `signing → pending → bridging → done | failed`, fed by push updates from
//! the external routing service, and retries failed routes under an explicit
//! [`RetryState`]:
//!
//! - a pre-flight simulation failure denylists the provider and re-quotes,
//!   up to [`MAX_ROUTE_ATTEMPTS`] attempts
//! - a user-rejected signature aborts immediately, without retry
//! - any failure *after* the source-side transaction has confirmed is never
//!   retried (a retry could double-spend); the step reports `bridging` with
//!   a tracking reference, since the cross-chain leg is out of this run's
//!   control
//!
//! Failures are scoped to their own step: an exhausted step does not stop
//! later bridge steps and never rolls back the submitted same-chain
//! transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::Event;
use crate::types::{Address, AssetKey, ChainId, ProviderId, TxId};

/// Upper bound on route attempts per bridge step.
pub const MAX_ROUTE_ATTEMPTS: u32 = 3;

/// Live phase of one bridge step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgePhase {
    /// Route obtained (or re-obtained), waiting for signer approval.
    Signing,
    /// Signer approved; sub-processes begun, none terminal yet.
    Pending,
    /// A cross-chain relay sub-process is in flight.
    Bridging,
    /// Every sub-process reported terminal success.
    Done,
    /// A sub-process reported terminal failure (or retries ran out).
    Failed,
}

/// Category of a routing-service sub-process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKind {
    /// Source-chain submission.
    Submission,
    /// Cross-chain relay.
    Relay,
    /// Destination-chain settlement.
    Settlement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    Started,
    Completed,
    Failed,
}

/// One sub-process record from the routing service. These accumulate on the
/// status while everything else is overwritten in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BridgeProcess {
    pub kind: ProcessKind,
    pub label: String,
    pub state: ProcessState,
    pub message: Option<String>,
    pub at: DateTime<Utc>,
}

/// Live status of one bridge step. One instance exists per executing bridge
/// step; the orchestrator mutates it as the state machine advances and
/// publishes a snapshot on every transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BridgeStatus {
    pub phase: BridgePhase,
    pub processes: Vec<BridgeProcess>,
    /// The bridge tool of the current route, once one is obtained.
    pub tool: Option<String>,
    pub from_asset: AssetKey,
    pub to_asset: AssetKey,
    pub from_chain: ChainId,
    pub to_chain: ChainId,
    pub error: Option<String>,
}

impl BridgeStatus {
    fn new(request: &RouteRequest) -> Self {
        Self {
            phase: BridgePhase::Signing,
            processes: Vec::new(),
            tool: None,
            from_asset: request.from_asset.clone(),
            to_asset: request.to_asset.clone(),
            from_chain: request.from_chain.clone(),
            to_chain: request.to_chain.clone(),
            error: None,
        }
    }
}

/// What the orchestrator asks the routing service for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub from_asset: AssetKey,
    pub to_asset: AssetKey,
    pub from_chain: ChainId,
    pub to_chain: ChainId,
    pub amount: u64,
    pub owner: Address,
    pub recipient: Address,
    /// Providers excluded after earlier failed attempts of this step.
    pub denied_providers: Vec<ProviderId>,
}

/// One executable route quoted by the routing service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BridgeRoute {
    pub provider: ProviderId,
    pub tool: String,
    pub route_id: String,
    pub expected_output: u64,
}

/// Push update from the routing service while a route executes.
#[derive(Clone, Debug, PartialEq)]
pub enum RouteUpdate {
    /// Signer approved the route.
    Signed,
    /// The source-side transaction reached finality. After this point the
    /// orchestrator will never retry the step.
    SourceConfirmed { tx: TxId },
    ProcessStarted { kind: ProcessKind, label: String },
    ProcessCompleted { label: String },
}

/// Terminal failure of one route execution.
#[derive(Debug, Error)]
pub enum RouteFailure {
    /// Pre-flight simulation failed before the signer confirmed anything.
    /// Retryable: the provider is denylisted and a fresh route requested.
    #[error("route simulation failed via {provider}: {message}")]
    Simulation {
        provider: ProviderId,
        message: String,
    },

    /// The user declined the signature prompt. Aborts without retry.
    #[error("bridge signature rejected by user")]
    Rejected,

    /// Failure observed after the source transaction confirmed. Never
    /// retried; the step stays `bridging` with a tracking reference.
    #[error("bridge tracking lost after source confirmation: {message}")]
    AfterConfirmation { tracking: String, message: String },
}

/// Failure obtaining a route at all (no route for the request, service
/// unreachable). Terminal for the attempt loop: re-asking with an identical
/// request cannot succeed.
#[derive(Debug, Error)]
#[error("route request failed: {message}")]
pub struct RouterError {
    pub message: String,
}

impl RouterError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// External routing/execution service. Owns route discovery, signing
/// prompts, and submission; reports progress through the update channel.
#[async_trait]
pub trait BridgeRouter: Send + Sync {
    async fn request_route(&self, request: &RouteRequest) -> Result<BridgeRoute, RouterError>;

    async fn execute_route(
        &self,
        route: &BridgeRoute,
        updates: flume::Sender<RouteUpdate>,
    ) -> Result<(), RouteFailure>;
}

/// Retry bookkeeping threaded explicitly through the attempt loop.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RetryState {
    pub attempt: u32,
    pub denied_providers: Vec<ProviderId>,
}

impl RetryState {
    fn deny(&mut self, provider: ProviderId) {
        if !self.denied_providers.contains(&provider) {
            self.denied_providers.push(provider);
        }
    }
}

/// Terminal outcome of one bridge step.
#[derive(Clone, Debug)]
pub enum BridgeOutcome {
    /// Every sub-process completed.
    Completed {
        status: BridgeStatus,
        source_tx: Option<TxId>,
    },
    /// Source confirmed, destination leg still in flight and out of this
    /// run's control. Not a failure.
    InFlight {
        status: BridgeStatus,
        tracking: String,
    },
    /// User declined the signature. Deliberate action; not surfaced as an
    /// error.
    Rejected { status: BridgeStatus },
    /// Retries exhausted (or no route obtainable) before any source
    /// confirmation.
    Failed {
        status: BridgeStatus,
        attempts: u32,
    },
}

impl BridgeOutcome {
    #[must_use]
    pub fn status(&self) -> &BridgeStatus {
        match self {
            BridgeOutcome::Completed { status, .. }
            | BridgeOutcome::InFlight { status, .. }
            | BridgeOutcome::Rejected { status }
            | BridgeOutcome::Failed { status, .. } => status,
        }
    }

    #[must_use]
    pub fn phase(&self) -> BridgePhase {
        self.status().phase
    }
}

/// Execute one bridge step to a terminal outcome, publishing every status
/// transition as an [`Event::Bridge`] on `events`.
pub async fn run_bridge_step(
    router: &dyn BridgeRouter,
    step: usize,
    request: RouteRequest,
    events: &flume::Sender<Event>,
) -> BridgeOutcome {
    let mut retry = RetryState::default();
    let mut status = BridgeStatus::new(&request);

    loop {
        retry.attempt += 1;
        let mut attempt_request = request.clone();
        attempt_request.denied_providers = retry.denied_providers.clone();

        status.phase = BridgePhase::Signing;
        status.tool = None;
        status.error = None;
        publish(events, step, &status);

        let route = match router.request_route(&attempt_request).await {
            Ok(route) => route,
            Err(err) => {
                tracing::warn!(step, attempt = retry.attempt, error = %err, "route request failed");
                status.phase = BridgePhase::Failed;
                status.error = Some(err.message);
                publish(events, step, &status);
                return BridgeOutcome::Failed {
                    status,
                    attempts: retry.attempt,
                };
            }
        };

        tracing::debug!(
            step,
            attempt = retry.attempt,
            provider = %route.provider,
            tool = %route.tool,
            "route obtained"
        );
        status.tool = Some(route.tool.clone());
        publish(events, step, &status);

        let (update_tx, update_rx) = flume::unbounded();
        let mut execution = std::pin::pin!(router.execute_route(&route, update_tx));
        let mut source_tx: Option<TxId> = None;

        let result = loop {
            tokio::select! {
                res = &mut execution => break res,
                update = update_rx.recv_async() => {
                    if let Ok(update) = update {
                        apply_update(&mut status, &mut source_tx, update);
                        publish(events, step, &status);
                    }
                }
            }
        };
        // Updates sent just before the execution future resolved.
        while let Ok(update) = update_rx.try_recv() {
            apply_update(&mut status, &mut source_tx, update);
            publish(events, step, &status);
        }

        match result {
            Ok(()) => {
                status.phase = BridgePhase::Done;
                status.error = None;
                publish(events, step, &status);
                return BridgeOutcome::Completed { status, source_tx };
            }
            Err(RouteFailure::Rejected) => {
                tracing::info!(step, "bridge signature rejected; aborting step");
                status.phase = BridgePhase::Failed;
                publish(events, step, &status);
                return BridgeOutcome::Rejected { status };
            }
            Err(RouteFailure::AfterConfirmation { tracking, message }) => {
                tracing::warn!(step, tracking = %tracking, error = %message,
                    "post-confirmation failure; leg is out of this run's control");
                status.phase = BridgePhase::Bridging;
                status.error = None;
                publish(events, step, &status);
                return BridgeOutcome::InFlight { status, tracking };
            }
            Err(RouteFailure::Simulation { provider, message }) => {
                // The source leg may have confirmed even if the failure was
                // misclassified upstream; never retry past confirmation.
                if let Some(tx) = &source_tx {
                    status.phase = BridgePhase::Bridging;
                    publish(events, step, &status);
                    return BridgeOutcome::InFlight {
                        status,
                        tracking: tx.to_string(),
                    };
                }
                tracing::warn!(step, attempt = retry.attempt, provider = %provider, error = %message,
                    "route simulation failed");
                retry.deny(provider);
                status.error = Some(message);
                if retry.attempt >= MAX_ROUTE_ATTEMPTS {
                    status.phase = BridgePhase::Failed;
                    publish(events, step, &status);
                    return BridgeOutcome::Failed {
                        status,
                        attempts: retry.attempt,
                    };
                }
                // Re-quote with the next-best route.
            }
        }
    }
}

fn apply_update(status: &mut BridgeStatus, source_tx: &mut Option<TxId>, update: RouteUpdate) {
    match update {
        RouteUpdate::Signed => {
            if status.phase == BridgePhase::Signing {
                status.phase = BridgePhase::Pending;
            }
        }
        RouteUpdate::SourceConfirmed { tx } => {
            *source_tx = Some(tx);
        }
        RouteUpdate::ProcessStarted { kind, label } => {
            status.processes.push(BridgeProcess {
                kind,
                label,
                state: ProcessState::Started,
                message: None,
                at: Utc::now(),
            });
            status.phase = match kind {
                ProcessKind::Relay => BridgePhase::Bridging,
                _ if status.phase == BridgePhase::Signing => BridgePhase::Pending,
                _ => status.phase,
            };
        }
        RouteUpdate::ProcessCompleted { label } => {
            if let Some(process) = status
                .processes
                .iter_mut()
                .rev()
                .find(|p| p.label == label && p.state == ProcessState::Started)
            {
                process.state = ProcessState::Completed;
            }
        }
    }
}

fn publish(events: &flume::Sender<Event>, step: usize, status: &BridgeStatus) {
    // A dropped subscriber must not fail the bridge step.
    let _ = events.send(Event::bridge(step, status.clone()));
}
