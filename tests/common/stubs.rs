//! Stub collaborators: everything the engine treats as an injected
//! capability, backed by in-memory tables so tests can script and observe
//! every external interaction.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Notify;

use ledgerflow::adapters::{
    AdapterError, AdapterOutput, AdapterRegistry, OpContext, ProtocolAdapter,
};
use ledgerflow::assembler::{CallArg, LedgerTransaction, ValueHandle};
use ledgerflow::bridge::{
    BridgeRoute, BridgeRouter, ProcessKind, RouteFailure, RouteRequest, RouteUpdate, RouterError,
};
use ledgerflow::condition::{PredicateFetchError, PredicateSource, StateQuery};
use ledgerflow::graph::{LendAction, OpKind, OpSpec};
use ledgerflow::ledger::{
    AddressResolver, Coin, CoinSource, LedgerFetchError, ResolveError, SubmitError, Wallet,
};
use ledgerflow::types::{Address, AssetKey, ProviderId, TxId};

pub const SIGNER: &str = "0xsigner";

// ---------------------------------------------------------------------------
// predicate source

#[derive(Default)]
pub struct StubPredicateSource {
    balances: HashMap<(String, String), f64>,
    states: HashMap<String, f64>,
    fail: bool,
}

impl StubPredicateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(mut self, address: &str, asset: &str, value: f64) -> Self {
        self.balances
            .insert((address.to_string(), asset.to_string()), value);
        self
    }

    pub fn with_state(mut self, function: &str, value: f64) -> Self {
        self.states.insert(function.to_string(), value);
        self
    }

    /// Every fetch fails, as if the RPC endpoint were down.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl PredicateSource for StubPredicateSource {
    async fn balance_of(
        &self,
        address: &Address,
        asset: &AssetKey,
    ) -> Result<f64, PredicateFetchError> {
        if self.fail {
            return Err(PredicateFetchError::new("balance endpoint unreachable"));
        }
        Ok(*self
            .balances
            .get(&(address.to_string(), asset.to_string()))
            .unwrap_or(&0.0))
    }

    async fn read_state(&self, query: &StateQuery) -> Result<f64, PredicateFetchError> {
        if self.fail {
            return Err(PredicateFetchError::new("state endpoint unreachable"));
        }
        Ok(*self.states.get(&query.function).unwrap_or(&0.0))
    }
}

// ---------------------------------------------------------------------------
// coin source

/// Coin table keyed by asset, counting every enumeration call so tests can
/// assert the pool short-circuited the external fetch.
#[derive(Default)]
pub struct CountingCoinSource {
    coins: HashMap<String, Vec<Coin>>,
    calls: AtomicUsize,
}

impl CountingCoinSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_coins(mut self, asset: &str, coins: &[(&str, u64)]) -> Self {
        self.coins.insert(
            asset.to_string(),
            coins
                .iter()
                .map(|(id, amount)| Coin {
                    id: (*id).into(),
                    amount: *amount,
                })
                .collect(),
        );
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CoinSource for CountingCoinSource {
    async fn coins_of(
        &self,
        _owner: &Address,
        asset: &AssetKey,
    ) -> Result<Vec<Coin>, LedgerFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.coins.get(asset.as_str()).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// name service

#[derive(Default)]
pub struct StubResolver {
    map: HashMap<String, Address>,
    calls: AtomicUsize,
}

impl StubResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alias(mut self, name: &str, address: &str) -> Self {
        self.map.insert(name.to_string(), Address::from(address));
        self
    }

    pub fn resolve_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AddressResolver for StubResolver {
    async fn resolve(&self, name: &str) -> Result<Address, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.map.get(name).cloned().ok_or_else(|| ResolveError {
            name: name.to_string(),
            message: "unknown alias".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// wallet

pub struct StubWallet {
    reject: bool,
    submitted: Mutex<Vec<LedgerTransaction>>,
}

impl StubWallet {
    pub fn new() -> Self {
        Self {
            reject: false,
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// A wallet whose user declines every signature prompt.
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn submitted(&self) -> Vec<LedgerTransaction> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Wallet for StubWallet {
    fn address(&self) -> Address {
        Address::from(SIGNER)
    }

    async fn sign_and_submit(&self, tx: LedgerTransaction) -> Result<TxId, SubmitError> {
        if self.reject {
            return Err(SubmitError::Rejected);
        }
        self.submitted.lock().unwrap().push(tx);
        Ok(TxId::from("0xtx1"))
    }
}

/// Wallet that parks inside the signature prompt until released, so a test
/// can observe the engine mid-run.
#[derive(Default)]
pub struct GatedWallet {
    entered: Notify,
    release: Notify,
}

impl GatedWallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves once a run has reached the signature prompt.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the parked signature prompt proceed.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl Wallet for GatedWallet {
    fn address(&self) -> Address {
        Address::from(SIGNER)
    }

    async fn sign_and_submit(&self, _tx: LedgerTransaction) -> Result<TxId, SubmitError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(TxId::from("0xtx1"))
    }
}

// ---------------------------------------------------------------------------
// protocol adapters

/// Lending adapter: deposits and repayments consume their sourced input;
/// withdrawals and borrows produce pooled value.
pub struct TestLendAdapter;

impl ProtocolAdapter for TestLendAdapter {
    fn build(
        &self,
        cx: &mut OpContext<'_>,
        op: &OpSpec,
        input: Option<ValueHandle>,
    ) -> Result<AdapterOutput, AdapterError> {
        let OpSpec::Lend {
            action,
            asset,
            amount,
            protocol,
        } = op
        else {
            return Err(AdapterError::new("lend adapter got a non-lend op"));
        };
        let amount = amount.ok_or_else(|| AdapterError::new("lend amount missing"))?;
        match action {
            LendAction::Deposit | LendAction::Repay => {
                let value =
                    input.ok_or_else(|| AdapterError::new("lend consumption needs an input"))?;
                let function = if *action == LendAction::Deposit {
                    "deposit"
                } else {
                    "repay"
                };
                cx.tx
                    .call(protocol.clone(), function, vec![CallArg::Value(value)]);
                Ok(AdapterOutput::settled())
            }
            LendAction::Withdraw | LendAction::Borrow => {
                let function = if *action == LendAction::Withdraw {
                    "withdraw"
                } else {
                    "borrow"
                };
                let handle = cx.tx.call(
                    protocol.clone(),
                    function,
                    vec![CallArg::Literal(serde_json::json!(amount))],
                );
                Ok(AdapterOutput::producing(asset.clone(), handle, amount))
            }
        }
    }
}

/// Swap adapter: consumes the input asset; output settles to the signer in
/// the call itself, so nothing enters the pool.
pub struct TestSwapAdapter;

impl ProtocolAdapter for TestSwapAdapter {
    fn build(
        &self,
        cx: &mut OpContext<'_>,
        op: &OpSpec,
        input: Option<ValueHandle>,
    ) -> Result<AdapterOutput, AdapterError> {
        let OpSpec::Swap {
            to_asset, protocol, ..
        } = op
        else {
            return Err(AdapterError::new("swap adapter got a non-swap op"));
        };
        let value = input.ok_or_else(|| AdapterError::new("swap needs an input"))?;
        cx.tx.call(
            protocol.clone(),
            "swap_exact_in",
            vec![
                CallArg::Value(value),
                CallArg::Literal(serde_json::json!(to_asset.as_str())),
                CallArg::Address(cx.signer.clone()),
            ],
        );
        Ok(AdapterOutput::settled())
    }
}

/// Built-ins plus the protocols the tests exercise.
pub fn test_adapters() -> AdapterRegistry {
    let mut registry = AdapterRegistry::with_builtins();
    registry.register(OpKind::Lend, "navi", TestLendAdapter);
    registry.register(OpKind::Swap, "cetus", TestSwapAdapter);
    registry
}

// ---------------------------------------------------------------------------
// bridge router

/// What the router should do for one attempt (one route request plus its
/// execution).
#[derive(Clone, Debug)]
pub enum RouteScript {
    /// Route quotes fine, then fails pre-flight simulation.
    SimulationFail { provider: &'static str },
    /// Route quotes fine, then the user declines the signature.
    Reject { provider: &'static str },
    /// Route executes to completion, with the full update sequence.
    Complete { provider: &'static str },
    /// Source confirms, then the destination leg is lost.
    FailAfterConfirmation {
        provider: &'static str,
        tracking: &'static str,
    },
    /// No route obtainable at all.
    NoRoute,
}

impl RouteScript {
    fn provider(&self) -> &'static str {
        match self {
            RouteScript::SimulationFail { provider }
            | RouteScript::Reject { provider }
            | RouteScript::Complete { provider }
            | RouteScript::FailAfterConfirmation { provider, .. } => provider,
            RouteScript::NoRoute => "",
        }
    }
}

/// Router that plays a fixed script, one entry per attempt, recording every
/// route request it receives.
pub struct ScriptedRouter {
    script: Mutex<VecDeque<RouteScript>>,
    current: Mutex<Option<RouteScript>>,
    requests: Mutex<Vec<RouteRequest>>,
}

impl ScriptedRouter {
    pub fn new(script: Vec<RouteScript>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            current: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RouteRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl BridgeRouter for ScriptedRouter {
    async fn request_route(&self, request: &RouteRequest) -> Result<BridgeRoute, RouterError> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            None | Some(RouteScript::NoRoute) => Err(RouterError::new("no route available")),
            Some(script) => {
                let provider = script.provider();
                *self.current.lock().unwrap() = Some(script);
                Ok(BridgeRoute {
                    provider: ProviderId::from(provider),
                    tool: format!("{provider}-bridge"),
                    route_id: format!("route-{provider}"),
                    expected_output: request.amount,
                })
            }
        }
    }

    async fn execute_route(
        &self,
        _route: &BridgeRoute,
        updates: flume::Sender<RouteUpdate>,
    ) -> Result<(), RouteFailure> {
        let script = self.current.lock().unwrap().take();
        match script {
            Some(RouteScript::SimulationFail { provider }) => Err(RouteFailure::Simulation {
                provider: ProviderId::from(provider),
                message: "simulated output below minimum".to_string(),
            }),
            Some(RouteScript::Reject { .. }) => Err(RouteFailure::Rejected),
            Some(RouteScript::Complete { .. }) => {
                let _ = updates.send(RouteUpdate::Signed);
                let _ = updates.send(RouteUpdate::ProcessStarted {
                    kind: ProcessKind::Submission,
                    label: "submit".to_string(),
                });
                let _ = updates.send(RouteUpdate::SourceConfirmed {
                    tx: TxId::from("0xsource"),
                });
                let _ = updates.send(RouteUpdate::ProcessCompleted {
                    label: "submit".to_string(),
                });
                let _ = updates.send(RouteUpdate::ProcessStarted {
                    kind: ProcessKind::Relay,
                    label: "relay".to_string(),
                });
                let _ = updates.send(RouteUpdate::ProcessCompleted {
                    label: "relay".to_string(),
                });
                Ok(())
            }
            Some(RouteScript::FailAfterConfirmation { tracking, .. }) => {
                let _ = updates.send(RouteUpdate::Signed);
                let _ = updates.send(RouteUpdate::ProcessStarted {
                    kind: ProcessKind::Submission,
                    label: "submit".to_string(),
                });
                let _ = updates.send(RouteUpdate::SourceConfirmed {
                    tx: TxId::from("0xsource"),
                });
                Err(RouteFailure::AfterConfirmation {
                    tracking: tracking.to_string(),
                    message: "relay status lost".to_string(),
                })
            }
            Some(RouteScript::NoRoute) | None => Err(RouteFailure::Simulation {
                provider: ProviderId::from("unscripted"),
                message: "execute called without a scripted route".to_string(),
            }),
        }
    }
}
