//! Atomic transaction assembly.
//!
//! Converts every live, non-branch, non-bridge step of a plan into ledger
//! operations inside one all-or-nothing transaction. Step inputs are sourced
//! pool-first: value produced earlier in the same run is split to the exact
//! amount and consumed without touching the external ledger; only when the
//! pool cannot cover an input are the signer's holdings enumerated, merged if
//! necessary, and split.
//!
//! Accounting invariant: every unit of value entering the transaction is
//! either transferred externally or still registered in the pool when
//! assembly finishes; residual produced value is returned to the signer, so
//! nothing leaks and nothing can be spent twice. Cumulative external draws
//! are tracked per asset, so two sibling steps cannot both spend the same
//! holding.
//!
//! Validation runs fully before the first ledger operation is built — an
//! invalid step aborts with its index and builds nothing.

mod pool;
mod tx;
pub(crate) mod validate;

pub use pool::{PoolEntry, ResourcePool};
pub use tx::{CallArg, HoldingRef, LedgerOp, LedgerTransaction, TxBuilder, ValueHandle};

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::adapters::{AdapterRegistry, OpContext};
use crate::compiler::Plan;
use crate::graph::{FlowGraph, NodeSpec, OpKind, OpSpec};
use crate::ledger::{AddressResolver, CoinSource, LedgerFetchError, ResolveError};
use crate::types::{Address, AssetKey};

/// Assembly failure. Everything here aborts the run before submission; the
/// same-chain transaction is all-or-nothing.
#[derive(Debug, Error, Diagnostic)]
pub enum AssembleError {
    #[error("step {step}: {message}")]
    #[diagnostic(
        code(ledgerflow::assembler::validation),
        help("Validation runs before any ledger call; fix the step configuration and re-run.")
    )]
    Validation { step: usize, message: String },

    #[error("step {step}: {source}")]
    #[diagnostic(code(ledgerflow::assembler::resolution))]
    Resolution {
        step: usize,
        #[source]
        source: ResolveError,
    },

    #[error("step {step}: insufficient {asset} balance: need {needed}, have {available}")]
    #[diagnostic(code(ledgerflow::assembler::insufficient_balance))]
    InsufficientBalance {
        step: usize,
        asset: AssetKey,
        needed: u64,
        available: u64,
    },

    #[error("step {step}: failed to enumerate {asset} holdings: {source}")]
    #[diagnostic(code(ledgerflow::assembler::coin_fetch))]
    CoinFetch {
        step: usize,
        asset: AssetKey,
        #[source]
        source: LedgerFetchError,
    },

    #[error("step {step}: no adapter registered for {kind:?} via {protocol:?}")]
    #[diagnostic(
        code(ledgerflow::assembler::unknown_adapter),
        help("Register a ProtocolAdapter for this (kind, protocol) pair on the engine.")
    )]
    UnknownAdapter {
        step: usize,
        kind: OpKind,
        protocol: String,
    },

    #[error("step {step}: adapter failed: {message}")]
    #[diagnostic(code(ledgerflow::assembler::adapter))]
    Adapter { step: usize, message: String },
}

/// Result of assembling one plan.
#[derive(Debug)]
pub struct Assembly {
    /// `None` when every step was skipped or only bridge steps remained —
    /// there is nothing to sign.
    pub tx: Option<LedgerTransaction>,
    /// Number of operation steps that contributed ledger operations.
    pub live_steps: usize,
    /// Aliases resolved during validation, reused for bridge recipients so a
    /// name is never resolved twice in one run.
    resolved: validate::ResolvedAddresses,
}

impl Assembly {
    /// Canonical form of a recipient, from the run's one-shot alias table.
    #[must_use]
    pub fn canonical(&self, recipient: &crate::graph::Recipient) -> Option<Address> {
        self.resolved.canonical(recipient)
    }
}

/// Externally-sourced holdings of one asset: the (merged) primary coin plus
/// how much of it is still undrawn in this transaction.
struct ExternalHoldings {
    primary: crate::ledger::CoinId,
    remaining: u64,
}

/// Assemble all live same-chain steps into one transaction.
pub async fn assemble(
    graph: &FlowGraph,
    plan: &Plan,
    signer: &Address,
    coins: &dyn CoinSource,
    resolver: &dyn AddressResolver,
    adapters: &AdapterRegistry,
) -> Result<Assembly, AssembleError> {
    let resolved = validate::validate_and_resolve(graph, plan, resolver).await?;

    let op_steps: Vec<(usize, &OpSpec)> = plan
        .live_steps()
        .filter_map(|step| match graph.node(&step.node).map(|n| &n.spec) {
            Some(NodeSpec::Op(op)) if !op.is_bridge() => Some((step.index, op)),
            _ => None,
        })
        .collect();

    if op_steps.is_empty() {
        tracing::info!("no live same-chain steps; nothing to assemble");
        return Ok(Assembly {
            tx: None,
            live_steps: 0,
            resolved,
        });
    }

    let mut tx = TxBuilder::new();
    let mut pool = ResourcePool::new();
    let mut external: FxHashMap<AssetKey, ExternalHoldings> = FxHashMap::default();
    let live_steps = op_steps.len();

    for (step, op) in op_steps {
        let adapter = adapters
            .get(op.kind(), op.protocol())
            .cloned()
            .ok_or_else(|| AssembleError::UnknownAdapter {
                step,
                kind: op.kind(),
                protocol: op.protocol().to_string(),
            })?;

        let input = match adapter.required_input(op) {
            Some((asset, amount)) => Some(
                source_input(
                    step, &asset, amount, &mut pool, &mut external, &mut tx, signer, coins,
                )
                .await?,
            ),
            None => None,
        };

        let mut cx = OpContext {
            tx: &mut tx,
            signer,
            step,
            resolved: &resolved,
        };
        let output = adapter
            .build(&mut cx, op, input)
            .map_err(|e| AssembleError::Adapter {
                step,
                message: e.message,
            })?;

        if let Some(produced) = output.produced {
            tracing::debug!(
                step,
                asset = %produced.asset,
                amount = produced.amount,
                "step produced pooled value"
            );
            pool.deposit(produced.asset, produced.handle, produced.amount, &mut tx);
        }
    }

    // Residual produced value goes back to the signer; the pool ends the
    // run empty either way.
    for (asset, entry) in pool.drain_sorted() {
        tracing::debug!(asset = %asset, amount = entry.amount, "returning residual pooled value");
        tx.transfer(entry.handle, signer.clone());
    }

    tracing::info!(live_steps, ops = tx.op_count(), "assembled atomic transaction");
    Ok(Assembly {
        tx: Some(tx.finish()),
        live_steps,
        resolved,
    })
}

/// Source `amount` of `asset` for one step: pool first, then the signer's
/// external holdings (fetched once per asset, merged, drawn cumulatively).
#[allow(clippy::too_many_arguments)]
async fn source_input(
    step: usize,
    asset: &AssetKey,
    amount: u64,
    pool: &mut ResourcePool,
    external: &mut FxHashMap<AssetKey, ExternalHoldings>,
    tx: &mut TxBuilder,
    signer: &Address,
    coins: &dyn CoinSource,
) -> Result<ValueHandle, AssembleError> {
    if let Some(handle) = pool.take(asset, amount, tx) {
        tracing::debug!(step, asset = %asset, amount, "input satisfied from resource pool");
        return Ok(handle);
    }

    if !external.contains_key(asset) {
        let holdings =
            coins
                .coins_of(signer, asset)
                .await
                .map_err(|source| AssembleError::CoinFetch {
                    step,
                    asset: asset.clone(),
                    source,
                })?;
        let total: u64 = holdings.iter().map(|c| c.amount).sum();
        if total < amount {
            return Err(AssembleError::InsufficientBalance {
                step,
                asset: asset.clone(),
                needed: amount,
                available: total,
            });
        }
        let mut ids = holdings.into_iter().map(|c| c.id);
        let primary = ids.next().expect("total >= amount > 0 implies a coin");
        let rest: Vec<HoldingRef> = ids.map(HoldingRef::Coin).collect();
        if !rest.is_empty() {
            tx.merge(HoldingRef::Coin(primary.clone()), rest);
        }
        external.insert(
            asset.clone(),
            ExternalHoldings {
                primary,
                remaining: total,
            },
        );
    }

    let holdings = external.get_mut(asset).expect("inserted above");
    if holdings.remaining < amount {
        return Err(AssembleError::InsufficientBalance {
            step,
            asset: asset.clone(),
            needed: amount,
            available: holdings.remaining,
        });
    }
    holdings.remaining -= amount;
    let handle = tx.split(HoldingRef::Coin(holdings.primary.clone()), amount);
    tracing::debug!(step, asset = %asset, amount, "input sourced from external holdings");
    Ok(handle)
}
