//! Pluggable per-protocol operation builders.
//!
//! The assembler does not know how to talk to any specific protocol. Each
//! operation step is handed to a [`ProtocolAdapter`] looked up by
//! `(operation kind, protocol selection)`; the adapter appends whatever
//! ledger operations the protocol needs through the [`OpContext`] and
//! reports any value it produced for the resource pool.
//!
//! Only the plain [`TransferAdapter`] ships built in — it needs no protocol
//! knowledge. Swap, lending, and staking adapters are external collaborators
//! registered by the host application.

use rustc_hash::FxHashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::assembler::validate::ResolvedAddresses;
use crate::assembler::{TxBuilder, ValueHandle};
use crate::graph::{OpKind, OpSpec, Recipient};
use crate::types::{Address, AssetKey};

/// Build-time context handed to adapters: the in-progress transaction plus
/// everything resolved before assembly began.
pub struct OpContext<'a> {
    pub tx: &'a mut TxBuilder,
    pub signer: &'a Address,
    pub step: usize,
    pub(crate) resolved: &'a ResolvedAddresses,
}

impl OpContext<'_> {
    /// Canonical form of a recipient, using the pre-resolved alias table.
    ///
    /// Aliases were resolved before assembly; an unknown alias here means
    /// the adapter is asking about a recipient validation never saw, which
    /// is an adapter bug.
    pub fn canonical_recipient(&self, recipient: &Recipient) -> Result<Address, AdapterError> {
        self.resolved
            .canonical(recipient)
            .ok_or_else(|| AdapterError::new(format!("unresolved recipient {recipient:?}")))
    }
}

/// Value an adapter produced that is not settled externally by the call
/// itself, destined for the resource pool.
#[derive(Clone, Debug)]
pub struct ProducedValue {
    pub asset: AssetKey,
    pub handle: ValueHandle,
    pub amount: u64,
}

/// Result of building one operation.
#[derive(Clone, Debug, Default)]
pub struct AdapterOutput {
    pub produced: Option<ProducedValue>,
}

impl AdapterOutput {
    /// The operation settled everything externally (or consumed its input
    /// entirely); nothing enters the pool.
    #[must_use]
    pub fn settled() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn producing(asset: AssetKey, handle: ValueHandle, amount: u64) -> Self {
        Self {
            produced: Some(ProducedValue {
                asset,
                handle,
                amount,
            }),
        }
    }
}

/// Adapter failure surfaced with the step index by the assembler.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AdapterError {
    pub message: String,
}

impl AdapterError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One protocol's operation builder.
pub trait ProtocolAdapter: Send + Sync {
    /// Asset and amount this operation consumes, which the assembler sources
    /// (pool first, then externally) before calling [`build`](Self::build).
    ///
    /// The default derives the requirement from the operation payload;
    /// adapters for producing operations (withdraw, borrow, unstake) or
    /// read-only custom calls inherit the `None` it returns for those.
    fn required_input(&self, op: &OpSpec) -> Option<(AssetKey, u64)> {
        let asset = op.consumed_asset()?.clone();
        let amount = op.amount()?;
        Some((asset, amount))
    }

    /// Append this operation's ledger calls. `input` is the sourced value
    /// handle when [`required_input`](Self::required_input) returned `Some`.
    fn build(
        &self,
        cx: &mut OpContext<'_>,
        op: &OpSpec,
        input: Option<ValueHandle>,
    ) -> Result<AdapterOutput, AdapterError>;
}

/// Registry of adapters keyed by `(operation kind, protocol selection)`.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: FxHashMap<(OpKind, String), Arc<dyn ProtocolAdapter>>,
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-seeded with the built-in transfer adapter.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(OpKind::Transfer, "", TransferAdapter);
        registry
    }

    pub fn register(
        &mut self,
        kind: OpKind,
        protocol: impl Into<String>,
        adapter: impl ProtocolAdapter + 'static,
    ) {
        self.adapters
            .insert((kind, protocol.into()), Arc::new(adapter));
    }

    #[must_use]
    pub fn get(&self, kind: OpKind, protocol: &str) -> Option<&Arc<dyn ProtocolAdapter>> {
        self.adapters.get(&(kind, protocol.to_string()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

/// Built-in adapter for plain transfers: one `Transfer` operation sending
/// the sourced input to the (pre-resolved) recipient.
pub struct TransferAdapter;

impl ProtocolAdapter for TransferAdapter {
    fn build(
        &self,
        cx: &mut OpContext<'_>,
        op: &OpSpec,
        input: Option<ValueHandle>,
    ) -> Result<AdapterOutput, AdapterError> {
        let OpSpec::Transfer { recipient, .. } = op else {
            return Err(AdapterError::new("transfer adapter got a non-transfer op"));
        };
        let recipient = recipient
            .as_ref()
            .ok_or_else(|| AdapterError::new("transfer recipient missing"))?;
        let value =
            input.ok_or_else(|| AdapterError::new("transfer requires a sourced input value"))?;
        let address = cx.canonical_recipient(recipient)?;
        cx.tx.transfer(value, address);
        Ok(AdapterOutput::settled())
    }
}
