//! The in-progress atomic transaction and its opaque value handles.
//!
//! A [`TxBuilder`] accumulates typed ledger operations; each operation that
//! produces value yields a [`ValueHandle`] referring to that not-yet-settled
//! result. Handles are only meaningful inside the transaction they were
//! minted in, which is exactly why bridge steps (a different transaction
//! context) can never consume them.

use serde::{Deserialize, Serialize};

use crate::ledger::CoinId;
use crate::types::Address;

/// Opaque reference to the value produced by one operation in the
/// in-progress transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueHandle(u32);

/// Something that holds value: an externally-owned coin or an in-transaction
/// produced result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldingRef {
    Coin(CoinId),
    Value(ValueHandle),
}

/// Argument to a protocol call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallArg {
    Value(ValueHandle),
    Address(Address),
    Literal(serde_json::Value),
}

/// One operation inside the atomic transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerOp {
    /// Split `amount` off a holding; produces the split value.
    Split { source: HoldingRef, amount: u64 },
    /// Merge `sources` into `primary`; the merged value stays addressable
    /// through whatever referenced `primary` before.
    Merge {
        primary: HoldingRef,
        sources: Vec<HoldingRef>,
    },
    /// Transfer a produced value out to a recipient.
    Transfer {
        value: ValueHandle,
        recipient: Address,
    },
    /// Protocol-specific call appended by an adapter; produces its result.
    Call {
        protocol: String,
        function: String,
        args: Vec<CallArg>,
    },
}

/// Builder for the single all-or-nothing transaction of a run.
#[derive(Debug, Default)]
pub struct TxBuilder {
    ops: Vec<LedgerOp>,
}

impl TxBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, op: LedgerOp) -> ValueHandle {
        let handle = ValueHandle(self.ops.len() as u32);
        self.ops.push(op);
        handle
    }

    /// Split an exact amount off a holding, producing a new value.
    pub fn split(&mut self, source: HoldingRef, amount: u64) -> ValueHandle {
        self.push(LedgerOp::Split { source, amount })
    }

    /// Merge several holdings into a primary one.
    pub fn merge(&mut self, primary: HoldingRef, sources: Vec<HoldingRef>) {
        self.push(LedgerOp::Merge { primary, sources });
    }

    /// Transfer a produced value to a recipient.
    pub fn transfer(&mut self, value: ValueHandle, recipient: Address) {
        self.push(LedgerOp::Transfer { value, recipient });
    }

    /// Append a protocol call, producing its result handle.
    pub fn call(
        &mut self,
        protocol: impl Into<String>,
        function: impl Into<String>,
        args: Vec<CallArg>,
    ) -> ValueHandle {
        self.push(LedgerOp::Call {
            protocol: protocol.into(),
            function: function.into(),
            args,
        })
    }

    #[must_use]
    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    #[must_use]
    pub fn finish(self) -> LedgerTransaction {
        LedgerTransaction { ops: self.ops }
    }
}

/// The completed transaction, ready for one signature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    ops: Vec<LedgerOp>,
}

impl LedgerTransaction {
    #[must_use]
    pub fn ops(&self) -> &[LedgerOp] {
        &self.ops
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
