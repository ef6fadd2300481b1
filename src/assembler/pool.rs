//! The intermediate resource pool.
//!
//! Value produced by one step (a withdrawal, a borrow) and consumed by a
//! later step in the same run never round-trips through the external ledger:
//! it is parked here, keyed by asset identity, as a handle into the
//! in-progress transaction. The pool is exclusively owned by one assembly
//! invocation; it is never shared across runs or across the same-chain /
//! bridge boundary.

use rustc_hash::FxHashMap;

use super::tx::{HoldingRef, TxBuilder, ValueHandle};
use crate::types::AssetKey;

/// One pooled value: a transaction handle plus the amount it carries.
#[derive(Clone, Copy, Debug)]
pub struct PoolEntry {
    pub handle: ValueHandle,
    pub amount: u64,
}

/// Per-asset holding area for produced-but-unsettled value.
#[derive(Debug, Default)]
pub struct ResourcePool {
    entries: FxHashMap<AssetKey, PoolEntry>,
}

impl ResourcePool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register produced value, merging with any existing entry for the
    /// same asset inside the transaction.
    pub fn deposit(
        &mut self,
        asset: AssetKey,
        handle: ValueHandle,
        amount: u64,
        tx: &mut TxBuilder,
    ) {
        match self.entries.get_mut(&asset) {
            Some(entry) => {
                tx.merge(
                    HoldingRef::Value(entry.handle),
                    vec![HoldingRef::Value(handle)],
                );
                entry.amount = entry.amount.saturating_add(amount);
            }
            None => {
                self.entries.insert(asset, PoolEntry { handle, amount });
            }
        }
    }

    /// Take exactly `amount` of `asset` from the pool, if it holds enough.
    ///
    /// An exact match hands over the pooled handle; otherwise the needed
    /// amount is split off and the remainder stays pooled. Returns `None`
    /// when the pool cannot cover the full amount, in which case the caller
    /// sources the input externally instead.
    pub fn take(
        &mut self,
        asset: &AssetKey,
        amount: u64,
        tx: &mut TxBuilder,
    ) -> Option<ValueHandle> {
        let entry = self.entries.get_mut(asset)?;
        if entry.amount < amount {
            return None;
        }
        if entry.amount == amount {
            let entry = self.entries.remove(asset).expect("entry just observed");
            return Some(entry.handle);
        }
        let split = tx.split(HoldingRef::Value(entry.handle), amount);
        entry.amount -= amount;
        Some(split)
    }

    #[must_use]
    pub fn holds(&self, asset: &AssetKey) -> Option<u64> {
        self.entries.get(asset).map(|e| e.amount)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drain residual entries in deterministic (asset-sorted) order.
    ///
    /// Residual *produced* value not consumed by any step is legal; assembly
    /// returns it to the signer so every unit entering the transaction is
    /// accounted for exactly once.
    pub fn drain_sorted(&mut self) -> Vec<(AssetKey, PoolEntry)> {
        let mut out: Vec<(AssetKey, PoolEntry)> = self.entries.drain().collect();
        out.sort_by(|(a, _), (b, _)| a.0.cmp(&b.0));
        out
    }
}
