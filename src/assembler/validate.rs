//! Fail-fast pre-assembly validation and one-shot name resolution.
//!
//! Every live operation step is checked for mandatory fields before a single
//! ledger operation is built; the first violation aborts with its step
//! index. Name-service aliases are resolved here, exactly once per run, and
//! the resolved form is reused for both validation and call construction so
//! a name cannot change meaning mid-assembly.

use rustc_hash::FxHashMap;

use super::AssembleError;
use crate::compiler::Plan;
use crate::graph::{FlowGraph, NodeSpec, OpSpec, Recipient};
use crate::ledger::AddressResolver;
use crate::types::Address;

/// Aliases resolved to canonical addresses for this run.
#[derive(Debug, Default)]
pub(crate) struct ResolvedAddresses {
    map: FxHashMap<String, Address>,
}

impl ResolvedAddresses {
    pub(crate) fn canonical(&self, recipient: &Recipient) -> Option<Address> {
        match recipient {
            Recipient::Address(addr) => Some(addr.clone()),
            Recipient::Name(name) => self.map.get(name).cloned(),
        }
    }
}

/// Validate every live operation step and resolve all aliases they mention.
pub(crate) async fn validate_and_resolve(
    graph: &FlowGraph,
    plan: &Plan,
    resolver: &dyn AddressResolver,
) -> Result<ResolvedAddresses, AssembleError> {
    let mut resolved = ResolvedAddresses::default();

    for step in plan.live_steps() {
        let Some(node) = graph.node(&step.node) else {
            continue;
        };
        let op = match &node.spec {
            NodeSpec::Op(op) => op,
            // Branch steps carry no ledger operation and need no fields.
            _ => continue,
        };

        validate_op(step.index, op)?;

        for recipient in op_recipients(op) {
            if let Recipient::Name(name) = recipient {
                if !resolved.map.contains_key(name) {
                    let address = resolver.resolve(name).await.map_err(|source| {
                        AssembleError::Resolution {
                            step: step.index,
                            source,
                        }
                    })?;
                    tracing::debug!(name = %name, address = %address, "resolved alias");
                    resolved.map.insert(name.clone(), address);
                }
            }
        }
    }

    Ok(resolved)
}

fn validate_op(step: usize, op: &OpSpec) -> Result<(), AssembleError> {
    let fail = |message: &str| {
        Err(AssembleError::Validation {
            step,
            message: message.to_string(),
        })
    };

    match op {
        OpSpec::Transfer {
            amount, recipient, ..
        } => {
            if recipient.is_none() {
                return fail("transfer recipient is not set");
            }
            require_amount(step, *amount)?;
        }
        OpSpec::Swap {
            from_asset,
            to_asset,
            amount,
            ..
        } => {
            if from_asset == to_asset {
                return fail("swap input and output assets must differ");
            }
            require_amount(step, *amount)?;
        }
        OpSpec::Lend { amount, .. } | OpSpec::Stake { amount, .. } => {
            require_amount(step, *amount)?;
        }
        OpSpec::Bridge {
            from_chain,
            to_chain,
            amount,
            ..
        } => {
            if from_chain == to_chain {
                return fail("bridge source and destination chains must differ");
            }
            require_amount(step, *amount)?;
        }
        OpSpec::Custom {
            protocol, amount, ..
        } => {
            if protocol.is_empty() {
                return fail("custom operation has no protocol selected");
            }
            // A custom op may legitimately consume nothing; but a zero
            // amount is always a configuration mistake.
            if *amount == Some(0) {
                return fail("amount must be greater than zero");
            }
        }
    }

    Ok(())
}

fn require_amount(step: usize, amount: Option<u64>) -> Result<(), AssembleError> {
    match amount {
        Some(a) if a > 0 => Ok(()),
        Some(_) => Err(AssembleError::Validation {
            step,
            message: "amount must be greater than zero".to_string(),
        }),
        None => Err(AssembleError::Validation {
            step,
            message: "amount is not set".to_string(),
        }),
    }
}

fn op_recipients(op: &OpSpec) -> impl Iterator<Item = &Recipient> {
    let recipient = match op {
        OpSpec::Transfer { recipient, .. } | OpSpec::Bridge { recipient, .. } => recipient.as_ref(),
        _ => None,
    };
    recipient.into_iter()
}
