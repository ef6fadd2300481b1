//! Node, edge, and operation payload types.

use serde::{Deserialize, Serialize};

use crate::condition::Predicate;
use crate::types::{Address, AssetKey, ChainId, NodeId};

/// Canvas position of a node, in editor coordinates.
///
/// Positions participate in the compiler's deterministic tie-break: when a
/// node fans out to several successors, the successor with the smaller `y`
/// is visited first, falling back to smaller `x` within an epsilon band.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A node in the flow graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    pub id: NodeId,
    pub position: Position,
    pub spec: NodeSpec,
}

impl FlowNode {
    #[must_use]
    pub fn new(id: impl Into<NodeId>, position: Position, spec: NodeSpec) -> Self {
        Self {
            id: id.into(),
            position,
            spec,
        }
    }
}

/// A directed edge between two nodes.
///
/// Duplicate `(source, target)` pairs are legal (the editor may render them
/// for cosmetic reasons); the compiler's visited set makes them harmless.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEdge {
    pub id: String,
    pub source: NodeId,
    pub target: NodeId,
}

impl FlowEdge {
    #[must_use]
    pub fn new(id: impl Into<String>, source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Kind-specific node payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeSpec {
    /// The single wallet root. Passthrough: traversed, never emitted.
    Wallet,
    /// Routing/selector node. Passthrough: traversed, never emitted.
    Selector,
    /// Conditional branch. Emitted as a step (for the execution summary) but
    /// contributes no ledger operation.
    Branch(Predicate),
    /// An operation that contributes ledger operations (or a bridge process).
    Op(OpSpec),
}

impl NodeSpec {
    /// Passthrough nodes route traversal into their successors without
    /// appearing in the compiled plan.
    #[must_use]
    pub fn is_passthrough(&self) -> bool {
        matches!(self, NodeSpec::Wallet | NodeSpec::Selector)
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        matches!(self, NodeSpec::Wallet)
    }

    #[must_use]
    pub fn is_branch(&self) -> bool {
        matches!(self, NodeSpec::Branch(_))
    }

    #[must_use]
    pub fn as_op(&self) -> Option<&OpSpec> {
        match self {
            NodeSpec::Op(op) => Some(op),
            _ => None,
        }
    }
}

/// A transfer/call recipient: either a canonical address or a human-readable
/// name-service alias resolved once before assembly.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipient {
    Address(Address),
    Name(String),
}

/// Direction of a lending-protocol operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LendAction {
    Deposit,
    Withdraw,
    Borrow,
    Repay,
}

/// Direction of a staking-protocol operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakeAction {
    Stake,
    Unstake,
}

/// Operation payloads. Amounts are `u64` base units; `None` means the editor
/// has not (yet) filled the field in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OpSpec {
    Transfer {
        asset: AssetKey,
        amount: Option<u64>,
        recipient: Option<Recipient>,
    },
    Swap {
        from_asset: AssetKey,
        to_asset: AssetKey,
        amount: Option<u64>,
        protocol: String,
    },
    Lend {
        action: LendAction,
        asset: AssetKey,
        amount: Option<u64>,
        protocol: String,
    },
    Stake {
        action: StakeAction,
        asset: AssetKey,
        amount: Option<u64>,
        protocol: String,
    },
    Bridge {
        from_asset: AssetKey,
        to_asset: AssetKey,
        amount: Option<u64>,
        from_chain: ChainId,
        to_chain: ChainId,
        recipient: Option<Recipient>,
    },
    /// Escape hatch for protocol-specific operations the built-in variants do
    /// not model. Interpreted entirely by the registered adapter.
    Custom {
        protocol: String,
        asset: AssetKey,
        amount: Option<u64>,
        params: serde_json::Value,
    },
}

/// Discriminant of [`OpSpec`], used (together with the protocol selection) to
/// key the adapter registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Transfer,
    Swap,
    Lend,
    Stake,
    Bridge,
    Custom,
}

impl OpSpec {
    #[must_use]
    pub fn kind(&self) -> OpKind {
        match self {
            OpSpec::Transfer { .. } => OpKind::Transfer,
            OpSpec::Swap { .. } => OpKind::Swap,
            OpSpec::Lend { .. } => OpKind::Lend,
            OpSpec::Stake { .. } => OpKind::Stake,
            OpSpec::Bridge { .. } => OpKind::Bridge,
            OpSpec::Custom { .. } => OpKind::Custom,
        }
    }

    /// Protocol selection, empty for protocol-less operations (transfer,
    /// bridge — the bridge tool is chosen by the routing service, not here).
    #[must_use]
    pub fn protocol(&self) -> &str {
        match self {
            OpSpec::Transfer { .. } | OpSpec::Bridge { .. } => "",
            OpSpec::Swap { protocol, .. }
            | OpSpec::Lend { protocol, .. }
            | OpSpec::Stake { protocol, .. }
            | OpSpec::Custom { protocol, .. } => protocol,
        }
    }

    #[must_use]
    pub fn is_bridge(&self) -> bool {
        matches!(self, OpSpec::Bridge { .. })
    }

    /// The editor-supplied amount field, whichever variant carries it.
    #[must_use]
    pub fn amount(&self) -> Option<u64> {
        match self {
            OpSpec::Transfer { amount, .. }
            | OpSpec::Swap { amount, .. }
            | OpSpec::Lend { amount, .. }
            | OpSpec::Stake { amount, .. }
            | OpSpec::Bridge { amount, .. }
            | OpSpec::Custom { amount, .. } => *amount,
        }
    }

    /// The asset this operation consumes from the signer (or the pool), if
    /// any. Withdraw/borrow/unstake produce value instead of consuming it.
    #[must_use]
    pub fn consumed_asset(&self) -> Option<&AssetKey> {
        match self {
            OpSpec::Transfer { asset, .. } => Some(asset),
            OpSpec::Swap { from_asset, .. } => Some(from_asset),
            OpSpec::Lend { action, asset, .. } => match action {
                LendAction::Deposit | LendAction::Repay => Some(asset),
                LendAction::Withdraw | LendAction::Borrow => None,
            },
            OpSpec::Stake { action, asset, .. } => match action {
                StakeAction::Stake => Some(asset),
                StakeAction::Unstake => None,
            },
            OpSpec::Bridge { from_asset, .. } => Some(from_asset),
            OpSpec::Custom { asset, amount, .. } => {
                // A custom op with an amount consumes that asset; pure
                // read/claim ops leave the amount unset.
                amount.map(|_| asset)
            }
        }
    }

    /// The asset this operation produces into the resource pool, if any.
    ///
    /// Swap output is settled to the signer inside the swap call itself and
    /// is therefore *not* pool-produced.
    #[must_use]
    pub fn produced_asset(&self) -> Option<&AssetKey> {
        match self {
            OpSpec::Lend { action, asset, .. } => match action {
                LendAction::Withdraw | LendAction::Borrow => Some(asset),
                LendAction::Deposit | LendAction::Repay => None,
            },
            OpSpec::Stake { action, asset, .. } => match action {
                StakeAction::Unstake => Some(asset),
                StakeAction::Stake => None,
            },
            _ => None,
        }
    }
}
