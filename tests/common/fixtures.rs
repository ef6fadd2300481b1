//! Graph-building helpers shared across integration tests.

use ledgerflow::condition::{Comparator, Predicate};
use ledgerflow::graph::{
    FlowEdge, FlowGraph, FlowNode, LendAction, NodeSpec, OpSpec, Position, Recipient,
};
use ledgerflow::types::{Address, AssetKey, ChainId};

pub fn node(id: &str, x: f64, y: f64, spec: NodeSpec) -> FlowNode {
    FlowNode::new(id, Position::new(x, y), spec)
}

pub fn wallet(id: &str) -> FlowNode {
    node(id, 0.0, 0.0, NodeSpec::Wallet)
}

pub fn edge(source: &str, target: &str) -> FlowEdge {
    FlowEdge::new(format!("{source}->{target}"), source, target)
}

pub fn graph(nodes: Vec<FlowNode>, edges: Vec<FlowEdge>) -> FlowGraph {
    FlowGraph::new(nodes, edges).unwrap()
}

pub fn transfer(asset: &str, amount: Option<u64>, recipient: Option<Recipient>) -> NodeSpec {
    NodeSpec::Op(OpSpec::Transfer {
        asset: AssetKey::from(asset),
        amount,
        recipient,
    })
}

pub fn transfer_to(asset: &str, amount: u64, recipient: &str) -> NodeSpec {
    transfer(
        asset,
        Some(amount),
        Some(Recipient::Address(Address::from(recipient))),
    )
}

pub fn swap(from: &str, to: &str, amount: u64, protocol: &str) -> NodeSpec {
    NodeSpec::Op(OpSpec::Swap {
        from_asset: AssetKey::from(from),
        to_asset: AssetKey::from(to),
        amount: Some(amount),
        protocol: protocol.to_string(),
    })
}

pub fn lend(action: LendAction, asset: &str, amount: u64, protocol: &str) -> NodeSpec {
    NodeSpec::Op(OpSpec::Lend {
        action,
        asset: AssetKey::from(asset),
        amount: Some(amount),
        protocol: protocol.to_string(),
    })
}

pub fn bridge_op(
    from_asset: &str,
    to_asset: &str,
    amount: u64,
    from_chain: &str,
    to_chain: &str,
) -> NodeSpec {
    NodeSpec::Op(OpSpec::Bridge {
        from_asset: AssetKey::from(from_asset),
        to_asset: AssetKey::from(to_asset),
        amount: Some(amount),
        from_chain: ChainId::from(from_chain),
        to_chain: ChainId::from(to_chain),
        recipient: None,
    })
}

pub fn balance_branch(address: &str, asset: &str, comparator: Comparator, threshold: f64) -> NodeSpec {
    NodeSpec::Branch(Predicate::Balance {
        address: Some(Address::from(address)),
        asset: Some(AssetKey::from(asset)),
        comparator,
        threshold: Some(threshold),
    })
}

/// A branch the editor left half-filled: no threshold.
pub fn unconfigured_branch() -> NodeSpec {
    NodeSpec::Branch(Predicate::Balance {
        address: Some(Address::from("0xwho")),
        asset: None,
        comparator: Comparator::Gt,
        threshold: None,
    })
}

/// `wallet -> a -> b -> c` with top-to-bottom canvas placement.
pub fn linear_graph(a: NodeSpec, b: NodeSpec, c: NodeSpec) -> FlowGraph {
    graph(
        vec![
            wallet("w"),
            node("a", 0.0, 100.0, a),
            node("b", 0.0, 200.0, b),
            node("c", 0.0, 300.0, c),
        ],
        vec![edge("w", "a"), edge("a", "b"), edge("b", "c")],
    )
}
