mod common;

use common::*;
use ledgerflow::condition::Comparator;
use ledgerflow::estimator::estimate_at;
use ledgerflow::graph::LendAction;
use ledgerflow::types::NodeId;

#[test]
fn upstream_consumption_accumulates() {
    let g = linear_graph(
        transfer_to("SUI", 3, "0xa"),
        swap("SUI", "USDC", 5, "cetus"),
        transfer_to("SUI", 1, "0xb"),
    );
    // At c, both a (3) and b's swap input (5) have been committed.
    assert_eq!(estimate_at(&g, &NodeId::from("c"), &"SUI".into()), -8);
    // At a, nothing has run yet; its own delta is not counted.
    assert_eq!(estimate_at(&g, &NodeId::from("a"), &"SUI".into()), 0);
}

#[test]
fn only_the_requested_asset_is_aggregated() {
    let g = linear_graph(
        transfer_to("SUI", 3, "0xa"),
        transfer_to("USDC", 7, "0xb"),
        transfer_to("SUI", 1, "0xc"),
    );
    assert_eq!(estimate_at(&g, &NodeId::from("c"), &"USDC".into()), -7);
    assert_eq!(estimate_at(&g, &NodeId::from("c"), &"SUI".into()), -3);
}

#[test]
fn production_does_not_add_by_itself() {
    // A withdrawal produces USDC but the projection stays conservative.
    let g = linear_graph(
        lend(LendAction::Withdraw, "USDC", 50, "navi"),
        lend(LendAction::Repay, "USDC", 30, "navi"),
        transfer_to("USDC", 1, "0xa"),
    );
    assert_eq!(estimate_at(&g, &NodeId::from("b"), &"USDC".into()), 0);
    assert_eq!(estimate_at(&g, &NodeId::from("c"), &"USDC".into()), -30);
}

#[test]
fn branches_and_passthroughs_contribute_nothing() {
    let g = linear_graph(
        balance_branch("0xwho", "SUI", Comparator::Gt, 10.0),
        transfer_to("SUI", 4, "0xa"),
        transfer_to("SUI", 1, "0xb"),
    );
    assert_eq!(estimate_at(&g, &NodeId::from("c"), &"SUI".into()), -4);
}

#[test]
fn unreachable_target_projects_zero() {
    let g = graph(
        vec![
            wallet("w"),
            node("a", 0.0, 100.0, transfer_to("SUI", 3, "0xa")),
            node("island", 500.0, 500.0, transfer_to("SUI", 9, "0xb")),
        ],
        vec![edge("w", "a")],
    );
    assert_eq!(estimate_at(&g, &NodeId::from("island"), &"SUI".into()), 0);
}

#[test]
fn fan_out_uses_the_first_visit_path() {
    // Two paths to join: through a (consumes 10) first in canvas order,
    // through b (consumes 2) second. The first visit wins.
    let g = graph(
        vec![
            wallet("w"),
            node("a", 0.0, 100.0, transfer_to("SUI", 10, "0xa")),
            node("b", 0.0, 150.0, transfer_to("SUI", 2, "0xb")),
            node("join", 0.0, 300.0, transfer_to("SUI", 1, "0xj")),
        ],
        vec![
            edge("w", "a"),
            edge("w", "b"),
            edge("a", "join"),
            edge("b", "join"),
        ],
    );
    assert_eq!(estimate_at(&g, &NodeId::from("join"), &"SUI".into()), -10);
}
