mod common;

use common::*;
use ledgerflow::compiler::compile;
use proptest::prelude::*;

fn step_ids(plan: &ledgerflow::compiler::Plan) -> Vec<String> {
    plan.steps().iter().map(|s| s.node.to_string()).collect()
}

proptest! {
    /// Fan-out order depends only on canvas positions, never on the order
    /// edges were inserted in.
    #[test]
    fn fan_out_order_is_position_determined(
        ys in prop::collection::hash_set(0u32..500, 2..6),
        reverse_edges in any::<bool>(),
    ) {
        let ys: Vec<u32> = ys.into_iter().collect();
        let mut nodes = vec![wallet("w")];
        let mut edges = Vec::new();
        for (i, y) in ys.iter().enumerate() {
            let id = format!("n{i}");
            // 10px spacing keeps distinct rows outside the epsilon band.
            nodes.push(node(&id, 0.0, f64::from(*y) * 10.0, transfer_to("SUI", 1, "0xa")));
            edges.push(edge("w", &id));
        }
        if reverse_edges {
            edges.reverse();
        }
        let plan = compile(&graph(nodes, edges));

        let mut expected: Vec<(u32, usize)> =
            ys.iter().copied().enumerate().map(|(i, y)| (y, i)).collect();
        expected.sort_unstable();
        let expected_ids: Vec<String> =
            expected.iter().map(|(_, i)| format!("n{i}")).collect();
        prop_assert_eq!(step_ids(&plan), expected_ids);
    }

    /// A single-path chain always compiles to the same plan, each node
    /// exactly once, under any edge insertion order.
    #[test]
    fn chain_plan_is_stable_under_edge_shuffle(
        perm in Just(vec![0usize, 1, 2, 3]).prop_shuffle(),
    ) {
        let chain = [("w", "a"), ("a", "b"), ("b", "c"), ("c", "d")];
        let nodes = vec![
            wallet("w"),
            node("a", 0.0, 100.0, transfer_to("SUI", 1, "0xa")),
            node("b", 0.0, 200.0, transfer_to("SUI", 1, "0xa")),
            node("c", 0.0, 300.0, transfer_to("SUI", 1, "0xa")),
            node("d", 0.0, 400.0, transfer_to("SUI", 1, "0xa")),
        ];
        let edges = perm.iter().map(|&i| edge(chain[i].0, chain[i].1)).collect();
        let plan = compile(&graph(nodes, edges));
        prop_assert_eq!(step_ids(&plan), vec!["a", "b", "c", "d"]);
    }
}
