//! Property-based tests for linear extension enumeration.
//!
//! These tests check the enumerator against a brute-force oracle on small
//! random DAGs:
//!
//! - Every produced order is a linear extension of the graph
//! - The number of orders equals the brute-force count
//! - Orders come out in strictly increasing lexicographic order, so the
//!   first one is the lowest-id-first order and none repeat

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::extract::StepDependencies;
    use crate::graph::{DependencyGraph, TopologicalEnumerator};
    use crate::types::{Reference, StepId};

    // Strategy for a DAG over steps 1..=n: an edge i -> j only when i < j,
    // so every generated graph is acyclic.
    fn dag() -> impl Strategy<Value = (u32, Vec<(u32, u32)>)> {
        (1u32..=6).prop_flat_map(|n| {
            let pairs: Vec<(u32, u32)> = (1..=n)
                .flat_map(|i| ((i + 1)..=n).map(move |j| (i, j)))
                .collect();
            let len = pairs.len();
            (Just(n), proptest::collection::vec(any::<bool>(), len)).prop_map(move |(n, keep)| {
                let edges = pairs
                    .iter()
                    .zip(keep)
                    .filter(|(_, k)| *k)
                    .map(|(p, _)| *p)
                    .collect();
                (n, edges)
            })
        })
    }

    fn build(n: u32, edges: &[(u32, u32)]) -> DependencyGraph {
        let steps: Vec<_> = (1..=n)
            .map(|step| {
                let refs = edges
                    .iter()
                    .filter(|(_, to)| *to == step)
                    .map(|(from, _)| Reference::Step(StepId::new(*from)))
                    .collect();
                StepDependencies::new(StepId::new(step), refs)
            })
            .collect();
        DependencyGraph::from_dependencies(&steps)
    }

    fn permutations(items: &[StepId]) -> Vec<Vec<StepId>> {
        if items.is_empty() {
            return vec![Vec::new()];
        }
        let mut out = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.to_vec();
            let head = rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, head);
                out.push(tail);
            }
        }
        out
    }

    proptest! {
        /// Every enumerated order respects every edge.
        #[test]
        fn enumerated_orders_are_valid((n, edges) in dag()) {
            let graph = build(n, &edges);
            let sequences = TopologicalEnumerator::new().enumerate(&graph).unwrap();
            for seq in &sequences {
                prop_assert!(graph.is_linear_extension(seq.steps()), "invalid order {:?}", seq);
                for (from, to) in &edges {
                    let a = seq.steps().iter().position(|s| s.get() == *from).unwrap();
                    let b = seq.steps().iter().position(|s| s.get() == *to).unwrap();
                    prop_assert!(a < b);
                }
            }
        }

        /// The enumeration is complete.
        #[test]
        fn enumeration_count_matches_brute_force((n, edges) in dag()) {
            let graph = build(n, &edges);
            let sequences = TopologicalEnumerator::new().enumerate(&graph).unwrap();
            let expected = permutations(&graph.step_ids())
                .into_iter()
                .filter(|p| graph.is_linear_extension(p))
                .count();
            prop_assert_eq!(sequences.len(), expected);
        }

        /// Orders are unique and produced lowest id first.
        #[test]
        fn orders_are_lexicographically_increasing((n, edges) in dag()) {
            let graph = build(n, &edges);
            let sequences = TopologicalEnumerator::new().enumerate(&graph).unwrap();
            for pair in sequences.windows(2) {
                prop_assert!(pair[0].steps() < pair[1].steps());
            }
            if edges.is_empty() {
                let ascending: Vec<StepId> = (1..=n).map(StepId::new).collect();
                prop_assert_eq!(sequences[0].steps(), ascending.as_slice());
            }
        }
    }
}
