//! Property tests for the smooth weighted round-robin picker.

use proptest::prelude::*;
use rpc_balancer::load_balancer::weighted::WeightedRoundRobinBuilder;
use rpc_balancer::load_balancer::PickerBuilder;

mod common;

fn endpoints(weights: &[i64]) -> Vec<(String, Option<i64>)> {
    weights
        .iter()
        .enumerate()
        .map(|(i, w)| (format!("10.0.0.{}:80", i), Some(*w)))
        .collect()
}

proptest! {
    #[test]
    fn every_window_of_total_weight_is_exact(
        weights in prop::collection::vec(1i64..=20, 1..8),
        cycles in 1usize..4,
    ) {
        let endpoints = endpoints(&weights);
        let picker = WeightedRoundRobinBuilder::default().build(&common::ready_set(&endpoints));
        let total: i64 = weights.iter().sum();

        for _ in 0..cycles {
            let counts = common::tally(
                (0..total).map(|_| picker.pick().unwrap().address().to_string()),
            );
            for (addr, weight) in &endpoints {
                prop_assert_eq!(counts.get(addr).copied().unwrap_or(0) as i64, weight.unwrap());
            }
        }
    }

    #[test]
    fn drained_connections_are_never_picked(
        weights in prop::collection::vec(0i64..=6, 2..8),
    ) {
        prop_assume!(weights.iter().any(|w| *w > 0));
        let endpoints = endpoints(&weights);
        let picker = WeightedRoundRobinBuilder::new(true).build(&common::ready_set(&endpoints));
        let total: i64 = weights.iter().sum();

        let counts = common::tally(
            (0..total * 2).map(|_| picker.pick().unwrap().address().to_string()),
        );
        for (addr, weight) in &endpoints {
            prop_assert_eq!(counts.get(addr).copied().unwrap_or(0) as i64, weight.unwrap() * 2);
        }
    }

    #[test]
    fn equal_weights_rotate_in_order(n in 1usize..8, weight in 1i64..5) {
        let endpoints = endpoints(&vec![weight; n]);
        let picker = WeightedRoundRobinBuilder::default().build(&common::ready_set(&endpoints));

        for round in 0..3 {
            for (addr, _) in &endpoints {
                let picked = picker.pick().unwrap();
                prop_assert_eq!(picked.address(), addr.as_str(), "round {}", round);
            }
        }
    }
}
