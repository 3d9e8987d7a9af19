//! Uniform random load balancing strategy.

use rand::Rng;
use crate::load_balancer::{
    FailingPicker, PickError, Picker, PickerBuilder, ReadyConnectionSet, SubConn,
};

pub const NAME: &str = "random";

/// Second registry name for this strategy, kept for existing client configs.
pub const ALIAS: &str = "custom_robin";

/// Builds [`RandomPicker`]s.
#[derive(Debug, Default)]
pub struct RandomBuilder;

impl PickerBuilder for RandomBuilder {
    fn name(&self) -> &str {
        NAME
    }

    fn build(&self, ready: &ReadyConnectionSet) -> Box<dyn Picker> {
        tracing::debug!(ready = ready.len(), "Building random picker");
        if ready.is_empty() {
            return Box::new(FailingPicker::unavailable());
        }
        Box::new(RandomPicker::new(ready.iter().map(|rc| rc.subconn.clone()).collect()))
    }
}

/// Picks uniformly among a fixed handle list. Stateless between calls.
#[derive(Debug)]
pub struct RandomPicker {
    subconns: Vec<SubConn>,
}

impl RandomPicker {
    pub fn new(subconns: Vec<SubConn>) -> Self {
        Self { subconns }
    }
}

impl Picker for RandomPicker {
    fn pick(&self) -> Result<SubConn, PickError> {
        if self.subconns.is_empty() {
            return Err(PickError::NoConnectionsAvailable);
        }
        let idx = rand::thread_rng().gen_range(0..self.subconns.len());
        Ok(self.subconns[idx].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use crate::load_balancer::test_support::{pick_addrs, ready_set};

    #[test]
    fn test_single_connection_always_chosen() {
        let picker = RandomBuilder.build(&ready_set(&[("127.0.0.1:50051", None)]));
        for addr in pick_addrs(picker.as_ref(), 20) {
            assert_eq!(addr, "127.0.0.1:50051");
        }
    }

    #[test]
    fn test_empty_list_reports_unavailable() {
        let picker = RandomPicker::new(Vec::new());
        assert_eq!(picker.pick().unwrap_err(), PickError::NoConnectionsAvailable);

        let built = RandomBuilder.build(&[]);
        assert_eq!(built.pick().unwrap_err(), PickError::NoConnectionsAvailable);
    }

    #[test]
    fn test_roughly_uniform() {
        let picker = RandomBuilder.build(&ready_set(&[
            ("127.0.0.1:1", None),
            ("127.0.0.1:2", None),
            ("127.0.0.1:3", None),
        ]));

        let mut counts: HashMap<String, usize> = HashMap::new();
        for addr in pick_addrs(picker.as_ref(), 3000) {
            *counts.entry(addr).or_default() += 1;
        }

        assert_eq!(counts.len(), 3);
        // Expected 1000 each; the bound is far outside normal variance.
        for count in counts.values() {
            assert!(*count > 700 && *count < 1300, "count {}", count);
        }
    }
}
