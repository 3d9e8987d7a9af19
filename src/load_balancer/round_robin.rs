//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use crate::load_balancer::{
    FailingPicker, PickError, Picker, PickerBuilder, ReadyConnectionSet, SubConn,
};

pub const NAME: &str = "round_robin";

#[derive(Debug, Default)]
pub struct RoundRobinBuilder;

impl PickerBuilder for RoundRobinBuilder {
    fn name(&self) -> &str {
        NAME
    }

    fn build(&self, ready: &ReadyConnectionSet) -> Box<dyn Picker> {
        if ready.is_empty() {
            return Box::new(FailingPicker::unavailable());
        }
        Box::new(RoundRobinPicker::new(ready.iter().map(|rc| rc.subconn.clone()).collect()))
    }
}

/// Round-robin selector.
/// Stores an internal counter to rotate through connections.
#[derive(Debug)]
pub struct RoundRobinPicker {
    subconns: Vec<SubConn>,
    counter: AtomicUsize,
}

impl RoundRobinPicker {
    pub fn new(subconns: Vec<SubConn>) -> Self {
        Self {
            subconns,
            counter: AtomicUsize::new(0),
        }
    }
}

impl Picker for RoundRobinPicker {
    fn pick(&self) -> Result<SubConn, PickError> {
        if self.subconns.is_empty() {
            return Err(PickError::NoConnectionsAvailable);
        }
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % self.subconns.len();
        Ok(self.subconns[index].clone())
    }
}
