//! Smooth weighted round-robin strategy.
//!
//! Each connection carries a static weight and a running current weight.
//! Every pick adds the static weights, takes the connection with the highest
//! current weight (earliest wins ties) and charges it the total weight. Over
//! `total_weight` picks from the reset state each connection is chosen exactly
//! `static_weight` times, and heavy connections are interleaved with light
//! ones instead of being picked back to back.
//!
//! ```text
//! weights {a:5, b:1, c:1}  →  a a b a c a a | a a b a c a a | ...
//! ```

use std::sync::{Mutex, PoisonError};
use crate::load_balancer::{
    FailingPicker, PickError, Picker, PickerBuilder, ReadyConnection, ReadyConnectionSet,
    SubConn,
};

pub const NAME: &str = "weighted_round_robin";

/// Weight used when the endpoint carries none, or an invalid one.
pub const DEFAULT_WEIGHT: i64 = 1;

/// Largest static weight. Larger weights are clamped so `total_weight` and the
/// running current weights stay far from `i64` overflow.
pub const MAX_WEIGHT: i64 = u32::MAX as i64;

/// Builds [`SmoothWeightedPicker`]s.
#[derive(Debug, Default)]
pub struct WeightedRoundRobinBuilder {
    /// Keep an explicit weight of 0 instead of defaulting it.
    honor_zero_weight: bool,
}

impl WeightedRoundRobinBuilder {
    pub fn new(honor_zero_weight: bool) -> Self {
        Self { honor_zero_weight }
    }

    /// Static weight for one ready connection.
    pub fn static_weight(&self, rc: &ReadyConnection) -> i64 {
        let address = rc.endpoint.address.as_str();
        match rc.endpoint.weight {
            Some(w) if w > MAX_WEIGHT => {
                tracing::warn!(address, weight = w, max = MAX_WEIGHT, "Weight above maximum, clamping");
                MAX_WEIGHT
            }
            Some(w) if w > 0 => w,
            Some(0) if self.honor_zero_weight => {
                tracing::debug!(address, "Explicit weight 0, connection drained");
                0
            }
            Some(w) => {
                tracing::debug!(address, weight = w, default = DEFAULT_WEIGHT, "Non-positive weight, using default");
                DEFAULT_WEIGHT
            }
            None => {
                tracing::debug!(address, default = DEFAULT_WEIGHT, "No weight metadata, using default");
                DEFAULT_WEIGHT
            }
        }
    }
}

impl PickerBuilder for WeightedRoundRobinBuilder {
    fn name(&self) -> &str {
        NAME
    }

    fn build(&self, ready: &ReadyConnectionSet) -> Box<dyn Picker> {
        tracing::debug!(ready = ready.len(), "Building weighted round-robin picker");
        if ready.is_empty() {
            return Box::new(FailingPicker::unavailable());
        }

        let conns: Vec<WeightedConnection> = ready
            .iter()
            .map(|rc| WeightedConnection::new(rc.subconn.clone(), self.static_weight(rc)))
            .collect();

        if conns.iter().all(|c| c.static_weight == 0) {
            tracing::debug!(ready = ready.len(), "Every ready connection has weight 0, treating set as empty");
            return Box::new(FailingPicker::unavailable());
        }

        Box::new(SmoothWeightedPicker::new(conns))
    }
}

/// A handle with its smooth-WRR bookkeeping.
#[derive(Debug, Clone)]
pub struct WeightedConnection {
    pub subconn: SubConn,
    pub static_weight: i64,
    pub current_weight: i64,
}

impl WeightedConnection {
    pub fn new(subconn: SubConn, static_weight: i64) -> Self {
        Self {
            subconn,
            static_weight,
            current_weight: 0,
        }
    }
}

/// Smooth weighted round-robin picker over a fixed connection list.
#[derive(Debug)]
pub struct SmoothWeightedPicker {
    conns: Mutex<Vec<WeightedConnection>>,
    total_weight: i64,
}

impl SmoothWeightedPicker {
    /// Current weights are reset to 0 and the total recomputed. Static
    /// weights are clamped to `0..=MAX_WEIGHT`.
    pub fn new(mut conns: Vec<WeightedConnection>) -> Self {
        for c in &mut conns {
            c.static_weight = c.static_weight.clamp(0, MAX_WEIGHT);
            c.current_weight = 0;
        }
        let total_weight = conns
            .iter()
            .try_fold(0i64, |total, c| total.checked_add(c.static_weight))
            .unwrap_or_else(|| {
                tracing::warn!(connections = conns.len(), "Total weight overflows, saturating");
                i64::MAX
            });
        Self {
            conns: Mutex::new(conns),
            total_weight,
        }
    }

    pub fn total_weight(&self) -> i64 {
        self.total_weight
    }

    /// Copy of the connection list with current weights.
    pub fn snapshot(&self) -> Vec<WeightedConnection> {
        self.conns.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Picker for SmoothWeightedPicker {
    fn pick(&self) -> Result<SubConn, PickError> {
        let mut conns = self.conns.lock().unwrap_or_else(PoisonError::into_inner);

        let mut best: Option<usize> = None;
        let mut best_weight = i64::MIN;
        for (i, c) in conns.iter_mut().enumerate() {
            c.current_weight += c.static_weight;
            if c.current_weight > best_weight {
                best_weight = c.current_weight;
                best = Some(i);
            }
        }

        let Some(i) = best else {
            return Err(PickError::NoConnectionsAvailable);
        };
        let selected = &mut conns[i];
        selected.current_weight -= self.total_weight;
        Ok(selected.subconn.clone())
    }
}
