//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Channel readiness change
//!     → ReadyConnectionSet (ready handles + endpoint metadata, endpoint order)
//!     → registry.rs (strategy name → PickerBuilder)
//!     → PickerBuilder::build:
//!         - pick_first.rs (first ready handle)
//!         - round_robin.rs (rotate through handles)
//!         - random.rs (uniform random handle)
//!         - weighted.rs (smooth weighted round-robin)
//!         - base.rs (failing picker for an empty set)
//!     → Picker installed by the channel, serves pick() per call
//! ```
//!
//! # Design Decisions
//! - Pickers are immutable snapshots; a topology change builds a new one
//! - Only the weighted picker holds mutable state, under its own mutex
//! - An empty ready set is a normal state, not an error

pub mod base;
pub mod pick_first;
pub mod random;
pub mod registry;
pub mod round_robin;
pub mod subconn;
pub mod weighted;

pub use base::FailingPicker;
pub use registry::{BalancerError, StrategyRegistry};
pub use subconn::{ConnectivityState, SubConn};

use std::fmt;
use thiserror::Error;
use crate::resolver::Endpoint;

/// A ready handle together with the endpoint that produced it.
#[derive(Debug, Clone)]
pub struct ReadyConnection {
    pub subconn: SubConn,
    pub endpoint: Endpoint,
}

/// Ready handles in endpoint order.
pub type ReadyConnectionSet = [ReadyConnection];

/// Why a pick produced no handle.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum PickError {
    #[error("no connections available")]
    NoConnectionsAvailable,
}

/// Chooses the connection for one call.
pub trait Picker: Send + Sync + fmt::Debug {
    fn pick(&self) -> Result<SubConn, PickError>;
}

/// Builds a picker from the current ready set.
pub trait PickerBuilder: Send + Sync + fmt::Debug {
    /// Name the strategy is registered under.
    fn name(&self) -> &str;

    fn build(&self, ready: &ReadyConnectionSet) -> Box<dyn Picker>;
}
