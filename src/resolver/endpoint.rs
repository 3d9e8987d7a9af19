//! Endpoint records produced by the directory.

use std::fmt;

/// One network address of a logical service, plus its optional weight.
///
/// The weight is carried exactly as it was configured. Interpreting it
/// (defaulting, rejecting non-positive values) is the picker builder's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// `host:port` address.
    pub address: String,
    /// Configured weight, if any.
    pub weight: Option<i64>,
}

impl Endpoint {
    /// An endpoint without weight metadata.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            weight: None,
        }
    }

    /// An endpoint carrying an explicit weight.
    pub fn weighted(address: impl Into<String>, weight: i64) -> Self {
        Self {
            address: address.into(),
            weight: Some(weight),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.weight {
            Some(w) => write!(f, "{} (weight {})", self.address, w),
            None => write!(f, "{}", self.address),
        }
    }
}

/// Ordered endpoints of one service. Order is push order.
pub type EndpointSet = Vec<Endpoint>;
