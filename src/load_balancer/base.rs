//! Picker shared by every strategy for the empty ready set.

use crate::load_balancer::{PickError, Picker, SubConn};

/// Picker whose every pick fails until the next rebuild.
#[derive(Debug, Clone, Copy)]
pub struct FailingPicker {
    err: PickError,
}

impl FailingPicker {
    pub fn new(err: PickError) -> Self {
        Self { err }
    }

    /// The picker installed while nothing is ready.
    pub fn unavailable() -> Self {
        Self::new(PickError::NoConnectionsAvailable)
    }
}

impl Picker for FailingPicker {
    fn pick(&self) -> Result<SubConn, PickError> {
        Err(self.err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_fails() {
        let p = FailingPicker::unavailable();
        for _ in 0..3 {
            assert_eq!(p.pick().unwrap_err(), PickError::NoConnectionsAvailable);
        }
    }
}
