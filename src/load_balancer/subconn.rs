//! Connection handle abstraction.
//!
//! # Responsibilities
//! - Give the runtime an opaque, cheaply clonable handle per endpoint
//! - Track connectivity state reported by the transport
//!
//! Pickers only read handles; the channel creates and retires them.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Connectivity state of a handle.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Idle = 0,
    Connecting = 1,
    Ready = 2,
    TransientFailure = 3,
    Shutdown = 4,
}

impl From<u8> for ConnectivityState {
    fn from(val: u8) -> Self {
        match val {
            1 => ConnectivityState::Connecting,
            2 => ConnectivityState::Ready,
            3 => ConnectivityState::TransientFailure,
            4 => ConnectivityState::Shutdown,
            _ => ConnectivityState::Idle,
        }
    }
}

#[derive(Debug)]
struct Inner {
    id: u64,
    address: String,
    state: AtomicU8,
}

/// Opaque handle to one connection owned by the channel.
///
/// Clones share state; equality is identity of the underlying connection.
#[derive(Clone)]
pub struct SubConn {
    inner: Arc<Inner>,
}

impl SubConn {
    /// Create a handle in the `Idle` state.
    pub fn new(id: u64, address: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                id,
                address: address.into(),
                state: AtomicU8::new(ConnectivityState::Idle as u8),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn address(&self) -> &str {
        &self.inner.address
    }

    pub fn state(&self) -> ConnectivityState {
        self.inner.state.load(Ordering::Acquire).into()
    }

    /// Store a new state, returning the previous one.
    pub fn set_state(&self, state: ConnectivityState) -> ConnectivityState {
        self.inner.state.swap(state as u8, Ordering::AcqRel).into()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ConnectivityState::Ready
    }
}

impl PartialEq for SubConn {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for SubConn {}

impl Hash for SubConn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.inner).hash(state);
    }
}

impl fmt::Debug for SubConn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubConn")
            .field("id", &self.inner.id)
            .field("address", &self.inner.address)
            .field("state", &self.state())
            .finish()
    }
}
