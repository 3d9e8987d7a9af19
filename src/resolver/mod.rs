//! Name resolution subsystem.
//!
//! # Data Flow
//! ```text
//! Directory (service name -> endpoints)
//!     → DirectoryResolver::build (lookup target's service name)
//!     → ClientConn::update_state (push EndpointSet to the channel)
//!     → channel reconciles connection handles and rebuilds the picker
//!
//! On directory replacement (config reload):
//!     watch generation bumps
//!     → resolver task re-resolves and pushes again
//! ```
//!
//! # Design Decisions
//! - Unknown service names resolve to an empty set, not an error
//! - A rejected push is reported to the channel's error path, never fatal
//! - Resolvers are built explicitly from a builder bound to one scheme

pub mod directory;
pub mod directory_resolver;
pub mod endpoint;
pub mod target;

pub use directory::Directory;
pub use directory_resolver::{DirectoryResolver, DirectoryResolverBuilder};
pub use endpoint::{Endpoint, EndpointSet};
pub use target::Target;

use std::sync::Arc;
use thiserror::Error;

/// Resolver output pushed to the channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolverState {
    pub endpoints: EndpointSet,
}

/// Errors surfaced on the channel's error path.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolverError {
    #[error("state update for {target} rejected: channel closed")]
    PushRejected { target: String },
}

/// The runtime side a resolver pushes to.
pub trait ClientConn: Send + Sync {
    /// Deliver a new endpoint set.
    fn update_state(&self, state: ResolverState) -> Result<(), ResolverError>;

    /// Report a resolver-side failure.
    fn report_error(&self, err: ResolverError);
}

/// A live resolver for one target.
pub trait Resolver: Send + Sync {
    /// Request an immediate re-resolution. Must not block.
    fn resolve_now(&self);

    /// Release subscriptions. Idempotent.
    fn close(&self);
}

/// Creates resolvers for targets using one URI scheme.
pub trait ResolverBuilder: Send + Sync {
    fn scheme(&self) -> &str;

    fn build(&self, target: &Target, conn: Arc<dyn ClientConn>) -> Box<dyn Resolver>;
}
