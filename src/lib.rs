//! Client-side name resolution and load balancing for RPC channels.

pub mod channel;
pub mod config;
pub mod load_balancer;
pub mod observability;
pub mod resolver;

pub use channel::{Channel, ChannelError};
pub use config::schema::ClientConfig;
pub use load_balancer::{PickError, StrategyRegistry, SubConn};
pub use resolver::{Directory, DirectoryResolverBuilder, Endpoint};
