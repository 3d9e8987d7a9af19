//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → services populate the Directory, policy selects the strategy
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → services table compared with the last one applied
//!     → Directory::replace_from_config (only when it differs)
//!     → resolvers re-resolve, channels rebuild pickers
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Only the directory contents are hot reloaded; the policy is fixed per channel

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::BalancerConfig;
pub use schema::ChannelConfig;
pub use schema::ClientConfig;
pub use schema::EndpointConfig;
pub use schema::ObservabilityConfig;
pub use schema::ServiceConfig;
