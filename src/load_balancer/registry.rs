//! Selection-strategy registry.
//!
//! # Responsibilities
//! - Map strategy names from configuration to picker builders
//! - Report unknown names to the caller instead of substituting a default
//!
//! The registry is an ordinary value built during startup and handed to the
//! channel; nothing registers itself.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use crate::config::BalancerConfig;
use crate::load_balancer::{
    pick_first::{self, PickFirstBuilder},
    random::{self, RandomBuilder},
    round_robin::RoundRobinBuilder,
    weighted::WeightedRoundRobinBuilder,
    PickerBuilder,
};

/// Strategy used when configuration names none.
pub const DEFAULT_STRATEGY: &str = pick_first::NAME;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BalancerError {
    #[error("unknown load balancing strategy: {0}")]
    UnknownStrategy(String),
}

/// Strategy name -> builder table.
#[derive(Debug, Default)]
pub struct StrategyRegistry {
    builders: HashMap<String, Arc<dyn PickerBuilder>>,
}

impl StrategyRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in strategy.
    pub fn with_defaults(config: &BalancerConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PickFirstBuilder));
        registry.register(Arc::new(RoundRobinBuilder));
        let uniform: Arc<dyn PickerBuilder> = Arc::new(RandomBuilder);
        registry.register(uniform.clone());
        registry.register_as(random::ALIAS, uniform);
        registry.register(Arc::new(WeightedRoundRobinBuilder::new(config.honor_zero_weight)));
        registry
    }

    /// Register a builder under its own name, replacing any previous one.
    pub fn register(&mut self, builder: Arc<dyn PickerBuilder>) {
        let name = builder.name().to_string();
        self.register_as(&name, builder);
    }

    /// Register a builder under `name`, which may differ from its own.
    pub fn register_as(&mut self, name: &str, builder: Arc<dyn PickerBuilder>) {
        tracing::debug!(strategy = %name, builder = %builder.name(), "Registering load balancing strategy");
        if self.builders.insert(name.to_string(), builder).is_some() {
            tracing::warn!(strategy = %name, "Replaced previously registered strategy");
        }
    }

    /// Look up a builder by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn PickerBuilder>, BalancerError> {
        self.builders
            .get(name)
            .cloned()
            .ok_or_else(|| BalancerError::UnknownStrategy(name.to_string()))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.builders.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_registered() {
        let registry = StrategyRegistry::with_defaults(&BalancerConfig::default());
        assert_eq!(
            registry.names(),
            ["custom_robin", "pick_first", "random", "round_robin", "weighted_round_robin"]
        );
        assert_eq!(registry.get(DEFAULT_STRATEGY).unwrap().name(), "pick_first");
        assert_eq!(registry.get("custom_robin").unwrap().name(), "random");
    }

    #[test]
    fn test_unknown_strategy_is_error() {
        let registry = StrategyRegistry::with_defaults(&BalancerConfig::default());
        let err = registry.get("least_request").unwrap_err();
        assert_eq!(err, BalancerError::UnknownStrategy("least_request".into()));
        assert_eq!(err.to_string(), "unknown load balancing strategy: least_request");
    }

    #[test]
    fn test_empty_registry() {
        let registry = StrategyRegistry::new();
        assert!(registry.get(DEFAULT_STRATEGY).is_err());
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = StrategyRegistry::new();
        registry.register(Arc::new(WeightedRoundRobinBuilder::new(false)));
        registry.register(Arc::new(WeightedRoundRobinBuilder::new(true)));
        assert_eq!(registry.names(), ["weighted_round_robin"]);
    }
}
