//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Deserializer, Serialize};
use crate::resolver::directory_resolver::DEFAULT_SCHEME;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Dial target and policy selection.
    pub client: ChannelConfig,

    /// Strategy tuning.
    pub balancer: BalancerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Endpoint directory contents. Empty unless the file lists services.
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client: ChannelConfig::default(),
            balancer: BalancerConfig::default(),
            observability: ObservabilityConfig::default(),
            services: vec![ServiceConfig {
                name: "my-custom-service:1234".to_string(),
                endpoints: vec![
                    EndpointConfig { address: "127.0.0.1:50051".to_string(), weight: Some(1) },
                    EndpointConfig { address: "127.0.0.1:50052".to_string(), weight: Some(3) },
                    EndpointConfig { address: "127.0.0.1:50053".to_string(), weight: Some(0) },
                ],
            }],
        }
    }
}

/// Channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ChannelConfig {
    /// Dial target (e.g., "example:///my-custom-service:1234").
    pub target: String,

    /// Strategy name looked up in the registry.
    pub load_balancing_policy: String,

    /// Optional service config JSON, e.g. `{"loadBalancingPolicy":"random"}`.
    /// Its policy takes precedence over `load_balancing_policy`.
    pub default_service_config: Option<String>,

    /// Scheme the directory resolver answers to.
    pub resolver_scheme: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            target: "example:///my-custom-service:1234".to_string(),
            load_balancing_policy: "weighted_round_robin".to_string(),
            default_service_config: None,
            resolver_scheme: DEFAULT_SCHEME.to_string(),
        }
    }
}

/// Strategy tuning.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BalancerConfig {
    /// Keep an explicit weight of 0 (drain) instead of defaulting it to 1.
    pub honor_zero_weight: bool,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// One logical service and its endpoints.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServiceConfig {
    /// Logical service name (the target's endpoint part).
    pub name: String,

    /// Endpoints in push order.
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

/// Endpoint definition.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct EndpointConfig {
    /// Backend address (e.g., "127.0.0.1:50051").
    pub address: String,

    /// Weight for weighted balancing. Values that are not integers are
    /// treated as absent.
    #[serde(default, deserialize_with = "lenient_weight", skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
}

fn lenient_weight<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawWeight {
        Int(i64),
        Other(serde::de::IgnoredAny),
    }

    Ok(match RawWeight::deserialize(deserializer)? {
        RawWeight::Int(w) => Some(w),
        RawWeight::Other(_) => None,
    })
}

/// The subset of a service config JSON document the client understands.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfigJson {
    pub load_balancing_policy: Option<String>,
}

impl ChannelConfig {
    /// Strategy name after applying the service config override.
    pub fn effective_policy(&self) -> Result<String, serde_json::Error> {
        if let Some(raw) = &self.default_service_config {
            let parsed: ServiceConfigJson = serde_json::from_str(raw)?;
            if let Some(policy) = parsed.load_balancing_policy {
                return Ok(policy);
            }
        }
        Ok(self.load_balancing_policy.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_weighted_example() {
        let config = ClientConfig::default();
        assert_eq!(config.client.target, "example:///my-custom-service:1234");
        assert_eq!(config.services.len(), 1);
        let weights: Vec<_> = config.services[0].endpoints.iter().map(|e| e.weight).collect();
        assert_eq!(weights, [Some(1), Some(3), Some(0)]);
    }

    #[test]
    fn test_lenient_weight() {
        let config: ClientConfig = toml::from_str(
            r#"
            [[services]]
            name = "svc"
            endpoints = [
                { address = "10.0.0.1:80", weight = 4 },
                { address = "10.0.0.2:80", weight = "heavy" },
                { address = "10.0.0.3:80", weight = 2.5 },
                { address = "10.0.0.4:80" },
            ]
            "#,
        )
        .unwrap();

        let weights: Vec<_> = config.services[0].endpoints.iter().map(|e| e.weight).collect();
        assert_eq!(weights, [Some(4), None, None, None]);
    }

    #[test]
    fn test_partial_sections_use_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            [client]
            load_balancing_policy = "random"
            "#,
        )
        .unwrap();
        assert_eq!(config.client.load_balancing_policy, "random");
        assert_eq!(config.client.resolver_scheme, "example");
        assert_eq!(config.observability.log_level, "info");
        assert!(config.services.is_empty());
    }

    #[test]
    fn test_service_config_overrides_policy() {
        let mut client = ChannelConfig::default();
        assert_eq!(client.effective_policy().unwrap(), "weighted_round_robin");

        client.default_service_config = Some(r#"{"loadBalancingPolicy":"random"}"#.into());
        assert_eq!(client.effective_policy().unwrap(), "random");

        client.default_service_config = Some("{}".into());
        assert_eq!(client.effective_policy().unwrap(), "weighted_round_robin");

        client.default_service_config = Some("{not json".into());
        assert!(client.effective_policy().is_err());
    }
}
