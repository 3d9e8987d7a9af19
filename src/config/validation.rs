//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check endpoint addresses are `host:port`
//! - Bound weights so a service's total weight cannot overflow
//! - Detect duplicate services and duplicate endpoints
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;
use crate::config::schema::ClientConfig;
use crate::load_balancer::weighted::MAX_WEIGHT;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("client.target must not be empty")]
    EmptyTarget,
    #[error("service {0} is defined more than once")]
    DuplicateService(String),
    #[error("service {service} lists endpoint {address} more than once")]
    DuplicateEndpoint { service: String, address: String },
    #[error("service {service}: invalid endpoint address {address} (expected host:port)")]
    InvalidAddress { service: String, address: String },
    #[error("service {service}: endpoint {address} weight {weight} exceeds {max}")]
    WeightOutOfRange { service: String, address: String, weight: i64, max: i64 },
    #[error("unknown log format {0} (expected pretty or json)")]
    UnknownLogFormat(String),
    #[error("invalid metrics address {0}")]
    InvalidMetricsAddress(String),
    #[error("invalid default service config: {0}")]
    InvalidServiceConfig(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.client.target.trim().is_empty() {
        errors.push(ValidationError::EmptyTarget);
    }

    if let Err(e) = config.client.effective_policy() {
        errors.push(ValidationError::InvalidServiceConfig(e.to_string()));
    }

    let mut seen_services = HashSet::new();
    for service in &config.services {
        if !seen_services.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateService(service.name.clone()));
        }

        let mut seen_addrs = HashSet::new();
        for endpoint in &service.endpoints {
            if !is_host_port(&endpoint.address) {
                errors.push(ValidationError::InvalidAddress {
                    service: service.name.clone(),
                    address: endpoint.address.clone(),
                });
            }
            if let Some(weight) = endpoint.weight.filter(|w| *w > MAX_WEIGHT) {
                errors.push(ValidationError::WeightOutOfRange {
                    service: service.name.clone(),
                    address: endpoint.address.clone(),
                    weight,
                    max: MAX_WEIGHT,
                });
            }
            if !seen_addrs.insert(endpoint.address.as_str()) {
                errors.push(ValidationError::DuplicateEndpoint {
                    service: service.name.clone(),
                    address: endpoint.address.clone(),
                });
            }
        }
    }

    let format = config.observability.log_format.as_str();
    if format != "pretty" && format != "json" {
        errors.push(ValidationError::UnknownLogFormat(format.to_string()));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `host:port` with a non-empty host and a numeric port.
fn is_host_port(address: &str) -> bool {
    match address.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}
