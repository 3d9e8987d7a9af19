//! Endpoint directory.
//!
//! Maps a logical service name to its ordered endpoint list. Readers get a
//! lock-free snapshot through `ArcSwap`; writers replace the whole table and
//! bump a generation counter that subscribed resolvers watch.

use std::collections::HashMap;
use std::sync::Arc;
use arc_swap::ArcSwap;
use tokio::sync::watch;
use crate::config::ServiceConfig;
use crate::observability::metrics;
use crate::resolver::endpoint::{Endpoint, EndpointSet};

type ServiceTable = HashMap<String, EndpointSet>;

/// Service name -> endpoints lookup table.
#[derive(Debug)]
pub struct Directory {
    services: ArcSwap<ServiceTable>,
    generation: watch::Sender<u64>,
}

impl Directory {
    /// Create a directory from an initial table.
    pub fn new(services: HashMap<String, EndpointSet>) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            services: ArcSwap::from_pointee(services),
            generation,
        }
    }

    /// Build a directory from configured services.
    pub fn from_config(services: &[ServiceConfig]) -> Self {
        Self::new(table_from_config(services))
    }

    /// Look up a service. Unknown names yield `None`.
    pub fn lookup(&self, service: &str) -> Option<EndpointSet> {
        self.services.load().get(service).cloned()
    }

    /// Insert or replace the endpoints of one service.
    pub fn upsert(&self, service: &str, endpoints: EndpointSet) {
        let service = service.to_string();
        self.services.rcu(|current| {
            let mut next = ServiceTable::clone(current);
            next.insert(service.clone(), endpoints.clone());
            next
        });
        tracing::debug!(service = %service, endpoints = endpoints.len(), "Directory entry updated");
        self.bump();
    }

    /// Atomically replace the whole table (e.g. after a config reload).
    pub fn replace(&self, services: HashMap<String, EndpointSet>) {
        tracing::info!(services = services.len(), "Directory replaced");
        self.services.store(Arc::new(services));
        self.bump();
    }

    /// Replace the table from reloaded configuration.
    pub fn replace_from_config(&self, services: &[ServiceConfig]) {
        self.replace(table_from_config(services));
    }

    /// Subscribe to table replacements.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    /// Current generation; increases on every change.
    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    fn bump(&self) {
        self.generation.send_modify(|g| *g += 1);
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

fn table_from_config(services: &[ServiceConfig]) -> ServiceTable {
    services
        .iter()
        .map(|svc| {
            let endpoints: EndpointSet = svc
                .endpoints
                .iter()
                .map(|e| Endpoint {
                    address: e.address.clone(),
                    weight: e.weight,
                })
                .collect();
            metrics::record_endpoint_count(&svc.name, endpoints.len());
            (svc.name.clone(), endpoints)
        })
        .collect()
}
