//! Shared utilities for integration tests.

use std::collections::HashMap;
use std::sync::Arc;
use rpc_balancer::config::BalancerConfig;
use rpc_balancer::load_balancer::{ConnectivityState, ReadyConnection};
use rpc_balancer::{Channel, Directory, DirectoryResolverBuilder, Endpoint, StrategyRegistry, SubConn};

pub const SERVICE: &str = "my-custom-service:1234";
pub const TARGET: &str = "example:///my-custom-service:1234";

/// Ready connections for `(address, weight)` pairs, in order.
#[allow(dead_code)]
pub fn ready_set(endpoints: &[(String, Option<i64>)]) -> Vec<ReadyConnection> {
    endpoints
        .iter()
        .enumerate()
        .map(|(i, (addr, weight))| {
            let subconn = SubConn::new(i as u64, addr.clone());
            subconn.set_state(ConnectivityState::Ready);
            ReadyConnection {
                subconn,
                endpoint: Endpoint { address: addr.clone(), weight: *weight },
            }
        })
        .collect()
}

/// Directory with one service and a channel dialing it.
#[allow(dead_code)]
pub fn channel_for(endpoints: Vec<Endpoint>, policy: &str) -> (Arc<Directory>, Channel) {
    let mut table = HashMap::new();
    table.insert(SERVICE.to_string(), endpoints);
    let directory = Arc::new(Directory::new(table));
    let resolver = DirectoryResolverBuilder::new("example", directory.clone());
    let registry = StrategyRegistry::with_defaults(&BalancerConfig::default());
    let channel = Channel::connect(TARGET, policy, &resolver, &registry).unwrap();
    (directory, channel)
}

/// Count picks per address.
#[allow(dead_code)]
pub fn tally<I: IntoIterator<Item = String>>(addrs: I) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for addr in addrs {
        *counts.entry(addr).or_default() += 1;
    }
    counts
}
