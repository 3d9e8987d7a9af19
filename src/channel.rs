//! Client channel.
//!
//! # Responsibilities
//! - Own the connection handles for one target
//! - Reconcile handles against each resolver push
//! - Rebuild and swap the picker whenever the ready set changes
//! - Serve per-call picks from the current picker snapshot
//!
//! Connection establishment and health belong to the transport, which reports
//! readiness through [`Channel::set_connectivity`]. New handles are assumed
//! ready until told otherwise.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use arc_swap::ArcSwap;
use thiserror::Error;
use tokio::sync::mpsc;
use crate::load_balancer::{
    BalancerError, ConnectivityState, FailingPicker, PickError, Picker, PickerBuilder,
    ReadyConnection, StrategyRegistry, SubConn,
};
use crate::observability::metrics;
use crate::resolver::{
    ClientConn, Endpoint, Resolver, ResolverBuilder, ResolverError, ResolverState, Target,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("invalid target {0} (expected scheme://[authority]/service)")]
    InvalidTarget(String),
    #[error("no resolver for scheme {target} (resolver handles {resolver})")]
    SchemeMismatch { target: String, resolver: String },
    #[error(transparent)]
    Strategy(#[from] BalancerError),
}

/// An installed picker and the rebuild it came from.
#[derive(Debug)]
pub struct PickerSnapshot {
    picker: Box<dyn Picker>,
    generation: u64,
    ready: usize,
}

impl PickerSnapshot {
    pub fn pick(&self) -> Result<SubConn, PickError> {
        self.picker.pick()
    }

    /// Rebuild counter; 0 is the picker installed before the first push.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Ready connections the picker was built from.
    pub fn ready(&self) -> usize {
        self.ready
    }
}

#[derive(Default)]
struct ConnState {
    conns: Vec<(Endpoint, SubConn)>,
    next_id: u64,
    generation: u64,
}

struct ChannelInner {
    target: Target,
    raw_target: String,
    builder: Arc<dyn PickerBuilder>,
    state: Mutex<ConnState>,
    picker: ArcSwap<PickerSnapshot>,
    closed: AtomicBool,
    errors_tx: mpsc::UnboundedSender<ResolverError>,
}

/// A client channel to one logical service.
pub struct Channel {
    inner: Arc<ChannelInner>,
    resolver: Mutex<Option<Box<dyn Resolver>>>,
    errors_rx: Mutex<Option<mpsc::UnboundedReceiver<ResolverError>>>,
}

impl Channel {
    /// Resolve `target` and start balancing with the named strategy.
    pub fn connect(
        target: &str,
        policy: &str,
        resolver_builder: &dyn ResolverBuilder,
        registry: &StrategyRegistry,
    ) -> Result<Self, ChannelError> {
        let parsed = Target::parse(target)
            .ok_or_else(|| ChannelError::InvalidTarget(target.to_string()))?;
        if parsed.scheme != resolver_builder.scheme() {
            return Err(ChannelError::SchemeMismatch {
                target: parsed.scheme,
                resolver: resolver_builder.scheme().to_string(),
            });
        }
        let builder = registry.get(policy)?;

        tracing::info!(channel = %target, policy = %policy, "Connecting channel");

        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(ChannelInner {
            target: parsed,
            raw_target: target.to_string(),
            builder,
            state: Mutex::new(ConnState::default()),
            picker: ArcSwap::from_pointee(PickerSnapshot {
                picker: Box::new(FailingPicker::unavailable()),
                generation: 0,
                ready: 0,
            }),
            closed: AtomicBool::new(false),
            errors_tx,
        });

        let conn: Arc<dyn ClientConn> = inner.clone();
        let resolver = resolver_builder.build(&inner.target, conn);

        Ok(Self {
            inner,
            resolver: Mutex::new(Some(resolver)),
            errors_rx: Mutex::new(Some(errors_rx)),
        })
    }

    /// Pick the connection for one call.
    pub fn pick(&self) -> Result<SubConn, PickError> {
        let result = self.inner.picker.load().pick();
        metrics::record_pick(self.inner.builder.name(), result.is_ok());
        result
    }

    /// The current picker. Holders keep a valid picker after it is replaced.
    pub fn picker(&self) -> Arc<PickerSnapshot> {
        self.inner.picker.load_full()
    }

    /// Strategy name in use.
    pub fn policy(&self) -> &str {
        self.inner.builder.name()
    }

    pub fn target(&self) -> &Target {
        &self.inner.target
    }

    /// All handles in endpoint order, ready or not.
    pub fn subconns(&self) -> Vec<SubConn> {
        self.inner
            .lock_state()
            .conns
            .iter()
            .map(|(_, sc)| sc.clone())
            .collect()
    }

    /// Transport report: `subconn` moved to `state`.
    ///
    /// Rebuilds the picker when the handle enters or leaves `Ready`. Handles
    /// this channel no longer owns are ignored.
    pub fn set_connectivity(&self, subconn: &SubConn, state: ConnectivityState) {
        let mut conn_state = self.inner.lock_state();
        if !conn_state.conns.iter().any(|(_, sc)| sc == subconn) {
            tracing::debug!(address = %subconn.address(), "Connectivity report for unknown connection ignored");
            return;
        }

        let prev = subconn.set_state(state);
        tracing::debug!(address = %subconn.address(), from = ?prev, to = ?state, "Connectivity changed");
        if (prev == ConnectivityState::Ready) != (state == ConnectivityState::Ready) {
            self.inner.rebuild(&mut conn_state);
        }
    }

    /// Ask the resolver for a fresh push.
    pub fn resolve_now(&self) {
        if let Some(resolver) = self.resolver.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            resolver.resolve_now();
        }
    }

    /// Errors reported by the resolver. Returns `None` after the first call.
    pub fn errors(&self) -> Option<mpsc::UnboundedReceiver<ResolverError>> {
        self.errors_rx.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Close the resolver and retire every handle. Idempotent.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let resolver = self.resolver.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(resolver) = resolver {
            resolver.close();
        }

        let mut conn_state = self.inner.lock_state();
        for (_, sc) in conn_state.conns.drain(..) {
            sc.set_state(ConnectivityState::Shutdown);
        }
        conn_state.generation += 1;
        self.inner.picker.store(Arc::new(PickerSnapshot {
            picker: Box::new(FailingPicker::unavailable()),
            generation: conn_state.generation,
            ready: 0,
        }));

        tracing::info!(channel = %self.inner.raw_target, "Channel closed");
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.close();
    }
}

impl ChannelInner {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, ConnState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn rejected(&self) -> ResolverError {
        ResolverError::PushRejected { target: self.raw_target.clone() }
    }

    /// Build a picker from the ready handles and swap it in.
    fn rebuild(&self, conn_state: &mut ConnState) {
        let ready: Vec<ReadyConnection> = conn_state
            .conns
            .iter()
            .filter(|(_, sc)| sc.is_ready())
            .map(|(endpoint, sc)| ReadyConnection {
                subconn: sc.clone(),
                endpoint: endpoint.clone(),
            })
            .collect();

        conn_state.generation += 1;
        let picker = self.builder.build(&ready);

        if ready.is_empty() {
            tracing::debug!(channel = %self.raw_target, "No ready connections, picks will fail until the next rebuild");
        } else {
            tracing::info!(
                channel = %self.raw_target,
                strategy = %self.builder.name(),
                ready = ready.len(),
                generation = conn_state.generation,
                "Picker rebuilt"
            );
        }
        metrics::record_picker_rebuild(self.builder.name(), &self.raw_target, ready.len());

        self.picker.store(Arc::new(PickerSnapshot {
            picker,
            generation: conn_state.generation,
            ready: ready.len(),
        }));
    }
}

impl ClientConn for ChannelInner {
    fn update_state(&self, state: ResolverState) -> Result<(), ResolverError> {
        let mut conn_state = self.lock_state();
        if self.closed.load(Ordering::Acquire) {
            return Err(self.rejected());
        }

        let mut existing: HashMap<String, SubConn> = conn_state
            .conns
            .drain(..)
            .map(|(endpoint, sc)| (endpoint.address, sc))
            .collect();

        let mut next: Vec<(Endpoint, SubConn)> = Vec::with_capacity(state.endpoints.len());
        for endpoint in state.endpoints {
            if next.iter().any(|(e, _)| e.address == endpoint.address) {
                tracing::debug!(address = %endpoint.address, "Duplicate endpoint ignored");
                continue;
            }
            let sc = match existing.remove(&endpoint.address) {
                Some(sc) => sc,
                None => {
                    let sc = SubConn::new(conn_state.next_id, endpoint.address.clone());
                    conn_state.next_id += 1;
                    sc.set_state(ConnectivityState::Ready);
                    tracing::info!(channel = %self.raw_target, endpoint = %endpoint, "Connection added");
                    sc
                }
            };
            next.push((endpoint, sc));
        }

        for (address, sc) in existing {
            sc.set_state(ConnectivityState::Shutdown);
            tracing::info!(channel = %self.raw_target, address = %address, "Connection removed");
        }

        conn_state.conns = next;
        self.rebuild(&mut conn_state);
        Ok(())
    }

    fn report_error(&self, err: ResolverError) {
        tracing::warn!(channel = %self.raw_target, error = %err, "Resolver error");
        let _ = self.errors_tx.send(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use crate::config::BalancerConfig;
    use crate::resolver::{Directory, DirectoryResolverBuilder};

    const TARGET: &str = "example:///my-custom-service:1234";

    fn setup(policy: &str) -> (Arc<Directory>, Channel) {
        let mut table = HashMap::new();
        table.insert(
            "my-custom-service:1234".to_string(),
            vec![Endpoint::weighted("A:1", 1), Endpoint::weighted("B:1", 3)],
        );
        let dir = Arc::new(Directory::new(table));
        let resolver = DirectoryResolverBuilder::new("example", dir.clone());
        let registry = StrategyRegistry::with_defaults(&BalancerConfig::default());
        let channel = Channel::connect(TARGET, policy, &resolver, &registry).unwrap();
        (dir, channel)
    }

    fn picks(channel: &Channel, n: usize) -> Vec<String> {
        (0..n).map(|_| channel.pick().unwrap().address().to_string()).collect()
    }

    #[test]
    fn test_connect_errors() {
        let dir = Arc::new(Directory::default());
        let resolver = DirectoryResolverBuilder::new("example", dir);
        let registry = StrategyRegistry::with_defaults(&BalancerConfig::default());

        assert!(matches!(
            Channel::connect("no-scheme", "pick_first", &resolver, &registry),
            Err(ChannelError::InvalidTarget(_))
        ));
        assert!(matches!(
            Channel::connect("dns:///svc", "pick_first", &resolver, &registry),
            Err(ChannelError::SchemeMismatch { .. })
        ));
        assert_eq!(
            Channel::connect(TARGET, "least_request", &resolver, &registry).err(),
            Some(ChannelError::Strategy(BalancerError::UnknownStrategy("least_request".into())))
        );
    }

    #[test]
    fn test_custom_robin_alias_picks_randomly() {
        let (_dir, channel) = setup("custom_robin");
        assert_eq!(channel.policy(), "random");
        assert!(picks(&channel, 20).iter().all(|a| a == "A:1" || a == "B:1"));
    }

    #[test]
    fn test_weighted_picks_through_channel() {
        let (_dir, channel) = setup("weighted_round_robin");
        assert_eq!(channel.policy(), "weighted_round_robin");
        assert_eq!(picks(&channel, 4), ["B:1", "A:1", "B:1", "B:1"]);
    }

    #[test]
    fn test_unknown_service_is_unavailable() {
        let dir = Arc::new(Directory::default());
        let resolver = DirectoryResolverBuilder::new("example", dir);
        let registry = StrategyRegistry::with_defaults(&BalancerConfig::default());
        let channel = Channel::connect("example:///ghost", "random", &resolver, &registry).unwrap();

        assert_eq!(channel.pick().unwrap_err(), PickError::NoConnectionsAvailable);
        assert_eq!(channel.picker().generation(), 1);
    }

    #[test]
    fn test_readiness_change_rebuilds_and_resets() {
        let (_dir, channel) = setup("weighted_round_robin");
        channel.pick().unwrap();
        let before = channel.picker();

        let a = channel.subconns()[0].clone();
        channel.set_connectivity(&a, ConnectivityState::TransientFailure);
        assert_eq!(channel.picker().ready(), 1);
        assert!(picks(&channel, 3).iter().all(|addr| addr == "B:1"));

        channel.set_connectivity(&a, ConnectivityState::Ready);
        let after = channel.picker();
        assert!(after.generation() > before.generation());
        // fresh picker, no bias from earlier picks
        assert_eq!(picks(&channel, 4), ["B:1", "A:1", "B:1", "B:1"]);

        // the superseded snapshot still answers
        assert!(before.pick().is_ok());
    }

    #[test]
    fn test_same_state_report_keeps_picker() {
        let (_dir, channel) = setup("round_robin");
        let generation = channel.picker().generation();
        let a = channel.subconns()[0].clone();
        channel.set_connectivity(&a, ConnectivityState::Ready);
        assert_eq!(channel.picker().generation(), generation);

        let stranger = SubConn::new(99, "C:1");
        channel.set_connectivity(&stranger, ConnectivityState::TransientFailure);
        assert_eq!(channel.picker().generation(), generation);
    }

    #[test]
    fn test_all_unready_is_unavailable() {
        let (_dir, channel) = setup("pick_first");
        for sc in channel.subconns() {
            channel.set_connectivity(&sc, ConnectivityState::Connecting);
        }
        assert_eq!(channel.pick().unwrap_err(), PickError::NoConnectionsAvailable);
    }

    #[test]
    fn test_update_reconciles_handles() {
        let (dir, channel) = setup("round_robin");
        let old = channel.subconns();

        dir.upsert(
            "my-custom-service:1234",
            vec![Endpoint::weighted("B:1", 5), Endpoint::new("C:1"), Endpoint::new("C:1")],
        );
        channel.resolve_now();

        let now = channel.subconns();
        assert_eq!(now.len(), 2);
        assert_eq!(now[0], old[1]);
        assert_eq!(now[1].address(), "C:1");
        assert_eq!(old[0].state(), ConnectivityState::Shutdown);
    }

    #[test]
    fn test_close_rejects_pushes() {
        let (_dir, channel) = setup("round_robin");
        let mut errors = channel.errors().unwrap();
        assert!(channel.errors().is_none());

        let subconns = channel.subconns();
        channel.close();
        channel.close();
        assert!(channel.is_closed());
        assert!(subconns.iter().all(|sc| sc.state() == ConnectivityState::Shutdown));
        assert_eq!(channel.pick().unwrap_err(), PickError::NoConnectionsAvailable);

        let err = channel
            .inner
            .update_state(ResolverState { endpoints: vec![Endpoint::new("A:1")] })
            .unwrap_err();
        channel.inner.report_error(err);
        assert_eq!(
            errors.try_recv().unwrap(),
            ResolverError::PushRejected { target: TARGET.into() }
        );
    }
}
