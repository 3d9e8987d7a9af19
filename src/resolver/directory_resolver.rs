//! Resolver backed by the in-process [`Directory`].
//!
//! Each resolver has a single writer. Inside a Tokio runtime the watch task
//! owns every push after the first one, and `resolve_now` only wakes it.
//! Without a runtime `resolve_now` pushes inline. In both cases lookup and
//! push happen under one lock, so a push never carries an older table than
//! the one before it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use crate::observability::metrics;
use crate::resolver::{
    ClientConn, Directory, Resolver, ResolverBuilder, ResolverState, Target,
};

/// Scheme used when none is configured.
pub const DEFAULT_SCHEME: &str = "example";

/// Builds [`DirectoryResolver`]s for one scheme.
#[derive(Debug, Clone)]
pub struct DirectoryResolverBuilder {
    scheme: String,
    directory: Arc<Directory>,
}

impl DirectoryResolverBuilder {
    pub fn new(scheme: impl Into<String>, directory: Arc<Directory>) -> Self {
        Self {
            scheme: scheme.into(),
            directory,
        }
    }
}

impl ResolverBuilder for DirectoryResolverBuilder {
    fn scheme(&self) -> &str {
        &self.scheme
    }

    fn build(&self, target: &Target, conn: Arc<dyn ClientConn>) -> Box<dyn Resolver> {
        let resolver = Arc::new(ResolveTask {
            service: target.endpoint.clone(),
            directory: self.directory.clone(),
            conn,
            closed: AtomicBool::new(false),
            push: Mutex::new(()),
            wake: Notify::new(),
        });

        // subscribe first so a change racing the initial push is not lost
        let runtime = tokio::runtime::Handle::try_current()
            .ok()
            .map(|handle| (handle, self.directory.subscribe()));

        resolver.resolve();

        let watcher = match runtime {
            Some((handle, changes)) => Some(handle.spawn(watch_directory(resolver.clone(), changes))),
            None => {
                tracing::debug!(service = %target.endpoint, "No Tokio runtime, directory changes need resolve_now");
                None
            }
        };

        Box::new(DirectoryResolver {
            inner: resolver,
            background: watcher.is_some(),
            watcher: Mutex::new(watcher),
        })
    }
}

/// Resolver for one service name.
pub struct DirectoryResolver {
    inner: Arc<ResolveTask>,
    background: bool,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

struct ResolveTask {
    service: String,
    directory: Arc<Directory>,
    conn: Arc<dyn ClientConn>,
    closed: AtomicBool,
    /// Held across lookup and push.
    push: Mutex<()>,
    wake: Notify,
}

impl ResolveTask {
    fn resolve(&self) {
        let _push = self.push.lock().unwrap_or_else(PoisonError::into_inner);
        if self.closed.load(Ordering::Acquire) {
            return;
        }

        let endpoints = match self.directory.lookup(&self.service) {
            Some(endpoints) => endpoints,
            None => {
                tracing::debug!(service = %self.service, "Service not in directory, pushing empty endpoint set");
                Vec::new()
            }
        };

        for endpoint in &endpoints {
            tracing::debug!(service = %self.service, endpoint = %endpoint, "Resolved endpoint");
        }
        metrics::record_resolver_update(&self.service);

        if let Err(e) = self.conn.update_state(ResolverState { endpoints }) {
            self.conn.report_error(e);
        }
    }
}

async fn watch_directory(task: Arc<ResolveTask>, mut changes: watch::Receiver<u64>) {
    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                tracing::debug!(service = %task.service, "Directory changed, re-resolving");
            }
            _ = task.wake.notified() => {
                tracing::debug!(service = %task.service, "Re-resolution requested");
            }
        }
        if task.closed.load(Ordering::Acquire) {
            break;
        }
        task.resolve();
    }
}

impl Resolver for DirectoryResolver {
    fn resolve_now(&self) {
        if self.inner.closed.load(Ordering::Acquire) {
            return;
        }
        if self.background {
            self.inner.wake.notify_one();
        } else {
            self.inner.resolve();
        }
    }

    fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let watcher = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = watcher {
            handle.abort();
        }
        tracing::debug!(service = %self.inner.service, "Resolver closed");
    }
}

impl Drop for DirectoryResolver {
    fn drop(&mut self) {
        self.close();
    }
}
