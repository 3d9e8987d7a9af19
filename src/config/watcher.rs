//! Directory hot reload from the configuration file.
//!
//! Only the `services` table is reloaded. A file event reloads and validates
//! the whole file, then replaces the directory when the table differs from
//! the last one applied. Editors emit several events per save; the repeats
//! compare equal and are dropped, so resolvers see one change per edit.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::ServiceConfig;
use crate::resolver::Directory;

/// What a reload did to the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reload {
    /// The table changed and was swapped in; carries the service count.
    Applied(usize),
    /// The file parsed to the table already in place.
    Unchanged,
}

/// Keeps a [`Directory`] in sync with the services listed in a config file.
#[derive(Clone)]
pub struct DirectoryReloader {
    path: PathBuf,
    directory: Arc<Directory>,
    applied: Arc<Mutex<Vec<ServiceConfig>>>,
}

impl DirectoryReloader {
    /// `current` is the table the directory was built from.
    pub fn new(path: &Path, directory: Arc<Directory>, current: Vec<ServiceConfig>) -> Self {
        Self {
            path: path.to_path_buf(),
            directory,
            applied: Arc::new(Mutex::new(current)),
        }
    }

    /// Re-read the file and apply its services. On error the directory is
    /// left untouched.
    pub fn reload(&self) -> Result<Reload, ConfigError> {
        let services = load_config(&self.path)?.services;

        let mut applied = self.applied.lock().unwrap_or_else(PoisonError::into_inner);
        if *applied == services {
            return Ok(Reload::Unchanged);
        }
        self.directory.replace_from_config(&services);
        let count = services.len();
        *applied = services;
        Ok(Reload::Applied(count))
    }

    /// Start watching the file. Reloads run on the notify thread; the
    /// returned watcher must be kept alive.
    pub fn watch(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();
        let reloader = self.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::error!(error = %e, path = ?reloader.path, "Config watch error");
                    return;
                }
            };
            if !(event.kind.is_modify() || event.kind.is_create()) {
                return;
            }
            match reloader.reload() {
                Ok(Reload::Applied(services)) => {
                    tracing::info!(path = ?reloader.path, services, "Directory reloaded from config")
                }
                Ok(Reload::Unchanged) => {
                    tracing::debug!(path = ?reloader.path, "Config event without service changes")
                }
                Err(e) => {
                    tracing::warn!(path = ?reloader.path, error = %e, "Config reload rejected, directory unchanged")
                }
            }
        })?;
        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Watching config for directory changes");
        Ok(watcher)
    }
}
