//! Live configuration with background reload
//!
//! Readers take a snapshot with [`ConfigStore::snapshot`], which is a
//! lock-free `arc-swap` load. The poller replaces the whole `Arc<Config>`
//! when `config.yaml` gets a newer modification time, so a reader holds
//! either the old mapping or the new one, never a mix.
//!
//! A reload that fails to parse keeps the previous snapshot *and* the
//! previous modification time. The broken file is therefore retried on
//! every tick until it parses.

use arc_swap::ArcSwap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::Config;
use crate::error::ConfigError;

/// How often the poller stats `config.yaml`
pub const CONFIG_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Result of a single poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Unchanged,
    Reloaded,
    Failed,
}

/// Process-wide configuration snapshot
pub struct ConfigStore {
    path: PathBuf,
    current: ArcSwap<Config>,
    /// Modification time of the file behind `current`
    mtime: Mutex<SystemTime>,
}

impl ConfigStore {
    /// Initial synchronous load. The caller must not serve if this fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let mtime = file_mtime(&path).unwrap_or(SystemTime::UNIX_EPOCH);
        let config = Config::load(&path)?;

        tracing::debug!("Loaded config {:?} ({} keys)", path, config.len());

        Ok(Self {
            path,
            current: ArcSwap::from_pointee(config),
            mtime: Mutex::new(mtime),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current configuration
    #[inline]
    pub fn snapshot(&self) -> Arc<Config> {
        self.current.load_full()
    }

    /// Check the file once and reload it if it changed
    pub fn poll_once(&self) -> PollOutcome {
        let mtime = match file_mtime(&self.path) {
            Ok(mtime) => mtime,
            Err(_) => return PollOutcome::Unchanged,
        };

        let mut recorded = match self.mtime.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if mtime <= *recorded {
            return PollOutcome::Unchanged;
        }

        match Config::load(&self.path) {
            Ok(config) => {
                self.current.store(Arc::new(config));
                *recorded = mtime;
                tracing::info!("Config file updated: {:?}", self.path);
                PollOutcome::Reloaded
            }
            Err(e) => {
                tracing::warn!("Keeping previous config: {}", e);
                PollOutcome::Failed
            }
        }
    }

    /// Start polling on a background task.
    ///
    /// The task runs until [`ConfigPoller::stop`] is called or the returned
    /// handle is dropped.
    pub fn spawn_poller(self: &Arc<Self>, interval: Duration) -> ConfigPoller {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let store = Arc::clone(self);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; the initial load already happened.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        store.poll_once();
                    }
                }
            }

            tracing::debug!("Config poller stopped");
        });

        ConfigPoller {
            stop_tx: Some(stop_tx),
            handle,
        }
    }
}

/// Handle to the background config poller
pub struct ConfigPoller {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl ConfigPoller {
    /// Stop the poller and wait for the task to finish
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.handle).await {
            tracing::error!("Config poller task failed: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

fn file_mtime(path: &Path) -> std::io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}
