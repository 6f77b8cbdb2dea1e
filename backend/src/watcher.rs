//! Watches the snapshot file written by the acquisition process.
//!
//! The acquisition process may start after the server, so subscribing is
//! retried on a fixed delay with no attempt limit. Once subscribed, every
//! debounced change triggers a full read of the file, and non-empty
//! content is forwarded verbatim.

use crate::broadcaster::SnapshotSink;
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use shared::ServerSection;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Not watching; `attempts` counts failed subscriptions since the last
    /// successful one.
    Unsubscribed { attempts: u32 },
    Subscribed,
}

struct Subscription {
    _debouncer: Debouncer<RecommendedWatcher>,
    changes: mpsc::UnboundedReceiver<()>,
}

pub struct SnapshotWatcher {
    path: PathBuf,
    retry_delay: Duration,
    debounce: Duration,
    state_tx: watch::Sender<WatchState>,
}

impl SnapshotWatcher {
    pub fn new(path: impl Into<PathBuf>, retry_delay: Duration, debounce: Duration) -> Self {
        let (state_tx, _) = watch::channel(WatchState::Unsubscribed { attempts: 0 });
        Self {
            path: path.into(),
            retry_delay,
            debounce,
            state_tx,
        }
    }

    pub fn from_config(config: &ServerSection) -> Self {
        Self::new(&config.snapshot_path, config.retry_delay(), config.debounce())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> watch::Receiver<WatchState> {
        self.state_tx.subscribe()
    }

    /// Runs until the task is dropped.
    pub async fn run<S>(self, sink: Arc<S>)
    where
        S: SnapshotSink + ?Sized,
    {
        let mut attempts = 0u32;
        loop {
            match self.subscribe() {
                Ok(subscription) => {
                    attempts = 0;
                    self.state_tx.send_replace(WatchState::Subscribed);
                    log::info!("Watching snapshot file {}", self.path.display());

                    self.forward_changes(subscription, sink.as_ref()).await;

                    self.state_tx
                        .send_replace(WatchState::Unsubscribed { attempts });
                    log::warn!(
                        "Snapshot file {} went away; resubscribing",
                        self.path.display()
                    );
                }
                Err(err) => {
                    attempts = attempts.saturating_add(1);
                    self.state_tx
                        .send_replace(WatchState::Unsubscribed { attempts });
                    log::warn!(
                        "Snapshot file {} unavailable ({}). Trying again in {:?}...",
                        self.path.display(),
                        err,
                        self.retry_delay
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }

    fn subscribe(&self) -> Result<Subscription, notify::Error> {
        let (tx, changes) = mpsc::unbounded_channel();
        let label = self.path.display().to_string();

        let mut debouncer =
            new_debouncer(self.debounce, move |result: DebounceEventResult| match result {
                Ok(events) => {
                    if !events.is_empty() {
                        let _ = tx.send(());
                    }
                }
                Err(err) => {
                    log::error!("Snapshot watcher error for '{}': {}", label, err);
                }
            })?;

        debouncer
            .watcher()
            .watch(&self.path, RecursiveMode::NonRecursive)?;

        Ok(Subscription {
            _debouncer: debouncer,
            changes,
        })
    }

    /// Returns once the file can no longer be found.
    async fn forward_changes<S>(&self, mut subscription: Subscription, sink: &S)
    where
        S: SnapshotSink + ?Sized,
    {
        while subscription.changes.recv().await.is_some() {
            match read_snapshot(&self.path) {
                Ok(Some(payload)) => {
                    let delivered = sink.publish(payload);
                    log::debug!("Snapshot change forwarded to {} session(s)", delivered);
                }
                Ok(None) => log::debug!("Snapshot file is empty; skipping change"),
                Err(err) if err.kind() == io::ErrorKind::NotFound => return,
                Err(err) => log::warn!(
                    "Failed to read snapshot file {}: {}",
                    self.path.display(),
                    err
                ),
            }
        }
    }
}

/// Reads the whole snapshot file. Blank content yields `None`.
pub fn read_snapshot(path: &Path) -> io::Result<Option<String>> {
    let text = std::fs::read_to_string(path)?;
    if text.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(text))
    }
}
