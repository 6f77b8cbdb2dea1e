//! Fan-out of snapshot payloads to every connected viewer session.
//!
//! Sessions join and leave independently of snapshot events. `publish` never
//! waits on a viewer: each session owns a small bounded queue, and a viewer
//! that falls behind loses payloads instead of stalling everyone else.

use shared::ServerSection;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::{self, error::TrySendError};

pub type SessionId = u64;

/// Raw snapshot text, shared between all session queues.
pub type Payload = Arc<str>;

/// Destination for every snapshot the watcher reads.
pub trait SnapshotSink: Send + Sync {
    /// Hands `payload` on and returns how many receivers accepted it.
    fn publish(&self, payload: String) -> usize;
}

/// Receiving end of one viewer's queue.
pub struct Session {
    pub id: SessionId,
    pub payloads: mpsc::Receiver<Payload>,
}

struct BroadcastState {
    sessions: HashMap<SessionId, mpsc::Sender<Payload>>,
    last_snapshot: Option<Payload>,
}

pub struct Broadcaster {
    state: Mutex<BroadcastState>,
    next_id: AtomicU64,
    replay_last: bool,
    queue_capacity: usize,
}

impl Broadcaster {
    pub fn new(replay_last: bool, queue_capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(BroadcastState {
                sessions: HashMap::new(),
                last_snapshot: None,
            }),
            next_id: AtomicU64::new(1),
            replay_last,
            queue_capacity: queue_capacity.max(1),
        })
    }

    pub fn from_config(config: &ServerSection) -> Arc<Self> {
        Self::new(config.replay_last_snapshot, config.session_queue)
    }

    fn lock_state(&self) -> MutexGuard<'_, BroadcastState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Broadcaster state mutex poisoned; recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Registers a new viewer session. With replay enabled the session's
    /// queue starts out holding the most recent snapshot.
    pub fn connect(&self) -> Session {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut state = self.lock_state();
        if self.replay_last {
            if let Some(last) = state.last_snapshot.clone() {
                let _ = tx.try_send(last);
            }
        }
        state.sessions.insert(id, tx);
        log::info!(
            "Session {} connected ({} active)",
            id,
            state.sessions.len()
        );

        Session { id, payloads: rx }
    }

    pub fn disconnect(&self, id: SessionId) -> bool {
        let mut state = self.lock_state();
        let removed = state.sessions.remove(&id).is_some();
        if removed {
            log::info!(
                "Session {} disconnected ({} active)",
                id,
                state.sessions.len()
            );
        }
        removed
    }

    pub fn session_count(&self) -> usize {
        self.lock_state().sessions.len()
    }

    pub fn last_snapshot(&self) -> Option<Payload> {
        self.lock_state().last_snapshot.clone()
    }

    /// Sends `payload` to every connected session without waiting.
    ///
    /// A full queue drops the payload for that session only. A closed queue
    /// means the viewer is gone, so its session is forgotten.
    pub fn publish(&self, payload: String) -> usize {
        let payload: Payload = Arc::from(payload);
        let mut state = self.lock_state();
        state.last_snapshot = Some(payload.clone());

        let mut delivered = 0;
        state.sessions.retain(|id, tx| match tx.try_send(payload.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                log::debug!("Session {} is behind; dropping snapshot", id);
                true
            }
            Err(TrySendError::Closed(_)) => {
                log::debug!("Session {} closed before publish; forgetting it", id);
                false
            }
        });

        log::debug!(
            "Published snapshot ({} bytes) to {} session(s)",
            payload.len(),
            delivered
        );
        delivered
    }
}

impl SnapshotSink for Broadcaster {
    fn publish(&self, payload: String) -> usize {
        Broadcaster::publish(self, payload)
    }
}
