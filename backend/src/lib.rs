pub mod broadcaster;
pub mod server;
pub mod watcher;

pub use broadcaster::{Broadcaster, Session, SessionId, SnapshotSink};
pub use watcher::{SnapshotWatcher, WatchState};
