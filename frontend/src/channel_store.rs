//! Latest known value of every channel, fed by snapshot payloads.
//!
//! The first snapshot that parses fixes the display rows: one row per
//! channel, in snapshot order. Later snapshots only update values by name.
//! Each payload is applied under a single write lock, so readers see either
//! the previous or the new snapshot, never a mix.

use shared::{ChannelValue, Snapshot};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Page-rendering collaborator that owns the visible channel rows.
pub trait ChannelRows: Send {
    /// Called once, with the channel names in snapshot order.
    fn init_rows(&mut self, names: &[String]);

    fn set_value(&mut self, name: &str, value: &ChannelValue);
}

/// Presentation that renders nothing.
#[derive(Debug, Default)]
pub struct NoRows;

impl ChannelRows for NoRows {
    fn init_rows(&mut self, _names: &[String]) {}

    fn set_value(&mut self, _name: &str, _value: &ChannelValue) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    /// No snapshot carrying this channel has arrived yet.
    NotYetAvailable,
    Value(ChannelValue),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    RowsInitialized(usize),
    Updated(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("malformed snapshot payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Default)]
struct StoreState {
    values: HashMap<String, ChannelValue>,
    rows: Vec<String>,
    row_names: HashSet<String>,
    initialized: bool,
}

pub struct ChannelStore {
    state: RwLock<StoreState>,
    rows: Mutex<Box<dyn ChannelRows>>,
}

impl ChannelStore {
    pub fn new(rows: impl ChannelRows + 'static) -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(StoreState::default()),
            rows: Mutex::new(Box::new(rows)),
        })
    }

    pub fn headless() -> Arc<Self> {
        Self::new(NoRows)
    }

    fn read_state(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_rows(&self) -> MutexGuard<'_, Box<dyn ChannelRows>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Folds one snapshot payload into the store.
    ///
    /// A payload that does not parse is logged and discarded; nothing in the
    /// store changes.
    pub fn on_snapshot(&self, payload: &str) -> Result<SnapshotOutcome, StoreError> {
        let snapshot = match Snapshot::from_json(payload) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                log::warn!("Discarding malformed snapshot: {}", err);
                return Err(err.into());
            }
        };

        let mut state = self.write_state();
        let mut rows = self.lock_rows();

        let outcome = if state.initialized {
            SnapshotOutcome::Updated(snapshot.channels.len())
        } else {
            let mut ordered = Vec::with_capacity(snapshot.channels.len());
            for name in snapshot.channel_names() {
                if state.row_names.insert(name.clone()) {
                    ordered.push(name);
                }
            }
            state.rows = ordered;
            state.initialized = true;
            rows.init_rows(&state.rows);
            log::info!("Initialized {} channel row(s)", state.rows.len());
            SnapshotOutcome::RowsInitialized(state.rows.len())
        };

        for channel in snapshot.channels {
            if state.row_names.contains(&channel.name) {
                rows.set_value(&channel.name, &channel.value);
            }
            state.values.insert(channel.name, channel.value);
        }

        Ok(outcome)
    }

    pub fn get(&self, name: &str) -> Reading {
        match self.read_state().values.get(name) {
            Some(value) => Reading::Value(value.clone()),
            None => Reading::NotYetAvailable,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.read_state().initialized
    }

    /// Row names in creation order; empty before the first snapshot.
    pub fn row_names(&self) -> Vec<String> {
        self.read_state().rows.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum RowEvent {
        Init(Vec<String>),
        Set(String, String),
    }

    #[derive(Clone, Default)]
    struct RecordingRows(Arc<Mutex<Vec<RowEvent>>>);

    impl RecordingRows {
        fn events(&self) -> Vec<RowEvent> {
            self.0.lock().unwrap().clone()
        }
    }

    impl ChannelRows for RecordingRows {
        fn init_rows(&mut self, names: &[String]) {
            self.0.lock().unwrap().push(RowEvent::Init(names.to_vec()));
        }

        fn set_value(&mut self, name: &str, value: &ChannelValue) {
            self.0
                .lock()
                .unwrap()
                .push(RowEvent::Set(name.to_string(), value.to_string()));
        }
    }

    const RPM_1200: &str = r#"{"channels":[{"name":"RPM","value":"1200"}]}"#;
    const RPM_1350: &str = r#"{"channels":[{"name":"RPM","value":"1350"}]}"#;

    #[test]
    fn first_snapshot_creates_rows_then_updates_in_place() {
        let rows = RecordingRows::default();
        let store = ChannelStore::new(rows.clone());

        assert_eq!(
            store.on_snapshot(RPM_1200).unwrap(),
            SnapshotOutcome::RowsInitialized(1)
        );
        assert_eq!(store.get("RPM"), Reading::Value("1200".into()));

        assert_eq!(store.on_snapshot(RPM_1350).unwrap(), SnapshotOutcome::Updated(1));
        assert_eq!(store.get("RPM"), Reading::Value("1350".into()));
        assert_eq!(store.row_names(), vec!["RPM"]);
        assert_eq!(
            rows.events(),
            vec![
                RowEvent::Init(vec!["RPM".to_string()]),
                RowEvent::Set("RPM".to_string(), "1200".to_string()),
                RowEvent::Set("RPM".to_string(), "1350".to_string()),
            ]
        );
    }

    #[test]
    fn later_order_changes_do_not_reorder_rows() {
        let rows = RecordingRows::default();
        let store = ChannelStore::new(rows.clone());

        store
            .on_snapshot(r#"{"channels":[{"name":"RPM","value":"1"},{"name":"BatteryVoltage","value":"13.1 V"}]}"#)
            .unwrap();
        store
            .on_snapshot(r#"{"channels":[{"name":"BatteryVoltage","value":"13.4 V"},{"name":"RPM","value":"2"}]}"#)
            .unwrap();

        assert_eq!(store.row_names(), vec!["RPM", "BatteryVoltage"]);
        let inits = rows
            .events()
            .into_iter()
            .filter(|event| matches!(event, RowEvent::Init(_)))
            .count();
        assert_eq!(inits, 1);
        assert_eq!(store.get("BatteryVoltage"), Reading::Value("13.4 V".into()));
    }

    #[test]
    fn malformed_payload_leaves_state_untouched() {
        let rows = RecordingRows::default();
        let store = ChannelStore::new(rows.clone());
        store.on_snapshot(RPM_1200).unwrap();
        let events_before = rows.events();

        assert!(matches!(
            store.on_snapshot(r#"{"channels":[{"name":"RPM","value":"#),
            Err(StoreError::Malformed(_))
        ));
        assert!(store.on_snapshot(r#"{"readings":[]}"#).is_err());

        assert_eq!(store.get("RPM"), Reading::Value("1200".into()));
        assert_eq!(store.row_names(), vec!["RPM"]);
        assert_eq!(rows.events(), events_before);
    }

    #[test]
    fn malformed_first_payload_does_not_initialize() {
        let store = ChannelStore::headless();
        assert!(store.on_snapshot("garbage").is_err());
        assert!(!store.is_initialized());
        assert_eq!(store.get("RPM"), Reading::NotYetAvailable);

        store.on_snapshot(RPM_1200).unwrap();
        assert!(store.is_initialized());
    }

    #[test]
    fn channel_added_after_initialization_gets_no_row() {
        let rows = RecordingRows::default();
        let store = ChannelStore::new(rows.clone());
        store.on_snapshot(RPM_1200).unwrap();

        store
            .on_snapshot(r#"{"channels":[{"name":"RPM","value":"1400"},{"name":"OilTemp","value":92}]}"#)
            .unwrap();

        assert_eq!(store.row_names(), vec!["RPM"]);
        assert_eq!(store.get("OilTemp"), Reading::Value(ChannelValue::Number(92.0)));
        assert!(
            !rows
                .events()
                .iter()
                .any(|event| matches!(event, RowEvent::Set(name, _) if name == "OilTemp"))
        );
    }

    #[test]
    fn duplicate_names_in_first_snapshot_create_one_row() {
        let store = ChannelStore::headless();
        let outcome = store
            .on_snapshot(r#"{"channels":[{"name":"RPM","value":"1"},{"name":"RPM","value":"2"}]}"#)
            .unwrap();

        assert_eq!(outcome, SnapshotOutcome::RowsInitialized(1));
        assert_eq!(store.get("RPM"), Reading::Value("2".into()));
    }
}
