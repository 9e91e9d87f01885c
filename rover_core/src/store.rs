//! Shared state store.
//!
//! One [`SystemState`] exists for the process lifetime, owned behind the
//! store's lock. All public operations are atomic: readers only ever get
//! snapshot copies, never a live reference, so a torn update cannot be
//! observed. The lock is held for the duration of a single map update or
//! clone — never across driver I/O.

use parking_lot::RwLock;
use rover_common::reading::{DeviceReading, now_us};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Maximum retained error-log entries.
pub const ERROR_LOG_CAP: usize = 64;

/// One recorded driver failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// When the failure was recorded [Unix µs].
    pub timestamp_us: u64,
    /// Device that failed.
    pub device_id: String,
    /// Failure description.
    pub message: String,
}

/// Complete system state at a point in time.
///
/// Live instance is private to [`StateStore`]; external readers and the
/// persistence task work with `snapshot()` deep copies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemState {
    /// Latest reading per device.
    pub readings: HashMap<String, DeviceReading>,
    /// Global emergency-stop flag.
    pub emergency_stopped: bool,
    /// When the store was created [Unix µs].
    pub started_at_us: u64,
    /// Recent driver failures, oldest first, capped at [`ERROR_LOG_CAP`].
    pub error_log: VecDeque<ErrorEntry>,
}

impl SystemState {
    fn new() -> Self {
        Self {
            readings: HashMap::new(),
            emergency_stopped: false,
            started_at_us: now_us(),
            error_log: VecDeque::new(),
        }
    }
}

/// Exclusion-guarded container around [`SystemState`].
///
/// The only resource shared between the poll task, the persistence task
/// and external readers. Updates are atomic per device: `get()` after
/// concurrent `update()` calls returns exactly one submitted reading,
/// never a mixture of fields.
#[derive(Debug)]
pub struct StateStore {
    inner: RwLock<SystemState>,
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(SystemState::new()),
        }
    }

    /// Replace the entry for the reading's device.
    pub fn update(&self, reading: DeviceReading) {
        let mut state = self.inner.write();
        state.readings.insert(reading.device_id.clone(), reading);
    }

    /// Latest reading for a device, if it has ever reported.
    pub fn get(&self, device_id: &str) -> Option<DeviceReading> {
        self.inner.read().readings.get(device_id).cloned()
    }

    /// Deep copy of the current state. Subsequent store mutations are
    /// invisible to the caller.
    pub fn snapshot(&self) -> SystemState {
        self.inner.read().clone()
    }

    /// Set the global emergency-stop flag. Observed by the next poll tick.
    pub fn trigger_emergency_stop(&self) {
        self.inner.write().emergency_stopped = true;
    }

    /// Clear the global emergency-stop flag.
    pub fn clear_emergency_stop(&self) {
        self.inner.write().emergency_stopped = false;
    }

    /// Whether the emergency-stop flag is set.
    pub fn is_emergency_stopped(&self) -> bool {
        self.inner.read().emergency_stopped
    }

    /// Append a driver failure to the capped error ring.
    pub fn record_error(&self, device_id: &str, message: impl Into<String>) {
        let mut state = self.inner.write();
        state.error_log.push_back(ErrorEntry {
            timestamp_us: now_us(),
            device_id: device_id.to_string(),
            message: message.into(),
        });
        while state.error_log.len() > ERROR_LOG_CAP {
            state.error_log.pop_front();
        }
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_common::reading::ReadingPayload;
    use std::sync::Arc;

    fn range_reading(distances: Vec<f32>) -> DeviceReading {
        DeviceReading::ok("range", ReadingPayload::Range { distances_cm: distances })
    }

    #[test]
    fn update_then_get_returns_latest() {
        let store = StateStore::new();
        assert!(store.get("range").is_none());

        store.update(range_reading(vec![10.0]));
        store.update(range_reading(vec![20.0]));

        let r = store.get("range").unwrap();
        assert_eq!(r.payload, ReadingPayload::Range { distances_cm: vec![20.0] });
    }

    #[test]
    fn snapshot_is_isolated_from_later_updates() {
        let store = StateStore::new();
        store.update(range_reading(vec![10.0]));

        let snap = store.snapshot();
        store.update(range_reading(vec![99.0]));
        store.trigger_emergency_stop();

        assert_eq!(
            snap.readings["range"].payload,
            ReadingPayload::Range { distances_cm: vec![10.0] }
        );
        assert!(!snap.emergency_stopped);
        assert!(store.is_emergency_stopped());
    }

    #[test]
    fn emergency_flag_round_trip() {
        let store = StateStore::new();
        assert!(!store.is_emergency_stopped());
        store.trigger_emergency_stop();
        assert!(store.is_emergency_stopped());
        store.clear_emergency_stop();
        assert!(!store.is_emergency_stopped());
    }

    #[test]
    fn error_log_is_capped() {
        let store = StateStore::new();
        for i in 0..(ERROR_LOG_CAP + 10) {
            store.record_error("range", format!("failure {i}"));
        }
        let snap = store.snapshot();
        assert_eq!(snap.error_log.len(), ERROR_LOG_CAP);
        // Oldest entries were evicted.
        assert_eq!(snap.error_log.front().unwrap().message, "failure 10");
        assert_eq!(
            snap.error_log.back().unwrap().message,
            format!("failure {}", ERROR_LOG_CAP + 9)
        );
    }

    #[test]
    fn concurrent_updates_never_tear() {
        // Writers race on the same key; every observed reading must be
        // exactly one submitted value (payload consistent with its
        // device id), never a mixture.
        let store = Arc::new(StateStore::new());
        let mut handles = Vec::new();

        for writer in 0..4u32 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                for i in 0..250u32 {
                    let value = (writer * 1000 + i) as f32;
                    store.update(range_reading(vec![value, value]));
                }
            }));
        }

        let reader = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..500 {
                    if let Some(r) = store.get("range") {
                        match r.payload {
                            ReadingPayload::Range { distances_cm } => {
                                assert_eq!(distances_cm[0], distances_cm[1], "torn reading");
                            }
                            other => panic!("unexpected payload {other:?}"),
                        }
                    }
                }
            })
        };

        for h in handles {
            h.join().unwrap();
        }
        reader.join().unwrap();

        let r = store.get("range").unwrap();
        assert!(r.is_ok());
    }
}
