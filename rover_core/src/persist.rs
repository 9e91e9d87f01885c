//! Persistence sink.
//!
//! The persistence task hands one snapshot per tick to a
//! [`PersistenceSink`]. The core does not depend on the sink's storage
//! format; a sink failure is logged by the task, the tick skipped, and
//! the next tick retried.

use async_trait::async_trait;
use rover_common::error::SinkError;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::store::SystemState;

/// Durable recorder for state snapshots.
#[async_trait]
pub trait PersistenceSink: Send {
    /// Record one snapshot. Invoked once per persistence tick.
    async fn save(&mut self, snapshot: &SystemState) -> Result<(), SinkError>;
}

/// Appends each snapshot as one JSON document per line.
///
/// The write is plain blocking file I/O; the sink only ever runs on the
/// persistence task, which is scheduled independently of the poll task,
/// so a slow write path cannot delay emergency-stop propagation.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

#[async_trait]
impl PersistenceSink for JsonlSink {
    async fn save(&mut self, snapshot: &SystemState) -> Result<(), SinkError> {
        let mut line =
            serde_json::to_vec(snapshot).map_err(|e| SinkError::Serialize(e.to_string()))?;
        line.push(b'\n');

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| SinkError::Io(format!("{}: {e}", self.path.display())))?;
        file.write_all(&line)
            .map_err(|e| SinkError::Io(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StateStore;
    use rover_common::reading::{DeviceReading, ReadingPayload};
    use tempfile::TempDir;

    #[tokio::test]
    async fn jsonl_sink_appends_one_line_per_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.jsonl");
        let mut sink = JsonlSink::new(&path);

        let store = StateStore::new();
        store.update(DeviceReading::ok(
            "range",
            ReadingPayload::Range { distances_cm: vec![42.0] },
        ));

        sink.save(&store.snapshot()).await.unwrap();
        store.trigger_emergency_stop();
        sink.save(&store.snapshot()).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: SystemState = serde_json::from_str(lines[0]).unwrap();
        assert!(!first.emergency_stopped);
        let second: SystemState = serde_json::from_str(lines[1]).unwrap();
        assert!(second.emergency_stopped);
        assert!(second.readings.contains_key("range"));
    }

    #[tokio::test]
    async fn jsonl_sink_reports_io_errors() {
        let dir = TempDir::new().unwrap();
        // Path points at a directory — the open must fail, as a value.
        let mut sink = JsonlSink::new(dir.path());
        let err = sink.save(&StateStore::new().snapshot()).await.unwrap_err();
        assert!(matches!(err, SinkError::Io(_)), "got {err:?}");
    }
}
