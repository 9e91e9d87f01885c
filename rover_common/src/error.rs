//! Error types for driver and persistence operations.
//!
//! Failures are values, not panics: every driver and sink operation returns
//! one of these enums, and the orchestrator records them without aborting
//! the poll loop. Configuration errors live in [`crate::config`] because
//! they are the only startup-fatal class.

use thiserror::Error;

/// Error opening a device transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// Serial/USB port could not be opened.
    #[error("port unavailable: {0}")]
    PortUnavailable(String),

    /// Transport opened but handshake/identification failed.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Error reading from a device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// Read did not complete within the poll deadline.
    #[error("read timed out")]
    Timeout,

    /// Device is not connected (connect failed or was never called).
    #[error("device not connected")]
    NotConnected,

    /// Transport-level I/O failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Device responded with data that could not be parsed.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Error writing a snapshot to the persistence sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// Underlying storage I/O failed.
    #[error("sink I/O error: {0}")]
    Io(String),

    /// Snapshot could not be serialized.
    #[error("serialization error: {0}")]
    Serialize(String),
}
