//! Hardware serial links.
//!
//! Line-oriented ASCII protocols over tokio-serial:
//!
//! - ranging sensor: request `R`, reply `R <d0> <d1> ...` (cm, one token
//!   per zone)
//! - vision sensor: request `V`, reply `V <id> <x> <y> <w> <h>;...`
//!   (semicolon-separated objects; bare `V` when nothing is in view)
//! - motor controller: write `M <left> <right>`, no reply
//!
//! A hung endpoint simply never produces a line; the poll task's deadline
//! guard turns that into [`ReadError::Timeout`].

use async_trait::async_trait;
use rover_common::error::{ConnectError, ReadError};
use rover_common::reading::DetectedObject;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use crate::drivers::motor::MotorLink;
use crate::drivers::range::RangeLink;
use crate::drivers::vision::VisionLink;
use crate::motor::ActuatorSignal;

/// One serial endpoint with open/close lifecycle and line-oriented I/O.
struct SerialPort {
    path: String,
    baud: u32,
    stream: Option<BufReader<SerialStream>>,
}

impl SerialPort {
    fn new(path: &str, baud: u32) -> Self {
        Self {
            path: path.to_string(),
            baud,
            stream: None,
        }
    }

    async fn open(&mut self) -> Result<(), ConnectError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let stream = tokio_serial::new(&self.path, self.baud)
            .open_native_async()
            .map_err(|e| ConnectError::PortUnavailable(format!("{}: {e}", self.path)))?;
        self.stream = Some(BufReader::new(stream));
        Ok(())
    }

    fn close(&mut self) {
        self.stream = None;
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Write a request and read one reply line.
    async fn request_line(&mut self, request: &[u8]) -> Result<String, ReadError> {
        let stream = self.stream.as_mut().ok_or(ReadError::NotConnected)?;
        stream
            .get_mut()
            .write_all(request)
            .await
            .map_err(|e| ReadError::Transport(e.to_string()))?;

        let mut line = String::new();
        let n = stream
            .read_line(&mut line)
            .await
            .map_err(|e| ReadError::Transport(e.to_string()))?;
        if n == 0 {
            return Err(ReadError::Transport("endpoint closed".to_string()));
        }
        Ok(line)
    }

    /// Write one line, no reply expected.
    async fn write_line(&mut self, line: &str) -> Result<(), ReadError> {
        let stream = self.stream.as_mut().ok_or(ReadError::NotConnected)?;
        stream
            .get_mut()
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ReadError::Transport(e.to_string()))
    }
}

/// Parse a `R <d0> <d1> ...` reply.
fn parse_range_line(line: &str) -> Result<Vec<f32>, ReadError> {
    let rest = line
        .trim()
        .strip_prefix('R')
        .ok_or_else(|| ReadError::Protocol(format!("unexpected range reply: {line:?}")))?;
    rest.split_whitespace()
        .map(|token| {
            token
                .parse::<f32>()
                .map_err(|_| ReadError::Protocol(format!("bad distance token: {token:?}")))
        })
        .collect()
}

/// Parse a `V <id> <x> <y> <w> <h>;...` reply.
fn parse_vision_line(line: &str) -> Result<Vec<DetectedObject>, ReadError> {
    let rest = line
        .trim()
        .strip_prefix('V')
        .ok_or_else(|| ReadError::Protocol(format!("unexpected vision reply: {line:?}")))?;

    let mut objects = Vec::new();
    for entry in rest.split(';') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let fields: Vec<&str> = entry.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(ReadError::Protocol(format!(
                "expected 5 object fields, got {}: {entry:?}",
                fields.len()
            )));
        }
        let parse_err = |field: &str| ReadError::Protocol(format!("bad object field: {field:?}"));
        objects.push(DetectedObject {
            id: fields[0].parse().map_err(|_| parse_err(fields[0]))?,
            x: fields[1].parse().map_err(|_| parse_err(fields[1]))?,
            y: fields[2].parse().map_err(|_| parse_err(fields[2]))?,
            width: fields[3].parse().map_err(|_| parse_err(fields[3]))?,
            height: fields[4].parse().map_err(|_| parse_err(fields[4]))?,
        });
    }
    Ok(objects)
}

/// Ranging sensor over serial.
pub struct SerialRangeLink {
    port: SerialPort,
}

impl SerialRangeLink {
    pub fn new(path: &str, baud: u32) -> Self {
        Self {
            port: SerialPort::new(path, baud),
        }
    }
}

#[async_trait]
impl RangeLink for SerialRangeLink {
    async fn open(&mut self) -> Result<(), ConnectError> {
        self.port.open().await
    }

    fn close(&mut self) {
        self.port.close();
    }

    fn is_open(&self) -> bool {
        self.port.is_open()
    }

    async fn poll_distances(&mut self) -> Result<Vec<f32>, ReadError> {
        let line = self.port.request_line(b"R\n").await?;
        parse_range_line(&line)
    }
}

/// Vision sensor over serial.
pub struct SerialVisionLink {
    port: SerialPort,
}

impl SerialVisionLink {
    pub fn new(path: &str, baud: u32) -> Self {
        Self {
            port: SerialPort::new(path, baud),
        }
    }
}

#[async_trait]
impl VisionLink for SerialVisionLink {
    async fn open(&mut self) -> Result<(), ConnectError> {
        self.port.open().await
    }

    fn close(&mut self) {
        self.port.close();
    }

    fn is_open(&self) -> bool {
        self.port.is_open()
    }

    async fn poll_objects(&mut self) -> Result<Vec<DetectedObject>, ReadError> {
        let line = self.port.request_line(b"V\n").await?;
        parse_vision_line(&line)
    }
}

/// Motor controller over serial.
pub struct SerialMotorLink {
    port: SerialPort,
}

impl SerialMotorLink {
    pub fn new(path: &str, baud: u32) -> Self {
        Self {
            port: SerialPort::new(path, baud),
        }
    }
}

#[async_trait]
impl MotorLink for SerialMotorLink {
    async fn open(&mut self) -> Result<(), ConnectError> {
        self.port.open().await
    }

    fn close(&mut self) {
        self.port.close();
    }

    fn is_open(&self) -> bool {
        self.port.is_open()
    }

    async fn apply(&mut self, signal: ActuatorSignal) -> Result<(), ReadError> {
        self.port
            .write_line(&format!("M {} {}\n", signal.left, signal.right))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_range_reply() {
        let distances = parse_range_line("R 120.5 60 200\r\n").unwrap();
        assert_eq!(distances, vec![120.5, 60.0, 200.0]);
    }

    #[test]
    fn parse_empty_range_reply() {
        assert_eq!(parse_range_line("R\n").unwrap(), Vec::<f32>::new());
    }

    #[test]
    fn range_reply_without_prefix_rejected() {
        let err = parse_range_line("120 60\n").unwrap_err();
        assert!(matches!(err, ReadError::Protocol(_)), "got {err:?}");
    }

    #[test]
    fn range_reply_with_garbage_rejected() {
        let err = parse_range_line("R 120 abc\n").unwrap_err();
        assert!(matches!(err, ReadError::Protocol(_)), "got {err:?}");
    }

    #[test]
    fn parse_vision_reply() {
        let objects = parse_vision_line("V 1 160 120 40 40;2 -20 95 12 30\r\n").unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].id, 1);
        assert_eq!(objects[1].x, -20);
        assert_eq!(objects[1].height, 30);
    }

    #[test]
    fn parse_vision_reply_nothing_in_view() {
        assert!(parse_vision_line("V\n").unwrap().is_empty());
    }

    #[test]
    fn vision_reply_with_wrong_arity_rejected() {
        let err = parse_vision_line("V 1 160 120 40\n").unwrap_err();
        assert!(matches!(err, ReadError::Protocol(_)), "got {err:?}");
    }
}
