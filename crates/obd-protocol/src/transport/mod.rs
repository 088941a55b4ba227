//! Byte-stream links to ELM327 adapters
//!
//! - [`TcpTransport`] for Wi-Fi adapters
//! - [`SerialTransport`] for Bluetooth SPP/RFCOMM and USB serial adapters
//! - [`MockTransport`] for tests and the demo connection
//!
//! The adapter controller is the only caller. It sends one command, reads the
//! lines up to the `>` prompt, and only then sends the next one.

pub mod mock;
mod serial;
mod stream;
mod tcp;

pub use mock::{MockHandle, MockTransport};
pub use serial::{SerialTransport, DEFAULT_BAUD_RATE};
pub use stream::ElmLink;
pub use tcp::{TcpTransport, DEFAULT_HOST, DEFAULT_PORT};

use crate::error::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// Something a transport can connect to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Address understood by the transport (`/dev/rfcomm0`, `192.168.0.10:35000`)
    pub id: String,
    /// Display name, if the device advertises one
    pub name: Option<String>,
}

impl DeviceDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", name, self.id),
            None => f.write_str(&self.id),
        }
    }
}

/// Link-level transitions reported by a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Up,
    Down,
}

/// Capability the adapter controller needs from a link
#[async_trait]
pub trait Transport: Send {
    /// Open the link. `target` overrides the transport's configured device.
    async fn connect(
        &mut self,
        target: Option<&DeviceDescriptor>,
        timeout: Duration,
    ) -> Result<(), TransportError>;

    /// Write one command; the transport appends the carriage return
    async fn send(&mut self, command: &str) -> Result<(), TransportError>;

    /// Read up to the next prompt. The prompt and blank lines are stripped.
    async fn receive_lines(&mut self) -> Result<Vec<String>, TransportError>;

    /// Throw away anything left over from an abandoned round trip
    async fn flush_input(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&mut self);

    /// Link transitions in the order they happened
    fn subscribe(&self) -> broadcast::Receiver<LinkState>;

    /// Devices this transport could connect to
    async fn discover_devices(&mut self) -> Result<mpsc::Receiver<DeviceDescriptor>, TransportError>;
}

/// Fill a discovery channel from an already known list
pub(crate) fn discovered(devices: Vec<DeviceDescriptor>) -> mpsc::Receiver<DeviceDescriptor> {
    let (tx, rx) = mpsc::channel(devices.len().max(1));
    for device in devices {
        // capacity covers every item
        let _ = tx.try_send(device);
    }
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_discovered_channel_closes() {
        let mut rx = discovered(vec![
            DeviceDescriptor::new("/dev/rfcomm0").with_name("OBDII"),
            DeviceDescriptor::new("/dev/ttyUSB0"),
        ]);
        assert_eq!(rx.recv().await.unwrap().to_string(), "OBDII (/dev/rfcomm0)");
        assert_eq!(rx.recv().await.unwrap().id, "/dev/ttyUSB0");
        assert!(rx.recv().await.is_none());
    }
}
