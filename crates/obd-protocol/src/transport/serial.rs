//! Serial adapters: USB cables and Bluetooth SPP bound to an RFCOMM device

use super::{discovered, DeviceDescriptor, ElmLink, LinkState, Transport};
use crate::error::TransportError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio_serial::{SerialPortBuilderExt, SerialPortType, SerialStream};
use tracing::{debug, info, warn};

/// Baud rate most ELM327 clones ship with
pub const DEFAULT_BAUD_RATE: u32 = 38400;

pub struct SerialTransport {
    device: String,
    baud_rate: u32,
    link: Option<ElmLink<SerialStream>>,
    events: broadcast::Sender<LinkState>,
}

impl SerialTransport {
    /// # Arguments
    /// * `device` - Serial port device path (e.g., "/dev/rfcomm0" or "COM3")
    /// * `baud_rate` - Baud rate for serial communication
    pub fn new(device: &str, baud_rate: u32) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            device: device.to_string(),
            baud_rate,
            link: None,
            events,
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    fn link(&mut self) -> Result<&mut ElmLink<SerialStream>, TransportError> {
        self.link.as_mut().ok_or(TransportError::NotConnected)
    }

    fn link_lost(&mut self, err: TransportError) -> TransportError {
        if matches!(err, TransportError::Closed) && self.link.take().is_some() {
            let _ = self.events.send(LinkState::Down);
        }
        err
    }
}

fn open_error(device: &str, e: tokio_serial::Error) -> TransportError {
    match e.kind() {
        tokio_serial::ErrorKind::NoDevice => TransportError::DeviceNotFound(device.to_string()),
        _ => TransportError::Serial(format!("Failed to open serial port {}: {}", device, e)),
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn connect(
        &mut self,
        target: Option<&DeviceDescriptor>,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        if let Some(target) = target {
            self.device = target.id.clone();
        }
        info!(
            "Opening serial adapter {} at {} baud",
            self.device, self.baud_rate
        );

        let port = tokio_serial::new(&self.device, self.baud_rate)
            .timeout(timeout)
            .open_native_async()
            .map_err(|e| open_error(&self.device, e))?;

        self.link = Some(ElmLink::new(port));
        let _ = self.events.send(LinkState::Up);
        Ok(())
    }

    async fn send(&mut self, command: &str) -> Result<(), TransportError> {
        let result = self.link()?.write_command(command).await;
        result.map_err(|e| self.link_lost(e))
    }

    async fn receive_lines(&mut self) -> Result<Vec<String>, TransportError> {
        let result = self.link()?.read_response().await;
        result.map_err(|e| self.link_lost(e))
    }

    async fn flush_input(&mut self) -> Result<(), TransportError> {
        let result = self.link()?.drain().await;
        result.map_err(|e| self.link_lost(e))
    }

    async fn disconnect(&mut self) {
        if self.link.take().is_some() {
            debug!("Closing serial port {}", self.device);
            let _ = self.events.send(LinkState::Down);
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<LinkState> {
        self.events.subscribe()
    }

    async fn discover_devices(&mut self) -> Result<mpsc::Receiver<DeviceDescriptor>, TransportError> {
        let ports = tokio_serial::available_ports()
            .map_err(|e| TransportError::Serial(e.to_string()))?;
        if ports.is_empty() {
            warn!("No serial ports found");
        }
        let devices = ports
            .into_iter()
            .map(|port| {
                let name = match port.port_type {
                    SerialPortType::UsbPort(usb) => usb.product,
                    SerialPortType::BluetoothPort => Some("Bluetooth".to_string()),
                    _ => None,
                };
                DeviceDescriptor {
                    id: port.port_name,
                    name,
                }
            })
            .collect();
        Ok(discovered(devices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_device_fails_to_open() {
        let mut transport = SerialTransport::new("/dev/does-not-exist-obd", DEFAULT_BAUD_RATE);
        let err = transport
            .connect(None, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::DeviceNotFound(_) | TransportError::Serial(_)
        ));
        assert!(matches!(
            transport.receive_lines().await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_target_overrides_device() {
        let mut transport = SerialTransport::new("/dev/rfcomm0", DEFAULT_BAUD_RATE);
        let target = DeviceDescriptor::new("/dev/does-not-exist-usb");
        let _ = transport.connect(Some(&target), Duration::from_millis(100)).await;
        assert_eq!(transport.device(), "/dev/does-not-exist-usb");
    }
}
