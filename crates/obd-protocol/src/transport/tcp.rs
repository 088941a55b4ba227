//! Wi-Fi adapters (ELM327 over a TCP socket)

use super::{discovered, DeviceDescriptor, ElmLink, LinkState, Transport};
use crate::error::TransportError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

/// Address most Wi-Fi ELM327 clones listen on
pub const DEFAULT_HOST: &str = "192.168.0.10";
pub const DEFAULT_PORT: u16 = 35000;

pub struct TcpTransport {
    address: String,
    link: Option<ElmLink<TcpStream>>,
    events: broadcast::Sender<LinkState>,
}

impl TcpTransport {
    pub fn new(host: &str, port: u16) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            address: format!("{}:{}", host, port),
            link: None,
            events,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn link(&mut self) -> Result<&mut ElmLink<TcpStream>, TransportError> {
        self.link.as_mut().ok_or(TransportError::NotConnected)
    }

    fn link_lost(&mut self, err: TransportError) -> TransportError {
        if matches!(err, TransportError::Closed) && self.link.take().is_some() {
            let _ = self.events.send(LinkState::Down);
        }
        err
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(
        &mut self,
        target: Option<&DeviceDescriptor>,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        if let Some(target) = target {
            self.address = target.id.clone();
        }
        info!("Connecting to adapter at {}", self.address);

        let stream = match tokio::time::timeout(timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => {
                return Err(TransportError::ConnectionRefused(self.address.clone()))
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(TransportError::DeviceNotFound(self.address.clone())),
        };
        stream.set_nodelay(true)?;

        self.link = Some(ElmLink::new(stream));
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
        if let Some(mut link) = self.link.take() {
            debug!("Closing socket to {}", self.address);
            link.shutdown().await;
            let _ = self.events.send(LinkState::Down);
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<LinkState> {
        self.events.subscribe()
    }

    async fn discover_devices(&mut self) -> Result<mpsc::Receiver<DeviceDescriptor>, TransportError> {
        Ok(discovered(vec![
            DeviceDescriptor::new(self.address.clone()).with_name("ELM327 Wi-Fi")
        ]))
    }
}
