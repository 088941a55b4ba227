//! Scriptable in-memory adapter
//!
//! Replies come from a command -> lines table. A [`MockHandle`] shared with the
//! test (or the demo service) can change the table, silence commands, make
//! `connect` fail, or drop the link while the controller owns the transport.

use super::{discovered, DeviceDescriptor, LinkState, Transport};
use crate::error::TransportError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

/// Canned answer for one command
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    Lines(Vec<String>),
    /// Never answer; the caller's timeout has to fire
    Silent,
}

impl MockReply {
    pub fn lines<S: AsRef<str>>(lines: &[S]) -> Self {
        MockReply::Lines(lines.iter().map(|l| l.as_ref().to_string()).collect())
    }
}

#[derive(Default)]
struct MockState {
    responses: HashMap<String, MockReply>,
    sent: Vec<String>,
    pending: Option<MockReply>,
    connected: bool,
    fail_connect: bool,
    connect_delay: Duration,
    latency: Duration,
    /// ELM protocol id the simulated vehicle answers on; `None` answers on any
    vehicle_protocol: Option<char>,
    active_protocol: Option<char>,
    /// Mode 01 PID -> data bytes, answered for any combination of PIDs
    live_data: HashMap<u8, Vec<u8>>,
}

impl MockState {
    fn reply_for(&mut self, command: &str) -> MockReply {
        if command.starts_with("AT") {
            if let Some(id) = command.strip_prefix("ATSP") {
                self.active_protocol = id.chars().next();
            }
            if let Some(reply) = self.responses.get(command) {
                return reply.clone();
            }
            if command == "ATDPN" {
                let id = self.active_protocol.unwrap_or('0');
                return MockReply::Lines(vec![format!("A{}", id)]);
            }
            return MockReply::lines(&["OK"]);
        }

        if let (Some(vehicle), Some(active)) = (self.vehicle_protocol, self.active_protocol) {
            if active != '0' && active != vehicle {
                return MockReply::lines(&["UNABLE TO CONNECT"]);
            }
        }
        if let Some(reply) = self.responses.get(command) {
            return reply.clone();
        }

        match self.live_reply(command) {
            Some(lines) => MockReply::Lines(lines),
            None => MockReply::lines(&["NO DATA"]),
        }
    }

    fn live_reply(&self, command: &str) -> Option<Vec<String>> {
        let pids = command.strip_prefix("01")?;
        if pids.is_empty() || pids.len() % 2 != 0 {
            return None;
        }
        let mut data = vec![0x41];
        for i in (0..pids.len()).step_by(2) {
            let pid = u8::from_str_radix(pids.get(i..i + 2)?, 16).ok()?;
            if let Some(bytes) = self.live_data.get(&pid) {
                data.push(pid);
                data.extend_from_slice(bytes);
            }
        }
        if data.len() == 1 {
            return None;
        }
        Some(encode_isotp_lines(0x7E8, &data))
    }
}

/// Split one message into the ISO-TP lines an ELM327 prints with headers on
pub fn encode_isotp_lines(ecu: u32, data: &[u8]) -> Vec<String> {
    let id = if ecu > 0xFFF {
        format!("{:08X}", ecu)
    } else {
        format!("{:03X}", ecu)
    };
    let line = |pci: Vec<u8>, chunk: &[u8]| -> String {
        let bytes: Vec<String> = pci
            .iter()
            .chain(chunk)
            .map(|b| format!("{:02X}", b))
            .collect();
        format!("{} {}", id, bytes.join(" "))
    };

    if data.len() <= 7 {
        return vec![line(vec![data.len() as u8], data)];
    }

    let total = data.len().min(0xFFF);
    let mut lines = vec![line(
        vec![0x10 | (total >> 8) as u8, (total & 0xFF) as u8],
        &data[..6],
    )];
    for (i, chunk) in data[6..total].chunks(7).enumerate() {
        let seq = ((i + 1) & 0x0F) as u8;
        lines.push(line(vec![0x20 | seq], chunk));
    }
    lines
}

/// In-memory [`Transport`]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    events: broadcast::Sender<LinkState>,
}

/// Control side of a [`MockTransport`]
#[derive(Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
    events: broadcast::Sender<LinkState>,
}

impl MockTransport {
    /// Empty adapter: AT commands answer `OK`, everything else `NO DATA`
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            events,
        }
    }

    /// Simulated ELM327 v1.5 attached to an 11-bit 500k CAN vehicle
    pub fn demo() -> Self {
        let transport = Self::new();
        let handle = transport.handle();
        handle.set_vehicle_protocol(Some('6'));
        handle.set_latency(Duration::from_millis(20));

        handle.respond("ATZ", &["ELM327 v1.5"]);
        handle.respond("ATRV", &["12.6V"]);
        for (pid, bytes) in [
            (0x00, vec![0xBE, 0x3F, 0xA8, 0x13]),
            (0x01, vec![0x82, 0x07, 0x65, 0x04]),
            (0x04, vec![0x66]),
            (0x05, vec![0x5A]),
            (0x0C, vec![0x1A, 0xF8]),
            (0x0D, vec![0x32]),
            (0x0F, vec![0x46]),
            (0x10, vec![0x01, 0xF4]),
            (0x11, vec![0x33]),
            (0x20, vec![0x80, 0x00, 0x00, 0x00]),
            (0x2F, vec![0x99]),
            (0x42, vec![0x31, 0x38]),
            (0x51, vec![0x01]),
        ] {
            handle.set_live_data(pid, bytes);
        }

        let mut vin = vec![0x49, 0x02, 0x01];
        vin.extend_from_slice(b"1D4GP00R55B123456");
        handle.respond_lines("0902", encode_isotp_lines(0x7E8, &vin));

        let mut cal = vec![0x49, 0x04, 0x01];
        cal.extend_from_slice(b"DEMOCAL000010000");
        handle.respond_lines("0904", encode_isotp_lines(0x7E8, &cal));

        handle.respond("03", &["7E8 06 43 02 01 01 C1 23", "7E9 04 43 01 07 00"]);
        handle.respond("07", &["7E8 04 47 01 04 20"]);
        handle.respond("0A", &["7E8 02 4A 00"]);
        handle.respond("04", &["7E8 01 44"]);
        // manufacturer oil temperature, 90 °C
        handle.respond("221234", &["7E8 04 62 12 34 82"]);
        transport
    }

    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: self.state.clone(),
            events: self.events.clone(),
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHandle {
    /// Answer `command` with `lines`
    pub fn respond<S: AsRef<str>>(&self, command: &str, lines: &[S]) {
        self.set_reply(command, MockReply::lines(lines));
    }

    pub fn respond_lines(&self, command: &str, lines: Vec<String>) {
        self.set_reply(command, MockReply::Lines(lines));
    }

    /// Never answer `command`
    pub fn set_silent(&self, command: &str) {
        self.set_reply(command, MockReply::Silent);
    }

    pub fn set_reply(&self, command: &str, reply: MockReply) {
        self.state
            .lock()
            .responses
            .insert(command.to_ascii_uppercase(), reply);
    }

    pub fn set_live_data(&self, pid: u8, bytes: Vec<u8>) {
        self.state.lock().live_data.insert(pid, bytes);
    }

    pub fn set_vehicle_protocol(&self, id: Option<char>) {
        self.state.lock().vehicle_protocol = id;
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.state.lock().fail_connect = fail;
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        self.state.lock().connect_delay = delay;
    }

    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().latency = latency;
    }

    /// Simulate the adapter going away
    pub fn drop_link(&self) {
        let mut state = self.state.lock();
        if state.connected {
            state.connected = false;
            state.pending = None;
            let _ = self.events.send(LinkState::Down);
        }
    }

    /// Every command written so far, in order
    pub fn sent(&self) -> Vec<String> {
        self.state.lock().sent.clone()
    }

    /// How many times `command` was written
    pub fn count(&self, command: &str) -> usize {
        self.state
            .lock()
            .sent
            .iter()
            .filter(|c| c.as_str() == command)
            .count()
    }

    pub fn clear_sent(&self) {
        self.state.lock().sent.clear();
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(
        &mut self,
        _target: Option<&DeviceDescriptor>,
        _timeout: Duration,
    ) -> Result<(), TransportError> {
        let (fail, delay) = {
            let state = self.state.lock();
            (state.fail_connect, state.connect_delay)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(TransportError::ConnectionRefused("mock".into()));
        }

        {
            let mut state = self.state.lock();
            state.connected = true;
            state.pending = None;
            state.active_protocol = None;
        }
        let _ = self.events.send(LinkState::Up);
        Ok(())
    }

    async fn send(&mut self, command: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(TransportError::Closed);
        }
        let command = command.trim().to_ascii_uppercase();
        debug!("Mock transport: sent {}", command);
        let reply = state.reply_for(&command);
        state.sent.push(command);
        state.pending = Some(reply);
        Ok(())
    }

    async fn receive_lines(&mut self) -> Result<Vec<String>, TransportError> {
        let (reply, latency) = {
            let mut state = self.state.lock();
            if !state.connected {
                return Err(TransportError::Closed);
            }
            (state.pending.take(), state.latency)
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match reply {
            Some(MockReply::Lines(lines)) => Ok(lines),
            Some(MockReply::Silent) | None => std::future::pending().await,
        }
    }

    async fn flush_input(&mut self) -> Result<(), TransportError> {
        self.state.lock().pending = None;
        Ok(())
    }

    async fn disconnect(&mut self) {
        let was_connected = std::mem::replace(&mut self.state.lock().connected, false);
        if was_connected {
            let _ = self.events.send(LinkState::Down);
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<LinkState> {
        self.events.subscribe()
    }

    async fn discover_devices(&mut self) -> Result<mpsc::Receiver<DeviceDescriptor>, TransportError> {
        Ok(discovered(vec![
            DeviceDescriptor::new("mock").with_name("Simulated ELM327")
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{self, EcuId};
    use crate::protocol::FrameFormat;

    const CAN11: FrameFormat = FrameFormat::Can { id_bits: 11 };

    #[test]
    fn test_encode_single_frame() {
        assert_eq!(
            encode_isotp_lines(0x7E8, &[0x41, 0x0D, 0x32]),
            vec!["7E8 03 41 0D 32"]
        );
    }

    #[test]
    fn test_encode_reassembles() {
        let mut vin = vec![0x49, 0x02, 0x01];
        vin.extend_from_slice(b"1D4GP00R55B123456");
        let lines = encode_isotp_lines(0x7E8, &vin);
        assert_eq!(lines[0], "7E8 10 14 49 02 01 31 44 34");
        assert_eq!(lines.len(), 3);

        let messages = parser::parse(&lines, CAN11);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].ecu, EcuId(0x7E8));
        assert_eq!(messages[0].data, vin);
    }

    #[tokio::test]
    async fn test_table_and_defaults() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        handle.respond("0100", &["7E8 06 41 00 BE 3F A8 13"]);
        mock.connect(None, Duration::from_secs(1)).await.unwrap();

        mock.send("0100").await.unwrap();
        assert_eq!(mock.receive_lines().await.unwrap(), vec!["7E8 06 41 00 BE 3F A8 13"]);
        mock.send("ate0").await.unwrap();
        assert_eq!(mock.receive_lines().await.unwrap(), vec!["OK"]);
        mock.send("0902").await.unwrap();
        assert_eq!(mock.receive_lines().await.unwrap(), vec!["NO DATA"]);

        assert_eq!(handle.sent(), vec!["0100", "ATE0", "0902"]);
        assert_eq!(handle.count("0100"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_reply_never_resolves() {
        let mut mock = MockTransport::new();
        mock.handle().set_silent("010C");
        mock.connect(None, Duration::from_secs(1)).await.unwrap();
        mock.send("010C").await.unwrap();
        let waited = tokio::time::timeout(Duration::from_secs(5), mock.receive_lines()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_demo_batches_live_data() {
        let mut mock = MockTransport::demo();
        mock.handle().set_latency(Duration::ZERO);
        mock.connect(None, Duration::from_secs(1)).await.unwrap();
        mock.send("010C0D").await.unwrap();
        let lines = mock.receive_lines().await.unwrap();
        assert_eq!(lines, vec!["7E8 06 41 0C 1A F8 0D 32"]);
    }

    #[tokio::test]
    async fn test_demo_rejects_wrong_protocol() {
        let mut mock = MockTransport::demo();
        mock.handle().set_latency(Duration::ZERO);
        mock.connect(None, Duration::from_secs(1)).await.unwrap();
        mock.send("ATSP7").await.unwrap();
        mock.receive_lines().await.unwrap();
        mock.send("0100").await.unwrap();
        assert_eq!(mock.receive_lines().await.unwrap(), vec!["UNABLE TO CONNECT"]);

        mock.send("ATSP6").await.unwrap();
        mock.receive_lines().await.unwrap();
        mock.send("ATDPN").await.unwrap();
        assert_eq!(mock.receive_lines().await.unwrap(), vec!["A6"]);
    }

    #[tokio::test]
    async fn test_drop_link() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        let mut events = mock.subscribe();
        mock.connect(None, Duration::from_secs(1)).await.unwrap();
        handle.drop_link();
        assert_eq!(events.recv().await.unwrap(), LinkState::Up);
        assert_eq!(events.recv().await.unwrap(), LinkState::Down);
        assert!(matches!(mock.send("0100").await, Err(TransportError::Closed)));
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let mut mock = MockTransport::new();
        mock.handle().set_fail_connect(true);
        assert!(matches!(
            mock.connect(None, Duration::from_secs(1)).await,
            Err(TransportError::ConnectionRefused(_))
        ));
    }
}
