//! OBD-II Client for ELM327 Adapters
//!
//! Owns the transport, brings the adapter up, negotiates the vehicle protocol
//! and mediates every command/response round trip. Commands are strictly
//! one at a time: the adapter is half-duplex.

use crate::batch;
use crate::catalog::{
    self, ATAT1, ATD, ATDPN, ATE0, ATH1, ATL0, ATRV, ATZ, CALIBRATION_ID, CLEAR_DTC, PIDS_A, STATUS,
    VIN,
};
use crate::deadline::with_timeout;
use crate::decode::{DecodeResult, DecodeRule};
use crate::dtc::{DtcStatus, StatusReport, TroubleCode};
use crate::error::{ObdError, TransportError};
use crate::mode;
use crate::parser::{self, EcuId, EcuRole, Message};
use crate::pid::Command;
use crate::protocol::{FrameFormat, ObdProtocol};
use crate::state::ConnectionState;
use crate::transport::{DeviceDescriptor, LinkState, MockHandle, MockTransport, Transport};
use crate::units::{MeasurementResult, Unit};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Adapter replies that mean the vehicle bus, not the link, failed
const ADAPTER_ERRORS: [&str; 11] = [
    "UNABLE TO CONNECT",
    "CAN ERROR",
    "BUS ERROR",
    "BUS BUSY",
    "BUFFER FULL",
    "DATA ERROR",
    "FB ERROR",
    "LV RESET",
    "ACT ALERT",
    "STOPPED",
    "ERR",
];

/// Timing and retry settings for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Per-attempt limit for one command round trip
    pub command_timeout_ms: u64,
    /// Limit for opening the link to the adapter
    pub connect_timeout_ms: u64,
    /// Pause between attempts of the same command
    pub retry_backoff_ms: u64,
    pub default_retries: u32,
    /// Attempts for batched mode 01 requests
    pub batch_retries: u32,
    /// Attempts for adapter setup commands
    pub setup_retries: u32,
    /// Per-attempt limit for the supported-PIDs probe during negotiation
    pub probe_timeout_ms: u64,
    pub probe_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: 2000,
            connect_timeout_ms: 7000,
            retry_backoff_ms: 100,
            default_retries: 3,
            batch_retries: 10,
            setup_retries: 3,
            probe_timeout_ms: 5000,
            probe_retries: 2,
        }
    }
}

impl ClientConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// What the session learned while connecting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleInfo {
    pub protocol: ObdProtocol,
    /// Best effort; older vehicles do not answer mode 09
    pub vin: Option<String>,
    /// Mode 01 descriptors the vehicle announced
    pub supported_pids: Vec<Command>,
    /// ECUs that answered the protocol probe
    pub ecus: Vec<EcuId>,
}

/// Protocols tried by [`ObdClient::setup_vehicle`], in order. A preferred
/// protocol goes first and is not tried again; legacy protocols only appear
/// when preferred explicitly.
pub fn negotiation_candidates(preferred: Option<ObdProtocol>) -> Vec<ObdProtocol> {
    let preferred = preferred.filter(|p| *p != ObdProtocol::Auto);
    preferred
        .into_iter()
        .chain(
            ObdProtocol::NEGOTIATION_ORDER
                .iter()
                .copied()
                .filter(|p| Some(*p) != preferred),
        )
        .collect()
}

fn is_link_loss(err: &ObdError) -> bool {
    matches!(
        err,
        ObdError::Transport {
            source: TransportError::Closed | TransportError::NotConnected,
            ..
        }
    )
}

/// Errors that end a multi-PID request instead of skipping one part of it
fn ends_request(err: &ObdError) -> bool {
    err.is_fatal() || matches!(err, ObdError::NotConnected(_))
}

fn expect_ok(command: &str, lines: &[String]) -> Result<(), ObdError> {
    if lines.iter().any(|l| l.contains("OK")) {
        Ok(())
    } else {
        Err(ObdError::InvalidResponse(format!(
            "{} answered {:?}",
            command, lines
        )))
    }
}

/// Remove echo and progress chatter, then classify what is left
fn screen(command: &str, lines: Vec<String>) -> Result<Vec<String>, ObdError> {
    let lines: Vec<String> = lines
        .into_iter()
        .filter(|l| {
            !l.eq_ignore_ascii_case(command)
                && !l.starts_with("SEARCHING")
                && !l.starts_with("BUS INIT")
        })
        .collect();

    if lines.iter().any(|l| l == "?") {
        return Err(ObdError::AdapterRejected {
            command: command.to_string(),
        });
    }
    if let Some(message) = lines
        .iter()
        .find(|l| ADAPTER_ERRORS.iter().any(|e| l.starts_with(e)))
    {
        return Err(ObdError::AdapterError {
            command: command.to_string(),
            message: message.clone(),
        });
    }

    // one ECU may say NO DATA while another answers
    let lines: Vec<String> = lines.into_iter().filter(|l| l != "NO DATA").collect();
    if lines.is_empty() {
        return Err(ObdError::NoData);
    }
    Ok(lines)
}

/// OBD-II client for communicating with ELM327-compatible adapters
pub struct ObdClient {
    transport: Box<dyn Transport>,
    config: ClientConfig,
    state: ConnectionState,
    state_tx: broadcast::Sender<ConnectionState>,
    link_rx: broadcast::Receiver<LinkState>,
    protocol: ObdProtocol,
    ecus: Vec<EcuId>,
}

impl ObdClient {
    pub fn new(transport: Box<dyn Transport>, config: ClientConfig) -> Self {
        let (state_tx, _) = broadcast::channel(32);
        let link_rx = transport.subscribe();
        Self {
            transport,
            config,
            state: ConnectionState::Disconnected,
            state_tx,
            link_rx,
            protocol: ObdProtocol::Auto,
            ecus: Vec::new(),
        }
    }

    /// Client over the simulated demo vehicle (no hardware required)
    pub fn mock() -> (Self, MockHandle) {
        info!("Creating mock OBD client for testing");
        let transport = MockTransport::demo();
        let handle = transport.handle();
        (Self::new(Box::new(transport), ClientConfig::default()), handle)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Connection state transitions, in the order they happen
    pub fn subscribe_state(&self) -> broadcast::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Negotiated protocol; `Auto` until the vehicle is connected
    pub fn protocol(&self) -> ObdProtocol {
        self.protocol
    }

    /// ECUs that answered the protocol probe
    pub fn ecus(&self) -> &[EcuId] {
        &self.ecus
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_vehicle_up()
    }

    fn set_state(&mut self, next: ConnectionState) {
        if self.state == next {
            return;
        }
        info!("Connection state: {} -> {}", self.state, next);
        self.state = next;
        let _ = self.state_tx.send(next);
    }

    fn require_adapter(&self) -> Result<(), ObdError> {
        if self.state.is_adapter_up() {
            Ok(())
        } else {
            Err(ObdError::NotConnected(self.state))
        }
    }

    fn require_vehicle(&self) -> Result<(), ObdError> {
        if self.state.is_vehicle_up() {
            Ok(())
        } else {
            Err(ObdError::NotConnected(self.state))
        }
    }

    fn check_link(&mut self) -> Result<(), ObdError> {
        loop {
            match self.link_rx.try_recv() {
                Ok(LinkState::Down) => {
                    return Err(ObdError::transport("link", TransportError::Closed))
                }
                Ok(LinkState::Up) | Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return Ok(()),
            }
        }
    }

    async fn fail_session(&mut self, cause: &ObdError) {
        error!("Session lost: {}", cause);
        self.transport.disconnect().await;
        self.protocol = ObdProtocol::Auto;
        self.ecus.clear();
        self.set_state(ConnectionState::Disconnected);
    }

    /// Full bring-up: open the link, initialize the adapter, negotiate a protocol
    pub async fn connect(
        &mut self,
        target: Option<&DeviceDescriptor>,
        preferred: Option<ObdProtocol>,
    ) -> Result<VehicleInfo, ObdError> {
        self.connect_to_adapter(target, self.config.connect_timeout())
            .await?;
        self.initialize_adapter().await?;
        self.setup_vehicle(preferred).await
    }

    /// Open the link. Failure or timeout leaves the session disconnected.
    pub async fn connect_to_adapter(
        &mut self,
        target: Option<&DeviceDescriptor>,
        timeout: Duration,
    ) -> Result<(), ObdError> {
        if self.state.is_adapter_up() {
            debug!("Adapter already connected");
            return Ok(());
        }
        self.set_state(ConnectionState::ConnectingToAdapter);

        let transport = &mut self.transport;
        let result = with_timeout("connect", timeout, async {
            transport
                .connect(target, timeout)
                .await
                .map_err(|e| ObdError::transport("connect", e))
        })
        .await;

        match result {
            Ok(()) => {
                self.link_rx = self.transport.subscribe();
                self.set_state(ConnectionState::ConnectedToAdapter);
                Ok(())
            }
            Err(e) => {
                warn!("Adapter connection failed: {}", e);
                self.transport.disconnect().await;
                self.set_state(ConnectionState::Disconnected);
                Err(ObdError::AdapterConnection(Box::new(e)))
            }
        }
    }

    /// Reset the adapter and apply the session settings
    pub async fn initialize_adapter(&mut self) -> Result<(), ObdError> {
        if self.state != ConnectionState::ConnectedToAdapter {
            return Err(ObdError::NotConnected(self.state));
        }
        info!("Initializing adapter");

        match self.run_setup_sequence().await {
            Ok(()) => {
                self.set_state(ConnectionState::InitializingVehicle);
                Ok(())
            }
            Err(e) => {
                if self.state != ConnectionState::Disconnected {
                    self.fail_session(&e).await;
                }
                Err(e)
            }
        }
    }

    async fn run_setup_sequence(&mut self) -> Result<(), ObdError> {
        let retries = self.config.setup_retries;
        let banner = self.send_command_text(&ATZ.text, retries).await?;
        if !banner.iter().any(|l| l.contains("ELM")) {
            return Err(ObdError::InvalidResponse(format!(
                "not an ELM327 adapter: {:?}",
                banner
            )));
        }
        info!("Adapter: {}", banner.join(" "));

        for setup in [ATD, ATE0, ATL0, ATH1, ATAT1] {
            let lines = self.send_command_text(&setup.text, retries).await?;
            expect_ok(&setup.text, &lines)?;
        }
        Ok(())
    }

    /// Negotiate a protocol and collect vehicle information
    pub async fn setup_vehicle(
        &mut self,
        preferred: Option<ObdProtocol>,
    ) -> Result<VehicleInfo, ObdError> {
        if !matches!(
            self.state,
            ConnectionState::InitializingVehicle | ConnectionState::ConnectedToVehicle
        ) {
            return Err(ObdError::NotConnected(self.state));
        }
        self.set_state(ConnectionState::InitializingVehicle);

        let mut tried = Vec::new();
        let mut found = None;
        for protocol in negotiation_candidates(preferred) {
            tried.push(protocol);
            debug!("Trying protocol {}", protocol);
            match self.try_protocol(protocol).await {
                Ok(ecus) => {
                    found = Some((protocol, ecus));
                    break;
                }
                Err(e) if is_link_loss(&e) => {
                    self.fail_session(&e).await;
                    return Err(e);
                }
                Err(e) => warn!("Protocol {} failed: {}", protocol, e),
            }
        }

        let Some((protocol, ecus)) = found else {
            counter!("obd_protocol_negotiations_total", "outcome" => "not_found").increment(1);
            let err = ObdError::ProtocolNotFound { tried };
            self.fail_session(&err).await;
            return Err(err);
        };

        counter!("obd_protocol_negotiations_total", "outcome" => "found").increment(1);
        info!("Vehicle protocol: {} ({} ECU(s))", protocol, ecus.len());
        self.protocol = protocol;
        self.ecus = ecus;
        self.set_state(ConnectionState::ConnectedToVehicle);

        match self.describe_protocol().await {
            Ok(reported) if reported != protocol => {
                warn!("Adapter reports {} after selecting {}", reported, protocol)
            }
            Ok(_) => {}
            Err(e) => debug!("Protocol confirmation unavailable: {}", e),
        }

        let supported_pids = match self.get_supported_pids().await {
            Ok(pids) => pids,
            Err(e) => {
                warn!("Supported PID discovery failed: {}", e);
                Vec::new()
            }
        };
        let vin = match self.read_vin().await {
            Ok(vin) => Some(vin),
            Err(e) => {
                debug!("VIN unavailable: {}", e);
                None
            }
        };
        self.require_vehicle()?;

        Ok(VehicleInfo {
            protocol,
            vin,
            supported_pids,
            ecus: self.ecus.clone(),
        })
    }

    async fn try_protocol(&mut self, protocol: ObdProtocol) -> Result<Vec<EcuId>, ObdError> {
        let format = protocol
            .frame_format()
            .ok_or_else(|| ObdError::UnsupportedProtocol(protocol.name().to_string()))?;

        let select = protocol.to_elm_command();
        let lines = self
            .execute(&select, self.config.setup_retries, self.config.command_timeout())
            .await?;
        expect_ok(&select, &lines)?;

        let lines = self
            .execute(&PIDS_A.text, self.config.probe_retries, self.config.probe_timeout())
            .await?;
        let mut ecus: Vec<EcuId> = parser::parse(&lines, format)
            .into_iter()
            .filter(|m| m.data.len() >= 6 && m.data[..2] == [0x41, 0x00])
            .map(|m| m.ecu)
            .collect();
        ecus.sort();
        ecus.dedup();

        if ecus.is_empty() {
            return Err(ObdError::InvalidResponse(format!(
                "no supported-PIDs reply on {}",
                protocol
            )));
        }
        Ok(ecus)
    }

    /// Protocol the adapter reports as active (`ATDPN`)
    pub async fn describe_protocol(&mut self) -> Result<ObdProtocol, ObdError> {
        let lines = self
            .send_command_text(&ATDPN.text, self.config.default_retries)
            .await?;
        lines
            .iter()
            .find_map(|l| ObdProtocol::from_elm_id(l))
            .ok_or_else(|| ObdError::InvalidResponse(lines.join(" ")))
    }

    /// One command with per-attempt timeout and retry. No state handling.
    async fn execute(
        &mut self,
        command: &str,
        retries: u32,
        timeout: Duration,
    ) -> Result<Vec<String>, ObdError> {
        let attempts = retries.max(1);
        let mut last = None;

        for attempt in 1..=attempts {
            self.check_link()?;
            counter!("obd_commands_total").increment(1);

            let transport = &mut self.transport;
            let result = with_timeout(command, timeout, async {
                if let Err(e) = transport.send(command).await {
                    return Err(ObdError::transport(format!("write {}", command), e));
                }
                transport
                    .receive_lines()
                    .await
                    .map_err(|e| ObdError::transport(format!("read {}", command), e))
            })
            .await;

            let err = match result {
                Ok(lines) => {
                    debug!("{} -> {:?}", command, lines);
                    return screen(command, lines);
                }
                Err(e) if e.is_retryable() => e,
                Err(e) => return Err(e),
            };

            if matches!(err, ObdError::Timeout { .. }) {
                counter!("obd_command_timeouts_total").increment(1);
            }
            warn!("{} attempt {}/{} failed: {}", command, attempt, attempts, err);
            last = Some(err);

            // late bytes from the abandoned attempt must not answer the next one
            let transport = &mut self.transport;
            with_timeout("flush", timeout, async {
                transport
                    .flush_input()
                    .await
                    .map_err(|e| ObdError::transport("flush", e))
            })
            .await?;

            if attempt < attempts {
                counter!("obd_command_retries_total").increment(1);
                tokio::time::sleep(self.config.retry_backoff()).await;
            }
        }

        counter!("obd_command_failures_total").increment(1);
        Err(ObdError::CommandFailed {
            command: command.to_string(),
            attempts,
            source: Box::new(last.unwrap_or(ObdError::NoData)),
        })
    }

    /// Raw passthrough: send `command` and return the screened response lines.
    ///
    /// Transport loss and exhausted retries end the session.
    pub async fn send_command_text(
        &mut self,
        command: &str,
        retries: u32,
    ) -> Result<Vec<String>, ObdError> {
        self.require_adapter()?;
        let result = self
            .execute(command, retries, self.config.command_timeout())
            .await;
        if let Err(e) = &result {
            if e.is_fatal() {
                self.fail_session(e).await;
            }
        }
        result
    }

    /// Send a vehicle request and reassemble the replies that answer it
    async fn request_text(
        &mut self,
        text: &str,
        response_mode: Option<u8>,
        retries: u32,
    ) -> Result<Vec<Message>, ObdError> {
        self.require_vehicle()?;
        let format = self
            .protocol
            .frame_format()
            .ok_or_else(|| ObdError::UnsupportedProtocol(self.protocol.name().to_string()))?;

        let lines = self.send_command_text(text, retries).await?;
        let mut messages = parser::parse(&lines, format);
        // legacy lines the parser rejected are malformed, not headerless
        if messages.is_empty() && matches!(format, FrameFormat::Can { .. }) {
            messages = parser::parse_headerless(&lines);
        }
        if let Some(mode) = response_mode {
            messages.retain(|m| m.data.first() == Some(&mode));
        }
        if messages.is_empty() {
            return Err(ObdError::InvalidResponse(lines.join(" / ")));
        }
        // engine first so single-answer callers prefer it
        messages.sort_by_key(|m| m.ecu.role() != EcuRole::Engine);
        Ok(messages)
    }

    /// Send one descriptor and return every ECU's reassembled reply
    pub async fn request(&mut self, command: &Command, retries: u32) -> Result<Vec<Message>, ObdError> {
        self.request_text(&command.text, command.response_mode(), retries)
            .await
    }

    /// Send one descriptor and decode the first reply
    pub async fn send_command(&mut self, command: &Command) -> Result<DecodeResult, ObdError> {
        let retries = self.config.default_retries;
        if command.is_at() {
            let lines = self.send_command_text(&command.text, retries).await?;
            return Ok(DecodeResult::Text(lines.join("\n")));
        }

        let messages = self.request(command, retries).await?;
        let message = messages.first().ok_or(ObdError::NoData)?;
        Ok(command.decode(&message.data, self.protocol.is_can())?)
    }

    /// Request several PIDs. Mode 01 PIDs are batched six per physical
    /// request; anything else is sent on its own.
    ///
    /// PIDs or batches that get no usable answer are left out of the map.
    /// Only a lost session fails the whole call.
    pub async fn request_pids(
        &mut self,
        commands: &[Command],
    ) -> Result<HashMap<Command, MeasurementResult>, ObdError> {
        let mut batched = Vec::new();
        let mut single = Vec::new();
        for command in commands {
            if command.is_at() {
                debug!("{} is an adapter command, not polled", command.text);
            } else if command.mode() == Some(mode::CURRENT_DATA) && command.bytes > 0 {
                batched.push(command.clone());
            } else {
                single.push(command.clone());
            }
        }
        let mut results = HashMap::with_capacity(batched.len() + single.len());

        for chunk in batch::chunk(&batched) {
            let Some(text) = batch::build_request(chunk) else {
                continue;
            };
            let messages = match self
                .request_text(&text, Some(0x41), self.config.batch_retries)
                .await
            {
                Ok(messages) => messages,
                Err(e) if ends_request(&e) => return Err(e),
                Err(e) => {
                    debug!("Skipping {}: {}", text, e);
                    continue;
                }
            };
            let Some(message) = messages.first() else {
                continue;
            };

            for (cmd, outcome) in batch::extract(&message.data[1..], chunk) {
                match outcome {
                    Ok(measurement) => {
                        results.insert(cmd, measurement);
                    }
                    Err(e) => debug!("{} not decoded: {}", cmd.text, e),
                }
            }
        }

        for command in single {
            match self.send_command(&command).await {
                Ok(result) => match result.measurement() {
                    Some(measurement) => {
                        results.insert(command, measurement);
                    }
                    None => debug!("{} has no numeric value", command.text),
                },
                Err(e) if ends_request(&e) => return Err(e),
                Err(e) => debug!("Skipping {}: {}", command.text, e),
            }
        }
        Ok(results)
    }

    /// Walk the supported-PID bitmaps (`0100`, `0120`, ...) and map them to descriptors
    pub async fn get_supported_pids(&mut self) -> Result<Vec<Command>, ObdError> {
        let retries = self.config.default_retries;
        let mut supported = Vec::new();
        let mut base: u8 = 0x00;

        loop {
            let text = format!("{:02X}{:02X}", mode::CURRENT_DATA, base);
            let messages = match self.request_text(&text, Some(0x41), retries).await {
                Ok(messages) => messages,
                Err(e) if base == 0 => return Err(e),
                Err(e) => {
                    debug!("PID discovery stops at {}: {}", text, e);
                    break;
                }
            };

            let bitmap = messages
                .iter()
                .filter(|m| m.data.len() >= 6 && m.data[1] == base)
                .fold(0u32, |acc, m| {
                    acc | u32::from_be_bytes([m.data[2], m.data[3], m.data[4], m.data[5]])
                });

            for bit in 0..32u16 {
                if bitmap & (1 << (31 - bit)) == 0 {
                    continue;
                }
                let pid = base as u16 + bit + 1;
                let found = u8::try_from(pid).ok().and_then(catalog::mode1);
                match found {
                    Some(cmd) if cmd.rule != DecodeRule::Pid => supported.push(cmd.clone()),
                    Some(_) => {}
                    None => debug!("Vehicle supports PID {:02X} with no descriptor", pid),
                }
            }

            if bitmap & 1 == 0 || base >= 0xE0 {
                break;
            }
            base += 0x20;
        }

        info!("{} supported PIDs", supported.len());
        Ok(supported)
    }

    /// Read stored, pending or permanent codes per ECU. No reply means no codes.
    pub async fn scan_trouble_codes(
        &mut self,
        status: DtcStatus,
    ) -> Result<BTreeMap<EcuId, Vec<TroubleCode>>, ObdError> {
        let command = match status {
            DtcStatus::Confirmed => catalog::GET_DTC,
            DtcStatus::Pending => catalog::GET_PENDING_DTC,
            DtcStatus::Permanent => catalog::GET_PERMANENT_DTC,
        };
        let messages = match self.request(&command, self.config.default_retries).await {
            Ok(messages) => messages,
            Err(ObdError::NoData) => return Ok(BTreeMap::new()),
            Err(e) => return Err(e),
        };

        let can = self.protocol.is_can();
        let mut codes: BTreeMap<EcuId, Vec<TroubleCode>> = BTreeMap::new();
        for message in messages {
            match command.decode(&message.data, can) {
                Ok(DecodeResult::TroubleCodes(list)) => {
                    codes.entry(message.ecu).or_default().extend(list)
                }
                Ok(_) => {}
                Err(e) => debug!("Dropping DTC reply from {}: {}", message.ecu, e),
            }
        }
        info!(
            "{:?} trouble codes: {}",
            status,
            codes.values().map(Vec::len).sum::<usize>()
        );
        Ok(codes)
    }

    /// Clear stored codes and freeze frames (mode 04)
    pub async fn clear_trouble_codes(&mut self) -> Result<(), ObdError> {
        info!("Clearing trouble codes");
        self.request(&CLEAR_DTC, self.config.default_retries)
            .await
            .map(|_| ())
    }

    /// MIL, code count and readiness monitors (mode 01 PID 01)
    pub async fn get_status(&mut self) -> Result<StatusReport, ObdError> {
        match self.send_command(&STATUS).await? {
            DecodeResult::Status(report) => Ok(report),
            other => Err(ObdError::InvalidResponse(format!("{:?}", other))),
        }
    }

    pub async fn read_vin(&mut self) -> Result<String, ObdError> {
        self.read_text(&VIN).await
    }

    pub async fn read_calibration_id(&mut self) -> Result<String, ObdError> {
        self.read_text(&CALIBRATION_ID).await
    }

    async fn read_text(&mut self, command: &Command) -> Result<String, ObdError> {
        let result = self.send_command(command).await?;
        match result.text() {
            Some(text) if !text.is_empty() => Ok(text.to_string()),
            _ => Err(ObdError::InvalidResponse(format!(
                "{} returned {:?}",
                command.text, result
            ))),
        }
    }

    /// Supply voltage measured by the adapter (`ATRV`)
    pub async fn read_battery_voltage(&mut self) -> Result<MeasurementResult, ObdError> {
        let lines = self
            .send_command_text(&ATRV.text, self.config.default_retries)
            .await?;
        lines
            .iter()
            .find_map(|l| l.trim().trim_end_matches(['V', 'v']).parse::<f64>().ok())
            .map(|volts| MeasurementResult::new(volts, Unit::Volts))
            .ok_or_else(|| ObdError::InvalidResponse(lines.join(" ")))
    }

    /// Devices the transport could connect to
    pub async fn discover_devices(&mut self) -> Result<mpsc::Receiver<DeviceDescriptor>, ObdError> {
        self.transport
            .discover_devices()
            .await
            .map_err(|e| ObdError::transport("discover", e))
    }

    /// Disconnect from the OBD adapter
    pub async fn disconnect(&mut self) {
        if self.state != ConnectionState::Disconnected {
            info!("Disconnecting OBD client");
        }
        self.transport.disconnect().await;
        self.protocol = ObdProtocol::Auto;
        self.ecus.clear();
        self.set_state(ConnectionState::Disconnected);
    }
}
