//! Application facade over the adapter controller and the poller

use crate::config::{ConnectionType, ServiceConfig};
use crate::error::ServiceError;
use obd_protocol::transport::{DeviceDescriptor, MockTransport, SerialTransport, TcpTransport, Transport};
use obd_protocol::{
    catalog, Command, ConnectionState, DecodeResult, DtcStatus, EcuId, MeasurementResult,
    ObdClient, StatusReport, TroubleCode, UnitSystem, VehicleInfo,
};
use obd_scheduler::{spawn_poller, PidList, PidValues, PollStream};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub struct ObdService {
    config: ServiceConfig,
    connection_type: ConnectionType,
    client: Arc<Mutex<ObdClient>>,
    pid_list: PidList,
    custom: Vec<Command>,
}

fn build_client(config: &ServiceConfig, connection_type: ConnectionType) -> ObdClient {
    let transport: Box<dyn Transport> = match connection_type {
        ConnectionType::Bluetooth => Box::new(SerialTransport::new(
            &config.serial.device,
            config.serial.baud_rate,
        )),
        ConnectionType::Wifi => Box::new(TcpTransport::new(&config.wifi.host, config.wifi.port)),
        ConnectionType::Demo => Box::new(MockTransport::demo()),
    };
    ObdClient::new(transport, config.client.clone())
}

impl ObdService {
    /// Build the service and seed the poll list from `config.pids`.
    /// Must be called inside a tokio runtime.
    pub fn new(config: ServiceConfig) -> Result<Self, ServiceError> {
        let custom: Vec<Command> = config
            .custom_pids
            .iter()
            .cloned()
            .map(Command::from)
            .collect();
        let initial = config
            .pids
            .iter()
            .map(|text| {
                resolve(&custom, text).ok_or_else(|| ServiceError::UnknownPid(text.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let connection_type = config.connection_type;
        let client = build_client(&config, connection_type);
        info!(
            "OBD service ready ({} connection, {} PIDs to poll)",
            connection_type,
            initial.len()
        );

        Ok(Self {
            connection_type,
            client: Arc::new(Mutex::new(client)),
            pid_list: PidList::with_commands(initial),
            custom,
            config,
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn connection_type(&self) -> ConnectionType {
        self.connection_type
    }

    /// Shared handle to the current controller
    pub fn client(&self) -> Arc<Mutex<ObdClient>> {
        self.client.clone()
    }

    pub fn pid_list(&self) -> &PidList {
        &self.pid_list
    }

    /// Tear down the current session and replace the controller.
    ///
    /// Pollers started earlier keep the old controller and stop producing
    /// values; start a new one after reconnecting.
    pub async fn switch_connection_type(&mut self, connection_type: ConnectionType) {
        if connection_type == self.connection_type {
            return;
        }
        info!(
            "Switching connection type: {} -> {}",
            self.connection_type, connection_type
        );
        self.client.lock().await.disconnect().await;
        self.connection_type = connection_type;
        self.client = Arc::new(Mutex::new(build_client(&self.config, connection_type)));
    }

    /// Connect to the adapter and then the vehicle
    pub async fn start_connection(
        &self,
        target: Option<&DeviceDescriptor>,
    ) -> Result<VehicleInfo, ServiceError> {
        let mut client = self.client.lock().await;
        let vehicle = client
            .connect(target, self.config.preferred_protocol)
            .await
            .map_err(ServiceError::AdapterConnectionFailed)?;
        info!(
            "Connected on {} (VIN: {}, {} supported PIDs)",
            vehicle.protocol.name(),
            vehicle.vin.as_deref().unwrap_or("unknown"),
            vehicle.supported_pids.len()
        );
        Ok(vehicle)
    }

    pub async fn stop_connection(&self) {
        self.client.lock().await.disconnect().await;
    }

    pub async fn state(&self) -> ConnectionState {
        self.client.lock().await.state()
    }

    /// Devices the current connection type can reach
    pub async fn scan_for_adapters(&self) -> Result<Vec<DeviceDescriptor>, ServiceError> {
        let mut rx = self
            .client
            .lock()
            .await
            .discover_devices()
            .await
            .map_err(|e| ServiceError::wrap(e, ServiceError::ScanFailed))?;
        let mut devices = Vec::new();
        while let Some(device) = rx.recv().await {
            devices.push(device);
        }
        if devices.is_empty() {
            return Err(ServiceError::NoAdapterFound);
        }
        Ok(devices)
    }

    /// Custom PIDs first, then the catalog
    pub fn resolve_command(&self, text: &str) -> Option<Command> {
        resolve(&self.custom, text)
    }

    /// Request PIDs once, presented in the configured unit system
    pub async fn request_pids(&self, commands: &[Command]) -> Result<PidValues, ServiceError> {
        let values = self
            .client
            .lock()
            .await
            .request_pids(commands)
            .await
            .map_err(|e| {
                ServiceError::wrap(e, |source| ServiceError::CommandFailed {
                    command: "PID request".to_string(),
                    source,
                })
            })?;
        Ok(convert(values, self.config.unit))
    }

    /// Poll the PID list until the returned stream is dropped or cancelled
    pub fn start_continuous_updates(&self) -> PollStream {
        spawn_poller(
            self.client.clone(),
            self.pid_list.clone(),
            self.config.poller.clone(),
        )
        .in_system(self.config.unit)
    }

    pub async fn add_pid(&self, command: Command) -> Result<bool, ServiceError> {
        Ok(self.pid_list.add(vec![command]).await? > 0)
    }

    pub async fn remove_pid(&self, command: Command) -> Result<bool, ServiceError> {
        Ok(self.pid_list.remove(vec![command]).await? > 0)
    }

    pub async fn scan_for_trouble_codes(
        &self,
        status: DtcStatus,
    ) -> Result<BTreeMap<EcuId, Vec<TroubleCode>>, ServiceError> {
        self.client
            .lock()
            .await
            .scan_trouble_codes(status)
            .await
            .map_err(|e| ServiceError::wrap(e, ServiceError::ScanFailed))
    }

    pub async fn clear_trouble_codes(&self) -> Result<(), ServiceError> {
        self.client
            .lock()
            .await
            .clear_trouble_codes()
            .await
            .map_err(|e| ServiceError::wrap(e, ServiceError::ClearFailed))
    }

    pub async fn get_status(&self) -> Result<StatusReport, ServiceError> {
        let command = catalog::STATUS.text.to_string();
        self.client
            .lock()
            .await
            .get_status()
            .await
            .map_err(|e| command_failed(command, e))
    }

    pub async fn get_supported_pids(&self) -> Vec<Command> {
        match self.client.lock().await.get_supported_pids().await {
            Ok(pids) => pids,
            Err(e) => {
                warn!("Supported PID discovery failed: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn send_command(&self, command: &Command) -> Result<DecodeResult, ServiceError> {
        self.client
            .lock()
            .await
            .send_command(command)
            .await
            .map_err(|e| command_failed(command.text.to_string(), e))
    }

    /// Raw passthrough; returns the adapter's response lines
    pub async fn send_command_text(
        &self,
        text: &str,
        retries: u32,
    ) -> Result<Vec<String>, ServiceError> {
        self.client
            .lock()
            .await
            .send_command_text(text, retries)
            .await
            .map_err(|e| command_failed(text.to_string(), e))
    }

    pub async fn read_battery_voltage(&self) -> Result<MeasurementResult, ServiceError> {
        let command = catalog::ATRV.text.to_string();
        self.client
            .lock()
            .await
            .read_battery_voltage()
            .await
            .map(|v| v.in_system(self.config.unit))
            .map_err(|e| command_failed(command, e))
    }
}

fn resolve(custom: &[Command], text: &str) -> Option<Command> {
    custom
        .iter()
        .find(|c| c.text.eq_ignore_ascii_case(text))
        .cloned()
        .or_else(|| catalog::by_text(text).cloned())
}

fn command_failed(command: String, err: obd_protocol::ObdError) -> ServiceError {
    ServiceError::wrap(err, |source| ServiceError::CommandFailed { command, source })
}

fn convert(values: HashMap<Command, MeasurementResult>, system: UnitSystem) -> PidValues {
    values
        .into_iter()
        .map(|(command, value)| (command, value.in_system(system)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use obd_protocol::{CustomPid, DecodeRule, Unit};
    use tokio_stream::StreamExt;

    fn demo_config() -> ServiceConfig {
        ServiceConfig {
            connection_type: ConnectionType::Demo,
            pids: vec!["010C".to_string(), "010D".to_string()],
            ..ServiceConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_demo_connection() {
        let service = ObdService::new(demo_config()).unwrap();
        assert_eq!(service.state().await, ConnectionState::Disconnected);

        let vehicle = service.start_connection(None).await.unwrap();
        assert!(vehicle.protocol.is_can());
        assert_eq!(vehicle.vin.as_deref(), Some("1D4GP00R55B123456"));
        assert_eq!(service.state().await, ConnectionState::ConnectedToVehicle);

        service.stop_connection().await;
        assert_eq!(service.state().await, ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_connected_is_reported() {
        let service = ObdService::new(demo_config()).unwrap();
        let err = service
            .scan_for_trouble_codes(DtcStatus::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotConnectedToVehicle));
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_pids_in_imperial() {
        let mut config = demo_config();
        config.unit = UnitSystem::Imperial;
        let service = ObdService::new(config).unwrap();
        service.start_connection(None).await.unwrap();

        let speed = service.resolve_command("010D").unwrap();
        let values = service.request_pids(&[speed.clone()]).await.unwrap();
        assert_eq!(values[&speed].unit, Unit::MilesPerHour);
    }

    #[tokio::test(start_paused = true)]
    async fn test_continuous_updates_follow_pid_list() {
        let service = ObdService::new(demo_config()).unwrap();
        service.start_connection(None).await.unwrap();

        let coolant = service.resolve_command("0105").unwrap();
        assert!(service.add_pid(coolant.clone()).await.unwrap());
        assert!(!service.add_pid(coolant.clone()).await.unwrap());
        let rpm = service.resolve_command("010C").unwrap();
        assert!(service.remove_pid(rpm.clone()).await.unwrap());

        let mut updates = service.start_continuous_updates();
        let round = updates.next().await.unwrap();
        assert!(round.contains_key(&coolant));
        assert!(!round.contains_key(&rpm));
        updates.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_and_clear() {
        let service = ObdService::new(demo_config()).unwrap();
        service.start_connection(None).await.unwrap();

        let codes = service
            .scan_for_trouble_codes(DtcStatus::Confirmed)
            .await
            .unwrap();
        let engine: Vec<String> = codes[&EcuId(0x7E8)].iter().map(|c| c.code.clone()).collect();
        assert_eq!(engine, vec!["P0101", "U0123"]);

        service.clear_trouble_codes().await.unwrap();
        let status = service.get_status().await.unwrap();
        assert!(status.mil);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_connection_is_wrapped() {
        let mut config = demo_config();
        config.connection_type = ConnectionType::Wifi;
        config.wifi.host = "127.0.0.1".to_string();
        config.wifi.port = 9;
        config.client.connect_timeout_ms = 200;
        let service = ObdService::new(config).unwrap();

        let err = service.start_connection(None).await.unwrap_err();
        assert!(matches!(err, ServiceError::AdapterConnectionFailed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_connection_type_replaces_client() {
        let mut config = demo_config();
        config.connection_type = ConnectionType::Wifi;
        let mut service = ObdService::new(config).unwrap();
        let before = service.client();

        service.switch_connection_type(ConnectionType::Demo).await;
        assert_eq!(service.connection_type(), ConnectionType::Demo);
        assert!(!Arc::ptr_eq(&before, &service.client()));

        service.start_connection(None).await.unwrap();
        let voltage = service.read_battery_voltage().await.unwrap();
        assert_eq!(voltage.unit, Unit::Volts);
        assert!((voltage.value - 12.6).abs() < 1e-9);
        let adapters = service.scan_for_adapters().await.unwrap();
        assert!(!adapters.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_pid_resolution() {
        let mut config = demo_config();
        config.custom_pids.push(CustomPid {
            command: "221234".to_string(),
            description: "Oil Temperature".to_string(),
            bytes: 2,
            decoder: DecodeRule::Temp,
        });
        config.pids.push("221234".to_string());
        let service = ObdService::new(config).unwrap();

        let oil = service.resolve_command("221234").unwrap();
        assert_eq!(oil.description, "Oil Temperature");
        assert_eq!(service.pid_list().snapshot().await.unwrap().len(), 3);

        let mut config = demo_config();
        config.pids.push("99ZZ".to_string());
        assert!(matches!(
            ObdService::new(config),
            Err(ServiceError::UnknownPid(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_pid_requested_with_catalog_pids() {
        let mut config = demo_config();
        config.custom_pids.push(CustomPid {
            command: "221234".to_string(),
            description: "Oil Temperature".to_string(),
            bytes: 1,
            decoder: DecodeRule::Temp,
        });
        let service = ObdService::new(config).unwrap();
        service.start_connection(None).await.unwrap();

        let rpm = service.resolve_command("010C").unwrap();
        let oil = service.resolve_command("221234").unwrap();
        let values = service.request_pids(&[rpm.clone(), oil.clone()]).await.unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[&oil], MeasurementResult::new(90.0, Unit::Celsius));
        assert!((values[&rpm].value - 1726.0).abs() < 0.01);
    }

    #[tokio::test(start_paused = true)]
    async fn test_raw_passthrough() {
        let service = ObdService::new(demo_config()).unwrap();
        assert!(matches!(
            service.send_command_text("ATRV", 1).await,
            Err(ServiceError::NotConnectedToVehicle)
        ));

        service.start_connection(None).await.unwrap();
        let lines = service.send_command_text("ATRV", 1).await.unwrap();
        assert_eq!(lines, vec!["12.6V"]);

        match service.send_command_text("0199", 1).await {
            Err(ServiceError::CommandFailed { command, .. }) => assert_eq!(command, "0199"),
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }
}
