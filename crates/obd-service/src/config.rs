//! Service configuration
//!
//! Layered, lowest priority first: built-in defaults, an optional
//! TOML/YAML/JSON file, then `OBD__`-prefixed environment variables
//! (`OBD__WIFI__HOST=10.0.0.5`, `OBD__CONNECTION_TYPE=demo`).

use config::{Config, Environment, File};
use obd_protocol::transport::{DEFAULT_BAUD_RATE, DEFAULT_HOST, DEFAULT_PORT};
use obd_protocol::{ClientConfig, CustomPid, ObdProtocol, UnitSystem};
use obd_scheduler::PollerConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// How the service reaches the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    /// Bluetooth SPP or USB, through a serial device
    #[default]
    Bluetooth,
    Wifi,
    /// Simulated vehicle, no hardware
    Demo,
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionType::Bluetooth => "bluetooth",
            ConnectionType::Wifi => "wifi",
            ConnectionType::Demo => "demo",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/rfcomm0` or `COM3`
    pub device: String,
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: "/dev/rfcomm0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `trace`, `debug`, `info`, `warn` or `error`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub connection_type: ConnectionType,
    pub wifi: WifiConfig,
    pub serial: SerialConfig,
    pub client: ClientConfig,
    pub poller: PollerConfig,
    /// Protocol tried first; legacy protocols are only used when named here
    pub preferred_protocol: Option<ObdProtocol>,
    pub unit: UnitSystem,
    /// Command texts polled by continuous updates (`"010C"`)
    pub pids: Vec<String>,
    pub custom_pids: Vec<CustomPid>,
    pub logging: LoggingConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            connection_type: ConnectionType::default(),
            wifi: WifiConfig::default(),
            serial: SerialConfig::default(),
            client: ClientConfig::default(),
            poller: PollerConfig::default(),
            preferred_protocol: None,
            unit: UnitSystem::Metric,
            pids: vec![
                "010C".to_string(),
                "010D".to_string(),
                "0105".to_string(),
                "0104".to_string(),
            ],
            custom_pids: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load from an optional file plus the environment
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder
            .add_source(
                Environment::with_prefix("OBD")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obd_protocol::DecodeRule;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.connection_type, ConnectionType::Bluetooth);
        assert_eq!(config.wifi.host, "192.168.0.10");
        assert_eq!(config.wifi.port, 35000);
        assert_eq!(config.serial.baud_rate, 38400);
        assert_eq!(config.poller.interval_ms, 300);
        assert_eq!(config.client.command_timeout_ms, 2000);
        assert!(config.preferred_protocol.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
connection_type = "wifi"
unit = "imperial"
pids = ["010C", "0111"]
preferred_protocol = "Iso15765_4Can11bit500"

[wifi]
host = "10.0.0.5"

[client]
command_timeout_ms = 1500

[[custom_pids]]
command = "221234"
description = "Oil Temperature"
bytes = 2
decoder = "temp"
"#
        )
        .unwrap();

        let config = ServiceConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.connection_type, ConnectionType::Wifi);
        assert_eq!(config.unit, UnitSystem::Imperial);
        assert_eq!(config.pids, vec!["010C", "0111"]);
        assert_eq!(
            config.preferred_protocol,
            Some(ObdProtocol::Iso15765_4Can11bit500)
        );
        assert_eq!(config.wifi.host, "10.0.0.5");
        assert_eq!(config.wifi.port, 35000);
        assert_eq!(config.client.command_timeout_ms, 1500);
        assert_eq!(config.client.default_retries, 3);
        assert_eq!(config.custom_pids.len(), 1);
        assert_eq!(config.custom_pids[0].decoder, DecodeRule::Temp);
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[serial]
device = "/dev/rfcomm3"
baud_rate = 115200
"#
        )
        .unwrap();

        // no other test reads this variable
        std::env::set_var("OBD__SERIAL__DEVICE", "/dev/ttyUSB7");
        let loaded = ServiceConfig::load(Some(file.path()));
        std::env::remove_var("OBD__SERIAL__DEVICE");

        let config = loaded.unwrap();
        assert_eq!(config.serial.device, "/dev/ttyUSB7");
        assert_eq!(config.serial.baud_rate, 115200);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = ServiceConfig::load(Some(Path::new("/nonexistent/obd-monitor.toml")));
        assert!(result.is_err());
    }
}
