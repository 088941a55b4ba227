//! Adapter session state

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one adapter session. Only the client mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    ConnectingToAdapter,
    ConnectedToAdapter,
    InitializingVehicle,
    ConnectedToVehicle,
}

impl ConnectionState {
    /// Adapter link is up (vehicle may not be)
    pub fn is_adapter_up(&self) -> bool {
        matches!(
            self,
            ConnectionState::ConnectedToAdapter
                | ConnectionState::InitializingVehicle
                | ConnectionState::ConnectedToVehicle
        )
    }

    pub fn is_vehicle_up(&self) -> bool {
        *self == ConnectionState::ConnectedToVehicle
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::ConnectingToAdapter => "connecting to adapter",
            ConnectionState::ConnectedToAdapter => "connected to adapter",
            ConnectionState::InitializingVehicle => "initializing vehicle",
            ConnectionState::ConnectedToVehicle => "connected to vehicle",
        };
        f.write_str(s)
    }
}
