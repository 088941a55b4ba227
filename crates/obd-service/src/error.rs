//! Application-level errors

use obd_protocol::ObdError;
use obd_scheduler::SchedulerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("No adapter found")]
    NoAdapterFound,

    #[error("Not connected to a vehicle")]
    NotConnectedToVehicle,

    #[error("Adapter connection failed: {0}")]
    AdapterConnectionFailed(#[source] ObdError),

    #[error("Trouble code scan failed: {0}")]
    ScanFailed(#[source] ObdError),

    #[error("Clearing trouble codes failed: {0}")]
    ClearFailed(#[source] ObdError),

    #[error("Command {command} failed: {source}")]
    CommandFailed {
        command: String,
        #[source]
        source: ObdError,
    },

    #[error("Unknown PID command: {0}")]
    UnknownPid(String),

    #[error("PID list unavailable: {0}")]
    PidList(#[from] SchedulerError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] config::ConfigError),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl ServiceError {
    /// Wrap a controller error, keeping "not connected" distinguishable
    pub(crate) fn wrap(err: ObdError, kind: impl FnOnce(ObdError) -> ServiceError) -> Self {
        match err {
            ObdError::NotConnected(_) => ServiceError::NotConnectedToVehicle,
            other => kind(other),
        }
    }
}
