//! OBD-II Service
//!
//! Application-facing facade: picks the transport for the configured
//! connection type, maps controller failures to [`ServiceError`], and wires
//! the PID list to the background poller.

pub mod config;
mod error;
mod logging;
mod service;

pub use config::{ConnectionType, LogFormat, LoggingConfig, ServiceConfig};
pub use error::ServiceError;
pub use logging::init_logging;
pub use service::ObdService;
