//! OBD-II Protocol Implementation
//!
//! This crate provides async communication with ELM327-compatible OBD-II
//! adapters over serial, TCP or an in-memory mock. It supports ISO 15765-4
//! (CAN) with automatic negotiation and legacy protocols selected explicitly.
//!
//! Layers, leaf first:
//! - [`parser`] turns adapter lines into per-ECU messages (ISO-TP reassembly)
//! - [`decode`], [`batch`] and [`dtc`] interpret message payloads
//! - [`ObdClient`] drives the adapter through a [`transport::Transport`]

pub mod batch;
pub mod catalog;
mod client;
pub mod deadline;
pub mod decode;
pub mod dtc;
mod error;
pub mod parser;
mod pid;
mod protocol;
mod state;
pub mod transport;
pub mod uas;
mod units;

pub use client::{negotiation_candidates, ClientConfig, ObdClient, VehicleInfo};
pub use decode::{DecodeResult, DecodeRule, MonitorTest};
pub use dtc::{DtcStatus, StatusReport, TroubleCode};
pub use error::{DecodeError, ObdError, TransportError};
pub use parser::{EcuId, EcuRole, Message};
pub use pid::{Command, CustomPid};
pub use protocol::{FrameFormat, ObdProtocol};
pub use state::ConnectionState;
pub use units::{MeasurementResult, Unit, UnitSystem};

/// OBD-II mode constants
pub mod mode {
    /// Current data
    pub const CURRENT_DATA: u8 = 0x01;
    /// Freeze frame data
    pub const FREEZE_FRAME: u8 = 0x02;
    /// Diagnostic trouble codes
    pub const READ_DTC: u8 = 0x03;
    /// Clear trouble codes
    pub const CLEAR_DTC: u8 = 0x04;
    /// Oxygen sensor monitoring (non-CAN only)
    pub const O2_MONITORING: u8 = 0x05;
    /// On-board monitoring test results
    pub const TEST_RESULTS: u8 = 0x06;
    /// Pending trouble codes
    pub const PENDING_DTC: u8 = 0x07;
    /// Control of on-board systems
    pub const CONTROL: u8 = 0x08;
    /// Vehicle information
    pub const VEHICLE_INFO: u8 = 0x09;
    /// Permanent trouble codes
    pub const PERMANENT_DTC: u8 = 0x0A;
    /// Manufacturer data by 16-bit identifier (UDS service 0x22)
    pub const READ_DATA_BY_ID: u8 = 0x22;
}
