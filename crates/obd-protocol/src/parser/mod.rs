//! Response Line Reassembly
//!
//! Turns the ASCII hex lines of one adapter round trip into per-ECU messages.
//! Malformed lines and broken multi-frame sequences are dropped individually;
//! they never fail the whole batch.

mod can;
mod legacy;

use crate::protocol::FrameFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::trace;

/// Address of the ECU that sent a message: CAN arbitration id or legacy source byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EcuId(pub u32);

/// Well-known ECU functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EcuRole {
    Engine,
    Transmission,
    Unknown,
}

impl EcuId {
    pub fn role(&self) -> EcuRole {
        match self.0 {
            0x7E8 | 0x18DA_F110 | 0x10 => EcuRole::Engine,
            0x7E9 | 0x18DA_F118 | 0x18 => EcuRole::Transmission,
            _ => EcuRole::Unknown,
        }
    }
}

impl fmt::Display for EcuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 > 0xFFF {
            write!(f, "{:08X}", self.0)
        } else if self.0 > 0xFF {
            write!(f, "{:03X}", self.0)
        } else {
            write!(f, "{:02X}", self.0)
        }
    }
}

/// One logical response from one ECU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Sender address
    pub ecu: EcuId,
    /// Reassembled payload, starting with the response mode byte (e.g. 0x41)
    pub data: Vec<u8>,
}

impl Message {
    pub fn new(ecu: EcuId, data: Vec<u8>) -> Self {
        Self { ecu, data }
    }
}

/// Reasons a line or pending sequence was dropped. Logged, never returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum FrameError {
    #[error("not a hex frame")]
    Malformed,
    #[error("frame too short or too long ({0} bytes)")]
    Size(usize),
    #[error("declared length {declared} does not fit {available} bytes")]
    Length { declared: usize, available: usize },
    #[error("sequence {actual} where {expected} was expected")]
    Sequence { expected: u8, actual: u8 },
    #[error("consecutive frame without a first frame")]
    Orphan,
    #[error("flow control frame")]
    FlowControl,
}

/// Reassemble response lines according to the protocol's framing
pub fn parse<S: AsRef<str>>(lines: &[S], format: FrameFormat) -> Vec<Message> {
    match format {
        FrameFormat::Can { id_bits } => can::parse(lines, id_bits),
        FrameFormat::Legacy => legacy::parse(lines),
    }
}

/// Lines printed with headers off: each hex line is one message from an unnamed ECU
pub fn parse_headerless<S: AsRef<str>>(lines: &[S]) -> Vec<Message> {
    lines
        .iter()
        .filter_map(|line| hex_bytes(line.as_ref()))
        .map(|data| Message::new(EcuId(0), data))
        .collect()
}

/// Decode a run of hex digits, ignoring whitespace. Odd digit counts are rejected.
pub(crate) fn hex_bytes(s: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = s
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .map(|b| (b as char).to_digit(16).map(|d| d as u8))
        .collect::<Option<_>>()?;
    if digits.is_empty() || digits.len() % 2 != 0 {
        return None;
    }
    Some(digits.chunks(2).map(|p| (p[0] << 4) | p[1]).collect())
}

pub(crate) fn log_drop(line: &str, err: &FrameError) {
    trace!("Dropping frame {:?}: {}", line, err);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_bytes() {
        assert_eq!(hex_bytes("41 0C 1a f8"), Some(vec![0x41, 0x0C, 0x1A, 0xF8]));
        assert_eq!(hex_bytes("41 0"), None);
        assert_eq!(hex_bytes("NO DATA"), None);
        assert_eq!(hex_bytes(""), None);
    }

    #[test]
    fn test_headerless_lines() {
        let messages = parse_headerless(&["41 0C 1A F8 0D 32", "SEARCHING..."]);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].ecu, EcuId(0));
        assert_eq!(messages[0].data, vec![0x41, 0x0C, 0x1A, 0xF8, 0x0D, 0x32]);
    }

    #[test]
    fn test_ecu_roles() {
        assert_eq!(EcuId(0x7E8).role(), EcuRole::Engine);
        assert_eq!(EcuId(0x18DA_F118).role(), EcuRole::Transmission);
        assert_eq!(EcuId(0x7EA).role(), EcuRole::Unknown);
        assert_eq!(EcuId(0x7E8).to_string(), "7E8");
        assert_eq!(EcuId(0x18DA_F110).to_string(), "18DAF110");
    }
}
