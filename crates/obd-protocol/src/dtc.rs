//! Diagnostic Trouble Code decoding
//!
//! Two bytes per code: bits 15-14 pick the system letter, bits 13-12 the
//! first digit, the remaining three nibbles print as hex.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which list a code was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DtcStatus {
    /// Mode 03, stored codes
    Confirmed,
    /// Mode 07, detected during the current or last drive cycle
    Pending,
    /// Mode 0A, cannot be cleared by a scan tool
    Permanent,
}

/// A decoded trouble code such as `P0101`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TroubleCode {
    pub code: String,
    pub status: DtcStatus,
}

impl fmt::Display for TroubleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

const SYSTEM_LETTERS: [char; 4] = ['P', 'C', 'B', 'U'];

/// Render one two-byte word; `None` for the all-zero padding pair
pub fn decode_code(a: u8, b: u8) -> Option<String> {
    if a == 0 && b == 0 {
        return None;
    }
    let letter = SYSTEM_LETTERS[(a >> 6) as usize];
    let digit = (a >> 4) & 0x03;
    Some(format!("{}{}{:01X}{:02X}", letter, digit, a & 0x0F, b))
}

/// Walk a code list two bytes at a time. A trailing odd byte is ignored.
pub fn decode_dtc(bytes: &[u8], status: DtcStatus) -> Vec<TroubleCode> {
    bytes
        .chunks_exact(2)
        .filter_map(|pair| decode_code(pair[0], pair[1]))
        .map(|code| TroubleCode { code, status })
        .collect()
}

/// Inverse of [`decode_code`]
pub fn encode_code(code: &str) -> Option<[u8; 2]> {
    let mut chars = code.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    let system = SYSTEM_LETTERS.iter().position(|c| *c == letter)? as u8;
    let rest = chars.as_str();
    if rest.len() != 4 || !rest.is_ascii() {
        return None;
    }
    let digit = rest[..1].parse::<u8>().ok().filter(|d| *d <= 3)?;
    let low = u16::from_str_radix(&rest[1..], 16).ok()?;
    let a = (system << 6) | (digit << 4) | (low >> 8) as u8;
    Some([a, (low & 0xFF) as u8])
}

/// Engine type reported in the monitor status word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnitionType {
    Spark,
    Compression,
}

/// One on-board readiness monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitorReadiness {
    pub name: &'static str,
    pub available: bool,
    pub complete: bool,
}

/// Decoded monitor status word (mode 01 PID 01 and 41)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Malfunction indicator lamp lit
    pub mil: bool,
    /// Number of confirmed emission-related codes
    pub dtc_count: u8,
    pub ignition: IgnitionType,
    /// Continuous monitors followed by the engine-specific set
    pub monitors: Vec<MonitorReadiness>,
}

const CONTINUOUS_MONITORS: [&str; 3] = ["Misfire", "Fuel System", "Components"];

const SPARK_MONITORS: [&str; 8] = [
    "Catalyst",
    "Heated Catalyst",
    "Evaporative System",
    "Secondary Air System",
    "A/C Refrigerant",
    "Oxygen Sensor",
    "Oxygen Sensor Heater",
    "EGR System",
];

const COMPRESSION_MONITORS: [&str; 8] = [
    "NMHC Catalyst",
    "NOx/SCR Monitor",
    "",
    "Boost Pressure",
    "",
    "Exhaust Gas Sensor",
    "PM Filter",
    "EGR and/or VVT System",
];

fn bit(byte: u8, n: u8) -> bool {
    byte & (1 << n) != 0
}

/// Unpack the four status bytes A..D. Incomplete bits are inverted into `complete`.
pub fn decode_status(bytes: &[u8; 4]) -> StatusReport {
    let [a, b, c, d] = *bytes;
    let ignition = if bit(b, 3) {
        IgnitionType::Compression
    } else {
        IgnitionType::Spark
    };

    let mut monitors: Vec<MonitorReadiness> = CONTINUOUS_MONITORS
        .iter()
        .enumerate()
        .map(|(i, name)| MonitorReadiness {
            name: *name,
            available: bit(b, i as u8),
            complete: !bit(b, i as u8 + 4),
        })
        .collect();

    let engine_set = match ignition {
        IgnitionType::Spark => &SPARK_MONITORS,
        IgnitionType::Compression => &COMPRESSION_MONITORS,
    };
    monitors.extend(
        engine_set
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(i, name)| MonitorReadiness {
                name: *name,
                available: bit(c, i as u8),
                complete: !bit(d, i as u8),
            }),
    );

    StatusReport {
        mil: bit(a, 7),
        dtc_count: a & 0x7F,
        ignition,
        monitors,
    }
}
