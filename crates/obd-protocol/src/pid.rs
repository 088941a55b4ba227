//! OBD-II Command Descriptors
//!
//! A descriptor names the command text sent to the adapter, the expected
//! response width and the rule used to decode the payload.

use crate::decode::{DecodeResult, DecodeRule};
use crate::error::DecodeError;
use crate::mode;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// One request the adapter understands (`"010C"`, `"03"`, `"ATRV"`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Command {
    /// Command text as sent, without the terminator
    pub text: Cow<'static, str>,
    /// Human readable name
    pub description: Cow<'static, str>,
    /// Response width including the PID echo byte, 0 when variable
    pub bytes: usize,
    /// Payload decoder
    pub rule: DecodeRule,
}

impl Command {
    /// Catalog constructor
    pub const fn standard(
        text: &'static str,
        description: &'static str,
        bytes: usize,
        rule: DecodeRule,
    ) -> Self {
        Self {
            text: Cow::Borrowed(text),
            description: Cow::Borrowed(description),
            bytes,
            rule,
        }
    }

    /// Adapter directive rather than a vehicle request
    pub fn is_at(&self) -> bool {
        self.text.len() >= 2 && self.text[..2].eq_ignore_ascii_case("AT")
    }

    /// Service mode (first byte of the request)
    pub fn mode(&self) -> Option<u8> {
        if self.is_at() {
            return None;
        }
        self.text
            .get(..2)
            .and_then(|m| u8::from_str_radix(m, 16).ok())
    }

    /// PID byte for PID-addressed modes
    pub fn pid(&self) -> Option<u8> {
        if self.is_at() {
            return None;
        }
        self.text
            .get(2..4)
            .and_then(|p| u8::from_str_radix(p, 16).ok())
    }

    /// Everything after the mode, used to build batched requests
    pub fn pid_hex(&self) -> &str {
        self.text.get(2..).unwrap_or("")
    }

    /// Mode byte a positive response starts with
    pub fn response_mode(&self) -> Option<u8> {
        self.mode().map(|m| m + 0x40)
    }

    /// Mode 02 twin of a mode 01 descriptor
    pub fn freeze_frame(&self) -> Option<Command> {
        if self.mode() != Some(mode::CURRENT_DATA) {
            return None;
        }
        Some(Command {
            text: Cow::Owned(format!("02{}", self.pid_hex())),
            description: Cow::Owned(format!("Freeze Frame: {}", self.description)),
            bytes: self.bytes,
            rule: self.rule,
        })
    }

    /// Strip the response header from a reassembled message.
    ///
    /// Drops the mode byte, the PID or identifier echo (and freeze-frame
    /// number) where the mode has one, and the code count CAN prefixes to
    /// DTC lists.
    pub fn payload<'a>(&self, data: &'a [u8], can: bool) -> &'a [u8] {
        let header = match (self.mode(), self.rule) {
            (Some(mode::FREEZE_FRAME), _) => 3,
            (_, DecodeRule::Dtc(_)) => 1 + can as usize,
            (_, DecodeRule::Monitor) => 1,
            (Some(mode::CURRENT_DATA | mode::VEHICLE_INFO), _) => 2,
            (Some(mode::TEST_RESULTS), DecodeRule::Pid) => 2,
            (Some(mode::READ_DATA_BY_ID), _) => 3,
            _ => 1,
        };
        data.get(header..).unwrap_or(&[])
    }

    /// Decode a reassembled message addressed to this command
    pub fn decode(&self, data: &[u8], can: bool) -> Result<DecodeResult, DecodeError> {
        self.rule.decode(self.payload(data, can))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.text, self.description)
    }
}

/// User supplied descriptor, e.g. from configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomPid {
    /// Command text such as `"221234"`
    pub command: String,
    pub description: String,
    /// Response width including the PID echo byte
    #[serde(default)]
    pub bytes: usize,
    pub decoder: DecodeRule,
}

impl From<CustomPid> for Command {
    fn from(custom: CustomPid) -> Self {
        Command {
            text: Cow::Owned(custom.command.to_ascii_uppercase()),
            description: Cow::Owned(custom.description),
            bytes: custom.bytes,
            rule: custom.decoder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtc::DtcStatus;

    const RPM: Command = Command::standard("010C", "Engine RPM", 3, DecodeRule::Uas(0x07));

    #[test]
    fn test_mode_and_pid() {
        assert_eq!(RPM.mode(), Some(0x01));
        assert_eq!(RPM.pid(), Some(0x0C));
        assert_eq!(RPM.pid_hex(), "0C");
        assert_eq!(RPM.response_mode(), Some(0x41));

        let atrv = Command::standard("ATRV", "Voltage", 0, DecodeRule::None);
        assert!(atrv.is_at());
        assert_eq!(atrv.mode(), None);
    }

    #[test]
    fn test_rpm_decode_from_message() {
        let m = RPM.decode(&[0x41, 0x0C, 0x1A, 0xF8], true).unwrap();
        assert!((m.measurement().unwrap().value - 1726.0).abs() < 0.01);
    }

    #[test]
    fn test_freeze_frame_twin() {
        let ff = RPM.freeze_frame().unwrap();
        assert_eq!(ff.text, "020C");
        assert_eq!(ff.description, "Freeze Frame: Engine RPM");
        let m = ff.decode(&[0x42, 0x0C, 0x00, 0x1A, 0xF8], true).unwrap();
        assert!((m.measurement().unwrap().value - 1726.0).abs() < 0.01);
        assert!(ff.freeze_frame().is_none());
    }

    #[test]
    fn test_dtc_payload_drops_can_count() {
        let get_dtc = Command::standard("03", "Get DTCs", 0, DecodeRule::Dtc(DtcStatus::Confirmed));
        let can = get_dtc.payload(&[0x43, 0x02, 0x01, 0x01, 0xC1, 0x23], true);
        assert_eq!(can, &[0x01, 0x01, 0xC1, 0x23]);
        let legacy = get_dtc.payload(&[0x43, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00], false);
        assert_eq!(legacy.len(), 6);
    }

    #[test]
    fn test_identifier_echo_stripped() {
        let oil = Command::from(CustomPid {
            command: "221234".to_string(),
            description: "Oil Temperature".to_string(),
            bytes: 1,
            decoder: DecodeRule::Temp,
        });
        assert_eq!(oil.payload(&[0x62, 0x12, 0x34, 0x82], true), &[0x82]);
        let m = oil.decode(&[0x62, 0x12, 0x34, 0x82], true).unwrap();
        assert!((m.measurement().unwrap().value - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_custom_pid_deserializes() {
        let custom: CustomPid = serde_json::from_str(
            r#"{"command":"01a6","description":"Odometer","bytes":5,"decoder":{"uas":37}}"#,
        )
        .unwrap();
        let cmd = Command::from(custom);
        assert_eq!(cmd.text, "01A6");
        assert_eq!(cmd.rule, DecodeRule::Uas(0x25));
    }
}
