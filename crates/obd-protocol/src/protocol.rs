//! OBD-II Protocol Definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// How response lines for a protocol are framed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    /// ISO-TP over CAN with an arbitration id of the given width (11 or 29 bits)
    Can { id_bits: u8 },
    /// Header byte addressed, one complete message per line
    Legacy,
}

/// Supported OBD-II protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObdProtocol {
    /// No fixed protocol (ELM327 protocol 0, automatic search)
    Auto,
    /// SAE J1850 PWM (41.6 kbaud)
    J1850Pwm,
    /// SAE J1850 VPW (10.4 kbaud)
    J1850Vpw,
    /// ISO 9141-2 (10.4 kbaud, 5 baud init)
    Iso9141_2,
    /// ISO 14230-4 KWP (slow init, 10.4 kbaud)
    Iso14230_4Kwp,
    /// ISO 14230-4 KWP (fast init, 10.4 kbaud)
    Iso14230_4KwpFast,
    /// ISO 15765-4 CAN (11 bit ID, 500 kbaud)
    Iso15765_4Can11bit500,
    /// ISO 15765-4 CAN (29 bit ID, 500 kbaud)
    Iso15765_4Can29bit500,
    /// ISO 15765-4 CAN (11 bit ID, 250 kbaud)
    Iso15765_4Can11bit250,
    /// ISO 15765-4 CAN (29 bit ID, 250 kbaud)
    Iso15765_4Can29bit250,
    /// SAE J1939 (CAN 29 bit ID, 250 kbaud)
    SaeJ1939,
}

impl ObdProtocol {
    /// CAN candidates in automatic negotiation order. Legacy protocols are
    /// never guessed: their initialization is stateful and not safely retryable.
    pub const NEGOTIATION_ORDER: [ObdProtocol; 5] = [
        ObdProtocol::Iso15765_4Can11bit500,
        ObdProtocol::Iso15765_4Can29bit500,
        ObdProtocol::Iso15765_4Can11bit250,
        ObdProtocol::Iso15765_4Can29bit250,
        ObdProtocol::SaeJ1939,
    ];

    /// ELM327 protocol number
    pub fn elm_id(&self) -> char {
        match self {
            ObdProtocol::Auto => '0',
            ObdProtocol::J1850Pwm => '1',
            ObdProtocol::J1850Vpw => '2',
            ObdProtocol::Iso9141_2 => '3',
            ObdProtocol::Iso14230_4Kwp => '4',
            ObdProtocol::Iso14230_4KwpFast => '5',
            ObdProtocol::Iso15765_4Can11bit500 => '6',
            ObdProtocol::Iso15765_4Can29bit500 => '7',
            ObdProtocol::Iso15765_4Can11bit250 => '8',
            ObdProtocol::Iso15765_4Can29bit250 => '9',
            ObdProtocol::SaeJ1939 => 'A',
        }
    }

    /// Get the ELM327 AT command for this protocol
    pub fn to_elm_command(&self) -> String {
        format!("ATSP{}", self.elm_id())
    }

    /// Reverse of [`ObdProtocol::elm_id`]; accepts the `A` prefix of `ATDPN` replies
    pub fn from_elm_id(id: &str) -> Option<Self> {
        let id = id.trim().trim_start_matches('A');
        let id = if id.is_empty() { "A" } else { id };
        match id {
            "0" => Some(ObdProtocol::Auto),
            "1" => Some(ObdProtocol::J1850Pwm),
            "2" => Some(ObdProtocol::J1850Vpw),
            "3" => Some(ObdProtocol::Iso9141_2),
            "4" => Some(ObdProtocol::Iso14230_4Kwp),
            "5" => Some(ObdProtocol::Iso14230_4KwpFast),
            "6" => Some(ObdProtocol::Iso15765_4Can11bit500),
            "7" => Some(ObdProtocol::Iso15765_4Can29bit500),
            "8" => Some(ObdProtocol::Iso15765_4Can11bit250),
            "9" => Some(ObdProtocol::Iso15765_4Can29bit250),
            "A" => Some(ObdProtocol::SaeJ1939),
            _ => None,
        }
    }

    /// Check if this is a CAN protocol
    pub fn is_can(&self) -> bool {
        matches!(self.frame_format(), Some(FrameFormat::Can { .. }))
    }

    /// Parser strategy for response lines, `None` for automatic selection
    pub fn frame_format(&self) -> Option<FrameFormat> {
        match self {
            ObdProtocol::Auto => None,
            ObdProtocol::J1850Pwm
            | ObdProtocol::J1850Vpw
            | ObdProtocol::Iso9141_2
            | ObdProtocol::Iso14230_4Kwp
            | ObdProtocol::Iso14230_4KwpFast => Some(FrameFormat::Legacy),
            ObdProtocol::Iso15765_4Can11bit500 | ObdProtocol::Iso15765_4Can11bit250 => {
                Some(FrameFormat::Can { id_bits: 11 })
            }
            ObdProtocol::Iso15765_4Can29bit500
            | ObdProtocol::Iso15765_4Can29bit250
            | ObdProtocol::SaeJ1939 => Some(FrameFormat::Can { id_bits: 29 }),
        }
    }

    /// Human readable name
    pub fn name(&self) -> &'static str {
        match self {
            ObdProtocol::Auto => "Automatic",
            ObdProtocol::J1850Pwm => "SAE J1850 PWM",
            ObdProtocol::J1850Vpw => "SAE J1850 VPW",
            ObdProtocol::Iso9141_2 => "ISO 9141-2",
            ObdProtocol::Iso14230_4Kwp => "ISO 14230-4 KWP (5 baud init)",
            ObdProtocol::Iso14230_4KwpFast => "ISO 14230-4 KWP (fast init)",
            ObdProtocol::Iso15765_4Can11bit500 => "ISO 15765-4 (CAN 11/500)",
            ObdProtocol::Iso15765_4Can29bit500 => "ISO 15765-4 (CAN 29/500)",
            ObdProtocol::Iso15765_4Can11bit250 => "ISO 15765-4 (CAN 11/250)",
            ObdProtocol::Iso15765_4Can29bit250 => "ISO 15765-4 (CAN 29/250)",
            ObdProtocol::SaeJ1939 => "SAE J1939 (CAN 29/250)",
        }
    }

    /// Get the default baud rate for serial communication
    pub fn default_baud_rate(&self) -> u32 {
        // ELM327 adapters typically use 38400 or higher
        if self.is_can() {
            115200
        } else {
            38400
        }
    }
}

impl Default for ObdProtocol {
    fn default() -> Self {
        ObdProtocol::Auto
    }
}

impl fmt::Display for ObdProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_protocol_commands() {
        assert_eq!(ObdProtocol::Iso15765_4Can11bit500.to_elm_command(), "ATSP6");
        assert_eq!(ObdProtocol::SaeJ1939.to_elm_command(), "ATSPA");
        assert_eq!(ObdProtocol::Auto.to_elm_command(), "ATSP0");
    }

    #[test]
    fn test_negotiation_order_is_can_only() {
        assert!(ObdProtocol::NEGOTIATION_ORDER.iter().all(|p| p.is_can()));
        assert_eq!(ObdProtocol::NEGOTIATION_ORDER[0], ObdProtocol::Iso15765_4Can11bit500);
        assert_eq!(ObdProtocol::NEGOTIATION_ORDER[4], ObdProtocol::SaeJ1939);
    }

    #[test]
    fn test_frame_formats() {
        assert_eq!(
            ObdProtocol::SaeJ1939.frame_format(),
            Some(FrameFormat::Can { id_bits: 29 })
        );
        assert_eq!(ObdProtocol::Iso9141_2.frame_format(), Some(FrameFormat::Legacy));
        assert_eq!(ObdProtocol::Auto.frame_format(), None);
    }

    #[test]
    fn test_describe_protocol_number() {
        assert_eq!(ObdProtocol::from_elm_id("A6"), Some(ObdProtocol::Iso15765_4Can11bit500));
        assert_eq!(ObdProtocol::from_elm_id("3"), Some(ObdProtocol::Iso9141_2));
        assert_eq!(ObdProtocol::from_elm_id("A"), Some(ObdProtocol::SaeJ1939));
        assert_eq!(ObdProtocol::from_elm_id("Z"), None);
    }
}
