//! J1850 / ISO 9141 / KWP line parsing
//!
//! With headers on the adapter prints one message per line:
//! priority, target, source, up to seven data bytes, checksum.

use super::{hex_bytes, log_drop, EcuId, FrameError, Message};

const HEADER_LEN: usize = 3;
const MIN_LINE: usize = 6;
const MAX_LINE: usize = 11;

fn parse_line(line: &str) -> Result<Message, FrameError> {
    let bytes = hex_bytes(line).ok_or(FrameError::Malformed)?;
    if !(MIN_LINE..=MAX_LINE).contains(&bytes.len()) {
        return Err(FrameError::Size(bytes.len()));
    }
    let ecu = EcuId(bytes[2] as u32);
    let data = bytes[HEADER_LEN..bytes.len() - 1].to_vec();
    Ok(Message::new(ecu, data))
}

pub(super) fn parse<S: AsRef<str>>(lines: &[S]) -> Vec<Message> {
    lines
        .iter()
        .filter_map(|line| {
            let line = line.as_ref();
            parse_line(line).map_err(|e| log_drop(line, &e)).ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_checksum_stripped() {
        let msgs = parse(&["48 6B 10 41 0C 1A F8 5E"]);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].ecu, EcuId(0x10));
        assert_eq!(msgs[0].data, vec![0x41, 0x0C, 0x1A, 0xF8]);
    }

    #[test]
    fn test_one_message_per_line() {
        let msgs = parse(&[
            "48 6B 10 43 01 01 00 00 00 00 AA",
            "48 6B 18 43 00 00 00 00 00 00 BB",
            "48 6B",
        ]);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[1].ecu, EcuId(0x18));
        assert_eq!(msgs[0].data.len(), 7);
    }
}
