//! ISO-TP (ISO 15765-2) reassembly over adapter lines

use super::{hex_bytes, log_drop, EcuId, FrameError, Message};
use std::collections::HashMap;

const SINGLE_FRAME: u8 = 0x0;
const FIRST_FRAME: u8 = 0x1;
const CONSECUTIVE_FRAME: u8 = 0x2;
const FLOW_CONTROL: u8 = 0x3;

/// A CAN frame as printed by the adapter with headers on
#[derive(Debug, PartialEq, Eq)]
struct Frame {
    id: u32,
    payload: Vec<u8>,
}

/// Multi-frame message waiting for consecutive frames
struct Pending {
    total: usize,
    next_seq: u8,
    data: Vec<u8>,
}

fn split_frame(line: &str, id_bits: u8) -> Result<Frame, FrameError> {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    let id_len = if id_bits == 29 { 8 } else { 3 };
    if compact.len() <= id_len || !compact.is_char_boundary(id_len) {
        return Err(FrameError::Malformed);
    }
    let (id_hex, rest) = compact.split_at(id_len);
    let id = u32::from_str_radix(id_hex, 16).map_err(|_| FrameError::Malformed)?;
    let payload = hex_bytes(rest).ok_or(FrameError::Malformed)?;
    if payload.len() > 8 {
        return Err(FrameError::Size(payload.len()));
    }
    Ok(Frame { id, payload })
}

pub(super) fn parse<S: AsRef<str>>(lines: &[S], id_bits: u8) -> Vec<Message> {
    let mut pending: HashMap<u32, Pending> = HashMap::new();
    let mut messages = Vec::new();

    for line in lines {
        let line = line.as_ref();
        let result = split_frame(line, id_bits).and_then(|frame| {
            accept(frame, &mut pending).map(|done| {
                if let Some(message) = done {
                    messages.push(message);
                }
            })
        });
        if let Err(err) = result {
            log_drop(line, &err);
        }
    }

    for (id, p) in pending {
        log_drop(
            &format!("{:X}", id),
            &FrameError::Length {
                declared: p.total,
                available: p.data.len(),
            },
        );
    }

    messages
}

/// Feed one frame into the reassembly table; returns a message once one completes
fn accept(
    frame: Frame,
    pending: &mut HashMap<u32, Pending>,
) -> Result<Option<Message>, FrameError> {
    let Frame { id, payload } = frame;
    let pci = *payload.first().ok_or(FrameError::Size(0))?;

    match pci >> 4 {
        SINGLE_FRAME => {
            let len = (pci & 0x0F) as usize;
            let available = payload.len() - 1;
            if len == 0 || len > 7 || len > available {
                return Err(FrameError::Length {
                    declared: len,
                    available,
                });
            }
            Ok(Some(Message::new(EcuId(id), payload[1..=len].to_vec())))
        }
        FIRST_FRAME => {
            if payload.len() < 3 {
                return Err(FrameError::Size(payload.len()));
            }
            let total = (((pci & 0x0F) as usize) << 8) | payload[1] as usize;
            if total < 8 {
                return Err(FrameError::Length {
                    declared: total,
                    available: payload.len() - 2,
                });
            }
            // A new first frame restarts any sequence already open for this id
            pending.insert(
                id,
                Pending {
                    total,
                    next_seq: 1,
                    data: payload[2..].to_vec(),
                },
            );
            Ok(None)
        }
        CONSECUTIVE_FRAME => {
            let seq = pci & 0x0F;
            let entry = pending.get_mut(&id).ok_or(FrameError::Orphan)?;
            if seq != entry.next_seq {
                let expected = entry.next_seq;
                pending.remove(&id);
                return Err(FrameError::Sequence {
                    expected,
                    actual: seq,
                });
            }
            entry.data.extend_from_slice(&payload[1..]);
            entry.next_seq = (entry.next_seq + 1) & 0x0F;

            if entry.data.len() >= entry.total {
                if let Some(mut done) = pending.remove(&id) {
                    done.data.truncate(done.total);
                    return Ok(Some(Message::new(EcuId(id), done.data)));
                }
            }
            Ok(None)
        }
        FLOW_CONTROL => Err(FrameError::FlowControl),
        _ => Err(FrameError::Malformed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_frame_trimmed_to_declared_length() {
        let msgs = parse(&lines(&["7E8 04 41 0D 32 00 AA AA AA"]), 11);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].ecu, EcuId(0x7E8));
        assert_eq!(msgs[0].data, vec![0x41, 0x0D, 0x32, 0x00]);
    }

    #[test]
    fn test_single_frame_longer_than_line_is_dropped() {
        let msgs = parse(&lines(&["7E8 06 41 0D 32", "7E9 03 41 0D 10"]), 11);
        assert_eq!(msgs, vec![Message::new(EcuId(0x7E9), vec![0x41, 0x0D, 0x10])]);
    }

    #[test]
    fn test_multi_frame_vin() {
        let msgs = parse(
            &lines(&[
                "7E8 10 14 49 02 01 31 44 34",
                "7E8 21 47 50 30 30 52 35 35",
                "7E8 22 42 31 32 33 34 35 36",
            ]),
            11,
        );
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].data.len(), 0x14);
        assert_eq!(&msgs[0].data[..3], &[0x49, 0x02, 0x01]);
        assert_eq!(&msgs[0].data[3..], b"1D4GP00R55B123456");
    }

    #[test]
    fn test_wrong_sequence_drops_only_that_ecu() {
        let msgs = parse(
            &lines(&[
                "7E8 10 0A 43 04 01 01 02 02",
                "7E9 10 09 43 03 01 11 02 22",
                "7E8 22 03 03 04 04 00 00 00",
                "7E9 21 03 33 00 00 00 00 00",
            ]),
            11,
        );
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].ecu, EcuId(0x7E9));
        assert_eq!(
            msgs[0].data,
            vec![0x43, 0x03, 0x01, 0x11, 0x02, 0x22, 0x03, 0x33, 0x00]
        );
    }

    #[test]
    fn test_incomplete_sequence_is_not_emitted() {
        let msgs = parse(&lines(&["7E8 10 14 49 02 01 31 44 34"]), 11);
        assert!(msgs.is_empty());
    }

    #[test]
    fn test_29_bit_ids() {
        let msgs = parse(&lines(&["18 DA F1 10 03 41 0D 32"]), 29);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].ecu, EcuId(0x18DA_F110));
        assert_eq!(msgs[0].data, vec![0x41, 0x0D, 0x32]);
    }

    #[test]
    fn test_flow_control_and_garbage_ignored() {
        let msgs = parse(
            &lines(&["7E0 30 00 00", "SEARCHING...", "7E8 ZZ", "7E8 02 41 00"]),
            11,
        );
        assert_eq!(msgs, vec![Message::new(EcuId(0x7E8), vec![0x41, 0x00])]);
    }

    #[test]
    fn test_sequence_wraps_after_15() {
        // 6 + 15 * 7 + 7 bytes needs 16 consecutive frames: 21..2F then 20
        let total = 6 + 16 * 7;
        let mut raw = vec![format!(
            "7E8 1{:01X} {:02X} 00 00 00 00 00 00",
            total >> 8,
            total & 0xFF
        )];
        for i in 1..=16u8 {
            raw.push(format!("7E8 2{:01X} 01 01 01 01 01 01 01", i & 0x0F));
        }
        let msgs = parse(&raw, 11);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].data.len(), total);
    }

    proptest! {
        #[test]
        fn prop_garbage_never_blocks_valid_sibling(garbage in proptest::collection::vec(".{0,40}", 0..8)) {
            let mut raw = garbage.clone();
            raw.push("7E9 03 41 0D 32".to_string());
            let msgs = parse(&raw, 11);
            prop_assert!(msgs.contains(&Message::new(EcuId(0x7E9), vec![0x41, 0x0D, 0x32])));
        }

        #[test]
        fn prop_single_frame_length_matches(data in proptest::collection::vec(any::<u8>(), 1..=7)) {
            let mut line = format!("7E8 {:02X}", data.len());
            for b in &data {
                line.push_str(&format!(" {:02X}", b));
            }
            let msgs = parse(&[line], 11);
            prop_assert_eq!(msgs.len(), 1);
            prop_assert_eq!(&msgs[0].data, &data);
        }
    }
}
