//! Multi-PID Requests
//!
//! Several mode 01 PIDs can share one request (`"010C0D11"`). The response is
//! one concatenated stream in request order: echo byte, data bytes, next echo...

use crate::error::DecodeError;
use crate::pid::Command;
use crate::units::MeasurementResult;
use tracing::trace;

/// Most PIDs combined into one physical request
pub const MAX_PIDS_PER_REQUEST: usize = 6;

/// Outcome for one PID of a batch
pub type BatchItem = (Command, Result<MeasurementResult, DecodeError>);

/// Split a request list into physical requests
pub fn chunk(commands: &[Command]) -> std::slice::Chunks<'_, Command> {
    commands.chunks(MAX_PIDS_PER_REQUEST)
}

/// Combined request text: mode of the first command followed by every PID
pub fn build_request(commands: &[Command]) -> Option<String> {
    let mode = commands.first()?.mode()?;
    let mut text = format!("{:02X}", mode);
    for cmd in commands {
        text.push_str(cmd.pid_hex());
    }
    Some(text)
}

/// Walk a batched payload (mode byte already removed) in request order.
///
/// Each PID consumes its declared width. A PID whose width would overrun the
/// remaining bytes is left out of the result without affecting the others.
pub fn extract(data: &[u8], commands: &[Command]) -> Vec<BatchItem> {
    let mut rest = data;
    let mut results = Vec::with_capacity(commands.len());

    for cmd in commands {
        let width = cmd.bytes;
        if width == 0 || width > rest.len() {
            trace!(
                "Skipping {}: needs {} bytes, {} left",
                cmd.text,
                width,
                rest.len()
            );
            continue;
        }
        let (field, tail) = rest.split_at(width);
        rest = tail;

        let expected = cmd.pid().unwrap_or_default();
        let result = if field[0] != expected {
            Err(DecodeError::PidMismatch {
                expected,
                actual: field[0],
            })
        } else {
            cmd.rule.decode_measurement(&field[1..])
        };
        results.push((cmd.clone(), result));
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{COOLANT_TEMP, ENGINE_LOAD, FUEL_TYPE, MAF, RPM, SPEED, STATUS, THROTTLE_POS};

    fn value_of(items: &[BatchItem], cmd: &Command) -> f64 {
        items
            .iter()
            .find(|(c, _)| c == cmd)
            .and_then(|(_, r)| r.as_ref().ok())
            .map(|m| m.value)
            .unwrap()
    }

    #[test]
    fn test_request_text() {
        let cmds = [RPM, SPEED, THROTTLE_POS];
        assert_eq!(build_request(&cmds).as_deref(), Some("010C0D11"));
        assert_eq!(build_request(&[]), None);
    }

    #[test]
    fn test_chunk_boundary() {
        let six = [RPM, SPEED, THROTTLE_POS, COOLANT_TEMP, ENGINE_LOAD, MAF];
        assert_eq!(chunk(&six).count(), 1);

        let seven = [RPM, SPEED, THROTTLE_POS, COOLANT_TEMP, ENGINE_LOAD, MAF, STATUS];
        let chunks: Vec<_> = chunk(&seven).collect();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1], &[STATUS]);
        assert_eq!(build_request(chunks[0]).as_deref(), Some("010C0D11050410"));
    }

    #[test]
    fn test_order_follows_request() {
        let forward = extract(&[0x0C, 0x1A, 0xF8, 0x0D, 0x32], &[RPM, SPEED]);
        let reverse = extract(&[0x0D, 0x32, 0x0C, 0x1A, 0xF8], &[SPEED, RPM]);
        for items in [&forward, &reverse] {
            assert_eq!(items.len(), 2);
            assert!((value_of(items, &RPM) - 1726.0).abs() < 0.01);
            assert!((value_of(items, &SPEED) - 50.0).abs() < 0.01);
        }
    }

    #[test]
    fn test_overrun_is_skipped() {
        // RPM is cut short; speed before it still decodes
        let items = extract(&[0x0D, 0x32, 0x0C, 0x1A], &[SPEED, RPM]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].0, SPEED);
    }

    #[test]
    fn test_per_pid_errors_do_not_spread() {
        let items = extract(&[0x51, 0x40, 0x0D, 0x32], &[FUEL_TYPE, SPEED]);
        assert_eq!(items.len(), 2);
        assert!(items[0].1.is_err());
        assert!((value_of(&items, &SPEED) - 50.0).abs() < 0.01);
    }

    #[test]
    fn test_echo_mismatch() {
        let items = extract(&[0x0D, 0x32], &[THROTTLE_POS]);
        assert_eq!(
            items[0].1,
            Err(DecodeError::PidMismatch {
                expected: 0x11,
                actual: 0x0D
            })
        );
    }
}
