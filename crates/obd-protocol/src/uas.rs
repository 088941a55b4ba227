//! Standard Unit And Scaling identifiers (SAE J1979 appendix)

use crate::units::{MeasurementResult, Unit};

/// Scale, offset and signedness for one UAS id
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uas {
    pub signed: bool,
    pub scale: f64,
    pub unit: Unit,
    pub offset: f64,
}

impl Uas {
    const fn unsigned(scale: f64, unit: Unit) -> Self {
        Self {
            signed: false,
            scale,
            unit,
            offset: 0.0,
        }
    }

    const fn signed(scale: f64, unit: Unit) -> Self {
        Self {
            signed: true,
            scale,
            unit,
            offset: 0.0,
        }
    }

    const fn with_offset(self, offset: f64) -> Self {
        Self { offset, ..self }
    }

    /// Interpret `bytes` as one big-endian integer and scale it
    pub fn apply(&self, bytes: &[u8]) -> MeasurementResult {
        let raw = bytes.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64);
        let bits = (bytes.len() * 8).min(64) as u32;
        let value = if self.signed && bits > 0 && bits < 64 && raw & (1 << (bits - 1)) != 0 {
            raw as i64 - (1i64 << bits)
        } else {
            raw as i64
        };
        MeasurementResult::new(value as f64 * self.scale + self.offset, self.unit)
    }
}

/// Look up a UAS id
pub fn lookup(id: u8) -> Option<Uas> {
    use Unit::*;
    let uas = match id {
        0x01 => Uas::unsigned(1.0, Count),
        0x02 => Uas::unsigned(0.1, Count),
        0x03 => Uas::unsigned(0.01, Count),
        0x04 => Uas::unsigned(0.001, Count),
        0x05 => Uas::unsigned(0.000_030_5, Count),
        0x06 => Uas::unsigned(0.000_305, Count),
        0x07 => Uas::unsigned(0.25, Rpm),
        0x08 => Uas::unsigned(0.01, KilometersPerHour),
        0x09 => Uas::unsigned(1.0, KilometersPerHour),
        0x0A => Uas::unsigned(0.122, Millivolts),
        0x0B => Uas::unsigned(0.001, Volts),
        0x0C => Uas::unsigned(0.01, Volts),
        0x0D => Uas::unsigned(0.003_906_25, Milliamps),
        0x0E => Uas::unsigned(0.001, Amps),
        0x0F => Uas::unsigned(0.01, Amps),
        0x10 => Uas::unsigned(1.0, Milliseconds),
        0x11 => Uas::unsigned(100.0, Milliseconds),
        0x12 => Uas::unsigned(1.0, Seconds),
        0x13 => Uas::unsigned(1.0, Milliohms),
        0x14 => Uas::unsigned(1.0, Ohms),
        0x15 => Uas::unsigned(1.0, Kiloohms),
        0x16 => Uas::unsigned(0.1, Celsius).with_offset(-40.0),
        0x17 => Uas::unsigned(0.01, Kilopascals),
        0x18 => Uas::unsigned(0.0117, Kilopascals),
        0x19 => Uas::unsigned(0.079, Kilopascals),
        0x1A => Uas::unsigned(1.0, Kilopascals),
        0x1B => Uas::unsigned(10.0, Kilopascals),
        0x1C => Uas::unsigned(0.01, Degrees),
        0x1D => Uas::unsigned(0.5, Degrees),
        0x1E => Uas::unsigned(0.000_030_5, Ratio),
        0x1F => Uas::unsigned(0.05, Ratio),
        0x20 => Uas::unsigned(0.003_906_25, Ratio),
        0x21 => Uas::unsigned(1.0, Millihertz),
        0x22 => Uas::unsigned(1.0, Hertz),
        0x23 => Uas::unsigned(1.0, Kilohertz),
        0x24 => Uas::unsigned(1.0, Count),
        0x25 => Uas::unsigned(1.0, Kilometers),
        0x27 => Uas::unsigned(0.01, GramsPerSecond),
        0x28 => Uas::unsigned(1.0, GramsPerSecond),
        0x2B => Uas::unsigned(1.0, Count),
        0x2C => Uas::unsigned(0.01, Grams),
        0x2D => Uas::unsigned(0.01, Milligrams),
        0x2F => Uas::unsigned(0.01, Percent),
        0x30 => Uas::unsigned(0.001_526, Percent),
        0x31 => Uas::unsigned(0.001, Liters),
        0x33 => Uas::unsigned(0.000_244_14, Ratio),
        0x34 => Uas::unsigned(1.0, Minutes),
        0x35 => Uas::unsigned(10.0, Milliseconds),
        0x36 => Uas::unsigned(0.01, Grams),
        0x37 => Uas::unsigned(0.1, Grams),
        0x38 => Uas::unsigned(1.0, Grams),
        0x39 => Uas::unsigned(0.01, Percent).with_offset(-327.68),
        0x3A => Uas::unsigned(0.001, Grams),
        0x3B => Uas::unsigned(0.0001, Grams),
        0x3D => Uas::unsigned(0.01, Milliamps),
        0x3F => Uas::unsigned(0.01, Liters),
        0x40 => Uas::unsigned(1.0, Ppm),
        0x41 => Uas::unsigned(0.01, Microamps),

        0x81 => Uas::signed(1.0, Count),
        0x82 => Uas::signed(0.1, Count),
        0x83 => Uas::signed(0.01, Count),
        0x84 => Uas::signed(0.001, Count),
        0x85 => Uas::signed(0.000_030_5, Count),
        0x86 => Uas::signed(0.000_305, Count),
        0x87 => Uas::signed(1.0, Ppm),
        0x8A => Uas::signed(0.122, Millivolts),
        0x8B => Uas::signed(0.001, Volts),
        0x8C => Uas::signed(0.01, Volts),
        0x8D => Uas::signed(0.003_906_25, Milliamps),
        0x8E => Uas::signed(0.001, Amps),
        0x90 => Uas::signed(1.0, Milliseconds),
        0x96 => Uas::signed(0.1, Celsius),
        0x99 => Uas::signed(0.1, Kilopascals),
        0x9C => Uas::signed(0.01, Degrees),
        0x9D => Uas::signed(0.5, Degrees),
        0xA8 => Uas::signed(1.0, GramsPerSecond),
        0xAD => Uas::signed(0.01, Milligrams),
        0xAE => Uas::signed(0.1, Milligrams),
        0xAF => Uas::signed(0.01, Percent),
        0xB0 => Uas::signed(0.003_052, Percent),
        0xFC => Uas::signed(0.01, Kilopascals),
        0xFD => Uas::signed(0.001, Kilopascals),
        0xFE => Uas::signed(0.25, Pascals),
        _ => return None,
    };
    Some(uas)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpm_scaling() {
        let m = lookup(0x07).unwrap().apply(&[0x1A, 0xF8]);
        assert_eq!(m.unit, Unit::Rpm);
        assert!((m.value - 1726.0).abs() < 0.01);
    }

    #[test]
    fn test_catalyst_temp_offset() {
        // 0x1194 = 4500 -> 450.0 - 40
        let m = lookup(0x16).unwrap().apply(&[0x11, 0x94]);
        assert!((m.value - 410.0).abs() < 0.01);
    }

    #[test]
    fn test_signed_two_complement() {
        let m = lookup(0x81).unwrap().apply(&[0xFF, 0xFE]);
        assert!((m.value + 2.0).abs() < 1e-9);
        let m = lookup(0x81).unwrap().apply(&[0x7F, 0xFF]);
        assert!((m.value - 32767.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_id() {
        assert!(lookup(0x00).is_none());
        assert!(lookup(0xFF).is_none());
    }
}
