//! Payload Decoding Rules
//!
//! Each command descriptor names one [`DecodeRule`]. Decoders receive the
//! payload with the mode byte and PID echo already stripped (monitor and DTC
//! rules get everything after the mode byte) and are pure functions of it.

use crate::dtc::{decode_code, decode_dtc, decode_status, DtcStatus, StatusReport, TroubleCode};
use crate::error::DecodeError;
use crate::uas;
use crate::units::{MeasurementResult, Unit};
use serde::{Deserialize, Serialize};

/// How a payload is turned into a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeRule {
    /// Supported-PID bitmap (32 flags, most significant bit first)
    Pid,
    /// Monitor status since codes cleared / this drive cycle
    Status,
    /// The code that stored the freeze frame
    SingleDtc,
    FuelStatus,
    /// A * 100 / 255
    Percent,
    /// (A * 256 + B) * 100 / 255
    AbsoluteLoad,
    /// A - 40 °C
    Temp,
    /// (A - 128) * 100 / 128
    PercentCentered,
    /// A * 3 kPa
    FuelPressure,
    /// A kPa
    Pressure,
    /// Standard unit-and-scaling id applied to the whole payload
    Uas(u8),
    /// A / 2 - 64 degrees
    TimingAdvance,
    AirStatus,
    O2Sensors,
    /// A / 200 V
    SensorVoltage,
    ObdCompliance,
    O2SensorsAlt,
    AuxInputStatus,
    /// (C * 256 + D) * 8 / 65535 V
    SensorVoltageBig,
    /// Signed (A * 256 + B) / 4 Pa
    EvapPressure,
    /// (C * 256 + D) / 256 - 128 mA
    CurrentCentered,
    /// A * 10 g/s
    MaxMaf,
    FuelType,
    /// (A * 256 + B) - 32767 Pa
    EvapPressureAlt,
    /// ((A * 256 + B) - 26880) / 128 degrees
    InjectTiming,
    /// (A * 256 + B) * 0.05 L/h
    FuelRate,
    /// On-board monitor test records (modes 05 and 06)
    Monitor,
    /// Trouble code list (modes 03, 07, 0A)
    Dtc(DtcStatus),
    /// Message count (mode 09)
    Count,
    /// Printable ASCII (VIN, calibration id)
    EncodedString,
    /// Calibration verification numbers, four bytes each
    Cvn,
    /// Payload returned unchanged
    Raw,
    /// No decoder
    None,
}

/// A single on-board monitor test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorTest {
    pub mid: u8,
    pub tid: u8,
    pub name: Option<&'static str>,
    pub value: MeasurementResult,
    pub min: MeasurementResult,
    pub max: MeasurementResult,
}

impl MonitorTest {
    pub fn passed(&self) -> bool {
        self.min.value <= self.value.value && self.value.value <= self.max.value
    }
}

/// Output of a decoder
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DecodeResult {
    Measurement(MeasurementResult),
    Status(StatusReport),
    TroubleCodes(Vec<TroubleCode>),
    Monitor(Vec<MonitorTest>),
    Text(String),
    Flags(Vec<bool>),
    Raw(Vec<u8>),
}

impl DecodeResult {
    pub fn measurement(&self) -> Option<MeasurementResult> {
        match self {
            DecodeResult::Measurement(m) => Some(*m),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            DecodeResult::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn trouble_codes(&self) -> Option<&[TroubleCode]> {
        match self {
            DecodeResult::TroubleCodes(c) => Some(c),
            _ => None,
        }
    }
}

const FUEL_STATUS: [(u8, &str); 5] = [
    (0x01, "Open loop due to insufficient engine temperature"),
    (0x02, "Closed loop, using oxygen sensor feedback to determine fuel mix"),
    (0x04, "Open loop due to engine load OR fuel cut due to deceleration"),
    (0x08, "Open loop due to system failure"),
    (0x10, "Closed loop, using at least one oxygen sensor but there is a fault in the feedback system"),
];

const AIR_STATUS: [(u8, &str); 4] = [
    (0x01, "Upstream"),
    (0x02, "Downstream of catalytic converter"),
    (0x04, "From the outside atmosphere or off"),
    (0x08, "Pump commanded on for diagnostics"),
];

const OBD_COMPLIANCE: [&str; 34] = [
    "",
    "OBD-II as defined by the CARB",
    "OBD as defined by the EPA",
    "OBD and OBD-II",
    "OBD-I",
    "Not OBD compliant",
    "EOBD (Europe)",
    "EOBD and OBD-II",
    "EOBD and OBD",
    "EOBD, OBD and OBD II",
    "JOBD (Japan)",
    "JOBD and OBD II",
    "JOBD and EOBD",
    "JOBD, EOBD, and OBD II",
    "",
    "",
    "",
    "Engine Manufacturer Diagnostics (EMD)",
    "Engine Manufacturer Diagnostics Enhanced (EMD+)",
    "Heavy Duty On-Board Diagnostics (Child/Partial) (HD OBD-C)",
    "Heavy Duty On-Board Diagnostics (HD OBD)",
    "World Wide Harmonized OBD (WWH OBD)",
    "",
    "Heavy Duty Euro OBD Stage I without NOx control (HD EOBD-I)",
    "Heavy Duty Euro OBD Stage I with NOx control (HD EOBD-I N)",
    "Heavy Duty Euro OBD Stage II without NOx control (HD EOBD-II)",
    "Heavy Duty Euro OBD Stage II with NOx control (HD EOBD-II N)",
    "",
    "Brazil OBD Phase 1 (OBDBr-1)",
    "Brazil OBD Phase 2 (OBDBr-2)",
    "Korean OBD (KOBD)",
    "India OBD I (IOBD I)",
    "India OBD II (IOBD II)",
    "Heavy Duty Euro OBD Stage VI (HD EOBD-IV)",
];

const FUEL_TYPES: [&str; 24] = [
    "Not available",
    "Gasoline",
    "Methanol",
    "Ethanol",
    "Diesel",
    "LPG",
    "CNG",
    "Propane",
    "Electric",
    "Bifuel running Gasoline",
    "Bifuel running Methanol",
    "Bifuel running Ethanol",
    "Bifuel running LPG",
    "Bifuel running CNG",
    "Bifuel running Propane",
    "Bifuel running Electricity",
    "Bifuel running electric and combustion engine",
    "Hybrid gasoline",
    "Hybrid Ethanol",
    "Hybrid Diesel",
    "Hybrid Electric",
    "Hybrid running electric and combustion engine",
    "Hybrid Regenerative",
    "Bifuel running diesel",
];

const TEST_NAMES: [&str; 12] = [
    "Rich to Lean Sensor Threshold Voltage",
    "Lean to Rich Sensor Threshold Voltage",
    "Low Sensor Voltage for Switch Time Calculation",
    "High Sensor Voltage for Switch Time Calculation",
    "Rich to Lean Sensor Switch Time",
    "Lean to Rich Sensor Switch Time",
    "Minimum Sensor Voltage for Test Cycle",
    "Maximum Sensor Voltage for Test Cycle",
    "Time between Sensor Transitions",
    "Sensor Period",
    "Average Misfire Counts for last ten driving cycles",
    "Misfire Counts for last/current driving cycles",
];

const MONITOR_RECORD: usize = 9;

fn word(hi: u8, lo: u8) -> u32 {
    (hi as u32) << 8 | lo as u32
}

fn bits_msb_first(bytes: &[u8]) -> Vec<bool> {
    bytes
        .iter()
        .flat_map(|b| (0..8).rev().map(move |i| b & (1 << i) != 0))
        .collect()
}

fn single_bit_lookup(
    rule: DecodeRule,
    table: &[(u8, &'static str)],
    value: u8,
) -> Result<&'static str, DecodeError> {
    table
        .iter()
        .find(|(bit, _)| *bit == value)
        .map(|(_, text)| *text)
        .ok_or(DecodeError::OutOfDomain {
            rule,
            value: value as u32,
        })
}

impl DecodeRule {
    /// Fewest payload bytes the rule can decode
    pub fn min_len(&self) -> usize {
        match self {
            DecodeRule::Pid | DecodeRule::Status | DecodeRule::SensorVoltageBig => 4,
            DecodeRule::CurrentCentered | DecodeRule::Cvn => 4,
            DecodeRule::SingleDtc
            | DecodeRule::AbsoluteLoad
            | DecodeRule::EvapPressure
            | DecodeRule::EvapPressureAlt
            | DecodeRule::InjectTiming
            | DecodeRule::FuelRate => 2,
            DecodeRule::Monitor
            | DecodeRule::Dtc(_)
            | DecodeRule::EncodedString
            | DecodeRule::Raw
            | DecodeRule::None => 0,
            _ => 1,
        }
    }

    /// Whether the rule yields a [`MeasurementResult`]
    pub fn is_measurement(&self) -> bool {
        matches!(
            self,
            DecodeRule::Percent
                | DecodeRule::AbsoluteLoad
                | DecodeRule::Temp
                | DecodeRule::PercentCentered
                | DecodeRule::FuelPressure
                | DecodeRule::Pressure
                | DecodeRule::Uas(_)
                | DecodeRule::TimingAdvance
                | DecodeRule::SensorVoltage
                | DecodeRule::SensorVoltageBig
                | DecodeRule::EvapPressure
                | DecodeRule::CurrentCentered
                | DecodeRule::MaxMaf
                | DecodeRule::EvapPressureAlt
                | DecodeRule::InjectTiming
                | DecodeRule::FuelRate
                | DecodeRule::Count
        )
    }

    /// Decode a payload
    pub fn decode(&self, data: &[u8]) -> Result<DecodeResult, DecodeError> {
        let need = self.min_len();
        if data.len() < need {
            return Err(DecodeError::PayloadTooShort {
                expected: need,
                actual: data.len(),
            });
        }
        let m = |value: f64, unit: Unit| -> Result<DecodeResult, DecodeError> {
            Ok(DecodeResult::Measurement(MeasurementResult::new(value, unit)))
        };

        match *self {
            DecodeRule::Percent => m(data[0] as f64 * 100.0 / 255.0, Unit::Percent),
            DecodeRule::AbsoluteLoad => {
                m(word(data[0], data[1]) as f64 * 100.0 / 255.0, Unit::Percent)
            }
            DecodeRule::Temp => m(data[0] as f64 - 40.0, Unit::Celsius),
            DecodeRule::PercentCentered => m((data[0] as f64 - 128.0) * 100.0 / 128.0, Unit::Percent),
            DecodeRule::FuelPressure => m(data[0] as f64 * 3.0, Unit::Kilopascals),
            DecodeRule::Pressure => m(data[0] as f64, Unit::Kilopascals),
            DecodeRule::TimingAdvance => m(data[0] as f64 / 2.0 - 64.0, Unit::Degrees),
            DecodeRule::SensorVoltage => m(data[0] as f64 / 200.0, Unit::Volts),
            DecodeRule::SensorVoltageBig => {
                m(word(data[2], data[3]) as f64 * 8.0 / 65535.0, Unit::Volts)
            }
            DecodeRule::EvapPressure => {
                let raw = word(data[0], data[1]) as u16 as i16;
                m(raw as f64 / 4.0, Unit::Pascals)
            }
            DecodeRule::EvapPressureAlt => m(word(data[0], data[1]) as f64 - 32767.0, Unit::Pascals),
            DecodeRule::CurrentCentered => {
                m(word(data[2], data[3]) as f64 / 256.0 - 128.0, Unit::Milliamps)
            }
            DecodeRule::MaxMaf => m(data[0] as f64 * 10.0, Unit::GramsPerSecond),
            DecodeRule::InjectTiming => {
                m((word(data[0], data[1]) as f64 - 26880.0) / 128.0, Unit::Degrees)
            }
            DecodeRule::FuelRate => m(word(data[0], data[1]) as f64 * 0.05, Unit::LitersPerHour),
            DecodeRule::Count => m(data[0] as f64, Unit::Count),
            DecodeRule::Uas(id) => {
                let scaling = uas::lookup(id).ok_or(DecodeError::UnknownUas(id))?;
                Ok(DecodeResult::Measurement(scaling.apply(data)))
            }

            DecodeRule::Pid => Ok(DecodeResult::Flags(bits_msb_first(&data[..4]))),
            DecodeRule::O2Sensors | DecodeRule::O2SensorsAlt => {
                Ok(DecodeResult::Flags(bits_msb_first(&data[..1]).into_iter().rev().collect()))
            }
            DecodeRule::AuxInputStatus => Ok(DecodeResult::Flags(vec![data[0] & 0x01 != 0])),
            DecodeRule::Status => Ok(DecodeResult::Status(decode_status(&[
                data[0], data[1], data[2], data[3],
            ]))),

            DecodeRule::FuelStatus => {
                let mut text = single_bit_lookup(*self, &FUEL_STATUS, data[0])?.to_string();
                if let Some(second) = data.get(1).filter(|b| **b != 0) {
                    if let Ok(s) = single_bit_lookup(*self, &FUEL_STATUS, *second) {
                        text.push_str("; ");
                        text.push_str(s);
                    }
                }
                Ok(DecodeResult::Text(text))
            }
            DecodeRule::AirStatus => {
                single_bit_lookup(*self, &AIR_STATUS, data[0]).map(|s| DecodeResult::Text(s.into()))
            }
            DecodeRule::ObdCompliance => OBD_COMPLIANCE
                .get(data[0] as usize)
                .filter(|s| !s.is_empty())
                .map(|s| DecodeResult::Text((*s).into()))
                .ok_or(DecodeError::OutOfDomain {
                    rule: *self,
                    value: data[0] as u32,
                }),
            DecodeRule::FuelType => FUEL_TYPES
                .get(data[0] as usize)
                .map(|s| DecodeResult::Text((*s).into()))
                .ok_or(DecodeError::OutOfDomain {
                    rule: *self,
                    value: data[0] as u32,
                }),

            DecodeRule::SingleDtc => Ok(DecodeResult::TroubleCodes(
                decode_code(data[0], data[1])
                    .map(|code| TroubleCode {
                        code,
                        status: DtcStatus::Confirmed,
                    })
                    .into_iter()
                    .collect(),
            )),
            DecodeRule::Dtc(status) => Ok(DecodeResult::TroubleCodes(decode_dtc(data, status))),
            DecodeRule::Monitor => decode_monitor(data).map(DecodeResult::Monitor),

            DecodeRule::EncodedString => Ok(DecodeResult::Text(
                data.iter()
                    .filter(|b| b.is_ascii_graphic() || **b == b' ')
                    .map(|b| *b as char)
                    .collect::<String>()
                    .trim()
                    .to_string(),
            )),
            DecodeRule::Cvn => {
                // CAN replies carry a leading item count
                let body = if data.len() % 4 == 1 { &data[1..] } else { data };
                let cvns: Vec<String> = body
                    .chunks_exact(4)
                    .map(|c| c.iter().map(|b| format!("{:02X}", b)).collect())
                    .collect();
                Ok(DecodeResult::Text(cvns.join(" ")))
            }
            DecodeRule::Raw => Ok(DecodeResult::Raw(data.to_vec())),
            DecodeRule::None => Err(DecodeError::UnsupportedRule(*self)),
        }
    }

    /// Decode and require a numeric value
    pub fn decode_measurement(&self, data: &[u8]) -> Result<MeasurementResult, DecodeError> {
        self.decode(data)?
            .measurement()
            .ok_or(DecodeError::NotAMeasurement(*self))
    }
}

fn decode_monitor(data: &[u8]) -> Result<Vec<MonitorTest>, DecodeError> {
    data.chunks_exact(MONITOR_RECORD)
        .map(|rec| -> Result<MonitorTest, DecodeError> {
            let uas_id = rec[2];
            let scaling = uas::lookup(uas_id).ok_or(DecodeError::UnknownUas(uas_id))?;
            Ok(MonitorTest {
                mid: rec[0],
                tid: rec[1],
                name: TEST_NAMES.get((rec[1] as usize).wrapping_sub(1)).copied(),
                value: scaling.apply(&rec[3..5]),
                min: scaling.apply(&rec[5..7]),
                max: scaling.apply(&rec[7..9]),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(rule: DecodeRule, data: &[u8]) -> f64 {
        rule.decode_measurement(data).unwrap().value
    }

    #[test]
    fn test_single_byte_formulas() {
        assert!((value(DecodeRule::Percent, &[0xFF]) - 100.0).abs() < 0.01);
        assert!((value(DecodeRule::Temp, &[0x7B]) - 83.0).abs() < 0.01);
        assert!((value(DecodeRule::PercentCentered, &[0x80]) - 0.0).abs() < 0.01);
        assert!((value(DecodeRule::TimingAdvance, &[0x80]) - 0.0).abs() < 0.01);
        assert!((value(DecodeRule::FuelPressure, &[0x10]) - 48.0).abs() < 0.01);
        assert!((value(DecodeRule::SensorVoltage, &[0xC8, 0xFF]) - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_speed_and_rpm() {
        let speed = DecodeRule::Uas(0x09).decode_measurement(&[0x32]).unwrap();
        assert_eq!(speed, MeasurementResult::new(50.0, Unit::KilometersPerHour));
        assert!((value(DecodeRule::Uas(0x07), &[0x1A, 0xF8]) - 1726.0).abs() < 0.01);
    }

    #[test]
    fn test_two_byte_formulas() {
        assert!((value(DecodeRule::EvapPressure, &[0xFF, 0xFC]) + 1.0).abs() < 1e-9);
        assert!((value(DecodeRule::FuelRate, &[0x00, 0x64]) - 5.0).abs() < 1e-9);
        assert!((value(DecodeRule::InjectTiming, &[0x69, 0x00]) - 0.0).abs() < 1e-9);
        assert!((value(DecodeRule::CurrentCentered, &[0, 0, 0x80, 0x00]) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_payload_too_short() {
        assert_eq!(
            DecodeRule::Status.decode(&[0x00, 0x00]),
            Err(DecodeError::PayloadTooShort {
                expected: 4,
                actual: 2
            })
        );
        assert!(matches!(
            DecodeRule::Percent.decode(&[]),
            Err(DecodeError::PayloadTooShort { .. })
        ));
    }

    #[test]
    fn test_fuel_type_out_of_domain() {
        assert_eq!(
            DecodeRule::FuelType.decode(&[0x04]).unwrap().text(),
            Some("Diesel")
        );
        assert_eq!(
            DecodeRule::FuelType.decode(&[0x40]),
            Err(DecodeError::OutOfDomain {
                rule: DecodeRule::FuelType,
                value: 0x40
            })
        );
    }

    #[test]
    fn test_fuel_status_requires_single_bit() {
        let closed = DecodeRule::FuelStatus.decode(&[0x02, 0x00]).unwrap();
        assert!(closed.text().unwrap().starts_with("Closed loop"));
        assert!(DecodeRule::FuelStatus.decode(&[0x03, 0x00]).is_err());
    }

    #[test]
    fn test_supported_bitmap() {
        let flags = match DecodeRule::Pid.decode(&[0xBE, 0x1F, 0xA8, 0x13]).unwrap() {
            DecodeResult::Flags(f) => f,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(flags.len(), 32);
        assert!(flags[0]);
        assert!(!flags[1]);
        assert!(flags[31]);
    }

    #[test]
    fn test_vin_string() {
        let mut data = vec![0x01];
        data.extend_from_slice(b"1D4GP00R55B123456");
        let vin = DecodeRule::EncodedString.decode(&data).unwrap();
        assert_eq!(vin.text(), Some("1D4GP00R55B123456"));
    }

    #[test]
    fn test_monitor_records() {
        // MID 01, TID 01, UAS 0x0A (0.122 mV), value 1000 within [0, 2000]
        let data = [0x01, 0x01, 0x0A, 0x03, 0xE8, 0x00, 0x00, 0x07, 0xD0, 0xAA];
        let tests = match DecodeRule::Monitor.decode(&data).unwrap() {
            DecodeResult::Monitor(t) => t,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].name, Some("Rich to Lean Sensor Threshold Voltage"));
        assert!((tests[0].value.value - 122.0).abs() < 0.01);
        assert!(tests[0].passed());
    }

    #[test]
    fn test_not_a_measurement() {
        assert_eq!(
            DecodeRule::Status.decode_measurement(&[0, 0, 0, 0]),
            Err(DecodeError::NotAMeasurement(DecodeRule::Status))
        );
        assert_eq!(
            DecodeRule::None.decode(&[1]),
            Err(DecodeError::UnsupportedRule(DecodeRule::None))
        );
    }

    #[test]
    fn test_decode_is_idempotent() {
        let payload = [0x1A, 0xF8];
        let first = DecodeRule::Uas(0x07).decode(&payload).unwrap();
        let second = DecodeRule::Uas(0x07).decode(&payload).unwrap();
        assert_eq!(first, second);
        let (a, b) = (first.measurement().unwrap(), second.measurement().unwrap());
        assert_eq!(a.value.to_bits(), b.value.to_bits());
    }
}
