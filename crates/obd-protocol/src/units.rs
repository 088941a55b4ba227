//! Measurement values and their units

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit system used when presenting measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

/// Symbolic unit tag attached to every measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    /// Dimensionless count or ratio without a symbol
    Count,
    Ratio,
    Percent,
    Rpm,
    KilometersPerHour,
    MilesPerHour,
    Kilometers,
    Miles,
    Celsius,
    Fahrenheit,
    Kilopascals,
    Pascals,
    Psi,
    Volts,
    Millivolts,
    Amps,
    Milliamps,
    Microamps,
    Ohms,
    Milliohms,
    Kiloohms,
    Seconds,
    Milliseconds,
    Minutes,
    Degrees,
    Hertz,
    Millihertz,
    Kilohertz,
    GramsPerSecond,
    PoundsPerMinute,
    Grams,
    Milligrams,
    LitersPerHour,
    GallonsPerHour,
    Liters,
    Ppm,
}

impl Unit {
    /// Display symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Count | Unit::Ratio => "",
            Unit::Percent => "%",
            Unit::Rpm => "rpm",
            Unit::KilometersPerHour => "km/h",
            Unit::MilesPerHour => "mph",
            Unit::Kilometers => "km",
            Unit::Miles => "mi",
            Unit::Celsius => "°C",
            Unit::Fahrenheit => "°F",
            Unit::Kilopascals => "kPa",
            Unit::Pascals => "Pa",
            Unit::Psi => "psi",
            Unit::Volts => "V",
            Unit::Millivolts => "mV",
            Unit::Amps => "A",
            Unit::Milliamps => "mA",
            Unit::Microamps => "µA",
            Unit::Ohms => "Ω",
            Unit::Milliohms => "mΩ",
            Unit::Kiloohms => "kΩ",
            Unit::Seconds => "s",
            Unit::Milliseconds => "ms",
            Unit::Minutes => "min",
            Unit::Degrees => "°",
            Unit::Hertz => "Hz",
            Unit::Millihertz => "mHz",
            Unit::Kilohertz => "kHz",
            Unit::GramsPerSecond => "g/s",
            Unit::PoundsPerMinute => "lb/min",
            Unit::Grams => "g",
            Unit::Milligrams => "mg",
            Unit::LitersPerHour => "L/h",
            Unit::GallonsPerHour => "gal/h",
            Unit::Liters => "L",
            Unit::Ppm => "ppm",
        }
    }
}

/// A decoded numeric value. Never mutated after construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementResult {
    pub value: f64,
    pub unit: Unit,
}

impl MeasurementResult {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// Convert to the imperial equivalent; units without one are returned unchanged
    pub fn to_imperial(&self) -> Self {
        let (value, unit) = match self.unit {
            Unit::Celsius => (self.value * 9.0 / 5.0 + 32.0, Unit::Fahrenheit),
            Unit::KilometersPerHour => (self.value * 0.621_371, Unit::MilesPerHour),
            Unit::Kilometers => (self.value * 0.621_371, Unit::Miles),
            Unit::Kilopascals => (self.value * 0.145_038, Unit::Psi),
            Unit::GramsPerSecond => (self.value * 0.132_277, Unit::PoundsPerMinute),
            Unit::LitersPerHour => (self.value * 0.264_172, Unit::GallonsPerHour),
            _ => return *self,
        };
        Self { value, unit }
    }

    /// Present in the requested unit system
    pub fn in_system(&self, system: UnitSystem) -> Self {
        match system {
            UnitSystem::Metric => *self,
            UnitSystem::Imperial => self.to_imperial(),
        }
    }
}

impl fmt::Display for MeasurementResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit.symbol() {
            "" => write!(f, "{}", self.value),
            symbol => write!(f, "{} {}", self.value, symbol),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_celsius_to_fahrenheit() {
        let m = MeasurementResult::new(100.0, Unit::Celsius).to_imperial();
        assert_eq!(m.unit, Unit::Fahrenheit);
        assert!((m.value - 212.0).abs() < 1e-9);
    }

    #[test]
    fn test_rpm_has_no_imperial_form() {
        let m = MeasurementResult::new(1500.0, Unit::Rpm);
        assert_eq!(m.in_system(UnitSystem::Imperial), m);
    }

    #[test]
    fn test_display() {
        assert_eq!(MeasurementResult::new(50.0, Unit::KilometersPerHour).to_string(), "50 km/h");
        assert_eq!(MeasurementResult::new(3.0, Unit::Count).to_string(), "3");
    }
}
