//! Decoded sensor values.

use core::fmt;
use core::ops::RangeInclusive;

/// Relative humidity the DHT22 can report, in percent.
pub const HUMIDITY_RANGE: RangeInclusive<f32> = 0.0..=100.0;
/// Temperature the DHT22 can report, in degrees Celsius.
pub const TEMPERATURE_RANGE: RangeInclusive<f32> = -40.0..=80.0;

/// One validated humidity/temperature sample.
///
/// Only produced by a successful decode; there is no default or "last known"
/// reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub humidity_pct: f32,
    pub temperature_c: f32,
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T={:.1}°C H={:.1}%", self.temperature_c, self.humidity_pct)
    }
}
