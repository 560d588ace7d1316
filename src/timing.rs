//! Pulse timing for the DHT22 single-wire protocol.
//!
//! Durations on the wire are measured in polling units: one unit is one read
//! of the line followed by a 1 µs wait, so a unit is roughly a microsecond
//! plus the cost of the GPIO read.

use embedded_hal::delay::DelayNs;

use crate::line::{Level, SensorLine};

/// Polling units a single edge wait may spend before giving up.
pub const EDGE_TIMEOUT_UNITS: u32 = 8_000;

/// High pulses strictly longer than this many units decode as a `1` bit.
///
/// A `0` is ~26-28 µs high and a `1` is ~70 µs, so 50 sits between them. It
/// is a heuristic midpoint rather than a datasheet value.
pub const BIT_THRESHOLD_UNITS: u32 = 50;

/// Timing constants for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Line held high (as output) before the start pulse, in ms.
    pub quiescence_ms: u32,
    /// Host start pulse: line pulled low for this long (18-20 ms window).
    pub start_low_us: u32,
    /// Host releases the line high for this long before listening (20-40 µs).
    pub release_us: u32,
    pub edge_timeout: u32,
    pub bit_threshold: u32,
}

impl Timing {
    pub const fn new() -> Self {
        Self {
            quiescence_ms: 100,
            start_low_us: 20_000,
            release_us: 40,
            edge_timeout: EDGE_TIMEOUT_UNITS,
            bit_threshold: BIT_THRESHOLD_UNITS,
        }
    }

    /// Upper bound, in polling units, of the masked window after the start
    /// pulse: three handshake waits plus two waits per bit.
    pub fn worst_case_units(&self) -> u64 {
        let waits = 3 + 2 * crate::frame::FRAME_BITS as u64;
        waits * (u64::from(self.edge_timeout) + 1)
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::new()
    }
}

/// Poll `line` until it reads `level`, waiting 1 µs between reads.
///
/// Returns `Ok(Some(units))` with the number of units spent waiting, or
/// `Ok(None)` when `budget` units elapse without seeing the level.
pub fn wait_for_level<L, D>(
    line: &mut L,
    delay: &mut D,
    level: Level,
    budget: u32,
) -> Result<Option<u32>, L::Error>
where
    L: SensorLine,
    D: DelayNs,
{
    let mut units = 0u32;
    loop {
        if line.read_level()? == level {
            return Ok(Some(units));
        }
        if units >= budget {
            return Ok(None);
        }
        delay.delay_us(1);
        units += 1;
    }
}

/// Classify a measured high-pulse width. Exactly `threshold` is a `0`.
pub fn classify_pulse(units: u32, threshold: u32) -> bool {
    units > threshold
}
