//! Capability surface of the single data line a sensor transaction runs on.
//!
//! The decoder only ever talks to the line through [`SensorLine`], so any
//! platform GPIO (or a simulated waveform in tests) can back it. Microsecond
//! waits come from a separate [`embedded_hal::delay::DelayNs`].

use core::fmt;

/// Logic level seen on, or driven onto, the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => f.write_str("LOW"),
            Level::High => f.write_str("HIGH"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Output,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    PullUp,
    Floating,
}

/// A bidirectional digital line owned by one transaction at a time.
///
/// Exclusive access is expressed by `&mut self`: nothing else can drive the
/// line while a read borrows it.
pub trait SensorLine {
    type Error: fmt::Debug;

    fn set_direction(&mut self, direction: Direction) -> Result<(), Self::Error>;

    fn set_level(&mut self, level: Level) -> Result<(), Self::Error>;

    fn read_level(&mut self) -> Result<Level, Self::Error>;

    fn set_bias(&mut self, bias: Bias) -> Result<(), Self::Error>;
}

impl<T: SensorLine + ?Sized> SensorLine for &mut T {
    type Error = T::Error;

    fn set_direction(&mut self, direction: Direction) -> Result<(), Self::Error> {
        (**self).set_direction(direction)
    }

    fn set_level(&mut self, level: Level) -> Result<(), Self::Error> {
        (**self).set_level(level)
    }

    fn read_level(&mut self) -> Result<Level, Self::Error> {
        (**self).read_level()
    }

    fn set_bias(&mut self, bias: Bias) -> Result<(), Self::Error> {
        (**self).set_bias(bias)
    }
}
