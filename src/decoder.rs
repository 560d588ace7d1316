//! DHT22 / AM2302 single-wire decoder.
//!
//! One call to [`Dht22Decoder::read`] runs one complete transaction:
//!
//! ```text
//! Idle -> StartPulse -> AckWaitLow -> AckWaitHigh -> FrameWaitLow
//!      -> {BitWaitHigh -> BitMeasureHigh} x 40 -> ChecksumCheck -> RangeCheck
//!      -> Ok(Reading) | Err(DecodeError)
//! ```
//!
//! Everything from the start pulse to the last data bit runs with interrupts
//! masked through an [`InterruptMask`]: scheduler jitter of a few hundred
//! microseconds is enough to misclassify bits. The mask is closure-scoped, so
//! it is lifted on every exit path, and the decoder keeps no state between
//! calls.
//!
//! Inside the window only `delay_us` is used. `delay_ms` is called once, for
//! the quiescence hold before the window opens, so a delay whose millisecond
//! wait yields to the scheduler is fine.

use core::fmt;

use embedded_hal::delay::DelayNs;
use log::{debug, warn};

use crate::error::DecodeError;
use crate::frame::{Frame, FRAME_BITS, FRAME_BYTES};
use crate::line::{Bias, Direction, Level, SensorLine};
use crate::mask::{CriticalSectionMask, InterruptMask};
use crate::reading::Reading;
use crate::timing::{classify_pulse, wait_for_level, Timing};

/// Transaction phases. Failures record the phase they happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    StartPulse,
    AckWaitLow,
    AckWaitHigh,
    FrameWaitLow,
    BitWaitHigh,
    BitMeasureHigh,
    ChecksumCheck,
    RangeCheck,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::StartPulse => "start pulse",
            Phase::AckWaitLow => "response low",
            Phase::AckWaitHigh => "response high",
            Phase::FrameWaitLow => "data preamble",
            Phase::BitWaitHigh => "bit high",
            Phase::BitMeasureHigh => "bit low",
            Phase::ChecksumCheck => "checksum",
            Phase::RangeCheck => "range",
        };
        f.write_str(name)
    }
}

/// Stateless decoder, parameterized only by its timing constants.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dht22Decoder {
    timing: Timing,
}

impl Dht22Decoder {
    pub const fn new() -> Self {
        Self {
            timing: Timing::new(),
        }
    }

    pub const fn with_timing(timing: Timing) -> Self {
        Self { timing }
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Run one transaction on `line` and return a validated reading, masking
    /// through the global `critical-section` implementation.
    ///
    /// The caller must leave the line idle (pulled high) between calls and
    /// not call faster than the sensor's ~2 s sampling interval.
    pub fn read<L, D>(&self, line: &mut L, delay: &mut D) -> Result<Reading, DecodeError<L::Error>>
    where
        L: SensorLine,
        D: DelayNs,
    {
        self.read_masked(line, delay, &mut CriticalSectionMask)
    }

    /// Like [`read`](Self::read), with the timed part run under `mask`.
    pub fn read_masked<L, D, M>(
        &self,
        line: &mut L,
        delay: &mut D,
        mask: &mut M,
    ) -> Result<Reading, DecodeError<L::Error>>
    where
        L: SensorLine,
        D: DelayNs,
        M: InterruptMask,
    {
        // Drive the line high and let it settle before the timed part.
        line.set_direction(Direction::Output).map_err(DecodeError::Line)?;
        line.set_level(Level::High).map_err(DecodeError::Line)?;
        delay.delay_ms(self.timing.quiescence_ms);

        let result = mask
            .masked(|| self.acquire(line, delay))
            .and_then(|frame| {
                debug!("DHT22 raw frame: {frame}");
                frame.decode::<L::Error>()
            });
        if let Err(err) = &result {
            warn!("DHT22 read failed: {err}");
        }
        result
    }

    /// Start pulse, handshake and the 40 data bits. Runs with interrupts
    /// masked; must not log or sleep.
    fn acquire<L, D>(&self, line: &mut L, delay: &mut D) -> Result<Frame, DecodeError<L::Error>>
    where
        L: SensorLine,
        D: DelayNs,
    {
        // StartPulse
        line.set_level(Level::Low).map_err(DecodeError::Line)?;
        delay.delay_us(self.timing.start_low_us);
        line.set_level(Level::High).map_err(DecodeError::Line)?;
        delay.delay_us(self.timing.release_us);
        line.set_direction(Direction::Input).map_err(DecodeError::Line)?;
        line.set_bias(Bias::PullUp).map_err(DecodeError::Line)?;

        // Sensor answers ~80 µs low, ~80 µs high, then pulls low for bit 0.
        for (level, stage) in [
            (Level::Low, Phase::AckWaitLow),
            (Level::High, Phase::AckWaitHigh),
            (Level::Low, Phase::FrameWaitLow),
        ] {
            let waited = wait_for_level(line, delay, level, self.timing.edge_timeout)
                .map_err(DecodeError::Line)?;
            if waited.is_none() {
                return Err(DecodeError::NoResponse { stage });
            }
        }

        let mut bytes = [0u8; FRAME_BYTES];
        for bit in 0..FRAME_BITS {
            let timeout = |stage: Phase| -> DecodeError<L::Error> {
                DecodeError::Timeout {
                    bit: bit as u8,
                    stage,
                }
            };

            wait_for_level(line, delay, Level::High, self.timing.edge_timeout)
                .map_err(DecodeError::Line)?
                .ok_or_else(|| timeout(Phase::BitWaitHigh))?;
            let width = wait_for_level(line, delay, Level::Low, self.timing.edge_timeout)
                .map_err(DecodeError::Line)?
                .ok_or_else(|| timeout(Phase::BitMeasureHigh))?;

            let byte = &mut bytes[bit / 8];
            *byte <<= 1;
            if classify_pulse(width, self.timing.bit_threshold) {
                *byte |= 1;
            }
        }

        Ok(Frame::new(bytes))
    }
}

/// A DHT22 bound to its line, delay provider and interrupt mask.
pub struct Dht22<L, D, M = CriticalSectionMask> {
    line: L,
    delay: D,
    mask: M,
    decoder: Dht22Decoder,
}

impl<L, D> Dht22<L, D>
where
    L: SensorLine,
    D: DelayNs,
{
    pub fn new(line: L, delay: D) -> Self {
        Self::with_mask(line, delay, CriticalSectionMask)
    }
}

impl<L, D, M> Dht22<L, D, M>
where
    L: SensorLine,
    D: DelayNs,
    M: InterruptMask,
{
    pub fn with_mask(line: L, delay: D, mask: M) -> Self {
        Self {
            line,
            delay,
            mask,
            decoder: Dht22Decoder::new(),
        }
    }

    pub fn read(&mut self) -> Result<Reading, DecodeError<L::Error>> {
        self.decoder
            .read_masked(&mut self.line, &mut self.delay, &mut self.mask)
    }

    pub fn release(self) -> (L, D) {
        (self.line, self.delay)
    }
}

/// Anything the poller can take a reading from.
pub trait Sensor {
    type Error;

    fn read(&mut self) -> Result<Reading, DecodeError<Self::Error>>;
}

impl<L, D, M> Sensor for Dht22<L, D, M>
where
    L: SensorLine,
    D: DelayNs,
    M: InterruptMask,
{
    type Error = L::Error;

    fn read(&mut self) -> Result<Reading, DecodeError<L::Error>> {
        Dht22::read(self)
    }
}
