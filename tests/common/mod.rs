//! Simulated DHT22 wire for driving the decoder on the host.
//!
//! Time only moves when the decoder waits on [`SimDelay`]; the line answers
//! reads from a scripted waveform that starts when the host releases it.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use paludarium::{Bias, Direction, Level, SensorLine};

pub const DATA_LOW_US: u64 = 50;
pub const ZERO_HIGH_US: u32 = 26;
pub const ONE_HIGH_US: u32 = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Direction(Direction),
    Level(Level),
    Bias(Bias),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimError;

/// Segments of (duration µs, level) the sensor drives after release.
#[derive(Debug, Clone, Default)]
pub struct Waveform {
    segments: Vec<(u64, Level)>,
    /// Level once the script runs out.
    idle: Option<Level>,
}

impl Waveform {
    /// Sensor that never answers: the pull-up keeps the line high.
    pub fn silent() -> Self {
        Self::default()
    }

    /// Line shorted to ground.
    pub fn stuck_low() -> Self {
        Self::default().idle(Level::Low)
    }

    /// Acknowledge only: ~80 µs low, ~80 µs high, then the data preamble.
    pub fn handshake() -> Self {
        Self::default().high(20).low(80).high(80)
    }

    pub fn frame(bytes: [u8; 5]) -> Self {
        Self::frame_with_widths(bytes, ZERO_HIGH_US, ONE_HIGH_US)
    }

    pub fn frame_with_widths(bytes: [u8; 5], zero_us: u32, one_us: u32) -> Self {
        let widths: Vec<u32> = bits(bytes)
            .map(|bit| if bit { one_us } else { zero_us })
            .collect();
        Self::handshake().pulses(&widths).low(DATA_LOW_US)
    }

    /// Bits as high-pulse widths, each preceded by the 50 µs low gap.
    pub fn pulses(mut self, widths: &[u32]) -> Self {
        for width in widths {
            self = self.low(DATA_LOW_US).high(u64::from(*width));
        }
        self
    }

    pub fn low(mut self, us: u64) -> Self {
        self.segments.push((us, Level::Low));
        self
    }

    pub fn high(mut self, us: u64) -> Self {
        self.segments.push((us, Level::High));
        self
    }

    pub fn idle(mut self, level: Level) -> Self {
        self.idle = Some(level);
        self
    }

    fn level_at(&self, elapsed_us: u64, bias: Bias) -> Level {
        let mut start = 0;
        for (duration, level) in &self.segments {
            if elapsed_us < start + duration {
                return *level;
            }
            start += duration;
        }
        self.idle.unwrap_or(match bias {
            Bias::PullUp => Level::High,
            Bias::Floating => Level::Low,
        })
    }
}

/// MSB-first bits of a frame.
pub fn bits(bytes: [u8; 5]) -> impl Iterator<Item = bool> {
    bytes
        .into_iter()
        .flat_map(|byte| (0..8).rev().map(move |i| byte & (1 << i) != 0))
}

pub fn with_checksum(data: [u8; 4]) -> [u8; 5] {
    let sum = data.iter().fold(0u8, |s, b| s.wrapping_add(*b));
    [data[0], data[1], data[2], data[3], sum]
}

#[derive(Clone, Default)]
pub struct Clock(Rc<Cell<u64>>);

impl Clock {
    pub fn now_ns(&self) -> u64 {
        self.0.get()
    }

    pub fn now_us(&self) -> u64 {
        self.0.get() / 1_000
    }

    fn advance(&self, ns: u64) {
        self.0.set(self.0.get() + ns);
    }
}

pub struct SimDelay {
    clock: Clock,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.clock.advance(u64::from(ns));
    }
}

pub struct SimLine {
    clock: Clock,
    waveform: Waveform,
    direction: Direction,
    driven: Level,
    bias: Bias,
    released_at_ns: Option<u64>,
    events: Rc<RefCell<Vec<(u64, Event)>>>,
    reads: usize,
    fail_after_reads: Option<usize>,
}

impl SimLine {
    pub fn events(&self) -> Vec<(u64, Event)> {
        self.events.borrow().clone()
    }

    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Make every read after the first `reads` fail.
    pub fn fail_after(mut self, reads: usize) -> Self {
        self.fail_after_reads = Some(reads);
        self
    }

    fn record(&self, event: Event) {
        self.events.borrow_mut().push((self.clock.now_ns(), event));
    }
}

impl SensorLine for SimLine {
    type Error = SimError;

    fn set_direction(&mut self, direction: Direction) -> Result<(), SimError> {
        self.record(Event::Direction(direction));
        if direction == Direction::Input && self.direction == Direction::Output {
            self.released_at_ns = Some(self.clock.now_ns());
        }
        self.direction = direction;
        Ok(())
    }

    fn set_level(&mut self, level: Level) -> Result<(), SimError> {
        self.record(Event::Level(level));
        self.driven = level;
        Ok(())
    }

    fn read_level(&mut self) -> Result<Level, SimError> {
        if let Some(limit) = self.fail_after_reads {
            if self.reads >= limit {
                return Err(SimError);
            }
        }
        self.reads += 1;

        if self.direction == Direction::Output {
            return Ok(self.driven);
        }
        match self.released_at_ns {
            Some(at) => {
                let elapsed_us = (self.clock.now_ns() - at) / 1_000;
                Ok(self.waveform.level_at(elapsed_us, self.bias))
            }
            None => Ok(self.waveform.idle.unwrap_or(Level::High)),
        }
    }

    fn set_bias(&mut self, bias: Bias) -> Result<(), SimError> {
        self.record(Event::Bias(bias));
        self.bias = bias;
        Ok(())
    }
}

/// A line playing `waveform` and a delay sharing its clock.
pub fn sim(waveform: Waveform) -> (SimLine, SimDelay, Clock) {
    let clock = Clock::default();
    let line = SimLine {
        clock: clock.clone(),
        waveform,
        direction: Direction::Input,
        driven: Level::High,
        bias: Bias::PullUp,
        released_at_ns: None,
        events: Rc::default(),
        reads: 0,
        fail_after_reads: None,
    };
    let delay = SimDelay {
        clock: clock.clone(),
    };
    (line, delay, clock)
}

/// Tiny deterministic generator for frame sweeps.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next_u32(&mut self) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 33) as u32
    }

    pub fn below(&mut self, bound: u32) -> u32 {
        self.next_u32() % bound
    }
}
