//! The 40-bit DHT22 response frame.
//!
//! | Byte | Content |
//! |------|---------|
//! | 0-1  | humidity, unsigned big-endian, tenths of a percent |
//! | 2-3  | temperature, sign-magnitude big-endian, tenths of a degree (bit 15 = sign) |
//! | 4    | checksum: low 8 bits of the sum of bytes 0-3 |

use core::fmt;

use crate::error::DecodeError;
use crate::reading::{Reading, HUMIDITY_RANGE, TEMPERATURE_RANGE};

pub const FRAME_BYTES: usize = 5;
pub const FRAME_BITS: usize = FRAME_BYTES * 8;

const SIGN_BIT: u16 = 0x8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Frame([u8; FRAME_BYTES]);

impl Frame {
    pub const fn new(bytes: [u8; FRAME_BYTES]) -> Self {
        Self(bytes)
    }

    /// Checksum computed over the four data bytes.
    pub fn checksum(&self) -> u8 {
        self.0[..4].iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
    }

    pub fn received_checksum(&self) -> u8 {
        self.0[4]
    }

    pub fn is_all_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    pub fn raw_humidity(&self) -> u16 {
        u16::from_be_bytes([self.0[0], self.0[1]])
    }

    pub fn raw_temperature(&self) -> u16 {
        u16::from_be_bytes([self.0[2], self.0[3]])
    }

    pub fn humidity(&self) -> f32 {
        f32::from(self.raw_humidity()) / 10.0
    }

    /// Sign-magnitude, not two's complement: bits 0-14 are the magnitude.
    pub fn temperature(&self) -> f32 {
        let raw = self.raw_temperature();
        let magnitude = f32::from(raw & !SIGN_BIT) / 10.0;
        // A sign bit over a zero magnitude is plain zero, not -0.0.
        if raw & SIGN_BIT != 0 && magnitude != 0.0 {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Validate the frame and turn it into a [`Reading`].
    ///
    /// Checks run in order: checksum, all-zero guard, range.
    pub fn decode<E>(&self) -> Result<Reading, DecodeError<E>> {
        let computed = self.checksum();
        let received = self.received_checksum();
        if computed != received {
            return Err(DecodeError::ChecksumMismatch { computed, received });
        }
        if self.is_all_zero() {
            return Err(DecodeError::AllZeroFrame);
        }

        let humidity = self.humidity();
        let temperature = self.temperature();
        if !HUMIDITY_RANGE.contains(&humidity) || !TEMPERATURE_RANGE.contains(&temperature) {
            return Err(DecodeError::OutOfRange {
                humidity,
                temperature,
            });
        }

        Ok(Reading {
            humidity_pct: humidity,
            temperature_c: temperature,
        })
    }
}

impl From<[u8; FRAME_BYTES]> for Frame {
    fn from(bytes: [u8; FRAME_BYTES]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [b0, b1, b2, b3, b4] = self.0;
        write!(f, "{b0:02X} {b1:02X} {b2:02X} {b3:02X} {b4:02X}")
    }
}
