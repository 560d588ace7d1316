//! Failure taxonomy of a sensor transaction.
//!
//! Every variant is transient: the decoder never reports anything the caller
//! could not retry on the next attempt or the next polling cycle.

use core::convert::Infallible;
use core::fmt;

use crate::decoder::Phase;

/// Why a transaction produced no [`Reading`](crate::Reading).
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError<E = Infallible> {
    /// The sensor did not acknowledge the start pulse.
    NoResponse { stage: Phase },
    /// A bit edge did not arrive in time while acquiring the frame.
    Timeout { bit: u8, stage: Phase },
    ChecksumMismatch { computed: u8, received: u8 },
    /// All 40 bits read as zero. A stuck or disconnected line decodes this
    /// way with a vacuously matching checksum.
    AllZeroFrame,
    /// Checksum passed but the values fall outside the sensor envelope.
    OutOfRange { humidity: f32, temperature: f32 },
    /// The GPIO driver rejected a line operation.
    Line(E),
}

/// What the polling caller should do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    RetrySoon,
    /// Wiring or connectivity fault; wait for the next polling cycle.
    WiringFault,
}

impl<E> DecodeError<E> {
    pub fn action(&self) -> RetryAction {
        match self {
            Self::AllZeroFrame => RetryAction::WiringFault,
            _ => RetryAction::RetrySoon,
        }
    }

    /// Short, stable name of the failure kind, for logs and telemetry.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoResponse { .. } => "no_response",
            Self::Timeout { .. } => "timeout",
            Self::ChecksumMismatch { .. } => "checksum_mismatch",
            Self::AllZeroFrame => "all_zero_frame",
            Self::OutOfRange { .. } => "out_of_range",
            Self::Line(_) => "line",
        }
    }
}

impl<E: fmt::Debug> fmt::Display for DecodeError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoResponse { stage } => write!(f, "sensor did not respond ({stage})"),
            Self::Timeout { bit, stage } => write!(f, "timeout at bit {bit} ({stage})"),
            Self::ChecksumMismatch { computed, received } => write!(
                f,
                "checksum mismatch: computed 0x{computed:02X}, received 0x{received:02X}"
            ),
            Self::AllZeroFrame => write!(f, "all-zero frame (line stuck or disconnected)"),
            Self::OutOfRange {
                humidity,
                temperature,
            } => write!(f, "values out of range: H={humidity:.1}% T={temperature:.1}°C"),
            Self::Line(err) => write!(f, "GPIO error: {err:?}"),
        }
    }
}

impl<E: fmt::Debug> std::error::Error for DecodeError<E> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_all_zero_is_a_wiring_fault() {
        let errors: [DecodeError; 5] = [
            DecodeError::NoResponse {
                stage: Phase::AckWaitLow,
            },
            DecodeError::Timeout {
                bit: 3,
                stage: Phase::BitWaitHigh,
            },
            DecodeError::ChecksumMismatch {
                computed: 1,
                received: 2,
            },
            DecodeError::OutOfRange {
                humidity: 120.0,
                temperature: 20.0,
            },
            DecodeError::AllZeroFrame,
        ];
        let faults: Vec<_> = errors
            .iter()
            .filter(|e| e.action() == RetryAction::WiringFault)
            .collect();
        assert_eq!(faults, vec![&DecodeError::<Infallible>::AllZeroFrame]);
    }

    #[test]
    fn display_names_the_failure() {
        let err: DecodeError = DecodeError::ChecksumMismatch {
            computed: 0x94,
            received: 0x95,
        };
        assert_eq!(
            err.to_string(),
            "checksum mismatch: computed 0x94, received 0x95"
        );

        let err: DecodeError = DecodeError::Timeout {
            bit: 17,
            stage: Phase::BitMeasureHigh,
        };
        assert!(err.to_string().contains("bit 17"));

        let err: DecodeError<&str> = DecodeError::Line("gpio busy");
        assert_eq!(err.to_string(), "GPIO error: \"gpio busy\"");
        assert_eq!(err.kind(), "line");
    }
}
