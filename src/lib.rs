//! Paludarium sensor node.
//!
//! The heart of the crate is a decoder for the DHT22 / AM2302 single-wire
//! humidity and temperature sensor: host-initiated start pulse, three-edge
//! handshake, 40 pulse-width encoded bits, checksum and range validation.
//! It is written against the small [`SensorLine`] capability trait and an
//! [`embedded_hal::delay::DelayNs`], with the timed window run under an
//! [`InterruptMask`], so it runs unchanged on an ESP-IDF GPIO and against a
//! simulated waveform in tests.
//!
//! ```no_run
//! # fn demo<L: paludarium::SensorLine, D: embedded_hal::delay::DelayNs>(line: L, delay: D, mut sleep: D) {
//! use paludarium::{Dht22, PollOutcome, SensorPoller};
//!
//! let mut sensor = Dht22::new(line, delay);
//! let mut poller = SensorPoller::default();
//! if let PollOutcome::Reading(reading) = poller.poll(&mut sensor, &mut sleep) {
//!     println!("{reading}");
//! }
//! # }
//! ```
//!
//! Around it sit the caller-side pieces: the retry/health policy
//! ([`poller`]), build-time [`config`] and the MQTT payloads
//! ([`telemetry`]). The firmware binary wires these to ESP-IDF.

pub mod config;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod line;
pub mod mask;
pub mod poller;
pub mod reading;
pub mod telemetry;
pub mod timing;

pub use decoder::{Dht22, Dht22Decoder, Phase, Sensor};
pub use error::{DecodeError, RetryAction};
pub use frame::Frame;
pub use line::{Bias, Direction, Level, SensorLine};
pub use mask::{CriticalSectionMask, InterruptMask};
pub use poller::{PollOutcome, RetryPolicy, SensorHealth, SensorPoller};
pub use reading::Reading;
pub use timing::Timing;
