//! Caller-side retry policy and sensor health.
//!
//! The decoder itself never retries. Each polling cycle the poller makes up
//! to `attempts` reads with `backoff` between them and gives up for the cycle
//! after that; an all-zero frame ends the cycle at once since rapid retries
//! will not fix a wiring fault.

use core::fmt;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use log::error;

use crate::decoder::Sensor;
use crate::error::{DecodeError, RetryAction};
use crate::reading::Reading;

/// The sensor cannot be sampled faster than this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u8,
    pub backoff: Duration,
    /// Failed cycles in a row before the sensor counts as degraded.
    pub degraded_after: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(500),
            degraded_after: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorHealth {
    Healthy,
    /// Repeated failed cycles (bad checksums, noise, timeouts).
    Degraded,
    /// No answer or a stuck line on the last cycle.
    Disconnected,
}

impl SensorHealth {
    pub fn as_str(self) -> &'static str {
        match self {
            SensorHealth::Healthy => "healthy",
            SensorHealth::Degraded => "degraded",
            SensorHealth::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for SensorHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one polling cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<E> {
    Reading(Reading),
    Failed { error: DecodeError<E>, attempts: u8 },
}

impl<E> PollOutcome<E> {
    pub fn reading(&self) -> Option<&Reading> {
        match self {
            PollOutcome::Reading(reading) => Some(reading),
            PollOutcome::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SensorPoller {
    policy: RetryPolicy,
    consecutive_failures: u32,
    health: SensorHealth,
}

impl SensorPoller {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            consecutive_failures: 0,
            health: SensorHealth::Healthy,
        }
    }

    pub fn health(&self) -> SensorHealth {
        self.health
    }

    /// Failed cycles since the last successful one.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Run one polling cycle against `sensor`, sleeping on `delay` between
    /// attempts.
    pub fn poll<S, D>(&mut self, sensor: &mut S, delay: &mut D) -> PollOutcome<S::Error>
    where
        S: Sensor,
        S::Error: fmt::Debug,
        D: DelayNs,
    {
        let attempts = self.policy.attempts.max(1);
        let mut attempt = 0u8;
        let error = loop {
            attempt += 1;
            match sensor.read() {
                Ok(reading) => {
                    self.consecutive_failures = 0;
                    self.health = SensorHealth::Healthy;
                    return PollOutcome::Reading(reading);
                }
                // The sensor logs each failed attempt itself.
                Err(err) => {
                    if attempt >= attempts || err.action() == RetryAction::WiringFault {
                        break err;
                    }
                    delay.delay_ms(backoff_ms(self.policy.backoff));
                }
            }
        };

        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.health = match error {
            DecodeError::AllZeroFrame | DecodeError::NoResponse { .. } => {
                SensorHealth::Disconnected
            }
            _ if self.consecutive_failures >= self.policy.degraded_after => SensorHealth::Degraded,
            // The sensor answered; isolated failures do not count against it yet.
            _ => SensorHealth::Healthy,
        };
        error!(
            "DHT22 no reading after {attempt} attempt(s) [{}]: {error}; {} failed cycle(s) in a row, sensor {}",
            error.kind(),
            self.consecutive_failures,
            self.health
        );

        PollOutcome::Failed {
            error,
            attempts: attempt,
        }
    }
}

impl Default for SensorPoller {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

fn backoff_ms(backoff: Duration) -> u32 {
    u32::try_from(backoff.as_millis()).unwrap_or(u32::MAX)
}

/// Clamp a configured interval to the sensor's minimum sampling period.
pub fn clamp_interval(interval: Duration) -> Duration {
    interval.max(MIN_POLL_INTERVAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::Phase;
    use std::collections::VecDeque;

    struct Scripted {
        results: VecDeque<Result<Reading, DecodeError>>,
        reads: usize,
    }

    impl Scripted {
        fn new(results: Vec<Result<Reading, DecodeError>>) -> Self {
            Self {
                results: results.into(),
                reads: 0,
            }
        }
    }

    impl Sensor for Scripted {
        type Error = core::convert::Infallible;

        fn read(&mut self) -> Result<Reading, DecodeError> {
            self.reads += 1;
            self.results
                .pop_front()
                .expect("sensor read more often than scripted")
        }
    }

    #[derive(Default)]
    struct Sleeps {
        ms: Vec<u32>,
    }

    impl DelayNs for Sleeps {
        fn delay_ns(&mut self, _ns: u32) {}

        fn delay_ms(&mut self, ms: u32) {
            self.ms.push(ms);
        }
    }

    const READING: Reading = Reading {
        humidity_pct: 65.2,
        temperature_c: 26.1,
    };

    fn timeout() -> DecodeError {
        DecodeError::Timeout {
            bit: 12,
            stage: Phase::BitWaitHigh,
        }
    }

    fn checksum() -> DecodeError {
        DecodeError::ChecksumMismatch {
            computed: 0x94,
            received: 0x14,
        }
    }

    #[test]
    fn first_success_needs_no_retry() {
        let mut sensor = Scripted::new(vec![Ok(READING)]);
        let mut sleeps = Sleeps::default();
        let mut poller = SensorPoller::default();

        let outcome = poller.poll(&mut sensor, &mut sleeps);
        assert_eq!(outcome, PollOutcome::Reading(READING));
        assert_eq!(sensor.reads, 1);
        assert!(sleeps.ms.is_empty());
        assert_eq!(poller.health(), SensorHealth::Healthy);
    }

    #[test]
    fn retries_with_backoff_until_success() {
        let mut sensor = Scripted::new(vec![Err(timeout()), Err(checksum()), Ok(READING)]);
        let mut sleeps = Sleeps::default();
        let mut poller = SensorPoller::default();

        let outcome = poller.poll(&mut sensor, &mut sleeps);
        assert_eq!(outcome.reading(), Some(&READING));
        assert_eq!(sensor.reads, 3);
        assert_eq!(sleeps.ms, vec![500, 500]);
        assert_eq!(poller.consecutive_failures(), 0);
    }

    #[test]
    fn gives_up_after_three_attempts() {
        let mut sensor = Scripted::new(vec![Err(timeout()), Err(timeout()), Err(checksum())]);
        let mut sleeps = Sleeps::default();
        let mut poller = SensorPoller::default();

        let outcome = poller.poll(&mut sensor, &mut sleeps);
        assert_eq!(
            outcome,
            PollOutcome::Failed {
                error: checksum(),
                attempts: 3
            }
        );
        assert_eq!(sensor.reads, 3);
        assert_eq!(sleeps.ms.len(), 2);
        assert_eq!(poller.consecutive_failures(), 1);
        assert_eq!(outcome.reading(), None);
    }

    #[test]
    fn all_zero_frame_ends_the_cycle() {
        let mut sensor = Scripted::new(vec![Err(DecodeError::AllZeroFrame)]);
        let mut sleeps = Sleeps::default();
        let mut poller = SensorPoller::default();

        let outcome = poller.poll(&mut sensor, &mut sleeps);
        assert_eq!(
            outcome,
            PollOutcome::Failed {
                error: DecodeError::AllZeroFrame,
                attempts: 1
            }
        );
        assert!(sleeps.ms.is_empty());
        assert_eq!(poller.health(), SensorHealth::Disconnected);
    }

    #[test]
    fn persistent_failures_degrade_then_recover() {
        let mut sleeps = Sleeps::default();
        let mut poller = SensorPoller::new(RetryPolicy {
            attempts: 1,
            ..RetryPolicy::default()
        });

        for cycle in 1..=3 {
            let mut sensor = Scripted::new(vec![Err(checksum())]);
            poller.poll(&mut sensor, &mut sleeps);
            let expected = if cycle < 3 {
                SensorHealth::Healthy
            } else {
                SensorHealth::Degraded
            };
            assert_eq!(poller.health(), expected, "cycle {cycle}");
        }
        assert_eq!(poller.consecutive_failures(), 3);

        let mut sensor = Scripted::new(vec![Ok(READING)]);
        poller.poll(&mut sensor, &mut sleeps);
        assert_eq!(poller.health(), SensorHealth::Healthy);
        assert_eq!(poller.consecutive_failures(), 0);
    }

    #[test]
    fn no_response_marks_disconnected() {
        let mut sensor = Scripted::new(vec![
            Err(DecodeError::NoResponse {
                stage: Phase::AckWaitLow,
            });
            3
        ]);
        let mut sleeps = Sleeps::default();
        let mut poller = SensorPoller::default();

        poller.poll(&mut sensor, &mut sleeps);
        assert_eq!(poller.health(), SensorHealth::Disconnected);
    }

    #[test]
    fn zero_attempts_still_reads_once() {
        let mut sensor = Scripted::new(vec![Ok(READING)]);
        let mut sleeps = Sleeps::default();
        let mut poller = SensorPoller::new(RetryPolicy {
            attempts: 0,
            ..RetryPolicy::default()
        });
        assert!(poller.poll(&mut sensor, &mut sleeps).reading().is_some());
    }

    #[test]
    fn oversized_backoff_saturates() {
        let mut sensor = Scripted::new(vec![Err(timeout()), Ok(READING)]);
        let mut sleeps = Sleeps::default();
        let mut poller = SensorPoller::new(RetryPolicy {
            backoff: Duration::from_millis(u64::from(u32::MAX) + 1_000),
            ..RetryPolicy::default()
        });

        assert!(poller.poll(&mut sensor, &mut sleeps).reading().is_some());
        assert_eq!(sleeps.ms, vec![u32::MAX]);
        assert_eq!(backoff_ms(Duration::from_millis(500)), 500);
    }

    #[test]
    fn interval_is_clamped_to_sensor_minimum() {
        assert_eq!(clamp_interval(Duration::from_millis(500)), MIN_POLL_INTERVAL);
        assert_eq!(
            clamp_interval(DEFAULT_POLL_INTERVAL),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn health_strings() {
        assert_eq!(SensorHealth::Healthy.to_string(), "healthy");
        assert_eq!(SensorHealth::Degraded.as_str(), "degraded");
        assert_eq!(SensorHealth::Disconnected.as_str(), "disconnected");
    }
}
