use embedded_hal::delay::DelayNs;
use esp_idf_hal::delay::{Ets, FreeRtos};
use esp_idf_hal::gpio::{AnyIOPin, Pin};
use esp_idf_hal::interrupt;
use esp_idf_sys::{self as sys, esp, EspError};

use paludarium::{Bias, Direction, Level, InterruptMask, SensorLine};

/// DHT22 data line on an ESP-IDF GPIO.
///
/// Uses the raw GPIO driver: the direction and pull mode have to flip in the
/// middle of a transaction, which `PinDriver` modes do not allow.
pub struct EspLine {
    _pin: AnyIOPin,
    gpio: i32,
}

impl EspLine {
    pub fn new(pin: AnyIOPin) -> Result<Self, EspError> {
        let gpio = pin.pin();
        esp!(unsafe { sys::gpio_reset_pin(gpio) })?;
        let mut line = Self { _pin: pin, gpio };
        // Idle state between transactions: input, pulled up.
        line.set_direction(Direction::Input)?;
        line.set_bias(Bias::PullUp)?;
        Ok(line)
    }

    pub fn gpio(&self) -> i32 {
        self.gpio
    }
}

impl SensorLine for EspLine {
    type Error = EspError;

    fn set_direction(&mut self, direction: Direction) -> Result<(), EspError> {
        let mode = match direction {
            Direction::Output => sys::gpio_mode_t_GPIO_MODE_OUTPUT,
            Direction::Input => sys::gpio_mode_t_GPIO_MODE_INPUT,
        };
        esp!(unsafe { sys::gpio_set_direction(self.gpio, mode) })
    }

    fn set_level(&mut self, level: Level) -> Result<(), EspError> {
        esp!(unsafe { sys::gpio_set_level(self.gpio, u32::from(level.is_high())) })
    }

    fn read_level(&mut self) -> Result<Level, EspError> {
        Ok(Level::from(unsafe { sys::gpio_get_level(self.gpio) } != 0))
    }

    fn set_bias(&mut self, bias: Bias) -> Result<(), EspError> {
        let mode = match bias {
            Bias::PullUp => sys::gpio_pull_mode_t_GPIO_PULLUP_ONLY,
            Bias::Floating => sys::gpio_pull_mode_t_GPIO_FLOATING,
        };
        esp!(unsafe { sys::gpio_set_pull_mode(self.gpio, mode) })
    }
}

/// Masks interrupts on this core (`portENTER_CRITICAL`) for the timed part
/// of a transaction.
pub struct IsrMask;

impl InterruptMask for IsrMask {
    fn masked<R>(&mut self, f: impl FnOnce() -> R) -> R {
        interrupt::free(f)
    }
}

/// Busy-waits for sub-millisecond delays and yields to FreeRTOS for whole
/// milliseconds. The decoder only waits in milliseconds outside the masked
/// window.
pub struct SensorDelay;

impl DelayNs for SensorDelay {
    fn delay_ns(&mut self, ns: u32) {
        DelayNs::delay_ns(&mut Ets, ns);
    }

    fn delay_us(&mut self, us: u32) {
        Ets::delay_us(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        FreeRtos::delay_ms(ms);
    }
}
