// main.rs
// ESP32 paludarium sensor node
//
//   DHT22 (AM2302) on one GPIO (default GPIO15, DHT_GPIO env at build time)
//   -> validated readings every POLL_INTERVAL_SECS (default 10 s)
//   -> MQTT: <prefix>/sensor/{temperature,humidity,health}/state + HA discovery
//
// Notes:
// - The data line needs a pull-up; the internal one is enabled, ~4.7k external is better.
// - No reading is ever invented: a failed cycle publishes nothing but the health state.
// - WiFi/MQTT are optional at boot; the node keeps sampling and logging offline.

#[cfg(target_os = "espidf")]
mod esp_line;
#[cfg(target_os = "espidf")]
mod mqtt;
#[cfg(target_os = "espidf")]
mod wifi;

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    firmware::run()
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("paludarium firmware runs on ESP-IDF targets only; build with an *-espidf target");
}

#[cfg(target_os = "espidf")]
mod firmware {
    use std::thread;
    use std::time::{Duration, Instant};

    use anyhow::Result;
    use esp_idf_hal::delay::FreeRtos;
    use esp_idf_hal::gpio::AnyIOPin;
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_svc::log::EspLogger;
    use esp_idf_sys as sys;
    use log::{error, info, warn};

    use paludarium::config::{self, SW_VERSION};
    use paludarium::poller::MIN_POLL_INTERVAL;
    use paludarium::telemetry::Command;
    use paludarium::{Dht22, Level, PollOutcome, SensorLine, SensorPoller};

    use crate::esp_line::{EspLine, IsrMask, SensorDelay};
    use crate::mqtt::{init_mqtt, MqttClient};
    use crate::wifi::WifiLink;

    // Time for the sensor to power up before the first transaction.
    const SENSOR_WARMUP: Duration = Duration::from_secs(3);
    const LOOP_TICK: Duration = Duration::from_millis(200);

    pub fn run() -> Result<()> {
        sys::link_patches();
        EspLogger::initialize_default();
        info!("=== paludarium {SW_VERSION} ===");

        let peripherals = Peripherals::take()?;

        let gpio = config::dht_gpio();
        // SAFETY: the configured GPIO is used by nothing else in this firmware.
        let mut line = EspLine::new(unsafe { AnyIOPin::new(gpio) })?;
        info!("DHT22 sensor on GPIO{}", line.gpio());
        thread::sleep(SENSOR_WARMUP);
        probe_line(&mut line);

        let mut wifi = match WifiLink::connect(peripherals.modem) {
            Ok(wifi) => Some(wifi),
            Err(err) => {
                warn!("WiFi unavailable, running offline: {err:?}");
                None
            }
        };
        let mut mqtt = wifi.as_mut().and_then(connect_mqtt);

        // Bit timing runs with interrupts masked on this core; the 100 ms
        // hold before it yields to the other tasks.
        let mut sensor = Dht22::with_mask(line, SensorDelay, IsrMask);
        let mut poller = SensorPoller::default();
        let interval = config::poll_interval();
        info!("Polling every {}s", interval.as_secs());

        let mut last_read: Option<Instant> = None;
        let mut read_now = false;

        loop {
            let due = match last_read {
                None => true,
                Some(at) => {
                    at.elapsed() >= interval || (read_now && at.elapsed() >= MIN_POLL_INTERVAL)
                }
            };

            if due {
                read_now = false;
                // A failed cycle is logged by the poller and publishes no value.
                if let PollOutcome::Reading(reading) = poller.poll(&mut sensor, &mut FreeRtos) {
                    info!("DHT22 OK: {reading}");
                    if let Some(client) = mqtt.as_mut() {
                        if let Err(err) = client.publish_reading(&reading) {
                            warn!("MQTT publish failed: {err:?}");
                        }
                    }
                }
                if let Some(client) = mqtt.as_mut() {
                    if let Err(err) = client.publish_health(poller.health()) {
                        warn!("MQTT health publish failed: {err:?}");
                    }
                }
                last_read = Some(Instant::now());

                if let Some(wifi) = wifi.as_mut() {
                    if let Err(err) = wifi.ensure_up() {
                        warn!("WiFi reconnect failed: {err:?}");
                    } else if mqtt.is_none() {
                        mqtt = connect_mqtt(wifi);
                    }
                }
            }

            while let Some(command) = mqtt.as_mut().and_then(MqttClient::try_recv_command) {
                match command {
                    Command::ReadNow => {
                        info!("MQTT: read requested");
                        read_now = true;
                    }
                    Command::Reboot => {
                        warn!("MQTT: reboot requested");
                        unsafe { sys::esp_restart() };
                    }
                }
            }

            thread::sleep(LOOP_TICK);
        }
    }

    fn connect_mqtt(wifi: &mut WifiLink) -> Option<MqttClient> {
        match init_mqtt(wifi) {
            Ok(client) => Some(client),
            Err(err) => {
                warn!("MQTT unavailable: {err:?}");
                None
            }
        }
    }

    /// The line idles high through the pull-up; low at boot means wiring trouble.
    fn probe_line(line: &mut EspLine) {
        match line.read_level() {
            Ok(Level::High) => info!("GPIO{} idle HIGH (pull-up OK)", line.gpio()),
            Ok(Level::Low) => warn!(
                "GPIO{} idle LOW. Check DATA wiring, VCC=3V3, common GND and the pull-up.",
                line.gpio()
            ),
            Err(err) => error!("GPIO{} read failed: {err:?}", line.gpio()),
        }
    }
}
