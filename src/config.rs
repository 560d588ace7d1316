//! Build-time configuration.
//!
//! Values come from environment variables at compile time (see `build.rs`)
//! and fall back to the defaults below. Numeric values are parsed when read;
//! a value that does not parse is logged and replaced by its default.

use std::str::FromStr;
use std::time::Duration;

use log::warn;

use crate::poller::{clamp_interval, DEFAULT_POLL_INTERVAL};

pub const WIFI_SSID: &str = match option_env!("WIFI_SSID") {
    Some(v) => v,
    None => "YOUR_WIFI_SSID",
};
pub const WIFI_PASS: &str = match option_env!("WIFI_PASS") {
    Some(v) => v,
    None => "",
};

pub const MQTT_HOST: &str = match option_env!("MQTT_HOST") {
    Some(v) => v,
    None => "homeassistant.local",
};
pub const MQTT_PORT_DEFAULT: u16 = 1883;
const MQTT_PORT_ENV: Option<&str> = option_env!("MQTT_PORT");
pub const MQTT_USER: Option<&str> = match option_env!("MQTT_USER") {
    Some(v) if !v.is_empty() => Some(v),
    _ => None,
};
pub const MQTT_PASS: Option<&str> = match option_env!("MQTT_PASS") {
    Some(v) if !v.is_empty() => Some(v),
    _ => None,
};
pub const MQTT_CLIENT_ID: &str = match option_env!("MQTT_CLIENT_ID") {
    Some(v) => v,
    None => "paludarium",
};
pub const MQTT_PREFIX: &str = match option_env!("MQTT_PREFIX") {
    Some(v) => v,
    None => "paludarium",
};

// DHT22 data line. Needs a pull-up (internal or external ~4.7k).
pub const DHT_GPIO_DEFAULT: i32 = 15;
const DHT_GPIO_ENV: Option<&str> = option_env!("DHT_GPIO");
const POLL_INTERVAL_ENV: Option<&str> = option_env!("POLL_INTERVAL_SECS");

pub const SW_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn mqtt_port() -> u16 {
    parse_or("MQTT_PORT", MQTT_PORT_ENV, MQTT_PORT_DEFAULT)
}

pub fn dht_gpio() -> i32 {
    parse_or("DHT_GPIO", DHT_GPIO_ENV, DHT_GPIO_DEFAULT)
}

pub fn poll_interval() -> Duration {
    interval_from(POLL_INTERVAL_ENV)
}

fn interval_from(raw: Option<&str>) -> Duration {
    let secs = parse_or(
        "POLL_INTERVAL_SECS",
        raw,
        DEFAULT_POLL_INTERVAL.as_secs(),
    );
    clamp_interval(Duration::from_secs(secs))
}

fn parse_or<T: FromStr + Copy>(name: &str, raw: Option<&str>, default: T) -> T {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return default;
    };
    match raw.parse() {
        Ok(value) => value,
        Err(_) => {
            warn!("{name}={raw:?} is not valid, using default");
            default
        }
    }
}
