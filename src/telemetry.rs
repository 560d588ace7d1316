//! MQTT topic layout and payloads.
//!
//! Readings go out as one retained plain-text value per topic
//! (`<prefix>/sensor/temperature/state` -> `"26.1"`), so Home Assistant
//! entities can use the value directly. Discovery configs point at those
//! topics and at the shared availability topic.

use crate::poller::SensorHealth;
use crate::reading::Reading;

pub const PAYLOAD_ONLINE: &str = "online";
pub const PAYLOAD_OFFLINE: &str = "offline";
pub const DISCOVERY_PREFIX: &str = "homeassistant";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub availability: String,
    pub temperature: String,
    pub humidity: String,
    pub health: String,
    pub cmd: String,
}

impl Topics {
    pub fn new(prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');
        Self {
            availability: format!("{prefix}/availability"),
            temperature: format!("{prefix}/sensor/temperature/state"),
            humidity: format!("{prefix}/sensor/humidity/state"),
            health: format!("{prefix}/sensor/health/state"),
            cmd: format!("{prefix}/cmd"),
        }
    }
}

/// One decimal, matching the sensor's resolution.
pub fn format_value(value: f32) -> String {
    format!("{value:.1}")
}

/// `(topic, payload)` pairs to publish for a reading.
pub fn reading_messages<'a>(topics: &'a Topics, reading: &Reading) -> [(&'a str, String); 2] {
    [
        (
            topics.temperature.as_str(),
            format_value(reading.temperature_c),
        ),
        (topics.humidity.as_str(), format_value(reading.humidity_pct)),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Take a reading now instead of waiting for the next interval.
    ReadNow,
    Reboot,
}

pub fn parse_command(payload: &[u8]) -> Option<Command> {
    let text = String::from_utf8_lossy(payload);
    match text.trim().to_ascii_lowercase().as_str() {
        "read" | "read_now" | "refresh" => Some(Command::ReadNow),
        "reboot" | "restart" => Some(Command::Reboot),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub model: String,
    pub sw_version: String,
}

impl DeviceInfo {
    pub fn new(prefix: &str, sw_version: &str) -> Self {
        Self {
            id: prefix.replace(['-', '/'], "_"),
            name: "Paludarium".to_string(),
            model: "ESP32 + DHT22".to_string(),
            sw_version: sw_version.to_string(),
        }
    }

    fn json(&self) -> String {
        format!(
            r#""device":{{"identifiers":["{id}"],"name":"{name}","model":"{model}","manufacturer":"DIY","sw_version":"{sw}"}}"#,
            id = self.id,
            name = self.name,
            model = self.model,
            sw = self.sw_version,
        )
    }
}

/// A retained message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retained {
    pub topic: String,
    pub payload: String,
}

struct SensorEntity<'a> {
    key: &'a str,
    name: &'a str,
    state_topic: &'a str,
    unit: Option<&'a str>,
    device_class: Option<&'a str>,
    state_class: Option<&'a str>,
}

fn sensor_discovery(topics: &Topics, device: &DeviceInfo, entity: SensorEntity<'_>) -> Retained {
    let mut payload = format!(
        r#"{{"name":"{name}","state_topic":"{state_topic}","availability_topic":"{availability_topic}","payload_available":"{online}","payload_not_available":"{offline}","unique_id":"{device_id}-{key}","#,
        name = entity.name,
        state_topic = entity.state_topic,
        availability_topic = topics.availability,
        online = PAYLOAD_ONLINE,
        offline = PAYLOAD_OFFLINE,
        device_id = device.id,
        key = entity.key,
    );

    if let Some(unit) = entity.unit {
        payload.push_str(&format!(r#""unit_of_measurement":"{unit}","#));
    }
    if let Some(device_class) = entity.device_class {
        payload.push_str(&format!(r#""device_class":"{device_class}","#));
    }
    if let Some(state_class) = entity.state_class {
        payload.push_str(&format!(r#""state_class":"{state_class}","#));
    }
    payload.push_str(&device.json());
    payload.push('}');

    Retained {
        topic: format!("{DISCOVERY_PREFIX}/sensor/{}/{}/config", device.id, entity.key),
        payload,
    }
}

fn button_discovery(
    topics: &Topics,
    device: &DeviceInfo,
    key: &str,
    name: &str,
    payload_press: &str,
) -> Retained {
    // Stateless action: pressing publishes `payload_press` to the command topic.
    let payload = format!(
        r#"{{"name":"{name}","command_topic":"{command_topic}","payload_press":"{payload_press}","availability_topic":"{availability_topic}","payload_available":"{online}","payload_not_available":"{offline}","unique_id":"{device_id}-{key}",{device}}}"#,
        command_topic = topics.cmd,
        availability_topic = topics.availability,
        online = PAYLOAD_ONLINE,
        offline = PAYLOAD_OFFLINE,
        device_id = device.id,
        device = device.json(),
    );

    Retained {
        topic: format!("{DISCOVERY_PREFIX}/button/{}/{key}/config", device.id),
        payload,
    }
}

/// Home Assistant discovery configs for every entity this node exposes.
pub fn discovery_messages(topics: &Topics, device: &DeviceInfo) -> Vec<Retained> {
    vec![
        sensor_discovery(
            topics,
            device,
            SensorEntity {
                key: "temperature",
                name: "Paludarium Temperature",
                state_topic: &topics.temperature,
                unit: Some("°C"),
                device_class: Some("temperature"),
                state_class: Some("measurement"),
            },
        ),
        sensor_discovery(
            topics,
            device,
            SensorEntity {
                key: "humidity",
                name: "Paludarium Humidity",
                state_topic: &topics.humidity,
                unit: Some("%"),
                device_class: Some("humidity"),
                state_class: Some("measurement"),
            },
        ),
        sensor_discovery(
            topics,
            device,
            SensorEntity {
                key: "sensor_health",
                name: "Paludarium Sensor Health",
                state_topic: &topics.health,
                unit: None,
                device_class: None,
                state_class: None,
            },
        ),
        button_discovery(topics, device, "read_now", "Paludarium Read Now", "read_now"),
        button_discovery(topics, device, "reboot", "Paludarium Reboot", "reboot"),
    ]
}

pub fn health_payload(health: SensorHealth) -> &'static str {
    health.as_str()
}

/// Retained state to publish each time a broker session comes up, in order:
/// availability, discovery configs, then the last health sent (if any).
///
/// A reconnect follows the broker publishing our `offline` will, so all of
/// it goes out again, not just on boot.
pub fn session_messages(
    topics: &Topics,
    device: &DeviceInfo,
    health: Option<SensorHealth>,
) -> Vec<Retained> {
    let mut messages = vec![Retained {
        topic: topics.availability.clone(),
        payload: PAYLOAD_ONLINE.to_string(),
    }];
    messages.extend(discovery_messages(topics, device));
    if let Some(health) = health {
        messages.push(Retained {
            topic: topics.health.clone(),
            payload: health_payload(health).to_string(),
        });
    }
    messages
}

/// Health is published on change only; this remembers what went out last.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthLatch {
    last: Option<SensorHealth>,
}

impl HealthLatch {
    pub fn is_new(&self, health: SensorHealth) -> bool {
        self.last != Some(health)
    }

    pub fn record(&mut self, health: SensorHealth) {
        self.last = Some(health);
    }

    pub fn last(&self) -> Option<SensorHealth> {
        self.last
    }
}
