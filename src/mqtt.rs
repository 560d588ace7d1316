use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
// embedded-svc defines the MQTT traits and event payloads used across platforms.
use embedded_svc::mqtt::client::{EventPayload, QoS};
// esp-idf-svc provides the ESP-IDF backed MQTT client implementation and config.
use esp_idf_svc::mqtt::client::{EspMqttClient, LwtConfiguration, MqttClientConfiguration};
use log::{info, warn};

use paludarium::config::{
    mqtt_port, MQTT_CLIENT_ID, MQTT_HOST, MQTT_PASS, MQTT_PREFIX, MQTT_USER, SW_VERSION,
};
use paludarium::telemetry::{
    health_payload, parse_command, reading_messages, session_messages, Command, DeviceInfo,
    HealthLatch, Topics, PAYLOAD_OFFLINE,
};
use paludarium::{Reading, SensorHealth};

use crate::wifi::WifiLink;

// What the connection thread hands to the main loop.
enum Inbound {
    Connected,
    Command(Command),
}

pub struct MqttClient {
    client: EspMqttClient<'static>,
    inbound: Receiver<Inbound>,
    topics: Topics,
    device: DeviceInfo,
    health: HealthLatch,
}

impl MqttClient {
    /// Retained so a restarted dashboard sees the latest value at once.
    pub fn publish_reading(&mut self, reading: &Reading) -> Result<()> {
        for (topic, payload) in reading_messages(&self.topics, reading) {
            self.client
                .publish(topic, QoS::AtLeastOnce, true, payload.as_bytes())?;
        }
        Ok(())
    }

    /// Publishes only on change.
    pub fn publish_health(&mut self, health: SensorHealth) -> Result<()> {
        if !self.health.is_new(health) {
            return Ok(());
        }
        self.client.publish(
            &self.topics.health,
            QoS::AtLeastOnce,
            true,
            health_payload(health).as_bytes(),
        )?;
        self.health.record(health);
        Ok(())
    }

    /// Next command from the broker. Re-announces the node on the way when
    /// the connection thread reports a reconnect.
    pub fn try_recv_command(&mut self) -> Option<Command> {
        loop {
            match self.inbound.try_recv().ok()? {
                Inbound::Command(command) => return Some(command),
                Inbound::Connected => {
                    info!("MQTT reconnected, restoring session");
                    if let Err(err) = self.announce() {
                        warn!("MQTT session restore failed: {err:?}");
                    }
                }
            }
        }
    }

    // Subscriptions do not survive a clean session, and the broker has
    // published our `offline` will by the time we are back.
    fn announce(&mut self) -> Result<()> {
        self.client.subscribe(&self.topics.cmd, QoS::AtLeastOnce)?;
        for message in session_messages(&self.topics, &self.device, self.health.last()) {
            self.client.publish(
                &message.topic,
                QoS::AtLeastOnce,
                true,
                message.payload.as_bytes(),
            )?;
        }
        Ok(())
    }
}

pub fn init_mqtt(wifi: &mut WifiLink) -> Result<MqttClient> {
    wifi.ensure_up()?;

    let topics = Topics::new(MQTT_PREFIX);
    let url = format!("mqtt://{}:{}", MQTT_HOST, mqtt_port());
    let mut conf = MqttClientConfiguration::default();
    conf.client_id = Some(MQTT_CLIENT_ID);
    conf.username = MQTT_USER;
    conf.password = MQTT_PASS;
    conf.keep_alive_interval = Some(Duration::from_secs(30));
    conf.network_timeout = Duration::from_secs(5);
    conf.lwt = Some(LwtConfiguration {
        topic: &topics.availability,
        payload: PAYLOAD_OFFLINE.as_bytes(),
        qos: QoS::AtLeastOnce,
        retain: true,
    });

    let (client, mut conn) = EspMqttClient::new(&url, &conf)?;
    let (tx, inbound) = mpsc::channel::<Inbound>();
    let cmd_topic = topics.cmd.clone();

    // ESP-IDF delivers connection events here for the life of the client,
    // including every automatic reconnect.
    thread::spawn(move || loop {
        match conn.next() {
            Ok(event) => match event.payload() {
                EventPayload::Connected(_) => {
                    let _ = tx.send(Inbound::Connected);
                }
                EventPayload::Disconnected => warn!("MQTT disconnected"),
                EventPayload::Received { topic, data, .. } => {
                    if topic == Some(cmd_topic.as_str()) {
                        match parse_command(data) {
                            Some(command) => {
                                let _ = tx.send(Inbound::Command(command));
                            }
                            None => warn!(
                                "MQTT command ignored: {:?}",
                                String::from_utf8_lossy(data)
                            ),
                        }
                    }
                }
                _ => {}
            },
            Err(_) => {
                thread::sleep(Duration::from_millis(100));
            }
        }
    });

    // The first session is announced here; later ones from try_recv_command.
    match inbound.recv_timeout(Duration::from_secs(5)) {
        Ok(Inbound::Connected) => {}
        Ok(Inbound::Command(_)) => return Err(anyhow!("MQTT command before connect")),
        Err(RecvTimeoutError::Timeout) => return Err(anyhow!("MQTT connect timeout")),
        Err(RecvTimeoutError::Disconnected) => return Err(anyhow!("MQTT event loop ended")),
    }

    let mut client = MqttClient {
        client,
        inbound,
        topics,
        device: DeviceInfo::new(MQTT_PREFIX, SW_VERSION),
        health: HealthLatch::default(),
    };
    client.announce()?;

    info!("MQTT connected to {}", url);
    Ok(client)
}
