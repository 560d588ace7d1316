use anyhow::{anyhow, Result};
use embedded_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::{info, warn};

use paludarium::config::{WIFI_PASS, WIFI_SSID};

/// Station link to the configured access point. The node samples without
/// it; MQTT needs it up.
pub struct WifiLink {
    wifi: BlockingWifi<EspWifi<'static>>,
    drops: u32,
}

impl WifiLink {
    pub fn connect(modem: Modem) -> Result<Self> {
        let config = station_config()?;
        let sys_loop = EspSystemEventLoop::take()?;
        let nvs = EspDefaultNvsPartition::take()?;
        let mut wifi = BlockingWifi::wrap(
            EspWifi::new(modem, sys_loop.clone(), Some(nvs))?,
            sys_loop,
        )?;
        wifi.set_configuration(&config)?;

        let mut link = Self { wifi, drops: 0 };
        link.bring_up()?;
        let ip = link.wifi.wifi().sta_netif().get_ip_info()?.ip;
        info!("WiFi up on {WIFI_SSID}, IP {ip}");
        Ok(link)
    }

    /// Reconnect if the AP dropped the station. Returns `true` when it had
    /// to, so the caller can restore sessions riding on the link.
    pub fn ensure_up(&mut self) -> Result<bool> {
        if self.wifi.is_started()? && self.wifi.is_connected()? {
            return Ok(false);
        }
        self.drops += 1;
        warn!("WiFi down (drop #{}), reconnecting to {WIFI_SSID}", self.drops);
        self.bring_up()?;
        Ok(true)
    }

    fn bring_up(&mut self) -> Result<()> {
        if !self.wifi.is_started()? {
            self.wifi.start()?;
        }
        if !self.wifi.is_connected()? {
            self.wifi.connect()?;
        }
        self.wifi.wait_netif_up()?;
        Ok(())
    }
}

fn station_config() -> Result<Configuration> {
    if WIFI_SSID == "YOUR_WIFI_SSID" {
        return Err(anyhow!("WIFI_SSID not configured"));
    }
    let auth_method = match WIFI_PASS {
        "" => AuthMethod::None,
        _ => AuthMethod::WPA2Personal,
    };
    Ok(Configuration::Client(ClientConfiguration {
        ssid: WIFI_SSID
            .try_into()
            .map_err(|_| anyhow!("WIFI_SSID longer than 32 bytes"))?,
        password: WIFI_PASS
            .try_into()
            .map_err(|_| anyhow!("WIFI_PASS longer than 64 bytes"))?,
        auth_method,
        ..Default::default()
    }))
}
