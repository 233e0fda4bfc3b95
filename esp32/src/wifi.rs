use embedded_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::modem::Modem;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::EspWifi;
use log::info;

use roomsense_common::cycle::{BoxError, NetworkLink};

use crate::config::{WIFI_PASSWORD, WIFI_SSID};

/// The WPA2 station link. The join itself is asynchronous in the
/// driver; the main cycle polls [`NetworkLink::is_connected`] until an
/// address has been obtained, retrying forever.
pub struct Station {
    wifi: EspWifi<'static>,
}

impl Station {
    pub fn new(
        modem: Modem,
        sys_loop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
    ) -> anyhow::Result<Self> {
        let mut wifi = EspWifi::new(modem, sys_loop, Some(nvs))?;

        let wifi_configuration: Configuration = Configuration::Client(ClientConfiguration {
            ssid: WIFI_SSID.try_into().unwrap(),
            bssid: None,
            auth_method: AuthMethod::WPA2Personal,
            password: WIFI_PASSWORD.try_into().unwrap(),
            channel: None,
            ..Default::default()
        });
        wifi.set_configuration(&wifi_configuration)?;

        Ok(Self { wifi })
    }
}

impl NetworkLink for Station {
    fn start_join(&mut self) -> Result<(), BoxError> {
        self.wifi.start()?;
        info!("Wifi started");

        self.wifi.connect()?;
        Ok(())
    }

    fn is_connected(&mut self) -> Result<bool, BoxError> {
        // Up means both associated and holding a DHCP address.
        Ok(self.wifi.is_up()?)
    }

    fn address(&mut self) -> Result<String, BoxError> {
        let ip_info = self.wifi.sta_netif().get_ip_info()?;
        Ok(ip_info.ip.to_string())
    }
}
