//! WiFi connection management.
//!
//! Wraps the ESP-IDF WiFi driver for the two roles the firmware needs:
//! station mode to reach the telemetry endpoint, and access point mode to
//! serve the setup portal.

use crate::config::WifiConfig;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{
    AccessPointConfiguration, AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi,
};
use esp_idf_sys::EspError;
use log::info;
use std::net::Ipv4Addr;

/// WiFi connection manager.
pub struct WifiManager<'a> {
    wifi: BlockingWifi<EspWifi<'a>>,
}

impl<'a> WifiManager<'a> {
    /// Create a new WiFi manager.
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
    ) -> Result<Self, EspError> {
        let esp_wifi = EspWifi::new(modem, sysloop.clone(), nvs)?;
        let wifi = BlockingWifi::wrap(esp_wifi, sysloop)?;

        Ok(Self { wifi })
    }

    /// Join a network in station mode.
    ///
    /// Returns the IP address on success.
    pub fn connect(&mut self, config: &WifiConfig) -> Result<Ipv4Addr, WifiError> {
        info!("Connecting to WiFi: {}", config.ssid);

        let auth_method = if config.is_open() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };

        let wifi_config = Configuration::Client(ClientConfiguration {
            ssid: config
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| WifiError::InvalidSsid)?,
            password: config
                .password
                .as_str()
                .try_into()
                .map_err(|_| WifiError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });

        self.restart_with(&wifi_config)?;

        // Relies on ESP-IDF's internal timeout
        self.wifi.connect().map_err(WifiError::ConnectionFailed)?;
        self.wifi.wait_netif_up().map_err(WifiError::DhcpFailed)?;

        let ip = self.wifi.wifi().sta_netif().get_ip_info()?.ip;
        info!("Connected to WiFi, IP: {}", ip);
        Ok(ip)
    }

    /// Bring up an access point for the setup portal.
    ///
    /// Returns the address clients reach the device on.
    pub fn start_access_point(&mut self, config: &WifiConfig) -> Result<Ipv4Addr, WifiError> {
        info!("Starting access point: {}", config.ssid);

        let auth_method = if config.is_open() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };

        let ap_config = Configuration::AccessPoint(AccessPointConfiguration {
            ssid: config
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| WifiError::InvalidSsid)?,
            password: config
                .password
                .as_str()
                .try_into()
                .map_err(|_| WifiError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });

        self.restart_with(&ap_config)?;
        self.wifi.wait_netif_up()?;

        let ip = self.wifi.wifi().ap_netif().get_ip_info()?.ip;
        info!("Access point up, IP: {}", ip);
        Ok(ip)
    }

    /// Check if currently connected in station mode.
    pub fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    fn restart_with(&mut self, config: &Configuration) -> Result<(), EspError> {
        if self.wifi.is_started()? {
            self.wifi.stop()?;
        }
        self.wifi.set_configuration(config)?;
        self.wifi.start()
    }
}

/// Errors that can occur during WiFi operations.
#[derive(Debug)]
pub enum WifiError {
    /// SSID is invalid (too long or contains invalid characters).
    InvalidSsid,
    /// Password is invalid.
    InvalidPassword,
    /// Failed to connect to the network.
    ConnectionFailed(EspError),
    /// Failed to obtain IP address via DHCP.
    DhcpFailed(EspError),
    /// ESP-IDF error.
    EspError(EspError),
}

impl From<EspError> for WifiError {
    fn from(e: EspError) -> Self {
        Self::EspError(e)
    }
}

impl std::fmt::Display for WifiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "invalid SSID"),
            Self::InvalidPassword => write!(f, "invalid password"),
            Self::ConnectionFailed(e) => write!(f, "connection failed: {:?}", e),
            Self::DhcpFailed(e) => write!(f, "DHCP failed: {:?}", e),
            Self::EspError(e) => write!(f, "ESP error: {:?}", e),
        }
    }
}

impl std::error::Error for WifiError {}
