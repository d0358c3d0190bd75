//! ESP-IDF radio.

use super::{PortalConfig, Radio, RadioError};
use crate::config::WifiConfig;
use crate::wifi::{load_wifi_config, save_wifi_config, CaptivePortal, WifiError, WifiManager};
use esp_idf_svc::nvs::{EspNvs, NvsDefault};
use log::{info, warn};

/// WiFi driver plus the NVS namespace holding portal-provided credentials.
pub struct EspRadio<'a> {
    wifi: WifiManager<'a>,
    storage: EspNvs<NvsDefault>,
}

impl<'a> EspRadio<'a> {
    pub fn new(wifi: WifiManager<'a>, storage: EspNvs<NvsDefault>) -> Self {
        Self { wifi, storage }
    }

    /// Run the setup portal on a temporary access point.
    fn collect_credentials(&mut self, portal: &PortalConfig) -> Result<WifiConfig, RadioError> {
        let ip = self
            .wifi
            .start_access_point(&portal.access_point)
            .map_err(wifi_error)?;
        info!(
            "Join '{}' and open http://{}:{}/ to configure WiFi",
            portal.access_point.ssid, ip, portal.port
        );

        let server = CaptivePortal::bind(&format!("0.0.0.0:{}", portal.port))?;
        server.serve(portal.timeout)?.ok_or(RadioError::PortalTimeout)
    }
}

impl Radio for EspRadio<'_> {
    fn connect_with_credentials(&mut self, credentials: &WifiConfig) -> Result<(), RadioError> {
        self.wifi.connect(credentials).map(|_| ()).map_err(wifi_error)
    }

    fn connect_with_portal(&mut self, portal: &PortalConfig) -> Result<(), RadioError> {
        if let Some(stored) = load_wifi_config(&self.storage) {
            info!("Trying stored credentials for '{}'", stored.ssid);
            match self.wifi.connect(&stored) {
                Ok(_) => return Ok(()),
                Err(e) => warn!("Stored credentials failed: {}", e),
            }
        }

        let credentials = self.collect_credentials(portal)?;
        if let Err(e) = save_wifi_config(&mut self.storage, &credentials) {
            warn!("Failed to save credentials: {:?}", e);
        }
        self.connect_with_credentials(&credentials)
    }

    fn is_connected(&self) -> bool {
        self.wifi.is_connected()
    }
}

fn wifi_error(e: WifiError) -> RadioError {
    match e {
        WifiError::ConnectionFailed(_) | WifiError::DhcpFailed(_) => {
            RadioError::ConnectionFailed(e.to_string())
        }
        other => RadioError::Platform(other.to_string()),
    }
}
