//! NVS persistence for WiFi credentials.
//!
//! Credentials entered through the setup portal are kept in Non-Volatile
//! Storage so the device rejoins the network after a reboot without
//! serving the portal again.

use crate::config::{WifiConfig, MAX_PASSWORD_LEN, MAX_SSID_LEN};
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use esp_idf_sys::EspError;
use zeroize::Zeroizing;

/// NVS namespace for WiFi configuration.
const NVS_NAMESPACE: &str = "wifi_config";

/// NVS key for stored credentials.
const NVS_KEY: &str = "credentials";

/// Format: [ssid_len:1][ssid:32][password_len:1][password:64] = 98 bytes.
const MAX_CONFIG_BUFFER_SIZE: usize = 1 + MAX_SSID_LEN + 1 + MAX_PASSWORD_LEN + 4;

/// Open the credential namespace on the default partition.
pub fn open_wifi_storage(
    partition: EspDefaultNvsPartition,
) -> Result<EspNvs<NvsDefault>, EspError> {
    EspNvs::new(partition, NVS_NAMESPACE, true)
}

/// Load WiFi configuration from NVS.
///
/// Returns `None` if nothing is stored or the entry is corrupted.
pub fn load_wifi_config(nvs: &EspNvs<NvsDefault>) -> Option<WifiConfig> {
    let mut buf = [0u8; MAX_CONFIG_BUFFER_SIZE];
    let bytes = nvs.get_raw(NVS_KEY, &mut buf).ok()??;
    WifiConfig::from_bytes(bytes).ok()
}

/// Save WiFi configuration to NVS.
pub fn save_wifi_config(nvs: &mut EspNvs<NvsDefault>, config: &WifiConfig) -> Result<(), EspError> {
    let bytes = Zeroizing::new(config.to_bytes());
    nvs.set_raw(NVS_KEY, &bytes)?;
    Ok(())
}
