//! WiFi driver, credential storage, and setup portal.
//!
//! # Components
//!
//! - [`portal`] - captive HTTP portal collecting credentials
//! - [`connection`] - ESP-IDF WiFi driver wrapper (ESP32 only)
//! - [`storage`] - NVS persistence for credentials (ESP32 only)
//!
//! WiFi configuration types (SSID, password validation, etc.) live in
//! [`crate::config`].

mod portal;

#[cfg(feature = "esp32")]
mod connection;
#[cfg(feature = "esp32")]
mod storage;

pub use portal::{CaptivePortal, PortalError, DEFAULT_PORTAL_PORT};

#[cfg(feature = "esp32")]
pub use connection::{WifiError, WifiManager};
#[cfg(feature = "esp32")]
pub use storage::{load_wifi_config, open_wifi_storage, save_wifi_config};
