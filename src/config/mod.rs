//! Firmware configuration.
//!
//! # Components
//!
//! - [`wifi`] - WiFi credential types and validation
//! - [`firmware`] - build-time settings for the whole firmware

mod firmware;
mod wifi;

pub use firmware::{FirmwareConfig, DEFAULT_STARTUP_DELAY};
pub use wifi::{ConfigError, WifiConfig, MAX_PASSWORD_LEN, MAX_SSID_LEN, MIN_PASSWORD_LEN};
