//! Environmental telemetry firmware library.
//!
//! Samples temperature, humidity and ambient light, posts each reading as
//! JSON to an HTTP endpoint, and shows the device state on one RGB pixel.
//!
//! Everything except the ESP-IDF adapters (behind the `esp32` feature) is
//! platform-independent and tested on the host.

pub mod boot;
pub mod config;
pub mod connectivity;
pub mod indicator;
pub mod reporter;
pub mod sensors;
pub mod telemetry;
pub mod wifi;

#[cfg(test)]
mod testing;

// Re-export commonly used items
pub use boot::{BootError, FatalAction};
pub use config::{ConfigError, FirmwareConfig, WifiConfig};
pub use connectivity::{ConnectionState, ConnectivityManager, Provisioning};
pub use indicator::{Color, DeviceStatus, Palette, StatusIndicator};
pub use reporter::Reporter;
pub use sensors::{LightChannels, Reading, SensorSampler};
pub use telemetry::{PayloadFormat, TelemetryPublisher};
