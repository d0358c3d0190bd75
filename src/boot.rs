//! Boot failures and what the firmware does about them.

use crate::config::ConfigError;
use crate::connectivity::ConnectError;
use embedded_hal::delay::DelayNs;
use log::error;
use std::fmt;

/// Response to a failure during boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalAction {
    /// Stop doing anything until the device is power-cycled.
    Halt,
    /// Reboot and try again.
    Restart,
}

/// Errors that stop the firmware from reaching the reporting loop.
#[derive(Debug)]
pub enum BootError {
    /// Compiled-in configuration is unusable.
    Config(ConfigError),
    /// A required sensor did not answer on the bus.
    SensorNotDetected(&'static str),
    /// The network link could not be established.
    Connect(ConnectError),
    /// Peripheral or driver initialization failed.
    Platform(String),
}

impl BootError {
    pub fn action(&self) -> FatalAction {
        match self {
            Self::Config(_) | Self::SensorNotDetected(_) => FatalAction::Halt,
            Self::Connect(_) | Self::Platform(_) => FatalAction::Restart,
        }
    }
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid configuration: {}", e),
            Self::SensorNotDetected(name) => write!(f, "Could not find {} sensor", name),
            Self::Connect(e) => write!(f, "{}", e),
            Self::Platform(msg) => write!(f, "platform error: {}", msg),
        }
    }
}

impl std::error::Error for BootError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Connect(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for BootError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ConnectError> for BootError {
    fn from(e: ConnectError) -> Self {
        Self::Connect(e)
    }
}

#[cfg(feature = "esp32")]
impl From<esp_idf_sys::EspError> for BootError {
    fn from(e: esp_idf_sys::EspError) -> Self {
        Self::Platform(e.to_string())
    }
}

/// Park the firmware forever.
pub fn halt<D: DelayNs>(delay: &mut D) -> ! {
    error!("Halted");
    loop {
        delay.delay_ms(1000);
    }
}
