//! Network link management.
//!
//! The [`ConnectivityManager`] brings the WiFi link up once at boot, using
//! either credentials fixed at build time or the self-provisioning flow
//! (stored credentials, then a captive portal). Afterwards it only reports
//! the radio's link state.
//!
//! - [`esp`]: ESP-IDF radio implementation (ESP32 only)

#[cfg(feature = "esp32")]
mod esp;

#[cfg(feature = "esp32")]
pub use esp::EspRadio;

use crate::config::WifiConfig;
use crate::indicator::{DeviceStatus, PixelDriver, StatusIndicator};
use crate::wifi::PortalError;
use embedded_hal::delay::DelayNs;
use log::{error, info, warn};
use std::fmt;
use std::time::Duration;

/// Link state as reported by the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

impl From<bool> for ConnectionState {
    fn from(connected: bool) -> Self {
        if connected {
            Self::Connected
        } else {
            Self::Disconnected
        }
    }
}

/// The radio operations the firmware depends on.
pub trait Radio {
    /// Join the network described by `credentials`.
    fn connect_with_credentials(&mut self, credentials: &WifiConfig) -> Result<(), RadioError>;

    /// Join using stored credentials, falling back to a captive portal to
    /// collect new ones.
    fn connect_with_portal(&mut self, portal: &PortalConfig) -> Result<(), RadioError>;

    fn is_connected(&self) -> bool;
}

/// How often to retry a fixed-credential connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Pause between attempts.
    pub delay: Duration,
    /// Give up after this many attempts. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
            max_attempts: None,
        }
    }
}

/// Captive portal settings for self-provisioning.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// Credentials of the access point the portal is served on.
    pub access_point: WifiConfig,
    /// TCP port of the portal.
    pub port: u16,
    /// Stop waiting for credentials after this long. `None` waits forever.
    pub timeout: Option<Duration>,
}

/// Default access point name for the setup portal.
pub const DEFAULT_PORTAL_SSID: &str = "EnvSensor-Setup";

/// Default portal timeout.
pub const DEFAULT_PORTAL_TIMEOUT: Duration = Duration::from_secs(180);

/// How the device gets onto the network.
#[derive(Debug, Clone)]
pub enum Provisioning {
    /// Credentials fixed at build time, retried until connected.
    Fixed {
        credentials: WifiConfig,
        retry: RetryPolicy,
    },
    /// Stored credentials or a captive portal.
    Portal(PortalConfig),
}

impl Provisioning {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fixed { .. } => "fixed",
            Self::Portal(_) => "portal",
        }
    }
}

/// Owns the radio and the provisioning strategy.
pub struct ConnectivityManager<R> {
    radio: R,
    provisioning: Provisioning,
}

impl<R: Radio> ConnectivityManager<R> {
    pub fn new(radio: R, provisioning: Provisioning) -> Self {
        Self {
            radio,
            provisioning,
        }
    }

    /// Bring the link up, blocking until it resolves.
    ///
    /// The indicator shows provisioning while connecting and connected on
    /// success.
    pub fn connect<P: PixelDriver, D: DelayNs>(
        &mut self,
        indicator: &mut StatusIndicator<P>,
        delay: &mut D,
    ) -> Result<ConnectionState, ConnectError> {
        indicator.show(DeviceStatus::Provisioning);

        match &self.provisioning {
            Provisioning::Fixed { credentials, retry } => {
                connect_with_retry(&mut self.radio, credentials, retry, delay)?;
            }
            Provisioning::Portal(portal) => {
                info!("Starting self-provisioning (portal AP: {})", portal.access_point.ssid);
                self.radio.connect_with_portal(portal).map_err(|e| {
                    error!("Provisioning failed: {}", e);
                    ConnectError::Provisioning(e)
                })?;
            }
        }

        info!("Connected to the WiFi network");
        indicator.show(DeviceStatus::Connected);
        Ok(ConnectionState::Connected)
    }

    /// Current link state, queried from the radio.
    pub fn state(&self) -> ConnectionState {
        self.radio.is_connected().into()
    }

    pub fn provisioning(&self) -> &Provisioning {
        &self.provisioning
    }

    /// Access the underlying radio.
    pub fn radio(&self) -> &R {
        &self.radio
    }
}

fn connect_with_retry<R: Radio, D: DelayNs>(
    radio: &mut R,
    credentials: &WifiConfig,
    retry: &RetryPolicy,
    delay: &mut D,
) -> Result<(), ConnectError> {
    let mut attempts: u32 = 0;
    loop {
        attempts = attempts.saturating_add(1);
        match radio.connect_with_credentials(credentials) {
            Ok(()) => return Ok(()),
            Err(e) => warn!("Connecting to WiFi.. (attempt {}: {})", attempts, e),
        }

        if retry.max_attempts.is_some_and(|max| attempts >= max) {
            error!("Giving up on WiFi after {} attempts", attempts);
            return Err(ConnectError::RetriesExhausted { attempts });
        }

        delay.delay_ms(duration_to_ms(retry.delay));
    }
}

/// Milliseconds for a `DelayNs` call, saturating at `u32::MAX`.
pub(crate) fn duration_to_ms(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

/// Errors from the radio.
#[derive(Debug)]
pub enum RadioError {
    /// Could not associate or obtain an address.
    ConnectionFailed(String),
    /// No stored credentials are available.
    NotConfigured,
    /// The portal timed out without receiving credentials.
    PortalTimeout,
    /// The portal server failed.
    Portal(PortalError),
    /// Any other platform error.
    Platform(String),
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailed(reason) => write!(f, "connection failed: {}", reason),
            Self::NotConfigured => write!(f, "no WiFi credentials stored"),
            Self::PortalTimeout => write!(f, "configuration portal timed out"),
            Self::Portal(e) => write!(f, "portal error: {}", e),
            Self::Platform(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for RadioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Portal(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PortalError> for RadioError {
    fn from(e: PortalError) -> Self {
        Self::Portal(e)
    }
}

/// Errors from [`ConnectivityManager::connect`].
#[derive(Debug)]
pub enum ConnectError {
    /// Fixed-credential connection hit its attempt cap.
    RetriesExhausted { attempts: u32 },
    /// Self-provisioning failed; the device should restart.
    Provisioning(RadioError),
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RetriesExhausted { attempts } => {
                write!(f, "WiFi not connected after {} attempts", attempts)
            }
            Self::Provisioning(e) => write!(f, "provisioning failed: {}", e),
        }
    }
}

impl std::error::Error for ConnectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Provisioning(e) => Some(e),
            _ => None,
        }
    }
}
