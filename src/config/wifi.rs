//! WiFi credential types.
//!
//! Platform-independent credential handling shared by the fixed-credential
//! firmware (credentials baked in at build time) and the self-provisioning
//! firmware (credentials entered through the captive portal and kept in NVS).
//!
//! # Example
//!
//! ```
//! use env_telemetry_esp32::config::WifiConfig;
//!
//! let config = WifiConfig::new("MyNetwork", "MyPassword").unwrap();
//! assert!(config.validate().is_ok());
//! assert!(!config.is_open());
//! ```

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Maximum SSID length per IEEE 802.11 standard.
pub const MAX_SSID_LEN: usize = 32;

/// Maximum password length for WPA2.
pub const MAX_PASSWORD_LEN: usize = 64;

/// Minimum password length for WPA2.
pub const MIN_PASSWORD_LEN: usize = 8;

/// WiFi credentials for connecting to an access point.
///
/// Both fields are wiped from memory when the value is dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct WifiConfig {
    /// Network SSID (1-32 bytes).
    pub ssid: String,
    /// Network password (8-64 bytes for WPA2, empty for open networks).
    pub password: String,
}

impl WifiConfig {
    /// Create a new WiFi configuration.
    ///
    /// Returns an error if SSID or password are invalid.
    pub fn new(ssid: impl Into<String>, password: impl Into<String>) -> Result<Self, ConfigError> {
        let config = Self {
            ssid: ssid.into(),
            password: password.into(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Create a configuration for an open network (no password).
    pub fn open(ssid: impl Into<String>) -> Result<Self, ConfigError> {
        Self::new(ssid, String::new())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ssid.is_empty() {
            return Err(ConfigError::SsidEmpty);
        }
        if self.ssid.len() > MAX_SSID_LEN {
            return Err(ConfigError::SsidTooLong {
                len: self.ssid.len(),
                max: MAX_SSID_LEN,
            });
        }

        // Empty is OK for open networks
        if !self.password.is_empty() && self.password.len() < MIN_PASSWORD_LEN {
            return Err(ConfigError::PasswordTooShort {
                len: self.password.len(),
                min: MIN_PASSWORD_LEN,
            });
        }
        if self.password.len() > MAX_PASSWORD_LEN {
            return Err(ConfigError::PasswordTooLong {
                len: self.password.len(),
                max: MAX_PASSWORD_LEN,
            });
        }

        Ok(())
    }

    /// Check if this is an open network (no password).
    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }

    /// Serialize to bytes for NVS storage.
    ///
    /// Format: `[ssid_len:1][ssid:N][password_len:1][password:M]`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(2 + self.ssid.len() + self.password.len());
        bytes.push(self.ssid.len() as u8);
        bytes.extend_from_slice(self.ssid.as_bytes());
        bytes.push(self.password.len() as u8);
        bytes.extend_from_slice(self.password.as_bytes());
        bytes
    }

    /// Deserialize from the NVS byte format.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let (&ssid_len, rest) = bytes
            .split_first()
            .ok_or_else(|| ConfigError::InvalidFormat("empty data".into()))?;
        let ssid_len = ssid_len as usize;
        if rest.len() < ssid_len + 1 {
            return Err(ConfigError::InvalidFormat("truncated SSID".into()));
        }

        let (ssid_bytes, rest) = rest.split_at(ssid_len);
        let password_len = rest[0] as usize;
        let password_bytes = rest[1..]
            .get(..password_len)
            .ok_or_else(|| ConfigError::InvalidFormat("truncated password".into()))?;

        let ssid = String::from_utf8(ssid_bytes.to_vec())
            .map_err(|_| ConfigError::InvalidFormat("invalid SSID UTF-8".into()))?;
        let password = String::from_utf8(password_bytes.to_vec())
            .map_err(|_| ConfigError::InvalidFormat("invalid password UTF-8".into()))?;

        Self::new(ssid, password)
    }
}

impl fmt::Debug for WifiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiConfig")
            .field("ssid", &self.ssid)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Errors that can occur while building or parsing configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// SSID is empty.
    SsidEmpty,
    /// SSID exceeds maximum length.
    SsidTooLong { len: usize, max: usize },
    /// Password is too short for WPA2.
    PasswordTooShort { len: usize, min: usize },
    /// Password exceeds maximum length.
    PasswordTooLong { len: usize, max: usize },
    /// Invalid data format during deserialization.
    InvalidFormat(String),
    /// A required configuration key is not set.
    Missing(&'static str),
    /// A configuration key holds a value that cannot be used.
    InvalidValue { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SsidEmpty => write!(f, "SSID cannot be empty"),
            Self::SsidTooLong { len, max } => {
                write!(f, "SSID too long: {} bytes (max {})", len, max)
            }
            Self::PasswordTooShort { len, min } => {
                write!(f, "password too short: {} bytes (min {})", len, min)
            }
            Self::PasswordTooLong { len, max } => {
                write!(f, "password too long: {} bytes (max {})", len, max)
            }
            Self::InvalidFormat(msg) => write!(f, "invalid format: {}", msg),
            Self::Missing(key) => write!(f, "{} is not set", key),
            Self::InvalidValue { key, value } => write!(f, "invalid {}: '{}'", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}
