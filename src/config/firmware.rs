//! Firmware settings resolved from build-time environment variables.
//!
//! `build.rs` forwards the keys below from the environment (or `.env`) into
//! the compile, where [`FirmwareConfig::from_build_env`] picks them up with
//! `option_env!`. Parsing itself goes through [`FirmwareConfig::from_lookup`]
//! so it can be tested with any key source.
//!
//! | Key | Default |
//! |-----|---------|
//! | `PROVISIONING` | `fixed` if `WIFI_SSID` is set, else `portal` |
//! | `WIFI_SSID` / `WIFI_PASSWORD` | required for `fixed` |
//! | `PORTAL_SSID` / `PORTAL_PASSWORD` | `EnvSensor-Setup` / open |
//! | `PORTAL_TIMEOUT_SECS` | `180`, `0` waits forever |
//! | `API_URI` | required |
//! | `API_TOKEN` | required for `nested` |
//! | `PAYLOAD_FORMAT` | `flat` (fixed) / `nested` (portal) |
//! | `REPORT_INTERVAL_SECS` | `5` (fixed) / `60` (portal) |
//! | `STATUS_PALETTE` | `green-fault` (fixed) / `red-fault` (portal) |
//! | `CONNECT_RETRY_MS` | `1000` |
//! | `CONNECT_MAX_ATTEMPTS` | `0`, retry forever |
//! | `STARTUP_DELAY_MS` | `4000` |

use super::{ConfigError, WifiConfig};
use crate::connectivity::{
    PortalConfig, Provisioning, RetryPolicy, DEFAULT_PORTAL_SSID, DEFAULT_PORTAL_TIMEOUT,
};
use crate::indicator::Palette;
use crate::telemetry::{BearerToken, PayloadFormat, PublisherConfig};
use crate::wifi::DEFAULT_PORTAL_PORT;
use log::{info, warn};
use std::time::Duration;

/// Pause before the first connection attempt, letting the board settle.
pub const DEFAULT_STARTUP_DELAY: Duration = Duration::from_secs(4);

/// Everything the firmware needs to boot.
#[derive(Debug, Clone)]
pub struct FirmwareConfig {
    pub provisioning: Provisioning,
    pub publisher: PublisherConfig,
    /// Pause between reporting cycles.
    pub report_interval: Duration,
    pub palette: Palette,
    pub startup_delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Fixed,
    Portal,
}

impl FirmwareConfig {
    /// Resolve the configuration compiled into the firmware.
    pub fn from_build_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| build_env(key).map(str::to_string))
    }

    /// Resolve the configuration from `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mode = match get("PROVISIONING") {
            None if get("WIFI_SSID").is_some() => Mode::Fixed,
            None => Mode::Portal,
            Some(v) => match v.to_lowercase().as_str() {
                "fixed" => Mode::Fixed,
                "portal" => Mode::Portal,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "PROVISIONING",
                        value: v,
                    })
                }
            },
        };

        let provisioning = match mode {
            Mode::Fixed => {
                let ssid = get("WIFI_SSID").ok_or(ConfigError::Missing("WIFI_SSID"))?;
                let credentials = WifiConfig::new(ssid, get("WIFI_PASSWORD").unwrap_or_default())?;
                let max_attempts = match parse_number(&get, "CONNECT_MAX_ATTEMPTS")? {
                    None | Some(0) => None,
                    Some(n) => Some(u32::try_from(n).unwrap_or(u32::MAX)),
                };
                Provisioning::Fixed {
                    credentials,
                    retry: RetryPolicy {
                        delay: Duration::from_millis(
                            parse_number(&get, "CONNECT_RETRY_MS")?.unwrap_or(1000),
                        ),
                        max_attempts,
                    },
                }
            }
            Mode::Portal => {
                let ssid = get("PORTAL_SSID").unwrap_or_else(|| DEFAULT_PORTAL_SSID.to_string());
                let password = get("PORTAL_PASSWORD").unwrap_or_default();
                let access_point = WifiConfig::new(ssid, password)?;
                let timeout = match parse_number(&get, "PORTAL_TIMEOUT_SECS")? {
                    None => Some(DEFAULT_PORTAL_TIMEOUT),
                    Some(0) => None,
                    Some(secs) => Some(Duration::from_secs(secs)),
                };
                Provisioning::Portal(PortalConfig {
                    access_point,
                    port: DEFAULT_PORTAL_PORT,
                    timeout,
                })
            }
        };

        let endpoint = get("API_URI").ok_or(ConfigError::Missing("API_URI"))?;
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                key: "API_URI",
                value: endpoint,
            });
        }

        let format_name = get("PAYLOAD_FORMAT").unwrap_or_else(|| match mode {
            Mode::Fixed => "flat".to_string(),
            Mode::Portal => "nested".to_string(),
        });
        let format = match format_name.to_lowercase().as_str() {
            "flat" => {
                if get("API_TOKEN").is_some() {
                    warn!("API_TOKEN is ignored by the flat payload format");
                }
                PayloadFormat::Flat
            }
            "nested" => PayloadFormat::Nested {
                token: BearerToken::new(get("API_TOKEN").ok_or(ConfigError::Missing("API_TOKEN"))?),
            },
            _ => {
                return Err(ConfigError::InvalidValue {
                    key: "PAYLOAD_FORMAT",
                    value: format_name,
                })
            }
        };

        let report_interval = match parse_number(&get, "REPORT_INTERVAL_SECS")? {
            None => match mode {
                Mode::Fixed => Duration::from_secs(5),
                Mode::Portal => Duration::from_secs(60),
            },
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    key: "REPORT_INTERVAL_SECS",
                    value: "0".to_string(),
                })
            }
            Some(secs) => Duration::from_secs(secs),
        };

        let palette = match get("STATUS_PALETTE") {
            None => match mode {
                Mode::Fixed => Palette::GREEN_FAULT,
                Mode::Portal => Palette::RED_FAULT,
            },
            Some(name) => Palette::from_name(&name).ok_or(ConfigError::InvalidValue {
                key: "STATUS_PALETTE",
                value: name,
            })?,
        };

        let startup_delay = parse_number(&get, "STARTUP_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_STARTUP_DELAY);

        Ok(Self {
            provisioning,
            publisher: PublisherConfig { endpoint, format },
            report_interval,
            palette,
            startup_delay,
        })
    }

    /// Log the resolved settings. Secrets are never printed.
    pub fn log_summary(&self) {
        match &self.provisioning {
            Provisioning::Fixed { credentials, retry } => {
                info!("Provisioning: fixed credentials for '{}'", credentials.ssid);
                match retry.max_attempts {
                    Some(max) => info!(
                        "Connect retry: every {:?}, at most {} attempts",
                        retry.delay, max
                    ),
                    None => info!("Connect retry: every {:?}, unbounded", retry.delay),
                }
            }
            Provisioning::Portal(portal) => {
                info!(
                    "Provisioning: portal on AP '{}' port {} (timeout {:?})",
                    portal.access_point.ssid, portal.port, portal.timeout
                );
            }
        }
        info!("Endpoint: {}", self.publisher.endpoint);
        info!("Payload format: {}", self.publisher.format.name());
        info!("Report interval: {:?}", self.report_interval);
    }
}

fn parse_number<G>(get: &G, key: &'static str) -> Result<Option<u64>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|value| {
            value
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue { key, value })
        })
        .transpose()
}

/// Values captured by `build.rs` at compile time.
fn build_env(key: &str) -> Option<&'static str> {
    match key {
        "PROVISIONING" => option_env!("PROVISIONING"),
        "WIFI_SSID" => option_env!("WIFI_SSID"),
        "WIFI_PASSWORD" => option_env!("WIFI_PASSWORD"),
        "PORTAL_SSID" => option_env!("PORTAL_SSID"),
        "PORTAL_PASSWORD" => option_env!("PORTAL_PASSWORD"),
        "PORTAL_TIMEOUT_SECS" => option_env!("PORTAL_TIMEOUT_SECS"),
        "API_URI" => option_env!("API_URI"),
        "API_TOKEN" => option_env!("API_TOKEN"),
        "PAYLOAD_FORMAT" => option_env!("PAYLOAD_FORMAT"),
        "REPORT_INTERVAL_SECS" => option_env!("REPORT_INTERVAL_SECS"),
        "STATUS_PALETTE" => option_env!("STATUS_PALETTE"),
        "CONNECT_RETRY_MS" => option_env!("CONNECT_RETRY_MS"),
        "CONNECT_MAX_ATTEMPTS" => option_env!("CONNECT_MAX_ATTEMPTS"),
        "STARTUP_DELAY_MS" => option_env!("STARTUP_DELAY_MS"),
        _ => None,
    }
}
