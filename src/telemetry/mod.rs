//! Telemetry delivery.
//!
//! This module contains:
//! - [`payload`]: JSON payload shapes and bearer tokens
//! - [`esp_http`]: ESP-IDF HTTP client transport (ESP32 only)
//!
//! The [`TelemetryPublisher`] sends one reading per call and classifies the
//! HTTP outcome into a [`DeviceStatus`]. Only `201 Created` counts as
//! delivered.

mod payload;

#[cfg(feature = "esp32")]
mod esp_http;

pub use payload::{BearerToken, PayloadFormat};

#[cfg(feature = "esp32")]
pub use esp_http::EspHttpTransport;

use crate::connectivity::ConnectionState;
use crate::indicator::DeviceStatus;
use crate::sensors::Reading;
use log::{error, info, warn};
use std::fmt;

/// Status code the endpoint answers with when it stored the reading.
pub const HTTP_CREATED: u16 = 201;

/// A blocking HTTP client that handles one request at a time.
///
/// A request is built with [`begin`](Self::begin) and
/// [`add_header`](Self::add_header), sent with [`post`](Self::post), and the
/// connection is released with [`end`](Self::end).
pub trait HttpTransport {
    /// Open a request to `uri`.
    fn begin(&mut self, uri: &str) -> Result<(), TransportError>;

    /// Add a request header. Must be called after `begin`.
    fn add_header(&mut self, name: &str, value: &str);

    /// Send the request with `body`, returning the response status code.
    fn post(&mut self, body: &[u8]) -> Result<u16, TransportError>;

    /// Body of the response to the last successful `post`.
    fn response_body(&mut self) -> Result<String, TransportError>;

    /// Release the connection and any request state.
    fn end(&mut self);
}

/// Transport-level failures, before any HTTP status was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Could not open a connection to the server.
    ConnectionRefused,
    /// Request headers could not be sent.
    SendHeaderFailed,
    /// Request body could not be sent.
    SendPayloadFailed,
    /// The connection dropped mid-request.
    ConnectionLost,
    /// The server did not answer in time.
    ReadTimeout,
    /// The URI could not be used.
    InvalidUri(String),
    /// Any other platform error.
    Platform(String),
}

impl TransportError {
    /// Negative code in the numbering used by Arduino-style HTTP clients.
    pub fn code(&self) -> i32 {
        match self {
            Self::ConnectionRefused => -1,
            Self::SendHeaderFailed => -2,
            Self::SendPayloadFailed => -3,
            Self::ConnectionLost => -5,
            Self::ReadTimeout => -11,
            Self::InvalidUri(_) | Self::Platform(_) => -1,
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionRefused => write!(f, "connection refused"),
            Self::SendHeaderFailed => write!(f, "failed to send headers"),
            Self::SendPayloadFailed => write!(f, "failed to send payload"),
            Self::ConnectionLost => write!(f, "connection lost"),
            Self::ReadTimeout => write!(f, "read timeout"),
            Self::InvalidUri(uri) => write!(f, "invalid URI: {}", uri),
            Self::Platform(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

/// Classify a response code.
///
/// Non-positive codes are transport failures; any positive code other than
/// 201 is a rejected delivery.
pub fn classify(code: i32) -> DeviceStatus {
    if code == HTTP_CREATED as i32 {
        DeviceStatus::Delivered
    } else {
        DeviceStatus::DeliveryFailed
    }
}

/// Where and how readings are sent.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub endpoint: String,
    pub format: PayloadFormat,
}

/// A request in flight. Dropping it ends the request on the transport.
struct Session<'a, T: HttpTransport> {
    transport: &'a mut T,
}

impl<'a, T: HttpTransport> Session<'a, T> {
    fn begin(transport: &'a mut T, uri: &str) -> Result<Self, TransportError> {
        let session = Self { transport };
        session.transport.begin(uri)?;
        Ok(session)
    }
}

impl<T: HttpTransport> Drop for Session<'_, T> {
    fn drop(&mut self) {
        self.transport.end();
    }
}

/// Serializes readings and posts them to the endpoint.
pub struct TelemetryPublisher<T> {
    transport: T,
    config: PublisherConfig,
}

impl<T: HttpTransport> TelemetryPublisher<T> {
    pub fn new(transport: T, config: PublisherConfig) -> Self {
        Self { transport, config }
    }

    /// Deliver one reading and report the resulting device status.
    ///
    /// Makes at most one attempt. When `state` is disconnected the transport
    /// is not touched at all.
    pub fn publish(&mut self, reading: &Reading, state: ConnectionState) -> DeviceStatus {
        if state == ConnectionState::Disconnected {
            error!("Error in WiFi connection");
            return DeviceStatus::Disconnected;
        }

        let body = match self.config.format.encode(reading) {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to encode reading: {}", e);
                return DeviceStatus::DeliveryFailed;
            }
        };

        let session = match Session::begin(&mut self.transport, &self.config.endpoint) {
            Ok(session) => session,
            Err(e) => {
                error!("Error on sending POST: {} ({})", e.code(), e);
                return DeviceStatus::DeliveryFailed;
            }
        };

        session.transport.add_header("Content-Type", "application/json");
        if let Some(token) = self.config.format.bearer_token() {
            session
                .transport
                .add_header("Authorization", token.header_value().as_str());
        }

        match session.transport.post(&body) {
            Ok(code) => {
                match session.transport.response_body() {
                    Ok(response) => info!("HTTP {}: {}", code, response),
                    Err(e) => warn!("HTTP {}, failed to read response: {}", code, e),
                }
                classify(code as i32)
            }
            Err(e) => {
                error!("Error on sending POST: {} ({})", e.code(), e);
                classify(e.code())
            }
        }
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Access the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }
}
