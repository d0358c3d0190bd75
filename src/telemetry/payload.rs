//! Wire payloads.
//!
//! Two fixed JSON shapes are supported. Field names are part of the
//! endpoint contract and must not change.
//!
//! Flat:
//!
//! ```json
//! {"temperature":22.5,"humidity":48.0,"visible_plus_ir":120,"infrared":40}
//! ```
//!
//! Nested (sent with `Authorization: Bearer <token>`):
//!
//! ```json
//! {"temperatureReading":{"value":22.5},"humidityReading":{"value":48.0},
//!  "lightReading":{"visible_plus_ir_value":120,"infrared_value":40}}
//! ```

use crate::sensors::Reading;
use serde::Serialize;
use std::fmt;
use zeroize::Zeroizing;

/// Secret used for the `Authorization` header.
#[derive(Clone)]
pub struct BearerToken(Zeroizing<String>);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Zeroizing::new(token.into()))
    }

    /// Value for the `Authorization` header.
    pub fn header_value(&self) -> Zeroizing<String> {
        Zeroizing::new(format!("Bearer {}", self.0.as_str()))
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// Shape of the JSON document sent to the endpoint.
#[derive(Debug, Clone)]
pub enum PayloadFormat {
    /// Flat object. Absent light values are sent as `0`, so a receiver
    /// cannot tell "no fresh data" from "dark".
    Flat,
    /// Nested object with bearer authentication. `lightReading` is left out
    /// when there is no fresh light data.
    Nested { token: BearerToken },
}

impl PayloadFormat {
    /// Serialize `reading` in this format.
    pub fn encode(&self, reading: &Reading) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Self::Flat => serde_json::to_vec(&FlatPayload::from(reading)),
            Self::Nested { .. } => serde_json::to_vec(&NestedPayload::from(reading)),
        }
    }

    /// Token to send, if this format authenticates.
    pub fn bearer_token(&self) -> Option<&BearerToken> {
        match self {
            Self::Flat => None,
            Self::Nested { token } => Some(token),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Nested { .. } => "nested",
        }
    }
}

#[derive(Serialize)]
struct FlatPayload {
    temperature: f32,
    humidity: f32,
    visible_plus_ir: u16,
    infrared: u16,
}

impl From<&Reading> for FlatPayload {
    fn from(reading: &Reading) -> Self {
        Self {
            temperature: reading.temperature,
            humidity: reading.humidity,
            visible_plus_ir: reading.visible_plus_ir().unwrap_or(0),
            infrared: reading.infrared().unwrap_or(0),
        }
    }
}

#[derive(Serialize)]
struct ValueReading {
    value: f32,
}

#[derive(Serialize)]
struct LightValues {
    visible_plus_ir_value: u16,
    infrared_value: u16,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NestedPayload {
    temperature_reading: ValueReading,
    humidity_reading: ValueReading,
    #[serde(skip_serializing_if = "Option::is_none")]
    light_reading: Option<LightValues>,
}

impl From<&Reading> for NestedPayload {
    fn from(reading: &Reading) -> Self {
        Self {
            temperature_reading: ValueReading {
                value: reading.temperature,
            },
            humidity_reading: ValueReading {
                value: reading.humidity,
            },
            light_reading: reading.light.map(|l| LightValues {
                visible_plus_ir_value: l.visible_plus_ir,
                infrared_value: l.infrared,
            }),
        }
    }
}
