//! Environmental sensing.
//!
//! This module contains:
//! - [`sht31`]: SHT31 temperature/humidity sensor on the `sht3x` driver
//! - [`ltr329`]: LTR-329 ambient light driver
//!
//! and the [`SensorSampler`] that turns both into one [`Reading`] per cycle.

mod ltr329;
mod sht31;

pub use ltr329::{
    Gain, IntegrationTime, LightSensorConfig, Ltr329, MeasurementRate, LTR329_ADDRESS,
};
pub use sht31::{DelayCompat, I2cCompat, Measurement, Sht31, ShtAddress};

use log::{debug, info};
use std::fmt;

/// Both light channels, captured together from one conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightChannels {
    /// Channel 0: visible plus infrared.
    pub visible_plus_ir: u16,
    /// Channel 1: infrared only.
    pub infrared: u16,
}

/// One cycle's sensor values.
///
/// `light` is `None` when the light sensor had no fresh, valid data this
/// cycle. Values from earlier cycles are never carried over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Degrees Celsius.
    pub temperature: f32,
    /// Percent relative humidity.
    pub humidity: f32,
    pub light: Option<LightChannels>,
}

impl Reading {
    pub fn visible_plus_ir(&self) -> Option<u16> {
        self.light.map(|l| l.visible_plus_ir)
    }

    pub fn infrared(&self) -> Option<u16> {
        self.light.map(|l| l.infrared)
    }
}

/// Temperature and humidity peripheral.
///
/// Reads always produce a value; drivers report a failed conversion as `NaN`.
pub trait ClimateSensor {
    fn read_temperature(&mut self) -> f32;
    fn read_humidity(&mut self) -> f32;
}

/// Dual-channel ambient light peripheral.
pub trait LightSensor {
    /// Whether a conversion finished since the last data read.
    fn new_data_available(&mut self) -> bool;

    /// Read both channels as a pair. `None` if the peripheral flags the data
    /// as invalid or the read fails.
    fn read_both_channels(&mut self) -> Option<LightChannels>;
}

/// Samples both peripherals into a [`Reading`].
pub struct SensorSampler<C, L> {
    climate: C,
    light: L,
}

impl<C: ClimateSensor, L: LightSensor> SensorSampler<C, L> {
    pub fn new(climate: C, light: L) -> Self {
        Self { climate, light }
    }

    /// Take one reading.
    pub fn sample(&mut self) -> Reading {
        let light = if self.light.new_data_available() {
            let channels = self.light.read_both_channels();
            match channels {
                Some(c) => info!("Light: visible+IR={} IR={}", c.visible_plus_ir, c.infrared),
                None => debug!("Light data flagged invalid, discarded"),
            }
            channels
        } else {
            debug!("No new light data this cycle");
            None
        };

        let temperature = self.climate.read_temperature();
        let humidity = self.climate.read_humidity();
        info!("Temperature: {:.2} C, humidity: {:.2} %", temperature, humidity);

        Reading {
            temperature,
            humidity,
            light,
        }
    }
}

/// Errors from the sensor drivers.
#[derive(Debug)]
pub enum SensorError<E> {
    /// I2C transaction failed.
    I2c(E),
    /// Response failed its CRC check.
    Crc,
    /// The device did not identify as the expected part.
    NotDetected,
}

impl<E: fmt::Debug> fmt::Display for SensorError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I2c(e) => write!(f, "I2C error: {:?}", e),
            Self::Crc => write!(f, "CRC mismatch"),
            Self::NotDetected => write!(f, "sensor not detected"),
        }
    }
}

impl<E: fmt::Debug> std::error::Error for SensorError<E> {}
