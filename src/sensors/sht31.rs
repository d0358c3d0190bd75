//! Sensirion SHT31 temperature/humidity sensor.
//!
//! Measurements come from the `sht3x` driver (single shot, high
//! repeatability). That driver speaks the `embedded-hal` 0.2 blocking traits,
//! so the 1.0 bus and delay are wrapped in small adapters.

use super::{ClimateSensor, SensorError};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use embedded_hal_0_2::blocking::{delay as delay_0_2, i2c as i2c_0_2};
use log::warn;
use sht3x::{Repeatability, SHT3x};

pub use sht3x::Address as ShtAddress;

/// A converted temperature/humidity pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Degrees Celsius.
    pub temperature: f32,
    /// Percent relative humidity.
    pub humidity: f32,
}

/// `embedded-hal` 1.0 I2C bus presented through the 0.2 blocking traits.
pub struct I2cCompat<I2C>(pub I2C);

impl<I2C: I2c> i2c_0_2::Write for I2cCompat<I2C> {
    type Error = I2C::Error;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        self.0.write(address, bytes)
    }
}

impl<I2C: I2c> i2c_0_2::Read for I2cCompat<I2C> {
    type Error = I2C::Error;

    fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.0.read(address, buffer)
    }
}

impl<I2C: I2c> i2c_0_2::WriteRead for I2cCompat<I2C> {
    type Error = I2C::Error;

    fn write_read(
        &mut self,
        address: u8,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.0.write_read(address, bytes, buffer)
    }
}

/// `embedded-hal` 1.0 delay presented through the 0.2 `DelayMs` traits.
pub struct DelayCompat<D>(pub D);

impl<D: DelayNs> delay_0_2::DelayMs<u8> for DelayCompat<D> {
    fn delay_ms(&mut self, ms: u8) {
        self.0.delay_ms(u32::from(ms));
    }
}

impl<D: DelayNs> delay_0_2::DelayMs<u16> for DelayCompat<D> {
    fn delay_ms(&mut self, ms: u16) {
        self.0.delay_ms(u32::from(ms));
    }
}

impl<D: DelayNs> delay_0_2::DelayMs<u32> for DelayCompat<D> {
    fn delay_ms(&mut self, ms: u32) {
        self.0.delay_ms(ms);
    }
}

/// SHT31 on an I2C bus.
pub struct Sht31<I2C, D> {
    inner: SHT3x<I2cCompat<I2C>, DelayCompat<D>>,
}

impl<I2C: I2c, D: DelayNs> Sht31<I2C, D> {
    pub fn new(i2c: I2C, delay: D, address: ShtAddress) -> Self {
        Self {
            inner: SHT3x::new(I2cCompat(i2c), DelayCompat(delay), address),
        }
    }

    /// Confirm the sensor answers by taking one measurement.
    pub fn probe(&mut self) -> Result<Measurement, SensorError<I2C::Error>> {
        self.measure()
    }

    /// Run one measurement and convert it.
    pub fn measure(&mut self) -> Result<Measurement, SensorError<I2C::Error>> {
        match self.inner.measure(Repeatability::High) {
            // The driver reports hundredths of a degree and of a percent.
            Ok(m) => Ok(Measurement {
                temperature: m.temperature as f32 / 100.0,
                humidity: m.humidity as f32 / 100.0,
            }),
            Err(sht3x::Error::I2c(e)) => Err(SensorError::I2c(e)),
            Err(_) => Err(SensorError::Crc),
        }
    }

    /// Measure and pick one field, logging failures as NaN.
    fn measure_field(&mut self, field: fn(&Measurement) -> f32, name: &str) -> f32 {
        match self.measure() {
            Ok(m) => field(&m),
            Err(e) => {
                warn!("SHT31 {} read failed: {}", name, e);
                f32::NAN
            }
        }
    }
}

impl<I2C: I2c, D: DelayNs> ClimateSensor for Sht31<I2C, D> {
    fn read_temperature(&mut self) -> f32 {
        self.measure_field(|m| m.temperature, "temperature")
    }

    fn read_humidity(&mut self) -> f32 {
        self.measure_field(|m| m.humidity, "humidity")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDelay, FakeI2c};

    /// A 16-bit word followed by its Sensirion CRC-8 (poly 0x31, init 0xFF).
    fn response(word: u16) -> [u8; 3] {
        let [hi, lo] = word.to_be_bytes();
        let mut crc = 0xFFu8;
        for byte in [hi, lo] {
            crc ^= byte;
            for _ in 0..8 {
                crc = if crc & 0x80 != 0 { (crc << 1) ^ 0x31 } else { crc << 1 };
            }
        }
        [hi, lo, crc]
    }

    fn measurement_bytes(temperature: u16, humidity: u16) -> Vec<u8> {
        let mut bytes = response(temperature).to_vec();
        bytes.extend_from_slice(&response(humidity));
        bytes
    }

    fn sensor(i2c: &mut FakeI2c) -> Sht31<&mut FakeI2c, FakeDelay> {
        Sht31::new(i2c, FakeDelay::default(), ShtAddress::Low)
    }

    // ==================== Adapter Tests ====================

    #[test]
    fn test_i2c_compat_forwards_to_bus() {
        use i2c_0_2::{Read, Write};

        let mut i2c = FakeI2c::default();
        i2c.queue_read(&[0xBE, 0xEF]);
        let mut compat = I2cCompat(i2c);

        compat.write(0x44, &[0x24, 0x00]).unwrap();
        let mut buf = [0u8; 2];
        compat.read(0x44, &mut buf).unwrap();

        assert_eq!(buf, [0xBE, 0xEF]);
        assert_eq!(compat.0.writes, vec![(0x44, vec![0x24, 0x00])]);
    }

    #[test]
    fn test_delay_compat_records_milliseconds() {
        use delay_0_2::DelayMs;

        let mut delay = DelayCompat(FakeDelay::default());
        delay.delay_ms(15u8);
        delay.delay_ms(300u16);
        assert_eq!(delay.0.delays_ms, vec![15, 300]);
    }

    // ==================== Driver Tests ====================

    #[test]
    fn test_measure_converts_to_units() {
        let mut i2c = FakeI2c::default();
        i2c.queue_read(&measurement_bytes(0x6666, 0x8000));

        let m = sensor(&mut i2c).measure().unwrap();
        assert!((m.temperature - 25.0).abs() < 0.05, "{}", m.temperature);
        assert!((m.humidity - 50.0).abs() < 0.05, "{}", m.humidity);
    }

    #[test]
    fn test_measure_addresses_default_sensor() {
        let mut i2c = FakeI2c::default();
        i2c.queue_read(&measurement_bytes(0x6666, 0x8000));

        sensor(&mut i2c).measure().unwrap();
        assert_eq!(i2c.writes.len(), 1);
        assert_eq!(i2c.writes[0].0, 0x44);
    }

    #[test]
    fn test_probe_fails_without_device() {
        let mut i2c = FakeI2c {
            fail: true,
            ..Default::default()
        };
        assert!(matches!(
            sensor(&mut i2c).probe(),
            Err(SensorError::I2c(_))
        ));
    }

    #[test]
    fn test_failed_read_yields_nan() {
        let mut i2c = FakeI2c {
            fail: true,
            ..Default::default()
        };
        let mut sensor = sensor(&mut i2c);

        assert!(sensor.read_temperature().is_nan());
        assert!(sensor.read_humidity().is_nan());
    }

    #[test]
    fn test_each_read_takes_a_fresh_measurement() {
        let mut i2c = FakeI2c::default();
        i2c.queue_read(&measurement_bytes(0x6666, 0x8000));
        i2c.queue_read(&measurement_bytes(0x6666, 0x4000));
        let mut sensor = sensor(&mut i2c);

        assert!((sensor.read_temperature() - 25.0).abs() < 0.05);
        assert!((sensor.read_humidity() - 25.0).abs() < 0.05);
        drop(sensor);
        assert_eq!(i2c.writes.len(), 2);
    }
}
