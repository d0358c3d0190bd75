//! Lite-On LTR-329ALS ambient light sensor.
//!
//! Two photodiode channels are converted together: channel 0 sees visible
//! plus infrared light, channel 1 infrared only. Both are read in one burst
//! so a reading never mixes two conversions.

use super::{LightChannels, LightSensor, SensorError};
use embedded_hal::i2c::I2c;
use log::{info, warn};

/// Fixed I2C address of the LTR-329.
pub const LTR329_ADDRESS: u8 = 0x29;

const REG_ALS_CONTR: u8 = 0x80;
const REG_ALS_MEAS_RATE: u8 = 0x85;
const REG_PART_ID: u8 = 0x86;
const REG_MANUFAC_ID: u8 = 0x87;
const REG_ALS_DATA_CH1_0: u8 = 0x88;
const REG_ALS_STATUS: u8 = 0x8C;

const PART_ID: u8 = 0x0A;
const MANUFACTURER_ID: u8 = 0x05;

const CONTR_ACTIVE: u8 = 0x01;
const STATUS_NEW_DATA: u8 = 1 << 2;
const STATUS_DATA_INVALID: u8 = 1 << 7;

/// Analog gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gain {
    X1,
    X2,
    X4,
    X8,
    X48,
    X96,
}

impl Gain {
    fn bits(self) -> u8 {
        match self {
            Self::X1 => 0,
            Self::X2 => 1,
            Self::X4 => 2,
            Self::X8 => 3,
            Self::X48 => 6,
            Self::X96 => 7,
        }
    }

    pub fn factor(self) -> u8 {
        match self {
            Self::X1 => 1,
            Self::X2 => 2,
            Self::X4 => 4,
            Self::X8 => 8,
            Self::X48 => 48,
            Self::X96 => 96,
        }
    }
}

/// Time spent integrating one conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationTime {
    Ms50,
    Ms100,
    Ms150,
    Ms200,
    Ms250,
    Ms300,
    Ms350,
    Ms400,
}

impl IntegrationTime {
    fn bits(self) -> u8 {
        match self {
            Self::Ms100 => 0,
            Self::Ms50 => 1,
            Self::Ms200 => 2,
            Self::Ms400 => 3,
            Self::Ms150 => 4,
            Self::Ms250 => 5,
            Self::Ms300 => 6,
            Self::Ms350 => 7,
        }
    }

    pub fn millis(self) -> u16 {
        match self {
            Self::Ms50 => 50,
            Self::Ms100 => 100,
            Self::Ms150 => 150,
            Self::Ms200 => 200,
            Self::Ms250 => 250,
            Self::Ms300 => 300,
            Self::Ms350 => 350,
            Self::Ms400 => 400,
        }
    }
}

/// Interval between conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementRate {
    Ms50,
    Ms100,
    Ms200,
    Ms500,
    Ms1000,
    Ms2000,
}

impl MeasurementRate {
    fn bits(self) -> u8 {
        match self {
            Self::Ms50 => 0,
            Self::Ms100 => 1,
            Self::Ms200 => 2,
            Self::Ms500 => 3,
            Self::Ms1000 => 4,
            Self::Ms2000 => 5,
        }
    }

    pub fn millis(self) -> u16 {
        match self {
            Self::Ms50 => 50,
            Self::Ms100 => 100,
            Self::Ms200 => 200,
            Self::Ms500 => 500,
            Self::Ms1000 => 1000,
            Self::Ms2000 => 2000,
        }
    }
}

/// Conversion settings applied at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightSensorConfig {
    pub gain: Gain,
    pub integration_time: IntegrationTime,
    pub measurement_rate: MeasurementRate,
}

impl Default for LightSensorConfig {
    fn default() -> Self {
        Self {
            gain: Gain::X2,
            integration_time: IntegrationTime::Ms100,
            measurement_rate: MeasurementRate::Ms200,
        }
    }
}

/// LTR-329 on an I2C bus.
pub struct Ltr329<I2C> {
    i2c: I2C,
}

impl<I2C: I2c> Ltr329<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    /// Check the part and manufacturer IDs.
    pub fn probe(&mut self) -> Result<(), SensorError<I2C::Error>> {
        let part = self.read_register(REG_PART_ID)?;
        if part >> 4 != PART_ID {
            return Err(SensorError::NotDetected);
        }
        if self.read_register(REG_MANUFAC_ID)? != MANUFACTURER_ID {
            return Err(SensorError::NotDetected);
        }
        Ok(())
    }

    /// Apply gain and timing, and switch the sensor to active mode.
    pub fn configure(&mut self, config: &LightSensorConfig) -> Result<(), SensorError<I2C::Error>> {
        self.write_register(REG_ALS_CONTR, (config.gain.bits() << 2) | CONTR_ACTIVE)?;
        self.write_register(
            REG_ALS_MEAS_RATE,
            (config.integration_time.bits() << 3) | config.measurement_rate.bits(),
        )?;

        info!("Light sensor gain: {}", config.gain.factor());
        info!(
            "Light sensor integration time (ms): {}",
            config.integration_time.millis()
        );
        info!(
            "Light sensor measurement rate (ms): {}",
            config.measurement_rate.millis()
        );
        Ok(())
    }

    /// Read `ALS_STATUS`.
    pub fn read_status(&mut self) -> Result<u8, SensorError<I2C::Error>> {
        self.read_register(REG_ALS_STATUS)
    }

    /// Read both channels in one burst. `Ok(None)` if the sensor flags the
    /// conversion as invalid.
    pub fn read_channels(&mut self) -> Result<Option<LightChannels>, SensorError<I2C::Error>> {
        let mut buf = [0u8; 4];
        self.i2c
            .write_read(LTR329_ADDRESS, &[REG_ALS_DATA_CH1_0], &mut buf)
            .map_err(SensorError::I2c)?;

        if self.read_status()? & STATUS_DATA_INVALID != 0 {
            return Ok(None);
        }

        Ok(Some(LightChannels {
            infrared: u16::from_le_bytes([buf[0], buf[1]]),
            visible_plus_ir: u16::from_le_bytes([buf[2], buf[3]]),
        }))
    }

    fn read_register(&mut self, register: u8) -> Result<u8, SensorError<I2C::Error>> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(LTR329_ADDRESS, &[register], &mut buf)
            .map_err(SensorError::I2c)?;
        Ok(buf[0])
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), SensorError<I2C::Error>> {
        self.i2c
            .write(LTR329_ADDRESS, &[register, value])
            .map_err(SensorError::I2c)
    }
}

impl<I2C: I2c> LightSensor for Ltr329<I2C> {
    fn new_data_available(&mut self) -> bool {
        match self.read_status() {
            Ok(status) => status & STATUS_NEW_DATA != 0,
            Err(e) => {
                warn!("LTR-329 status read failed: {}", e);
                false
            }
        }
    }

    fn read_both_channels(&mut self) -> Option<LightChannels> {
        match self.read_channels() {
            Ok(channels) => channels,
            Err(e) => {
                warn!("LTR-329 channel read failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeI2c;

    #[test]
    fn test_probe_accepts_ltr329() {
        let mut i2c = FakeI2c::default();
        i2c.queue_read(&[0xA0]);
        i2c.queue_read(&[0x05]);
        let mut sensor = Ltr329::new(i2c);

        sensor.probe().unwrap();
        assert_eq!(
            sensor.i2c.writes,
            vec![(0x29, vec![REG_PART_ID]), (0x29, vec![REG_MANUFAC_ID])]
        );
    }

    #[test]
    fn test_probe_rejects_other_part() {
        let mut i2c = FakeI2c::default();
        i2c.queue_read(&[0x90]);
        let mut sensor = Ltr329::new(i2c);
        assert!(matches!(sensor.probe(), Err(SensorError::NotDetected)));
    }

    #[test]
    fn test_probe_rejects_other_manufacturer() {
        let mut i2c = FakeI2c::default();
        i2c.queue_read(&[0xA0]);
        i2c.queue_read(&[0x06]);
        let mut sensor = Ltr329::new(i2c);
        assert!(matches!(sensor.probe(), Err(SensorError::NotDetected)));
    }

    #[test]
    fn test_configure_default_registers() {
        let mut sensor = Ltr329::new(FakeI2c::default());
        sensor.configure(&LightSensorConfig::default()).unwrap();

        // Gain x2 -> 0b001 << 2, active; 100 ms -> 0b000, 200 ms rate -> 0b010
        assert_eq!(
            sensor.i2c.writes,
            vec![(0x29, vec![0x80, 0x05]), (0x29, vec![0x85, 0x02])]
        );
    }

    #[test]
    fn test_configure_high_gain_long_integration() {
        let mut sensor = Ltr329::new(FakeI2c::default());
        let config = LightSensorConfig {
            gain: Gain::X96,
            integration_time: IntegrationTime::Ms400,
            measurement_rate: MeasurementRate::Ms500,
        };
        sensor.configure(&config).unwrap();

        assert_eq!(sensor.i2c.writes[0], (0x29, vec![0x80, 0x1D]));
        assert_eq!(sensor.i2c.writes[1], (0x29, vec![0x85, 0x1B]));
    }

    #[test]
    fn test_new_data_flag() {
        let mut i2c = FakeI2c::default();
        i2c.queue_read(&[STATUS_NEW_DATA]);
        i2c.queue_read(&[0x00]);
        let mut sensor = Ltr329::new(i2c);

        assert!(sensor.new_data_available());
        assert!(!sensor.new_data_available());
    }

    #[test]
    fn test_read_both_channels_splits_pair() {
        let mut i2c = FakeI2c::default();
        // CH1 = 40, CH0 = 120, little endian
        i2c.queue_read(&[40, 0, 120, 0]);
        i2c.queue_read(&[STATUS_NEW_DATA]);
        let mut sensor = Ltr329::new(i2c);

        assert_eq!(
            sensor.read_both_channels(),
            Some(LightChannels {
                visible_plus_ir: 120,
                infrared: 40,
            })
        );
    }

    #[test]
    fn test_invalid_data_discarded_as_pair() {
        let mut i2c = FakeI2c::default();
        i2c.queue_read(&[0x34, 0x12, 0x78, 0x56]);
        i2c.queue_read(&[STATUS_DATA_INVALID]);
        let mut sensor = Ltr329::new(i2c);

        assert_eq!(sensor.read_both_channels(), None);
    }

    #[test]
    fn test_bus_failure_reads_as_no_data() {
        let i2c = FakeI2c {
            fail: true,
            ..Default::default()
        };
        let mut sensor = Ltr329::new(i2c);
        assert!(!sensor.new_data_available());
        assert_eq!(sensor.read_both_channels(), None);
    }
}
