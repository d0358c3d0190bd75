//! In-memory fakes for host tests.
//!
//! Bus fakes implement the `embedded-hal` traits and record what the
//! drivers send. Peripheral and service fakes implement the crate's own
//! traits so the logic above the drivers can run without hardware.

use crate::config::WifiConfig;
use crate::connectivity::{PortalConfig, Radio, RadioError};
use crate::indicator::{Color, PixelDriver};
use crate::sensors::{ClimateSensor, LightChannels, LightSensor};
use crate::telemetry::{HttpTransport, TransportError};
use embedded_hal::delay::DelayNs;
use embedded_hal::{i2c, spi};
use std::collections::VecDeque;

/// Route `log` output through the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ==================== Buses ====================

/// I2C bus recording writes and replaying queued reads.
#[derive(Debug, Default)]
pub struct FakeI2c {
    /// `(address, bytes)` for every write operation.
    pub writes: Vec<(u8, Vec<u8>)>,
    /// Fail every transaction.
    pub fail: bool,
    /// Replies for upcoming read operations.
    pub reads: VecDeque<Vec<u8>>,
}

impl FakeI2c {
    /// Queue the bytes returned by the next read operation.
    pub fn queue_read(&mut self, bytes: &[u8]) {
        self.reads.push_back(bytes.to_vec());
    }
}

impl i2c::ErrorType for FakeI2c {
    type Error = i2c::ErrorKind;
}

impl i2c::I2c for FakeI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [i2c::Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.fail {
            return Err(i2c::ErrorKind::NoAcknowledge(i2c::NoAcknowledgeSource::Address));
        }
        for op in operations {
            match op {
                i2c::Operation::Write(bytes) => self.writes.push((address, bytes.to_vec())),
                i2c::Operation::Read(buf) => {
                    let data = self.reads.pop_front().unwrap_or_default();
                    buf.fill(0);
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                }
            }
        }
        Ok(())
    }
}

/// SPI device recording every write.
#[derive(Debug, Default)]
pub struct FakeSpi {
    pub writes: Vec<Vec<u8>>,
    pub fail: bool,
}

impl spi::ErrorType for FakeSpi {
    type Error = spi::ErrorKind;
}

impl spi::SpiDevice for FakeSpi {
    fn transaction(
        &mut self,
        operations: &mut [spi::Operation<'_, u8>],
    ) -> Result<(), Self::Error> {
        if self.fail {
            return Err(spi::ErrorKind::Other);
        }
        for op in operations {
            if let spi::Operation::Write(bytes) = op {
                self.writes.push(bytes.to_vec());
            }
        }
        Ok(())
    }
}

/// Delay that returns immediately and records millisecond waits.
#[derive(Debug, Default)]
pub struct FakeDelay {
    pub delays_ms: Vec<u32>,
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, ms: u32) {
        self.delays_ms.push(ms);
    }
}

// ==================== Peripherals ====================

/// Pixel that records each flushed color.
#[derive(Debug, Default)]
pub struct RecordingPixel {
    /// Colors that reached the "hardware", in order.
    pub shown: Vec<Color>,
    /// Color set but not yet flushed.
    pub pending: Option<Color>,
    /// Fail every flush.
    pub fail_show: bool,
}

impl PixelDriver for RecordingPixel {
    type Error = ();

    fn set_pixel_color(&mut self, color: Color) {
        self.pending = Some(color);
    }

    fn show(&mut self) -> Result<(), Self::Error> {
        if self.fail_show {
            return Err(());
        }
        if let Some(color) = self.pending.take() {
            self.shown.push(color);
        }
        Ok(())
    }
}

/// Climate sensor returning fixed values.
#[derive(Debug)]
pub struct FakeClimate {
    temperature: f32,
    humidity: f32,
    pub temperature_reads: usize,
    pub humidity_reads: usize,
}

impl FakeClimate {
    pub fn new(temperature: f32, humidity: f32) -> Self {
        Self {
            temperature,
            humidity,
            temperature_reads: 0,
            humidity_reads: 0,
        }
    }
}

impl ClimateSensor for FakeClimate {
    fn read_temperature(&mut self) -> f32 {
        self.temperature_reads += 1;
        self.temperature
    }

    fn read_humidity(&mut self) -> f32 {
        self.humidity_reads += 1;
        self.humidity
    }
}

/// Light sensor replaying a list of conversions.
///
/// New data is reported while frames remain. A `None` frame is a conversion
/// the sensor flagged invalid.
#[derive(Debug, Default)]
pub struct FakeLight {
    frames: VecDeque<Option<LightChannels>>,
    pub channel_reads: usize,
}

impl FakeLight {
    pub fn with_frames(frames: Vec<Option<LightChannels>>) -> Self {
        Self {
            frames: frames.into(),
            channel_reads: 0,
        }
    }

    /// A sensor that never finishes a conversion.
    pub fn idle() -> Self {
        Self::default()
    }
}

impl LightSensor for FakeLight {
    fn new_data_available(&mut self) -> bool {
        !self.frames.is_empty()
    }

    fn read_both_channels(&mut self) -> Option<LightChannels> {
        self.channel_reads += 1;
        self.frames.pop_front().flatten()
    }
}

// ==================== Services ====================

/// Radio that fails a set number of credential attempts before joining.
#[derive(Debug)]
pub struct FakeRadio {
    pub failures_remaining: u32,
    pub connected: bool,
    pub credential_attempts: u32,
    pub portal_attempts: u32,
    /// Error returned by the portal flow. `None` means it succeeds.
    pub portal_result: Option<RadioError>,
}

impl FakeRadio {
    pub fn connecting_after(failures: u32) -> Self {
        Self {
            failures_remaining: failures,
            connected: false,
            credential_attempts: 0,
            portal_attempts: 0,
            portal_result: None,
        }
    }
}

impl Radio for FakeRadio {
    fn connect_with_credentials(&mut self, _credentials: &WifiConfig) -> Result<(), RadioError> {
        self.credential_attempts += 1;
        if self.failures_remaining > 0 {
            self.failures_remaining -= 1;
            return Err(RadioError::ConnectionFailed("no such network".into()));
        }
        self.connected = true;
        Ok(())
    }

    fn connect_with_portal(&mut self, _portal: &PortalConfig) -> Result<(), RadioError> {
        self.portal_attempts += 1;
        match self.portal_result.take() {
            Some(e) => Err(e),
            None => {
                self.connected = true;
                Ok(())
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// One call made on a [`FakeTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Begin(String),
    Header(String, String),
    /// Request body as UTF-8.
    Post(String),
    ResponseBody,
    End,
}

/// HTTP transport answering every POST the same way.
#[derive(Debug)]
pub struct FakeTransport {
    pub calls: Vec<TransportCall>,
    /// Outcome of every `post`.
    pub response: Result<u16, TransportError>,
    pub begin_error: Option<TransportError>,
    pub body_error: Option<TransportError>,
}

impl FakeTransport {
    pub fn responding(status: u16) -> Self {
        Self {
            calls: Vec::new(),
            response: Ok(status),
            begin_error: None,
            body_error: None,
        }
    }

    pub fn failing(error: TransportError) -> Self {
        Self {
            response: Err(error),
            ..Self::responding(0)
        }
    }

    pub fn read_body(&self) -> bool {
        self.calls.contains(&TransportCall::ResponseBody)
    }

    pub fn end_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| **c == TransportCall::End)
            .count()
    }
}

impl HttpTransport for FakeTransport {
    fn begin(&mut self, uri: &str) -> Result<(), TransportError> {
        self.calls.push(TransportCall::Begin(uri.to_string()));
        match self.begin_error.clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn add_header(&mut self, name: &str, value: &str) {
        self.calls
            .push(TransportCall::Header(name.to_string(), value.to_string()));
    }

    fn post(&mut self, body: &[u8]) -> Result<u16, TransportError> {
        self.calls
            .push(TransportCall::Post(String::from_utf8_lossy(body).into_owned()));
        self.response.clone()
    }

    fn response_body(&mut self) -> Result<String, TransportError> {
        self.calls.push(TransportCall::ResponseBody);
        match self.body_error.clone() {
            Some(e) => Err(e),
            None => Ok("{\"id\":1}".to_string()),
        }
    }

    fn end(&mut self) {
        self.calls.push(TransportCall::End);
    }
}
