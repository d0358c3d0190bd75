//! APA102 ("DotStar") pixel driver.
//!
//! The pixel is clocked over SPI: a start frame of four zero bytes, one
//! four-byte frame per LED (`0xE0 | global brightness`, then the three color
//! bytes in the LED's wiring order) and an end frame of `0xFF` bytes.
//!
//! Brightness is applied by scaling the color values, leaving the 5-bit
//! global brightness field at maximum.

use super::{Color, PixelDriver};
use embedded_hal::spi::SpiDevice;
use std::fmt;

/// Brightness the status pixel runs at (out of 255).
pub const DEFAULT_BRIGHTNESS: u8 = 20;

const START_FRAME: [u8; 4] = [0x00; 4];
const END_FRAME: [u8; 4] = [0xFF; 4];
const LED_FRAME_MARKER: u8 = 0xE0;
const MAX_GLOBAL_BRIGHTNESS: u8 = 0x1F;

/// Order in which color bytes are clocked out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorOrder {
    Rgb,
    /// Blue, red, green.
    Brg,
    /// Native APA102 order.
    Bgr,
}

impl ColorOrder {
    fn arrange(self, c: Color) -> [u8; 3] {
        match self {
            Self::Rgb => [c.red, c.green, c.blue],
            Self::Brg => [c.blue, c.red, c.green],
            Self::Bgr => [c.blue, c.green, c.red],
        }
    }
}

/// One APA102 pixel on an SPI bus.
pub struct DotStar<SPI> {
    spi: SPI,
    order: ColorOrder,
    brightness: u8,
    pending: Color,
}

impl<SPI: SpiDevice> DotStar<SPI> {
    pub fn new(spi: SPI, order: ColorOrder) -> Self {
        Self {
            spi,
            order,
            brightness: u8::MAX,
            pending: Color::OFF,
        }
    }

    /// Set the brightness applied on the next [`show`](PixelDriver::show).
    pub fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness;
    }

    /// The full SPI transfer for the pending color.
    fn frame(&self) -> [u8; 12] {
        let scaled = Color::new(
            scale(self.pending.red, self.brightness),
            scale(self.pending.green, self.brightness),
            scale(self.pending.blue, self.brightness),
        );
        let [c1, c2, c3] = self.order.arrange(scaled);

        let mut frame = [0u8; 12];
        frame[..4].copy_from_slice(&START_FRAME);
        frame[4..8].copy_from_slice(&[LED_FRAME_MARKER | MAX_GLOBAL_BRIGHTNESS, c1, c2, c3]);
        frame[8..].copy_from_slice(&END_FRAME);
        frame
    }

    /// Release the SPI device.
    pub fn release(self) -> SPI {
        self.spi
    }
}

fn scale(value: u8, brightness: u8) -> u8 {
    ((value as u16 * brightness as u16) / u8::MAX as u16) as u8
}

impl<SPI: SpiDevice> PixelDriver for DotStar<SPI> {
    type Error = PixelError<SPI::Error>;

    fn set_pixel_color(&mut self, color: Color) {
        self.pending = color;
    }

    fn show(&mut self) -> Result<(), Self::Error> {
        let frame = self.frame();
        self.spi.write(&frame).map_err(PixelError::Spi)
    }
}

/// Errors from the pixel driver.
#[derive(Debug)]
pub enum PixelError<E> {
    /// SPI transfer failed.
    Spi(E),
}

impl<E: fmt::Debug> fmt::Display for PixelError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spi(e) => write!(f, "SPI error: {:?}", e),
        }
    }
}

impl<E: fmt::Debug> std::error::Error for PixelError<E> {}
