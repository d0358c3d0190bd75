//! Single-pixel status indicator.
//!
//! Device state is shown as one RGB color. The mapping from [`DeviceStatus`]
//! to [`Color`] is a fixed [`Palette`]; two presets exist because the two
//! firmware variants disagree on the color used for fault states.
//!
//! - [`dotstar`]: APA102/DotStar pixel driver over an SPI device

mod dotstar;

pub use dotstar::{ColorOrder, DotStar, PixelError, DEFAULT_BRIGHTNESS};

use log::{debug, warn};
use std::fmt;

/// State of the device as communicated to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    /// Bringing up the network link.
    Provisioning,
    /// Link is up; also shown mid-cycle while sampling and publishing.
    Connected,
    /// Last reading was accepted by the endpoint (HTTP 201).
    Delivered,
    /// Last delivery attempt failed (transport error or non-201 response).
    DeliveryFailed,
    /// Link was down for this cycle; nothing was sent.
    Disconnected,
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Provisioning => "provisioning",
            Self::Connected => "connected",
            Self::Delivered => "delivered",
            Self::DeliveryFailed => "delivery failed",
            Self::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const OFF: Color = Color::new(0, 0, 0);
    pub const RED: Color = Color::new(255, 0, 0);
    pub const GREEN: Color = Color::new(0, 255, 0);
    pub const BLUE: Color = Color::new(0, 0, 255);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

/// Mapping from device status to indicator color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Shown for provisioning, failed deliveries and a down link.
    pub fault: Color,
    /// Shown once connected and while a cycle is in progress.
    pub working: Color,
    /// Shown after a successful delivery.
    pub delivered: Color,
}

impl Palette {
    /// Fault states shown in green, as the fixed-credential firmware does.
    pub const GREEN_FAULT: Palette = Palette {
        fault: Color::GREEN,
        working: Color::BLUE,
        delivered: Color::GREEN,
    };

    /// Fault states shown in red, as the self-provisioning firmware does.
    pub const RED_FAULT: Palette = Palette {
        fault: Color::RED,
        working: Color::BLUE,
        delivered: Color::GREEN,
    };

    /// Color for the given status.
    pub fn color_for(&self, status: DeviceStatus) -> Color {
        match status {
            DeviceStatus::Provisioning
            | DeviceStatus::DeliveryFailed
            | DeviceStatus::Disconnected => self.fault,
            DeviceStatus::Connected => self.working,
            DeviceStatus::Delivered => self.delivered,
        }
    }

    /// Look up a preset by its configuration name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "green-fault" => Some(Self::GREEN_FAULT),
            "red-fault" => Some(Self::RED_FAULT),
            _ => None,
        }
    }
}

/// A single addressable pixel.
pub trait PixelDriver {
    type Error: fmt::Debug;

    /// Set the pending color of the pixel.
    fn set_pixel_color(&mut self, color: Color);

    /// Push the pending color out to the hardware.
    fn show(&mut self) -> Result<(), Self::Error>;
}

/// Drives a pixel according to a palette.
///
/// Every call to [`show`](Self::show) fully overwrites the previous color;
/// there are no transition rules.
pub struct StatusIndicator<P> {
    pixel: P,
    palette: Palette,
}

impl<P: PixelDriver> StatusIndicator<P> {
    pub fn new(pixel: P, palette: Palette) -> Self {
        Self { pixel, palette }
    }

    /// Display `status`. Hardware errors are logged and swallowed.
    pub fn show(&mut self, status: DeviceStatus) {
        let color = self.palette.color_for(status);
        debug!("Indicator: {} -> {:?}", status, color);
        self.pixel.set_pixel_color(color);
        if let Err(e) = self.pixel.show() {
            warn!("Failed to update status pixel: {:?}", e);
        }
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    /// Access the underlying pixel driver.
    pub fn pixel(&self) -> &P {
        &self.pixel
    }

    pub fn pixel_mut(&mut self) -> &mut P {
        &mut self.pixel
    }
}
