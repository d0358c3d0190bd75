//! Environmental telemetry firmware binary.

#[cfg(feature = "esp32")]
fn main() {
    use env_telemetry_esp32::boot::{halt, FatalAction};
    use esp_idf_hal::delay::FreeRtos;
    use log::error;

    // Link ESP-IDF patches (must be first!)
    esp_idf_sys::link_patches();

    esp_idf_svc::log::EspLogger::initialize_default();
    log::info!("=== Environment telemetry node starting ===");

    match firmware::run() {
        Ok(never) => match never {},
        Err(e) => {
            error!("{}", e);
            match e.action() {
                FatalAction::Halt => halt(&mut FreeRtos),
                FatalAction::Restart => {
                    FreeRtos::delay_ms(1000);
                    esp_idf_hal::reset::restart();
                }
            }
        }
    }
}

#[cfg(feature = "esp32")]
mod firmware {
    use env_telemetry_esp32::boot::BootError;
    use env_telemetry_esp32::config::FirmwareConfig;
    use env_telemetry_esp32::connectivity::{ConnectivityManager, EspRadio};
    use env_telemetry_esp32::indicator::{
        ColorOrder, DeviceStatus, DotStar, StatusIndicator, DEFAULT_BRIGHTNESS,
    };
    use env_telemetry_esp32::reporter::Reporter;
    use env_telemetry_esp32::sensors::{
        LightSensorConfig, Ltr329, SensorSampler, Sht31, ShtAddress,
    };
    use env_telemetry_esp32::telemetry::{EspHttpTransport, TelemetryPublisher};
    use env_telemetry_esp32::wifi::{open_wifi_storage, WifiManager};
    use embedded_hal_bus::i2c::RefCellDevice;
    use esp_idf_hal::delay::FreeRtos;
    use esp_idf_hal::gpio::{AnyIOPin, AnyOutputPin};
    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_hal::spi::{config::Config as SpiConfig, SpiDeviceDriver, SpiDriverConfig};
    use esp_idf_hal::units::FromValueType;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use log::{info, warn};
    use std::cell::RefCell;
    use std::convert::Infallible;

    /// Boot the node and enter the reporting loop.
    ///
    /// Pins follow the reference board: sensors on I2C (SDA 23, SCL 22),
    /// DotStar data on GPIO33 and clock on GPIO21.
    pub fn run() -> Result<Infallible, BootError> {
        let config = FirmwareConfig::from_build_env()?;
        config.log_summary();

        let peripherals = Peripherals::take()?;
        let sysloop = EspSystemEventLoop::take()?;
        let nvs = EspDefaultNvsPartition::take()?;

        // Status pixel
        let spi = SpiDeviceDriver::new_single(
            peripherals.spi2,
            peripherals.pins.gpio21,
            peripherals.pins.gpio33,
            Option::<AnyIOPin>::None,
            Option::<AnyOutputPin>::None,
            &SpiDriverConfig::new(),
            &SpiConfig::new().baudrate(1.MHz().into()),
        )?;
        let mut pixel = DotStar::new(spi, ColorOrder::Brg);
        pixel.set_brightness(DEFAULT_BRIGHTNESS);
        let mut indicator = StatusIndicator::new(pixel, config.palette);
        indicator.show(DeviceStatus::Provisioning);

        FreeRtos::delay_ms(u32::try_from(config.startup_delay.as_millis()).unwrap_or(u32::MAX));

        // Network
        let wifi = WifiManager::new(peripherals.modem, sysloop, Some(nvs.clone()))?;
        let storage = open_wifi_storage(nvs)?;
        let mut connectivity =
            ConnectivityManager::new(EspRadio::new(wifi, storage), config.provisioning.clone());
        connectivity.connect(&mut indicator, &mut FreeRtos)?;

        // Sensors share one I2C bus
        let i2c = I2cDriver::new(
            peripherals.i2c0,
            peripherals.pins.gpio23,
            peripherals.pins.gpio22,
            &I2cConfig::new().baudrate(100.kHz().into()),
        )?;
        let bus = RefCell::new(i2c);

        info!("SHT31 test");
        let mut climate = Sht31::new(RefCellDevice::new(&bus), FreeRtos, ShtAddress::Low);
        climate.probe().map_err(|e| {
            warn!("SHT31 probe failed: {}", e);
            BootError::SensorNotDetected("SHT31")
        })?;
        info!("Found SHT31 sensor");

        info!("LTR-329 test");
        let mut light = Ltr329::new(RefCellDevice::new(&bus));
        light.probe().map_err(|e| {
            warn!("LTR-329 probe failed: {}", e);
            BootError::SensorNotDetected("LTR")
        })?;
        info!("Found LTR sensor");
        light
            .configure(&LightSensorConfig::default())
            .map_err(|e| BootError::Platform(format!("LTR-329 configuration failed: {}", e)))?;

        let publisher = TelemetryPublisher::new(EspHttpTransport::new(), config.publisher.clone());
        let mut reporter = Reporter::new(
            SensorSampler::new(climate, light),
            publisher,
            indicator,
            connectivity,
            FreeRtos,
            config.report_interval,
        );

        info!("Entering reporting loop");
        reporter.run()
    }
}

#[cfg(not(feature = "esp32"))]
fn main() {
    println!("This binary requires the 'esp32' feature.");
    println!("Use 'cargo test --no-default-features' for host testing.");
}
