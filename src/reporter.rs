//! The reporting loop.
//!
//! One cycle: show the working color, sample the sensors, publish the
//! reading, show the outcome. Cycles repeat forever with a fixed pause.

use crate::connectivity::{duration_to_ms, ConnectivityManager, Radio};
use crate::indicator::{DeviceStatus, PixelDriver, StatusIndicator};
use crate::sensors::{ClimateSensor, LightSensor, SensorSampler};
use crate::telemetry::{HttpTransport, TelemetryPublisher};
use embedded_hal::delay::DelayNs;
use log::debug;
use std::time::Duration;

/// Owns every runtime component after boot.
pub struct Reporter<C, L, T, P, R, D> {
    sampler: SensorSampler<C, L>,
    publisher: TelemetryPublisher<T>,
    indicator: StatusIndicator<P>,
    connectivity: ConnectivityManager<R>,
    delay: D,
    interval: Duration,
}

impl<C, L, T, P, R, D> Reporter<C, L, T, P, R, D>
where
    C: ClimateSensor,
    L: LightSensor,
    T: HttpTransport,
    P: PixelDriver,
    R: Radio,
    D: DelayNs,
{
    pub fn new(
        sampler: SensorSampler<C, L>,
        publisher: TelemetryPublisher<T>,
        indicator: StatusIndicator<P>,
        connectivity: ConnectivityManager<R>,
        delay: D,
        interval: Duration,
    ) -> Self {
        Self {
            sampler,
            publisher,
            indicator,
            connectivity,
            delay,
            interval,
        }
    }

    /// Run one cycle without sleeping and return the status left on the
    /// indicator.
    pub fn run_cycle(&mut self) -> DeviceStatus {
        self.indicator.show(DeviceStatus::Connected);
        let reading = self.sampler.sample();
        let status = self
            .publisher
            .publish(&reading, self.connectivity.state());
        self.indicator.show(status);
        status
    }

    /// Run one cycle, then wait out the reporting interval.
    pub fn step(&mut self) -> DeviceStatus {
        let status = self.run_cycle();
        debug!("Cycle finished: {}", status);
        self.delay.delay_ms(duration_to_ms(self.interval));
        status
    }

    /// Report forever.
    pub fn run(&mut self) -> ! {
        loop {
            self.step();
        }
    }

    pub fn indicator(&self) -> &StatusIndicator<P> {
        &self.indicator
    }

    pub fn publisher(&self) -> &TelemetryPublisher<T> {
        &self.publisher
    }

    pub fn connectivity(&self) -> &ConnectivityManager<R> {
        &self.connectivity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WifiConfig;
    use crate::connectivity::{Provisioning, RetryPolicy};
    use crate::indicator::{Color, Palette};
    use crate::sensors::LightChannels;
    use crate::telemetry::{PayloadFormat, PublisherConfig, TransportError};
    use crate::testing::{
        init_logging, FakeClimate, FakeDelay, FakeLight, FakeRadio, FakeTransport, RecordingPixel,
        TransportCall,
    };

    type TestReporter =
        Reporter<FakeClimate, FakeLight, FakeTransport, RecordingPixel, FakeRadio, FakeDelay>;

    fn build_reporter(transport: FakeTransport, connected: bool) -> TestReporter {
        init_logging();
        let mut connectivity = ConnectivityManager::new(
            FakeRadio::connecting_after(0),
            Provisioning::Fixed {
                credentials: WifiConfig::new("HomeNet", "password123").unwrap(),
                retry: RetryPolicy::default(),
            },
        );
        let mut indicator = StatusIndicator::new(RecordingPixel::default(), Palette::RED_FAULT);
        if connected {
            connectivity
                .connect(&mut indicator, &mut FakeDelay::default())
                .unwrap();
        }
        indicator.pixel_mut().shown.clear();

        let light = FakeLight::with_frames(vec![Some(LightChannels {
            visible_plus_ir: 120,
            infrared: 40,
        })]);
        Reporter::new(
            SensorSampler::new(FakeClimate::new(22.5, 48.0), light),
            TelemetryPublisher::new(
                transport,
                PublisherConfig {
                    endpoint: "http://example.com/readings".to_string(),
                    format: PayloadFormat::Flat,
                },
            ),
            indicator,
            connectivity,
            FakeDelay::default(),
            Duration::from_secs(5),
        )
    }

    // ==================== Cycle Outcome Tests ====================

    #[test]
    fn test_created_shows_delivered() {
        let mut reporter = build_reporter(FakeTransport::responding(201), true);

        assert_eq!(reporter.run_cycle(), DeviceStatus::Delivered);
        assert_eq!(
            reporter.indicator().pixel().shown,
            vec![Color::BLUE, Color::GREEN]
        );
        assert!(reporter.publisher().transport().calls.contains(&TransportCall::Post(
            r#"{"temperature":22.5,"humidity":48.0,"visible_plus_ir":120,"infrared":40}"#.into()
        )));
    }

    #[test]
    fn test_server_error_shows_fault() {
        let mut reporter = build_reporter(FakeTransport::responding(500), true);

        assert_eq!(reporter.run_cycle(), DeviceStatus::DeliveryFailed);
        assert_eq!(
            reporter.indicator().pixel().shown,
            vec![Color::BLUE, Color::RED]
        );
        assert!(reporter.publisher().transport().read_body());
    }

    #[test]
    fn test_refused_connection_leaves_body_unread() {
        let mut reporter = build_reporter(
            FakeTransport::failing(TransportError::ConnectionRefused),
            true,
        );

        assert_eq!(reporter.run_cycle(), DeviceStatus::DeliveryFailed);
        assert_eq!(
            reporter.indicator().pixel().shown,
            vec![Color::BLUE, Color::RED]
        );
        let transport = reporter.publisher().transport();
        assert!(!transport.read_body());
        assert_eq!(transport.end_count(), 1);
    }

    #[test]
    fn test_disconnected_cycle_sends_nothing() {
        let mut reporter = build_reporter(FakeTransport::responding(201), false);

        assert_eq!(reporter.run_cycle(), DeviceStatus::Disconnected);
        assert_eq!(
            reporter.indicator().pixel().shown,
            vec![Color::BLUE, Color::RED]
        );
        assert!(reporter.publisher().transport().calls.is_empty());
        assert_eq!(
            reporter.connectivity().radio().credential_attempts,
            0
        );
    }

    // ==================== Loop Tests ====================

    #[test]
    fn test_step_waits_interval() {
        let mut reporter = build_reporter(FakeTransport::responding(201), true);
        reporter.step();
        reporter.step();
        assert_eq!(reporter.delay.delays_ms, vec![5000, 5000]);
    }

    #[test]
    fn test_run_cycle_does_not_sleep() {
        let mut reporter = build_reporter(FakeTransport::responding(201), true);
        reporter.run_cycle();
        assert!(reporter.delay.delays_ms.is_empty());
    }

    #[test]
    fn test_light_absent_after_first_cycle() {
        let mut reporter = build_reporter(FakeTransport::responding(201), true);
        reporter.run_cycle();
        reporter.run_cycle();

        let posts: Vec<_> = reporter
            .publisher()
            .transport()
            .calls
            .iter()
            .filter(|c| matches!(c, TransportCall::Post(_)))
            .collect();
        assert_eq!(posts.len(), 2);
        assert_eq!(
            *posts[1],
            TransportCall::Post(
                r#"{"temperature":22.5,"humidity":48.0,"visible_plus_ir":0,"infrared":0}"#.into()
            )
        );
    }
}
