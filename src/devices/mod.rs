//! Device implementations
//!
//! Each control loop opens its own devices through a [`DeviceFactory`], so a
//! device that fails to open only takes down the loop that needed it.

pub mod ds1307;
#[cfg(feature = "rpi")]
pub mod rpi;
pub mod serial;
pub mod sim;
pub mod wheel;

use std::sync::Arc;

use chrono::{Datelike, Local, Timelike};

use crate::config::{DeviceKind, MarjaniConfig};
use crate::drivers::{BrushActuator, ClockSource, LineWriter, MotorDriver, RangeSensor, SerialChannel};
use crate::error::Result;
use crate::schedule::ClockTime;

/// Opens the hardware each loop needs.
pub trait DeviceFactory: Send + Sync {
    /// Open the command link as (reader, status writer)
    fn open_serial(&self) -> Result<(Box<dyn SerialChannel>, Box<dyn LineWriter>)>;

    fn open_motor(&self) -> Result<Box<dyn MotorDriver>>;

    fn open_range_sensor(&self) -> Result<Box<dyn RangeSensor>>;

    fn open_clock(&self) -> Result<Box<dyn ClockSource>>;

    fn open_brush(&self) -> Result<Box<dyn BrushActuator>>;
}

/// Create a device factory based on configuration
pub fn create_device(config: &MarjaniConfig) -> Result<Arc<dyn DeviceFactory>> {
    match config.device.kind {
        DeviceKind::Sim => Ok(Arc::new(sim::SimDevices::from_config(config))),
        #[cfg(feature = "rpi")]
        DeviceKind::Rpi => Ok(Arc::new(rpi::RpiDevices::new(config.clone()))),
        #[cfg(not(feature = "rpi"))]
        DeviceKind::Rpi => Err(crate::error::MarjaniError::Config(
            "device kind \"rpi\" requires building with --features rpi".to_string(),
        )),
    }
}

/// Current system local time as a clock reading (Monday = 1)
pub fn system_clock_time() -> ClockTime {
    let now = Local::now();
    ClockTime::new(
        now.weekday().number_from_monday() as u8,
        now.hour() as u8,
        now.minute() as u8,
        now.second() as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_time_ranges() {
        let time = system_clock_time();
        assert!((1..=7).contains(&time.weekday));
        assert!(time.hour < 24);
        assert!(time.minute < 60);
        assert!(time.second < 61);
    }

    #[test]
    fn test_create_sim_device() {
        let config = MarjaniConfig::default();
        let factory = create_device(&config).unwrap();
        assert!(factory.open_motor().is_ok());
        assert!(factory.open_clock().is_ok());
    }

    #[cfg(not(feature = "rpi"))]
    #[test]
    fn test_rpi_without_feature_is_config_error() {
        let mut config = MarjaniConfig::default();
        config.device.kind = DeviceKind::Rpi;
        assert!(create_device(&config).is_err());
    }
}
