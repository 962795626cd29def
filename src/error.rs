//! Error types for Marjani

use thiserror::Error;

/// Marjani error type
#[derive(Error, Debug)]
pub enum MarjaniError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// GPIO setup or pin access failed
    #[cfg(feature = "rpi")]
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    /// I2C bus setup or transfer failed
    #[cfg(feature = "rpi")]
    #[error("I2C error: {0}")]
    I2c(#[from] rppal::i2c::Error),

    #[error("Device error: {0}")]
    Device(String),
}

impl From<toml::de::Error> for MarjaniError {
    fn from(e: toml::de::Error) -> Self {
        MarjaniError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MarjaniError>;
