//! Configuration loading for Marjani

use crate::error::{MarjaniError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MarjaniConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub pins: PinConfig,
    #[serde(default)]
    pub motor: MotorConfig,
    #[serde(default)]
    pub rtc: RtcConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub avoidance: AvoidanceConfig,
    #[serde(default)]
    pub sim: SimConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which hardware backend to build
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Raspberry Pi GPIO/PWM/I2C (needs the `rpi` feature)
    Rpi,
    /// Simulated devices for bench runs
    #[default]
    Sim,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub kind: DeviceKind,
}

/// Command link settings
#[derive(Clone, Debug, Deserialize)]
pub struct SerialConfig {
    /// UART device path (default: /dev/ttyAMA2)
    #[serde(default = "default_serial_port")]
    pub port: String,

    /// Baud rate (default: 115200)
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// BCM pin numbers
#[derive(Clone, Debug, Deserialize)]
pub struct PinConfig {
    /// Right wheel forward
    #[serde(default = "default_motor_a1a")]
    pub motor_a1a: u8,
    /// Right wheel reverse
    #[serde(default = "default_motor_a1b")]
    pub motor_a1b: u8,
    /// Left wheel reverse
    #[serde(default = "default_motor_b1a")]
    pub motor_b1a: u8,
    /// Left wheel forward
    #[serde(default = "default_motor_b1b")]
    pub motor_b1b: u8,
    #[serde(default = "default_trigger")]
    pub sonar_trigger: u8,
    #[serde(default = "default_echo")]
    pub sonar_echo: u8,
    #[serde(default = "default_brush_a")]
    pub brush_a: u8,
    #[serde(default = "default_brush_b")]
    pub brush_b: u8,
}

/// Wheel and brush PWM parameters
#[derive(Clone, Debug, Deserialize)]
pub struct MotorConfig {
    /// Software PWM frequency for all motor pins (Hz)
    #[serde(default = "default_pwm_frequency")]
    pub pwm_frequency_hz: f64,

    /// Right wheel duty cycle at speed 1.0 (the right motor runs stronger)
    #[serde(default = "default_right_duty")]
    pub right_duty: f64,

    /// Left wheel duty cycle at speed 1.0
    #[serde(default = "default_left_duty")]
    pub left_duty: f64,

    /// Brush duty cycle while cleaning
    #[serde(default = "default_brush_duty")]
    pub brush_duty: f64,
}

/// Real-time clock chip settings
#[derive(Clone, Debug, Deserialize)]
pub struct RtcConfig {
    #[serde(default = "default_i2c_bus")]
    pub i2c_bus: u8,

    #[serde(default = "default_rtc_address")]
    pub address: u16,

    /// Write the system local time into the RTC when the schedule loop starts
    #[serde(default = "default_true")]
    pub seed_from_system: bool,
}

/// Loop cadences in milliseconds
#[derive(Clone, Debug, Deserialize)]
pub struct TimingConfig {
    /// Serial poll interval of the command loop
    #[serde(default = "default_command_poll")]
    pub command_poll_ms: u64,

    /// Drive loop poll interval while idle
    #[serde(default = "default_drive_idle_poll")]
    pub drive_idle_poll_ms: u64,

    /// Pause between cruising iterations
    #[serde(default = "default_cruise_interval")]
    pub cruise_interval_ms: u64,

    /// Schedule loop tick
    #[serde(default = "default_schedule_tick")]
    pub schedule_tick_ms: u64,
}

/// Obstacle avoidance parameters
#[derive(Clone, Debug, Deserialize)]
pub struct AvoidanceConfig {
    /// Obstacle threshold in centimeters
    #[serde(default = "default_threshold_cm")]
    pub threshold_cm: f32,

    /// Wheel speed for all maneuvers (0.0..=1.0)
    #[serde(default = "default_drive_speed")]
    pub drive_speed: f32,

    #[serde(default = "default_settle")]
    pub settle_ms: u64,

    #[serde(default = "default_turn")]
    pub turn_ms: u64,

    #[serde(default = "default_pause")]
    pub pause_ms: u64,

    #[serde(default = "default_first_advance")]
    pub first_advance_ms: u64,

    #[serde(default = "default_second_advance")]
    pub second_advance_ms: u64,

    /// Upper bound on each echo edge wait
    #[serde(default = "default_echo_timeout")]
    pub echo_timeout_ms: u64,
}

/// Simulated device parameters
#[derive(Clone, Debug, Deserialize)]
pub struct SimConfig {
    /// Distances (cm) returned by the simulated range sensor in order;
    /// the last value repeats. Negative values read as an echo timeout.
    #[serde(default = "default_sim_distances")]
    pub distances_cm: Vec<f32>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is not set (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_serial_port() -> String {
    "/dev/ttyAMA2".to_string()
}
fn default_baud_rate() -> u32 {
    115_200
}
fn default_motor_a1a() -> u8 {
    18
}
fn default_motor_a1b() -> u8 {
    17
}
fn default_motor_b1a() -> u8 {
    20
}
fn default_motor_b1b() -> u8 {
    21
}
fn default_trigger() -> u8 {
    23
}
fn default_echo() -> u8 {
    24
}
fn default_brush_a() -> u8 {
    16
}
fn default_brush_b() -> u8 {
    19
}
fn default_pwm_frequency() -> f64 {
    100.0
}
fn default_right_duty() -> f64 {
    750.0 / 1024.0
}
fn default_left_duty() -> f64 {
    550.0 / 1024.0
}
fn default_brush_duty() -> f64 {
    0.20
}
fn default_i2c_bus() -> u8 {
    1
}
fn default_rtc_address() -> u16 {
    0x68
}
fn default_true() -> bool {
    true
}
fn default_command_poll() -> u64 {
    10
}
fn default_drive_idle_poll() -> u64 {
    100
}
fn default_cruise_interval() -> u64 {
    300
}
fn default_schedule_tick() -> u64 {
    1000
}
fn default_threshold_cm() -> f32 {
    15.0
}
fn default_drive_speed() -> f32 {
    1.0
}
fn default_settle() -> u64 {
    300
}
fn default_turn() -> u64 {
    800
}
fn default_pause() -> u64 {
    1000
}
fn default_first_advance() -> u64 {
    400
}
fn default_second_advance() -> u64 {
    300
}
fn default_echo_timeout() -> u64 {
    3000
}
fn default_sim_distances() -> Vec<f32> {
    vec![120.0]
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            motor_a1a: default_motor_a1a(),
            motor_a1b: default_motor_a1b(),
            motor_b1a: default_motor_b1a(),
            motor_b1b: default_motor_b1b(),
            sonar_trigger: default_trigger(),
            sonar_echo: default_echo(),
            brush_a: default_brush_a(),
            brush_b: default_brush_b(),
        }
    }
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            pwm_frequency_hz: default_pwm_frequency(),
            right_duty: default_right_duty(),
            left_duty: default_left_duty(),
            brush_duty: default_brush_duty(),
        }
    }
}

impl Default for RtcConfig {
    fn default() -> Self {
        Self {
            i2c_bus: default_i2c_bus(),
            address: default_rtc_address(),
            seed_from_system: default_true(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            command_poll_ms: default_command_poll(),
            drive_idle_poll_ms: default_drive_idle_poll(),
            cruise_interval_ms: default_cruise_interval(),
            schedule_tick_ms: default_schedule_tick(),
        }
    }
}

impl Default for AvoidanceConfig {
    fn default() -> Self {
        Self {
            threshold_cm: default_threshold_cm(),
            drive_speed: default_drive_speed(),
            settle_ms: default_settle(),
            turn_ms: default_turn(),
            pause_ms: default_pause(),
            first_advance_ms: default_first_advance(),
            second_advance_ms: default_second_advance(),
            echo_timeout_ms: default_echo_timeout(),
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            distances_cm: default_sim_distances(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl TimingConfig {
    pub fn command_poll(&self) -> Duration {
        Duration::from_millis(self.command_poll_ms)
    }

    pub fn drive_idle_poll(&self) -> Duration {
        Duration::from_millis(self.drive_idle_poll_ms)
    }

    pub fn cruise_interval(&self) -> Duration {
        Duration::from_millis(self.cruise_interval_ms)
    }

    pub fn schedule_tick(&self) -> Duration {
        Duration::from_millis(self.schedule_tick_ms)
    }
}

impl MarjaniConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MarjaniError::Config(format!("Failed to read config file: {}", e)))?;
        let config: MarjaniConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the control loops cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.avoidance.drive_speed) {
            return Err(MarjaniError::Config(format!(
                "avoidance.drive_speed must be within 0.0..=1.0, got {}",
                self.avoidance.drive_speed
            )));
        }
        if self.avoidance.threshold_cm <= 0.0 {
            return Err(MarjaniError::Config(format!(
                "avoidance.threshold_cm must be positive, got {}",
                self.avoidance.threshold_cm
            )));
        }
        if self.timing.schedule_tick_ms == 0 {
            return Err(MarjaniError::Config(
                "timing.schedule_tick_ms must be non-zero".to_string(),
            ));
        }
        if self.sim.distances_cm.is_empty() {
            return Err(MarjaniError::Config(
                "sim.distances_cm needs at least one value".to_string(),
            ));
        }
        Ok(())
    }
}
