//! Hardware driver traits
//!
//! The control loops only talk to hardware through these traits. Concrete
//! implementations live in [`crate::devices`]: Raspberry Pi drivers behind the
//! `rpi` feature, and simulated devices for bench runs and tests.

use crate::error::Result;
use crate::schedule::ClockTime;

/// Wheel drive direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
    TurnLeft,
    TurnRight,
    Stop,
}

/// Differential wheel motor driver
pub trait MotorDriver: Send {
    /// Drive in `direction` at `speed` (0.0..=1.0 of full duty)
    fn drive(&mut self, direction: Direction, speed: f32) -> Result<()>;

    /// Stop both wheels
    fn stop(&mut self) -> Result<()> {
        self.drive(Direction::Stop, 0.0)
    }
}

/// Forward-facing range sensor
pub trait RangeSensor: Send {
    /// Distance to the nearest obstacle in centimeters, `None` on echo timeout
    fn measure_distance(&mut self) -> Result<Option<f32>>;
}

/// Real-time clock
pub trait ClockSource: Send {
    fn read_time(&mut self) -> Result<ClockTime>;

    fn write_time(&mut self, time: ClockTime) -> Result<()>;
}

/// Cleaning brush motor
pub trait BrushActuator: Send {
    fn enable(&mut self) -> Result<()>;

    fn disable(&mut self) -> Result<()>;
}

/// Read half of the serial command link
pub trait SerialChannel: Send {
    /// Read available bytes into `buffer`; returns 0 when nothing is pending
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;
}

/// Write half of the serial command link
pub trait LineWriter: Send {
    /// Write `line` followed by a newline
    fn write_line(&mut self, line: &str) -> Result<()>;
}
