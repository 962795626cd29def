//! Blind obstacle escape maneuver.
//!
//! A single forward sensor cannot tell how wide an obstacle is, so the robot
//! runs a fixed, time-based sequence and alternates the turn direction from
//! one encounter to the next. No sensor reads happen during the maneuver.

use std::time::Duration;

use crate::config::AvoidanceConfig;
use crate::drivers::{Direction, MotorDriver};
use crate::error::Result;

/// One timed step of a maneuver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManeuverStep {
    /// Stop the wheels and wait
    Stop(Duration),
    /// Drive for a fixed time
    Drive {
        direction: Direction,
        duration: Duration,
    },
}

impl ManeuverStep {
    pub fn duration(&self) -> Duration {
        match *self {
            ManeuverStep::Stop(duration) => duration,
            ManeuverStep::Drive { duration, .. } => duration,
        }
    }
}

/// Turn direction for an encounter: even parity turns right, odd turns left
pub fn turn_for_parity(parity: u32) -> Direction {
    if parity % 2 == 0 {
        Direction::TurnRight
    } else {
        Direction::TurnLeft
    }
}

/// Planned escape sequence
#[derive(Debug, Clone)]
pub struct AvoidanceManeuver {
    steps: Vec<ManeuverStep>,
    speed: f32,
}

impl AvoidanceManeuver {
    /// Stop and settle, turn, pause, advance, turn the same way again, pause,
    /// advance.
    pub fn plan(config: &AvoidanceConfig, turn: Direction) -> Self {
        let ms = Duration::from_millis;
        let steps = vec![
            ManeuverStep::Stop(ms(config.settle_ms)),
            ManeuverStep::Drive {
                direction: turn,
                duration: ms(config.turn_ms),
            },
            ManeuverStep::Stop(ms(config.pause_ms)),
            ManeuverStep::Drive {
                direction: Direction::Forward,
                duration: ms(config.first_advance_ms),
            },
            ManeuverStep::Drive {
                direction: turn,
                duration: ms(config.turn_ms),
            },
            ManeuverStep::Stop(ms(config.pause_ms)),
            ManeuverStep::Drive {
                direction: Direction::Forward,
                duration: ms(config.second_advance_ms),
            },
        ];
        Self {
            steps,
            speed: config.drive_speed,
        }
    }

    pub fn steps(&self) -> &[ManeuverStep] {
        &self.steps
    }

    /// Sum of all step durations
    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(ManeuverStep::duration).sum()
    }

    /// Run every step to completion on `motor`.
    ///
    /// Returns the first motor error; the caller decides whether to stop.
    pub fn execute(&self, motor: &mut dyn MotorDriver) -> Result<()> {
        for step in &self.steps {
            match *step {
                ManeuverStep::Stop(pause) => {
                    motor.stop()?;
                    std::thread::sleep(pause);
                }
                ManeuverStep::Drive {
                    direction,
                    duration,
                } => {
                    motor.drive(direction, self.speed)?;
                    std::thread::sleep(duration);
                }
            }
        }
        Ok(())
    }
}
