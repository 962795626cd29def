//! Direction to H-bridge pin duty mapping
//!
//! The two wheel motors are driven by a dual H-bridge with four inputs:
//!
//! | Direction  | A1A   | A1B   | B1A  | B1B  |
//! |------------|-------|-------|------|------|
//! | Forward    | right | 0     | 0    | left |
//! | Backward   | 0     | right | left | 0    |
//! | TurnLeft   | 0     | right | 0    | left |
//! | TurnRight  | right | 0     | left | 0    |
//! | Stop       | 0     | 0     | 0    | 0    |

use crate::config::MotorConfig;
use crate::drivers::Direction;

/// Duty cycle (0.0..=1.0) for each bridge input
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PinDuties {
    pub a1a: f64,
    pub a1b: f64,
    pub b1a: f64,
    pub b1b: f64,
}

impl PinDuties {
    pub fn as_array(&self) -> [f64; 4] {
        [self.a1a, self.a1b, self.b1a, self.b1b]
    }
}

/// Compute bridge duties for `direction` at `speed`.
pub fn pin_duties(config: &MotorConfig, direction: Direction, speed: f32) -> PinDuties {
    let speed = speed.clamp(0.0, 1.0) as f64;
    let right = config.right_duty * speed;
    let left = config.left_duty * speed;

    match direction {
        Direction::Forward => PinDuties {
            a1a: right,
            b1b: left,
            ..Default::default()
        },
        Direction::Backward => PinDuties {
            a1b: right,
            b1a: left,
            ..Default::default()
        },
        Direction::TurnLeft => PinDuties {
            a1b: right,
            b1b: left,
            ..Default::default()
        },
        Direction::TurnRight => PinDuties {
            a1a: right,
            b1a: left,
            ..Default::default()
        },
        Direction::Stop => PinDuties::default(),
    }
}
