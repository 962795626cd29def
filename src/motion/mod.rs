//! Drive maneuvers

mod avoidance;

pub use avoidance::{AvoidanceManeuver, ManeuverStep, turn_for_parity};
