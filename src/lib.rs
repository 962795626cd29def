//! Marjani - control core for an autonomous cleaning robot
//!
//! Drives the wheel motors, avoids obstacles with a forward ultrasonic sensor,
//! runs a weekly cleaning schedule off a real-time clock, and takes manual
//! commands over a line-based serial protocol.
//!
//! ## Architecture
//!
//! - [`threads`]: the command, drive and schedule loops
//! - [`shared`]: state shared between the loops (schedule table, cleaning flags)
//! - [`schedule`]: the schedule table and elapsed-time accounting
//! - [`protocol`]: command parsing, line framing and status lines
//! - [`drivers`]: hardware traits; [`devices`]: Raspberry Pi and simulated backends

pub mod config;
pub mod control;
pub mod devices;
pub mod drivers;
pub mod error;
pub mod motion;
pub mod protocol;
pub mod schedule;
pub mod shared;
pub mod threads;

pub use config::MarjaniConfig;
pub use control::CleaningControl;
pub use error::{MarjaniError, Result};
pub use schedule::{ClockTime, MAX_SCHEDULES, Schedule, ScheduleTable};
pub use shared::{CleaningStatus, SharedState};
