//! Drive thread: forward cruising with obstacle avoidance.
//!
//! While cleaning is active the robot drives forward and samples the range
//! sensor once per cruise interval. A reading below the threshold runs the
//! avoidance maneuver to completion before the cleaning flag is looked at
//! again. While idle the wheels stay stopped.

use std::sync::Arc;
use std::time::Duration;

use crate::config::MarjaniConfig;
use crate::devices::DeviceFactory;
use crate::drivers::{Direction, MotorDriver, RangeSensor};
use crate::error::Result;
use crate::motion::{AvoidanceManeuver, turn_for_parity};
use crate::shared::SharedState;

/// Drive loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveState {
    /// Cleaning inactive, wheels stopped
    Idle,
    /// Cleaning active, driving forward
    Cruising,
    /// Running the escape maneuver
    Avoiding,
}

/// Drive thread state and logic.
pub struct DriveThread {
    config: MarjaniConfig,
    shared_state: Arc<SharedState>,
    motor: Box<dyn MotorDriver>,
    sensor: Box<dyn RangeSensor>,
    state: DriveState,
}

impl DriveThread {
    pub fn new(
        config: MarjaniConfig,
        shared_state: Arc<SharedState>,
        motor: Box<dyn MotorDriver>,
        sensor: Box<dyn RangeSensor>,
    ) -> Self {
        Self {
            config,
            shared_state,
            motor,
            sensor,
            // Forces a stop on the first idle step
            state: DriveState::Cruising,
        }
    }

    /// Open the wheel motors and range sensor.
    pub fn open(
        config: MarjaniConfig,
        shared_state: Arc<SharedState>,
        factory: &dyn DeviceFactory,
    ) -> Result<Self> {
        let motor = factory.open_motor()?;
        let sensor = factory.open_range_sensor()?;
        Ok(Self::new(config, shared_state, motor, sensor))
    }

    pub fn state(&self) -> DriveState {
        self.state
    }

    /// Run one loop iteration; returns how long to wait before the next.
    pub fn step(&mut self) -> Duration {
        if !self.shared_state.is_cleaning() {
            if self.state != DriveState::Idle {
                tracing::info!("Drive idle");
                self.stop_motor();
                self.state = DriveState::Idle;
            }
            return self.config.timing.drive_idle_poll();
        }

        if self.state == DriveState::Idle {
            tracing::info!("Drive cruising");
        }
        self.state = DriveState::Cruising;

        if let Err(e) = self
            .motor
            .drive(Direction::Forward, self.config.avoidance.drive_speed)
        {
            tracing::warn!("Motor forward failed: {}", e);
        }

        if let Some(distance) = self.obstacle_distance() {
            self.avoid(distance);
        }

        self.config.timing.cruise_interval()
    }

    /// Distance of an obstacle inside the threshold, if any.
    ///
    /// Echo timeouts and sensor errors read as a clear path.
    fn obstacle_distance(&mut self) -> Option<f32> {
        match self.sensor.measure_distance() {
            Ok(Some(distance)) if distance < self.config.avoidance.threshold_cm => Some(distance),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Range sensor read failed: {}", e);
                None
            }
        }
    }

    fn avoid(&mut self, distance: f32) {
        self.state = DriveState::Avoiding;
        let turn = turn_for_parity(self.shared_state.turn_parity());
        tracing::info!("Obstacle at {:.1} cm, escaping with {:?}", distance, turn);

        let maneuver = AvoidanceManeuver::plan(&self.config.avoidance, turn);
        if let Err(e) = maneuver.execute(self.motor.as_mut()) {
            tracing::warn!("Avoidance maneuver aborted: {}", e);
            self.stop_motor();
        }

        self.shared_state.advance_turn_parity();
        self.state = DriveState::Cruising;
    }

    fn stop_motor(&mut self) {
        if let Err(e) = self.motor.stop() {
            tracing::warn!("Motor stop failed: {}", e);
        }
    }

    /// Run the drive thread main loop.
    pub fn run(&mut self) {
        tracing::info!("Drive thread started");

        loop {
            if self.shared_state.should_shutdown() {
                tracing::info!("Drive thread shutting down");
                break;
            }

            let wait = self.step();
            std::thread::sleep(wait);
        }

        self.stop_motor();
    }
}
