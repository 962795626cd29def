//! Schedule thread: RTC polling, scheduled start and duration stop.
//!
//! Once per tick the clock is read. While idle the schedule table is checked
//! for a slot due at this exact second, and the elapsed-time baseline is moved
//! to the current minute. While cleaning, the elapsed time since the baseline
//! is compared against the run's budget.

use std::sync::Arc;

use crate::config::MarjaniConfig;
use crate::control::CleaningControl;
use crate::devices::{DeviceFactory, system_clock_time};
use crate::drivers::ClockSource;
use crate::error::Result;
use crate::schedule::{ClockTime, RunBaseline};

/// Schedule thread state and logic.
pub struct ScheduleThread {
    config: MarjaniConfig,
    control: Arc<CleaningControl>,
    clock: Box<dyn ClockSource>,
    baseline: Option<RunBaseline>,
}

impl ScheduleThread {
    pub fn new(
        config: MarjaniConfig,
        control: Arc<CleaningControl>,
        clock: Box<dyn ClockSource>,
    ) -> Self {
        Self {
            config,
            control,
            clock,
            baseline: None,
        }
    }

    /// Open the RTC, seeding it from system time when configured.
    pub fn open(
        config: MarjaniConfig,
        control: Arc<CleaningControl>,
        factory: &dyn DeviceFactory,
    ) -> Result<Self> {
        let mut clock = factory.open_clock()?;
        if config.rtc.seed_from_system {
            let now = system_clock_time();
            match clock.write_time(now) {
                Ok(()) => tracing::info!("RTC set to {}", now),
                Err(e) => tracing::warn!("Failed to set RTC: {}", e),
            }
        }
        Ok(Self::new(config, control, clock))
    }

    pub fn baseline(&self) -> Option<RunBaseline> {
        self.baseline
    }

    /// Run one schedule check against the clock.
    pub fn tick(&mut self) {
        let now = match self.clock.read_time() {
            Ok(now) => now,
            Err(e) => {
                tracing::warn!("RTC read failed: {}", e);
                return;
            }
        };
        tracing::debug!("RTC {}", now);

        if self.control.shared().is_cleaning() {
            self.check_duration(&now);
        } else {
            self.check_schedules(&now);
        }
    }

    fn check_schedules(&mut self, now: &ClockTime) {
        let due = self.control.shared().match_due_schedule(now);
        self.baseline = Some(RunBaseline::at(now));
        if let Some(duration_secs) = due {
            tracing::info!("Schedule due at {}", now);
            self.control.start_scheduled(duration_secs);
        }
    }

    fn check_duration(&mut self, now: &ClockTime) {
        // A run started before the first idle tick has no baseline yet
        let baseline = *self.baseline.get_or_insert_with(|| RunBaseline::at(now));
        let elapsed = baseline.elapsed_secs(now);
        self.control.expire(elapsed);
    }

    /// Run the schedule thread main loop.
    pub fn run(&mut self) {
        tracing::info!("Schedule thread started");
        let tick = self.config.timing.schedule_tick();

        loop {
            if self.control.shared().should_shutdown() {
                tracing::info!("Schedule thread shutting down");
                break;
            }

            self.tick();
            std::thread::sleep(tick);
        }
    }
}
