//! Cleaning start/stop with its side effects.
//!
//! Every transition of the cleaning flag, whether from a host command or the
//! schedule loop, switches the brush and reports the new status on the serial
//! link. The flag update happens under the shared-state lock; the brush and the
//! status line are handled after the lock is released.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::drivers::BrushActuator;
use crate::protocol::{StatusOutbox, status_line};
use crate::shared::SharedState;

/// Cleaning state transitions shared by the command and schedule threads
pub struct CleaningControl {
    shared: Arc<SharedState>,
    brush: Mutex<Option<Box<dyn BrushActuator>>>,
    outbox: Arc<StatusOutbox>,
}

impl CleaningControl {
    pub fn new(shared: Arc<SharedState>, outbox: Arc<StatusOutbox>) -> Self {
        Self {
            shared,
            brush: Mutex::new(None),
            outbox,
        }
    }

    /// Install the brush actuator
    pub fn attach_brush(&self, brush: Box<dyn BrushActuator>) {
        *self.brush.lock() = Some(brush);
    }

    pub fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }

    pub fn outbox(&self) -> &Arc<StatusOutbox> {
        &self.outbox
    }

    /// `START`: cleaning on with the manual override set
    pub fn start_manual(&self) {
        self.shared.start_manual();
        tracing::info!("Cleaning started (manual)");
        self.switch_brush(true);
        self.report_status();
    }

    /// `STOP`: cleaning off, override cleared
    pub fn stop_manual(&self) {
        self.shared.stop_manual();
        tracing::info!("Cleaning stopped (manual)");
        self.switch_brush(false);
        self.report_status();
    }

    /// Schedule match: cleaning on with a duration budget
    pub fn start_scheduled(&self, duration_secs: u32) {
        self.shared.start_scheduled(duration_secs);
        tracing::info!("Cleaning started by schedule for {}s", duration_secs);
        self.switch_brush(true);
        self.report_status();
    }

    /// Stop a scheduled run once `elapsed_secs` exceeds its budget.
    ///
    /// Manual runs are left alone. Returns true if the run was stopped.
    pub fn expire(&self, elapsed_secs: i64) -> bool {
        if !self.shared.expire_run(elapsed_secs) {
            return false;
        }
        tracing::info!("Cleaning finished after {}s", elapsed_secs);
        self.switch_brush(false);
        self.report_status();
        true
    }

    /// Send the current status line
    pub fn report_status(&self) {
        self.outbox.send(status_line(self.shared.is_cleaning()));
    }

    /// Leave the brush off for process exit
    pub fn shutdown(&self) {
        self.switch_brush(false);
    }

    fn switch_brush(&self, enabled: bool) {
        let mut brush = self.brush.lock();
        let Some(brush) = brush.as_mut() else {
            return;
        };
        let result = if enabled {
            brush.enable()
        } else {
            brush.disable()
        };
        if let Err(e) = result {
            tracing::warn!("Brush {} failed: {}", if enabled { "enable" } else { "disable" }, e);
        }
    }
}
