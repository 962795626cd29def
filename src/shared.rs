//! Shared state for the multi-threaded control engine.
//!
//! Provides thread-safe state shared between:
//! - Command thread (serial protocol, manual start/stop, schedule edits)
//! - Drive thread (reads the cleaning flag, owns the turn parity)
//! - Schedule thread (RTC polling, scheduled start and duration stop)
//!
//! The schedule table and the cleaning flags sit behind two separate locks.
//! Neither lock is ever taken while the other is held, and no method holds a
//! lock across I/O or a sleep.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::schedule::{ClockTime, Schedule, ScheduleTable};

/// Snapshot of the cleaning flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CleaningStatus {
    /// A cleaning run is in progress
    pub active: bool,
    /// The run was started by hand; suppresses the duration stop
    pub manual_override: bool,
    /// Duration budget of the run, copied from the matched schedule
    pub duration_secs: u32,
}

/// Shared state between all threads.
#[derive(Debug, Default)]
pub struct SharedState {
    schedules: Mutex<ScheduleTable>,
    cleaning: Mutex<CleaningStatus>,
    /// Obstacle encounters so far; even turns right, odd turns left
    turn_parity: AtomicU32,
    /// Shutdown signal for graceful termination
    shutdown: AtomicBool,
}

impl SharedState {
    /// Create idle state with an empty schedule table.
    pub fn new() -> Self {
        Self::default()
    }

    // --- Schedule table ---

    /// Add or update a schedule; false when refused.
    pub fn add_schedule(&self, schedule: Schedule) -> bool {
        self.schedules.lock().add(schedule)
    }

    /// Delete a schedule by slot; out-of-range ids are ignored.
    pub fn delete_schedule(&self, id: usize) {
        self.schedules.lock().delete(id);
    }

    /// Raw contents of slot `id`, live or not.
    pub fn schedule_slot(&self, id: usize) -> Option<Schedule> {
        self.schedules.lock().slot(id).copied()
    }

    /// Copy of the live schedules in slot order.
    pub fn schedules(&self) -> Vec<Schedule> {
        self.schedules.lock().iter().copied().collect()
    }

    pub fn schedule_count(&self) -> usize {
        self.schedules.lock().len()
    }

    /// Duration of the schedule due at `time` (last slot wins).
    pub fn match_due_schedule(&self, time: &ClockTime) -> Option<u32> {
        self.schedules.lock().match_due(time)
    }

    // --- Cleaning flags ---

    pub fn cleaning(&self) -> CleaningStatus {
        *self.cleaning.lock()
    }

    pub fn is_cleaning(&self) -> bool {
        self.cleaning.lock().active
    }

    /// Manual start: cleaning on, override on.
    pub fn start_manual(&self) {
        let mut cleaning = self.cleaning.lock();
        cleaning.active = true;
        cleaning.manual_override = true;
    }

    /// Manual stop: cleaning off, override off.
    pub fn stop_manual(&self) {
        let mut cleaning = self.cleaning.lock();
        cleaning.active = false;
        cleaning.manual_override = false;
    }

    /// Scheduled start; the override flag is left as it is.
    pub fn start_scheduled(&self, duration_secs: u32) {
        let mut cleaning = self.cleaning.lock();
        cleaning.active = true;
        cleaning.duration_secs = duration_secs;
    }

    /// Stop the run if `elapsed_secs` is past its budget and it was not
    /// started by hand. Returns true when the run was stopped.
    pub fn expire_run(&self, elapsed_secs: i64) -> bool {
        let mut cleaning = self.cleaning.lock();
        if cleaning.active
            && !cleaning.manual_override
            && elapsed_secs > cleaning.duration_secs as i64
        {
            cleaning.active = false;
            return true;
        }
        false
    }

    // --- Obstacle turn alternation ---

    pub fn turn_parity(&self) -> u32 {
        self.turn_parity.load(Ordering::Acquire)
    }

    /// Count one obstacle encounter.
    pub fn advance_turn_parity(&self) {
        self.turn_parity.fetch_add(1, Ordering::AcqRel);
    }

    // --- Shutdown ---

    /// Signal shutdown.
    pub fn signal_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Check if shutdown is signaled.
    pub fn should_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = SharedState::new();
        assert_eq!(state.cleaning(), CleaningStatus::default());
        assert_eq!(state.schedule_count(), 0);
        assert_eq!(state.turn_parity(), 0);
        assert!(!state.should_shutdown());
    }

    #[test]
    fn test_manual_start_stop() {
        let state = SharedState::new();
        state.start_manual();
        assert!(state.cleaning().active);
        assert!(state.cleaning().manual_override);

        state.stop_manual();
        assert_eq!(state.cleaning(), CleaningStatus::default());

        // Stopping twice stays idle
        state.stop_manual();
        assert!(!state.is_cleaning());
    }

    #[test]
    fn test_scheduled_start_keeps_override() {
        let state = SharedState::new();
        state.start_scheduled(60);
        let status = state.cleaning();
        assert!(status.active);
        assert!(!status.manual_override);
        assert_eq!(status.duration_secs, 60);
    }

    #[test]
    fn test_expire_run() {
        let state = SharedState::new();
        state.start_scheduled(60);
        assert!(!state.expire_run(60));
        assert!(state.is_cleaning());
        assert!(state.expire_run(61));
        assert!(!state.is_cleaning());
        // Already idle
        assert!(!state.expire_run(500));
    }

    #[test]
    fn test_expire_run_respects_manual_override() {
        let state = SharedState::new();
        state.start_manual();
        state.start_scheduled(60);
        assert!(!state.expire_run(10_000));
        assert!(state.is_cleaning());
    }

    #[test]
    fn test_turn_parity_alternates() {
        let state = SharedState::new();
        assert_eq!(state.turn_parity() % 2, 0);
        state.advance_turn_parity();
        assert_eq!(state.turn_parity() % 2, 1);
        state.advance_turn_parity();
        assert_eq!(state.turn_parity() % 2, 0);
    }

    #[test]
    fn test_schedule_operations() {
        let state = SharedState::new();
        assert!(state.add_schedule(Schedule::from_fields(0, 1, 9, 30, 1800).unwrap()));
        assert!(state.add_schedule(Schedule::from_fields(1, 1, 9, 30, 900).unwrap()));
        assert_eq!(
            state.match_due_schedule(&ClockTime::new(1, 9, 30, 0)),
            Some(900)
        );
        state.delete_schedule(1);
        assert_eq!(state.schedules().len(), 1);
        assert_eq!(state.schedule_slot(0).unwrap().duration_secs, 1800);
    }
}
