//! Weekly cleaning schedule table.
//!
//! Schedules live in a fixed table of [`MAX_SCHEDULES`] slots. A schedule's id is
//! its slot index: adding with `id == len()` appends, adding with an id below
//! `len()` rewrites that slot in place, and deleting compacts the table so the
//! following slots shift down by one. Slots at or past `len()` are absent no
//! matter what they hold.

use std::fmt;

/// Capacity of the schedule table
pub const MAX_SCHEDULES: usize = 10;

/// Seconds in one day, added once when a run crosses midnight
pub const SECONDS_PER_DAY: i64 = 24 * 3600;

/// Wall-clock reading from the real-time clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockTime {
    /// Day of week, 1 = Monday .. 7 = Sunday
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl ClockTime {
    pub fn new(weekday: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            weekday,
            hour,
            minute,
            second,
        }
    }

    /// Seconds since midnight at the start of the current minute
    pub fn minute_mark(&self) -> i64 {
        self.hour as i64 * 3600 + self.minute as i64 * 60
    }

    /// Seconds since midnight
    pub fn seconds_of_day(&self) -> i64 {
        self.minute_mark() + self.second as i64
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "day {} {:02}:{:02}:{:02}",
            self.weekday, self.hour, self.minute, self.second
        )
    }
}

/// One weekly cleaning slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Schedule {
    /// Slot index in the table
    pub id: usize,
    /// Day of week, 1 = Monday .. 7 = Sunday
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    /// Run length budget in seconds
    pub duration_secs: u32,
}

impl Schedule {
    /// Build a schedule from raw protocol integers.
    ///
    /// Returns `None` when any field falls outside its range: id in
    /// `0..MAX_SCHEDULES`, weekday 1..=7, hour 0..=23, minute 0..=59,
    /// non-negative duration.
    pub fn from_fields(id: i64, weekday: i64, hour: i64, minute: i64, duration: i64) -> Option<Self> {
        let id = usize::try_from(id).ok().filter(|&id| id < MAX_SCHEDULES)?;
        let weekday = u8::try_from(weekday).ok().filter(|d| (1..=7).contains(d))?;
        let hour = u8::try_from(hour).ok().filter(|&h| h < 24)?;
        let minute = u8::try_from(minute).ok().filter(|&m| m < 60)?;
        let duration_secs = u32::try_from(duration).ok()?;
        Some(Self {
            id,
            weekday,
            hour,
            minute,
            duration_secs,
        })
    }

    /// True when this schedule fires at `time`.
    ///
    /// Only the zero-second tick of the target minute counts.
    pub fn is_due(&self, time: &ClockTime) -> bool {
        self.weekday == time.weekday
            && self.hour == time.hour
            && self.minute == time.minute
            && time.second == 0
    }
}

/// Fixed-capacity slot table.
#[derive(Debug, Clone, Default)]
pub struct ScheduleTable {
    slots: [Schedule; MAX_SCHEDULES],
    count: usize,
}

impl ScheduleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live slots
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count >= MAX_SCHEDULES
    }

    /// Write `schedule` into slot `schedule.id`.
    ///
    /// Fails when the table is full or the id is past the table capacity.
    /// Writing slot `len()` appends; a lower id updates in place. An id past
    /// `len()` is stored but stays absent until the table grows to it.
    pub fn add(&mut self, schedule: Schedule) -> bool {
        if self.is_full() || schedule.id >= MAX_SCHEDULES {
            return false;
        }

        self.slots[schedule.id] = schedule;
        if schedule.id == self.count {
            self.count += 1;
        }
        true
    }

    /// Remove slot `id`, shifting every later slot down by one.
    ///
    /// No-op when `id` is not a live slot.
    pub fn delete(&mut self, id: usize) {
        if id >= self.count {
            return;
        }

        self.slots.copy_within(id + 1..self.count, id);
        self.count -= 1;
        for (index, slot) in self.slots.iter_mut().enumerate().take(self.count).skip(id) {
            slot.id = index;
        }
    }

    /// Live schedule in slot `id`
    pub fn get(&self, id: usize) -> Option<&Schedule> {
        self.slots[..self.count].get(id)
    }

    /// Raw slot contents, including slots past `len()`
    pub fn slot(&self, id: usize) -> Option<&Schedule> {
        self.slots.get(id)
    }

    /// Live schedules in slot order
    pub fn iter(&self) -> impl Iterator<Item = &Schedule> {
        self.slots[..self.count].iter()
    }

    /// Duration of the schedule due at `time`, if any.
    ///
    /// When several slots are due at once the highest slot wins.
    pub fn match_due(&self, time: &ClockTime) -> Option<u32> {
        self.iter()
            .filter(|schedule| schedule.is_due(time))
            .last()
            .map(|schedule| schedule.duration_secs)
    }
}

/// Start point for elapsed-time accounting of a cleaning run.
///
/// Elapsed time is measured from the start of the minute the run began in, so it
/// carries up to 59 seconds of slack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunBaseline {
    pub weekday: u8,
    pub minute_mark: i64,
}

impl RunBaseline {
    pub fn at(time: &ClockTime) -> Self {
        Self {
            weekday: time.weekday,
            minute_mark: time.minute_mark(),
        }
    }

    /// Seconds since the baseline.
    ///
    /// Adds one day when the weekday changed; runs spanning more than one
    /// midnight are not accounted for.
    pub fn elapsed_secs(&self, now: &ClockTime) -> i64 {
        let mut current = now.seconds_of_day();
        if now.weekday != self.weekday {
            current += SECONDS_PER_DAY;
        }
        current - self.minute_mark
    }
}
