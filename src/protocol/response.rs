//! Status lines sent to the host

use crate::schedule::Schedule;

pub const STATUS_WORKING: &str = "STATUS WORKING";
pub const STATUS_IDLE: &str = "STATUS IDLE";

/// `STATUS WORKING` / `STATUS IDLE`
pub fn status_line(cleaning: bool) -> &'static str {
    if cleaning { STATUS_WORKING } else { STATUS_IDLE }
}

/// `SCHEDULE <slot> <day>-<hour>:<minute>:0 <duration>`
///
/// Schedules key on whole minutes, so the seconds field is always 0.
pub fn schedule_line(slot: usize, schedule: &Schedule) -> String {
    format!(
        "SCHEDULE {} {}-{}:{}:0 {}",
        slot, schedule.weekday, schedule.hour, schedule.minute, schedule.duration_secs
    )
}

/// `SCHEDULE_COUNT <n>`
pub fn schedule_count_line(count: usize) -> String {
    format!("SCHEDULE_COUNT {}", count)
}

/// One line per live schedule followed by the count line
pub fn schedule_dump(schedules: &[Schedule]) -> Vec<String> {
    schedules
        .iter()
        .enumerate()
        .map(|(slot, schedule)| schedule_line(slot, schedule))
        .chain(std::iter::once(schedule_count_line(schedules.len())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line() {
        assert_eq!(status_line(true), "STATUS WORKING");
        assert_eq!(status_line(false), "STATUS IDLE");
    }

    #[test]
    fn test_schedule_line_unpadded() {
        let schedule = Schedule::from_fields(0, 1, 9, 5, 1800).unwrap();
        assert_eq!(schedule_line(0, &schedule), "SCHEDULE 0 1-9:5:0 1800");
    }

    #[test]
    fn test_schedule_dump() {
        let schedules = vec![
            Schedule::from_fields(0, 1, 9, 30, 1800).unwrap(),
            Schedule::from_fields(1, 6, 14, 0, 600).unwrap(),
        ];
        assert_eq!(
            schedule_dump(&schedules),
            vec![
                "SCHEDULE 0 1-9:30:0 1800".to_string(),
                "SCHEDULE 1 6-14:0:0 600".to_string(),
                "SCHEDULE_COUNT 2".to_string(),
            ]
        );
        assert_eq!(schedule_dump(&[]), vec!["SCHEDULE_COUNT 0".to_string()]);
    }
}
