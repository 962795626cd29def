//! Control engine scenarios
//!
//! Runs the command, drive and schedule threads against in-memory devices:
//! commands go in through a [`MemoryChannel`], status lines are read back from
//! it, and the simulated clock, range sensor, motor and brush are scripted or
//! inspected through their shared handles.
//!
//! Run with: `cargo test --test control_engine`

use std::sync::Arc;
use std::time::{Duration, Instant};

use marjani::config::{AvoidanceConfig, MarjaniConfig, TimingConfig};
use marjani::control::CleaningControl;
use marjani::devices::DeviceFactory;
use marjani::devices::sim::{MemoryChannel, SimDevice, SimDevices};
use marjani::drivers::Direction;
use marjani::protocol::StatusOutbox;
use marjani::schedule::ClockTime;
use marjani::shared::SharedState;
use marjani::threads::{ThreadHandles, spawn_threads};

// ============================================================================
// Test Rig
// ============================================================================

const WAIT_LIMIT: Duration = Duration::from_secs(5);

fn fast_config() -> MarjaniConfig {
    let mut config = MarjaniConfig {
        timing: TimingConfig {
            command_poll_ms: 1,
            drive_idle_poll_ms: 1,
            cruise_interval_ms: 1,
            schedule_tick_ms: 2,
        },
        avoidance: AvoidanceConfig {
            settle_ms: 1,
            turn_ms: 1,
            pause_ms: 1,
            first_advance_ms: 1,
            second_advance_ms: 1,
            ..AvoidanceConfig::default()
        },
        ..MarjaniConfig::default()
    };
    // The simulated clock must stay where the test puts it
    config.rtc.seed_from_system = false;
    config
}

struct Rig {
    devices: Arc<SimDevices>,
    channel: MemoryChannel,
    shared: Arc<SharedState>,
    handles: Option<ThreadHandles>,
}

impl Rig {
    fn new() -> Self {
        Self::with_devices(|_| {})
    }

    /// Build the devices, let `prepare` script them, then start the threads
    fn with_devices(prepare: impl FnOnce(&SimDevices)) -> Self {
        let channel = MemoryChannel::new();
        let devices = Arc::new(SimDevices::in_memory(channel.clone()));
        prepare(&devices);

        let shared = Arc::new(SharedState::new());
        let control = Arc::new(CleaningControl::new(
            Arc::clone(&shared),
            Arc::new(StatusOutbox::new()),
        ));
        if let Ok(brush) = devices.open_brush() {
            control.attach_brush(brush);
        }

        let factory: Arc<dyn DeviceFactory> = devices.clone();
        let handles = spawn_threads(fast_config(), factory, control).unwrap();

        Self {
            devices,
            channel,
            shared,
            handles: Some(handles),
        }
    }

    fn send(&self, line: &str) {
        self.channel.send(&format!("{}\n", line));
    }

    /// Wait until the robot has written at least `count` lines
    fn wait_lines(&self, count: usize) -> Vec<String> {
        wait_until("serial output", || self.channel.lines().len() >= count);
        self.channel.lines()
    }

    fn set_clock(&self, weekday: u8, hour: u8, minute: u8, second: u8) {
        self.devices
            .clock
            .set(ClockTime::new(weekday, hour, minute, second));
    }

    fn turns(&self) -> Vec<Direction> {
        self.devices
            .motor
            .directions()
            .into_iter()
            .filter(|d| matches!(d, Direction::TurnLeft | Direction::TurnRight))
            .collect()
    }

    fn shutdown(&mut self) {
        self.shared.signal_shutdown();
        if let Some(handles) = self.handles.take() {
            handles.join();
        }
    }
}

impl Drop for Rig {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let start = Instant::now();
    while !condition() {
        assert!(start.elapsed() < WAIT_LIMIT, "timed out waiting for {}", what);
        std::thread::sleep(Duration::from_millis(1));
    }
}

// ============================================================================
// Command Protocol
// ============================================================================

#[test]
fn test_add_schedule_then_connect() {
    let rig = Rig::new();

    rig.send("ADD_SCHEDULE 0 1-9:30:0 1800");
    assert_eq!(rig.wait_lines(1), vec!["SCHEDULE 0 1-9:30:0 1800"]);

    rig.send("CONNECT");
    assert_eq!(
        rig.wait_lines(4),
        vec![
            "SCHEDULE 0 1-9:30:0 1800",
            "SCHEDULE 0 1-9:30:0 1800",
            "SCHEDULE_COUNT 1",
            "STATUS IDLE",
        ]
    );
}

#[test]
fn test_start_then_stop() {
    let rig = Rig::new();

    rig.send("START");
    assert_eq!(rig.wait_lines(1), vec!["STATUS WORKING"]);
    assert!(rig.devices.brush.is_enabled());
    wait_until("forward drive", || {
        rig.devices.motor.last_direction() == Some(Direction::Forward)
    });

    rig.send("STOP");
    assert_eq!(rig.wait_lines(2), vec!["STATUS WORKING", "STATUS IDLE"]);
    assert!(!rig.devices.brush.is_enabled());
    assert!(!rig.shared.cleaning().manual_override);
    wait_until("wheels stopped", || {
        rig.devices.motor.last_direction() == Some(Direction::Stop)
    });
}

#[test]
fn test_crlf_and_garbage_lines() {
    let rig = Rig::new();

    rig.channel.send("HELLO\nADD_SCHEDULE 1-9\r\nSTATUS\r\n");
    assert_eq!(rig.wait_lines(1), vec!["STATUS IDLE"]);

    // Nothing else shows up for the dropped lines
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(rig.channel.lines().len(), 1);
}

#[test]
fn test_overlong_line_is_discarded() {
    let rig = Rig::new();

    let junk = "X".repeat(200);
    rig.channel.send(&junk);
    rig.send("");
    rig.send("STATUS");
    assert_eq!(rig.wait_lines(1), vec!["STATUS IDLE"]);
}

// ============================================================================
// Schedule Loop
// ============================================================================

#[test]
fn test_scheduled_run_starts_and_expires() {
    let rig = Rig::new();
    rig.set_clock(1, 9, 29, 50);

    rig.send("ADD_SCHEDULE 0 1-9:30:0 60");
    rig.wait_lines(1);

    rig.set_clock(1, 9, 30, 0);
    wait_until("scheduled start", || rig.shared.is_cleaning());
    assert!(!rig.shared.cleaning().manual_override);
    assert_eq!(rig.shared.cleaning().duration_secs, 60);
    assert!(rig.devices.brush.is_enabled());

    rig.set_clock(1, 9, 31, 0);
    std::thread::sleep(Duration::from_millis(20));
    assert!(rig.shared.is_cleaning());

    rig.set_clock(1, 9, 31, 1);
    wait_until("duration stop", || !rig.shared.is_cleaning());
    assert!(!rig.devices.brush.is_enabled());
    assert_eq!(
        rig.wait_lines(3),
        vec!["SCHEDULE 0 1-9:30:0 60", "STATUS WORKING", "STATUS IDLE"]
    );
}

#[test]
fn test_manual_override_survives_duration() {
    let rig = Rig::new();
    rig.set_clock(2, 18, 0, 0);

    rig.send("ADD_SCHEDULE 0 2-18:0:0 60");
    wait_until("scheduled start", || rig.shared.is_cleaning());
    rig.send("START");
    wait_until("override", || rig.shared.cleaning().manual_override);
    assert_eq!(rig.shared.cleaning().duration_secs, 60);

    rig.set_clock(2, 20, 0, 0);
    std::thread::sleep(Duration::from_millis(30));
    assert!(rig.shared.is_cleaning());

    rig.send("STOP");
    wait_until("manual stop", || !rig.shared.is_cleaning());
}

#[test]
fn test_clock_failure_leaves_manual_control() {
    let rig = Rig::with_devices(|devices| devices.fail_open(SimDevice::Clock));

    rig.send("START");
    assert_eq!(rig.wait_lines(1), vec!["STATUS WORKING"]);
    wait_until("forward drive", || {
        rig.devices.motor.last_direction() == Some(Direction::Forward)
    });

    let handles = rig.handles.as_ref().unwrap();
    wait_until("schedule thread exit", || handles.schedule.is_finished());
    assert!(!handles.command.is_finished());
    assert!(!handles.drive.is_finished());
}

#[test]
fn test_serial_failure_leaves_schedule_running() {
    let rig = Rig::with_devices(|devices| {
        devices.fail_open(SimDevice::Serial);
        devices.clock.set(ClockTime::new(6, 7, 0, 0));
    });

    let schedule = marjani::Schedule::from_fields(0, 6, 7, 0, 600).unwrap();
    assert!(rig.shared.add_schedule(schedule));

    wait_until("scheduled start", || rig.shared.is_cleaning());
    assert!(rig.devices.brush.is_enabled());
    assert!(rig.channel.lines().is_empty());
}

// ============================================================================
// Drive Loop
// ============================================================================

#[test]
fn test_obstacles_alternate_turn_direction() {
    let rig = Rig::with_devices(|devices| {
        for reading in [Some(5.0), Some(100.0), Some(8.0), Some(100.0)] {
            devices.range_sensor.push(reading);
        }
    });

    rig.send("START");
    wait_until("two obstacles", || rig.shared.turn_parity() >= 2);
    rig.send("STOP");
    wait_until("idle", || !rig.shared.is_cleaning());

    assert_eq!(
        rig.turns(),
        vec![
            Direction::TurnRight,
            Direction::TurnRight,
            Direction::TurnLeft,
            Direction::TurnLeft,
        ]
    );
}

#[test]
fn test_sensor_timeout_keeps_cruising() {
    let rig = Rig::with_devices(|devices| devices.range_sensor.push(None));

    rig.send("START");
    wait_until("several reads", || rig.devices.range_sensor.reads() >= 5);
    assert!(rig.turns().is_empty());
    assert_eq!(rig.shared.turn_parity(), 0);
}

#[test]
fn test_shutdown_stops_wheels() {
    let mut rig = Rig::new();

    rig.send("START");
    wait_until("forward drive", || {
        rig.devices.motor.last_direction() == Some(Direction::Forward)
    });

    rig.shutdown();
    assert_eq!(rig.devices.motor.last_direction(), Some(Direction::Stop));
}
