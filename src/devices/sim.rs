//! Simulated devices for bench runs without a Raspberry Pi
//!
//! Every device is a cheap `Clone` handle over shared state, so the copy handed
//! to a control loop and the copy kept by the caller observe the same device.
//! Integration tests use these handles to script sensor readings and clock time
//! and to inspect motor commands, brush state and serial output.
//!
//! | Device       | Behavior                                             |
//! |--------------|------------------------------------------------------|
//! | Motor        | Records commands and the equivalent bridge duties    |
//! | Range sensor | Plays back a distance script, repeating the last one |
//! | Clock        | System local time, or a fixed settable time          |
//! | Brush        | Tracks enable state                                  |
//! | Serial       | Real UART, or an in-memory channel                   |

use std::collections::VecDeque;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use super::wheel::{PinDuties, pin_duties};
use super::{DeviceFactory, serial, system_clock_time};
use crate::config::{MarjaniConfig, MotorConfig, SerialConfig};
use crate::drivers::{
    BrushActuator, ClockSource, Direction, LineWriter, MotorDriver, RangeSensor, SerialChannel,
};
use crate::error::{MarjaniError, Result};
use crate::schedule::ClockTime;

/// Motor commands kept for inspection
const MOTOR_HISTORY_LIMIT: usize = 4096;

/// Device selector for open-failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimDevice {
    Serial,
    Motor,
    RangeSensor,
    Clock,
    Brush,
}

enum SerialBackend {
    Port(SerialConfig),
    Memory(MemoryChannel),
}

/// Simulated device set
pub struct SimDevices {
    serial: SerialBackend,
    pub motor: SimMotor,
    pub range_sensor: SimRangeSensor,
    pub clock: SimClock,
    pub brush: SimBrush,
    failing: Mutex<Vec<SimDevice>>,
}

impl SimDevices {
    /// Simulated drive hardware with the configured UART as command link
    pub fn from_config(config: &MarjaniConfig) -> Self {
        let range_sensor = SimRangeSensor::new();
        for &distance in &config.sim.distances_cm {
            range_sensor.push(if distance < 0.0 { None } else { Some(distance) });
        }

        Self {
            serial: SerialBackend::Port(config.serial.clone()),
            motor: SimMotor::new(config.motor.clone()),
            range_sensor,
            clock: SimClock::system(),
            brush: SimBrush::new(),
            failing: Mutex::new(Vec::new()),
        }
    }

    /// Fully in-memory device set: clear range sensor, clock fixed at
    /// Monday 00:00:00, and `channel` as the command link
    pub fn in_memory(channel: MemoryChannel) -> Self {
        Self {
            serial: SerialBackend::Memory(channel),
            motor: SimMotor::new(MotorConfig::default()),
            range_sensor: SimRangeSensor::new(),
            clock: SimClock::fixed(ClockTime::new(1, 0, 0, 0)),
            brush: SimBrush::new(),
            failing: Mutex::new(Vec::new()),
        }
    }

    /// Make every later open of `device` fail
    pub fn fail_open(&self, device: SimDevice) {
        self.failing.lock().push(device);
    }

    fn check_open(&self, device: SimDevice) -> Result<()> {
        if self.failing.lock().contains(&device) {
            return Err(MarjaniError::Device(format!(
                "simulated {:?} failed to open",
                device
            )));
        }
        Ok(())
    }
}

impl DeviceFactory for SimDevices {
    fn open_serial(&self) -> Result<(Box<dyn SerialChannel>, Box<dyn LineWriter>)> {
        self.check_open(SimDevice::Serial)?;
        match &self.serial {
            SerialBackend::Port(config) => {
                let (reader, writer) = serial::open(&config.port, config.baud_rate)?;
                Ok((Box::new(reader), Box::new(writer)))
            }
            SerialBackend::Memory(channel) => {
                Ok((Box::new(channel.clone()), Box::new(channel.clone())))
            }
        }
    }

    fn open_motor(&self) -> Result<Box<dyn MotorDriver>> {
        self.check_open(SimDevice::Motor)?;
        Ok(Box::new(self.motor.clone()))
    }

    fn open_range_sensor(&self) -> Result<Box<dyn RangeSensor>> {
        self.check_open(SimDevice::RangeSensor)?;
        Ok(Box::new(self.range_sensor.clone()))
    }

    fn open_clock(&self) -> Result<Box<dyn ClockSource>> {
        self.check_open(SimDevice::Clock)?;
        Ok(Box::new(self.clock.clone()))
    }

    fn open_brush(&self) -> Result<Box<dyn BrushActuator>> {
        self.check_open(SimDevice::Brush)?;
        Ok(Box::new(self.brush.clone()))
    }
}

// ============================================================================
// Motor
// ============================================================================

struct SimMotorState {
    config: MotorConfig,
    commands: VecDeque<(Direction, f32)>,
    duties: PinDuties,
}

/// Simulated wheel motors
#[derive(Clone)]
pub struct SimMotor {
    state: Arc<Mutex<SimMotorState>>,
}

impl SimMotor {
    pub fn new(config: MotorConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimMotorState {
                config,
                commands: VecDeque::new(),
                duties: PinDuties::default(),
            })),
        }
    }

    /// Commands received so far, oldest first
    pub fn commands(&self) -> Vec<(Direction, f32)> {
        self.state.lock().commands.iter().copied().collect()
    }

    /// Directions received so far, oldest first
    pub fn directions(&self) -> Vec<Direction> {
        self.state.lock().commands.iter().map(|(d, _)| *d).collect()
    }

    pub fn last_direction(&self) -> Option<Direction> {
        self.state.lock().commands.back().map(|(d, _)| *d)
    }

    /// Bridge duties the last command would produce on real hardware
    pub fn pin_duties(&self) -> PinDuties {
        self.state.lock().duties
    }

    pub fn clear(&self) {
        self.state.lock().commands.clear();
    }
}

impl MotorDriver for SimMotor {
    fn drive(&mut self, direction: Direction, speed: f32) -> Result<()> {
        let mut state = self.state.lock();
        if state.commands.back().map(|(d, _)| *d) != Some(direction) {
            tracing::debug!("Sim motor: {:?} at {:.2}", direction, speed);
        }
        state.duties = pin_duties(&state.config, direction, speed);
        if state.commands.len() >= MOTOR_HISTORY_LIMIT {
            state.commands.pop_front();
        }
        state.commands.push_back((direction, speed));
        Ok(())
    }
}

// ============================================================================
// Range sensor
// ============================================================================

#[derive(Default)]
struct SimRangeState {
    script: VecDeque<Option<f32>>,
    last: Option<f32>,
    reads: usize,
}

/// Scripted range sensor; `None` readings are echo timeouts
#[derive(Clone, Default)]
pub struct SimRangeSensor {
    state: Arc<Mutex<SimRangeState>>,
}

impl SimRangeSensor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reading
    pub fn push(&self, reading: Option<f32>) {
        self.state.lock().script.push_back(reading);
    }

    /// Number of measurements taken
    pub fn reads(&self) -> usize {
        self.state.lock().reads
    }

    /// Readings still queued
    pub fn pending(&self) -> usize {
        self.state.lock().script.len()
    }
}

impl RangeSensor for SimRangeSensor {
    fn measure_distance(&mut self) -> Result<Option<f32>> {
        let mut state = self.state.lock();
        if let Some(reading) = state.script.pop_front() {
            state.last = reading;
        }
        state.reads += 1;
        Ok(state.last)
    }
}

// ============================================================================
// Clock
// ============================================================================

#[derive(Default)]
struct SimClockState {
    fixed: Option<ClockTime>,
    written: Vec<ClockTime>,
}

/// Simulated RTC
#[derive(Clone, Default)]
pub struct SimClock {
    state: Arc<Mutex<SimClockState>>,
}

impl SimClock {
    /// Follows system local time
    pub fn system() -> Self {
        Self::default()
    }

    /// Stays at `time` until set or written
    pub fn fixed(time: ClockTime) -> Self {
        let clock = Self::default();
        clock.set(time);
        clock
    }

    pub fn set(&self, time: ClockTime) {
        self.state.lock().fixed = Some(time);
    }

    /// Times written through [`ClockSource::write_time`]
    pub fn written(&self) -> Vec<ClockTime> {
        self.state.lock().written.clone()
    }
}

impl ClockSource for SimClock {
    fn read_time(&mut self) -> Result<ClockTime> {
        Ok(self.state.lock().fixed.unwrap_or_else(system_clock_time))
    }

    fn write_time(&mut self, time: ClockTime) -> Result<()> {
        let mut state = self.state.lock();
        state.written.push(time);
        if state.fixed.is_some() {
            state.fixed = Some(time);
        }
        Ok(())
    }
}

// ============================================================================
// Brush
// ============================================================================

#[derive(Default)]
struct SimBrushState {
    enabled: bool,
    switches: usize,
}

/// Simulated brush motor
#[derive(Clone, Default)]
pub struct SimBrush {
    state: Arc<Mutex<SimBrushState>>,
}

impl SimBrush {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    /// Number of enable/disable calls
    pub fn switches(&self) -> usize {
        self.state.lock().switches
    }

    fn set(&self, enabled: bool) {
        let mut state = self.state.lock();
        state.enabled = enabled;
        state.switches += 1;
        tracing::debug!("Sim brush {}", if enabled { "on" } else { "off" });
    }
}

impl BrushActuator for SimBrush {
    fn enable(&mut self) -> Result<()> {
        self.set(true);
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        self.set(false);
        Ok(())
    }
}

// ============================================================================
// In-memory serial link
// ============================================================================

/// In-memory serial link: bytes sent by the host in, status lines out
#[derive(Clone)]
pub struct MemoryChannel {
    input_tx: Sender<u8>,
    input_rx: Receiver<u8>,
    output: Arc<Mutex<Vec<String>>>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        let (input_tx, input_rx) = crossbeam_channel::unbounded();
        Self {
            input_tx,
            input_rx,
            output: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue raw bytes as if sent by the host
    pub fn send(&self, data: &str) {
        for byte in data.bytes() {
            // Both ends live in self, so the channel cannot be disconnected
            let _ = self.input_tx.send(byte);
        }
    }

    /// Lines written by the robot so far
    pub fn lines(&self) -> Vec<String> {
        self.output.lock().clone()
    }

    /// Drain the lines written so far
    pub fn take_lines(&self) -> Vec<String> {
        std::mem::take(&mut *self.output.lock())
    }
}

impl Default for MemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialChannel for MemoryChannel {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut count = 0;
        while count < buffer.len() {
            match self.input_rx.try_recv() {
                Ok(byte) => {
                    buffer[count] = byte;
                    count += 1;
                }
                Err(_) => break,
            }
        }
        Ok(count)
    }
}

impl LineWriter for MemoryChannel {
    fn write_line(&mut self, line: &str) -> Result<()> {
        self.output.lock().push(line.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motor_records_commands() {
        let motor = SimMotor::new(MotorConfig::default());
        let mut driver: Box<dyn MotorDriver> = Box::new(motor.clone());
        driver.drive(Direction::Forward, 1.0).unwrap();
        driver.stop().unwrap();

        assert_eq!(motor.directions(), vec![Direction::Forward, Direction::Stop]);
        assert_eq!(motor.pin_duties(), PinDuties::default());
    }

    #[test]
    fn test_range_sensor_repeats_last() {
        let mut sensor = SimRangeSensor::new();
        assert_eq!(sensor.measure_distance().unwrap(), None);
        sensor.push(Some(40.0));
        sensor.push(Some(10.0));
        assert_eq!(sensor.measure_distance().unwrap(), Some(40.0));
        assert_eq!(sensor.measure_distance().unwrap(), Some(10.0));
        assert_eq!(sensor.measure_distance().unwrap(), Some(10.0));
        assert_eq!(sensor.reads(), 4);
    }

    #[test]
    fn test_fixed_clock_follows_writes() {
        let mut clock = SimClock::fixed(ClockTime::new(2, 8, 0, 0));
        assert_eq!(clock.read_time().unwrap(), ClockTime::new(2, 8, 0, 0));
        clock.write_time(ClockTime::new(5, 12, 30, 15)).unwrap();
        assert_eq!(clock.read_time().unwrap(), ClockTime::new(5, 12, 30, 15));
        assert_eq!(clock.written().len(), 1);
    }

    #[test]
    fn test_memory_channel_round_trip() {
        let channel = MemoryChannel::new();
        channel.send("STATUS\n");

        let mut reader = channel.clone();
        let mut buffer = [0u8; 4];
        assert_eq!(reader.read(&mut buffer).unwrap(), 4);
        assert_eq!(&buffer, b"STAT");
        assert_eq!(reader.read(&mut buffer).unwrap(), 3);
        assert_eq!(reader.read(&mut buffer).unwrap(), 0);

        let mut writer = channel.clone();
        writer.write_line("STATUS IDLE").unwrap();
        assert_eq!(channel.take_lines(), vec!["STATUS IDLE".to_string()]);
        assert!(channel.lines().is_empty());
    }

    #[test]
    fn test_fail_open() {
        let devices = SimDevices::in_memory(MemoryChannel::new());
        devices.fail_open(SimDevice::Clock);
        assert!(devices.open_clock().is_err());
        assert!(devices.open_motor().is_ok());
        assert!(devices.open_serial().is_ok());
    }
}
