//! Raspberry Pi drivers (GPIO software PWM, HC-SR04, I2C RTC)

use std::time::{Duration, Instant};

use rppal::gpio::{Gpio, InputPin, OutputPin};
use rppal::i2c::I2c;

use super::DeviceFactory;
use super::ds1307::{Ds1307Clock, RegisterBus};
use super::serial;
use super::wheel::pin_duties;
use crate::config::{MarjaniConfig, MotorConfig};
use crate::drivers::{
    BrushActuator, ClockSource, Direction, LineWriter, MotorDriver, RangeSensor, SerialChannel,
};
use crate::error::Result;

/// Speed of sound round trip: microseconds per centimeter, one way
const MICROS_PER_CM: f32 = 29.0;

/// Devices on the robot's Raspberry Pi
pub struct RpiDevices {
    config: MarjaniConfig,
}

impl RpiDevices {
    pub fn new(config: MarjaniConfig) -> Self {
        Self { config }
    }
}

impl DeviceFactory for RpiDevices {
    fn open_serial(&self) -> Result<(Box<dyn SerialChannel>, Box<dyn LineWriter>)> {
        let (reader, writer) = serial::open(&self.config.serial.port, self.config.serial.baud_rate)?;
        Ok((Box::new(reader), Box::new(writer)))
    }

    fn open_motor(&self) -> Result<Box<dyn MotorDriver>> {
        Ok(Box::new(PwmMotorDriver::new(&self.config)?))
    }

    fn open_range_sensor(&self) -> Result<Box<dyn RangeSensor>> {
        Ok(Box::new(UltrasonicSensor::new(&self.config)?))
    }

    fn open_clock(&self) -> Result<Box<dyn ClockSource>> {
        let mut i2c = I2c::with_bus(self.config.rtc.i2c_bus)?;
        i2c.set_slave_address(self.config.rtc.address)?;
        tracing::info!(
            "Opened RTC on i2c-{} at {:#04x}",
            self.config.rtc.i2c_bus,
            self.config.rtc.address
        );
        Ok(Box::new(Ds1307Clock::new(SmbusRegisters { i2c })))
    }

    fn open_brush(&self) -> Result<Box<dyn BrushActuator>> {
        Ok(Box::new(PwmBrush::new(&self.config)?))
    }
}

// ============================================================================
// Wheel motors
// ============================================================================

/// Dual H-bridge driven by four software-PWM pins
pub struct PwmMotorDriver {
    config: MotorConfig,
    /// A1A, A1B, B1A, B1B
    pins: [OutputPin; 4],
}

impl PwmMotorDriver {
    pub fn new(config: &MarjaniConfig) -> Result<Self> {
        let gpio = Gpio::new()?;
        let pins = [
            gpio.get(config.pins.motor_a1a)?.into_output_low(),
            gpio.get(config.pins.motor_a1b)?.into_output_low(),
            gpio.get(config.pins.motor_b1a)?.into_output_low(),
            gpio.get(config.pins.motor_b1b)?.into_output_low(),
        ];
        tracing::info!(
            "Wheel motors on BCM {}/{}/{}/{}",
            config.pins.motor_a1a,
            config.pins.motor_a1b,
            config.pins.motor_b1a,
            config.pins.motor_b1b
        );
        Ok(Self {
            config: config.motor.clone(),
            pins,
        })
    }
}

impl MotorDriver for PwmMotorDriver {
    fn drive(&mut self, direction: Direction, speed: f32) -> Result<()> {
        let duties = pin_duties(&self.config, direction, speed).as_array();
        for (pin, duty) in self.pins.iter_mut().zip(duties) {
            pin.set_pwm_frequency(self.config.pwm_frequency_hz, duty)?;
        }
        Ok(())
    }
}

impl Drop for PwmMotorDriver {
    fn drop(&mut self) {
        for pin in self.pins.iter_mut() {
            let _ = pin.clear_pwm();
            pin.set_low();
        }
    }
}

// ============================================================================
// Ultrasonic range sensor
// ============================================================================

/// HC-SR04 on a trigger/echo pin pair
pub struct UltrasonicSensor {
    trigger: OutputPin,
    echo: InputPin,
    echo_timeout: Duration,
}

impl UltrasonicSensor {
    pub fn new(config: &MarjaniConfig) -> Result<Self> {
        let gpio = Gpio::new()?;
        Ok(Self {
            trigger: gpio.get(config.pins.sonar_trigger)?.into_output_low(),
            echo: gpio.get(config.pins.sonar_echo)?.into_input(),
            echo_timeout: Duration::from_millis(config.avoidance.echo_timeout_ms),
        })
    }
}

impl RangeSensor for UltrasonicSensor {
    fn measure_distance(&mut self) -> Result<Option<f32>> {
        self.trigger.set_low();
        std::thread::sleep(Duration::from_micros(2));
        self.trigger.set_high();
        std::thread::sleep(Duration::from_micros(10));
        self.trigger.set_low();

        let wait_start = Instant::now();
        while self.echo.is_low() {
            if wait_start.elapsed() > self.echo_timeout {
                return Ok(None);
            }
        }

        // A stuck-high echo is capped and reads as a long distance
        let pulse_start = Instant::now();
        while self.echo.is_high() {
            if pulse_start.elapsed() > self.echo_timeout {
                break;
            }
        }

        let micros = pulse_start.elapsed().as_micros() as f32;
        Ok(Some(micros / MICROS_PER_CM / 2.0))
    }
}

// ============================================================================
// RTC bus
// ============================================================================

/// SMBus byte-data access to the RTC
pub struct SmbusRegisters {
    i2c: I2c,
}

impl RegisterBus for SmbusRegisters {
    fn read_register(&mut self, register: u8) -> Result<u8> {
        Ok(self.i2c.smbus_read_byte(register)?)
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<()> {
        Ok(self.i2c.smbus_write_byte(register, value)?)
    }
}

// ============================================================================
// Brush motor
// ============================================================================

/// Brush motor on a two-pin driver; pin A stays low, pin B carries the PWM
pub struct PwmBrush {
    pin_a: OutputPin,
    pin_b: OutputPin,
    frequency_hz: f64,
    duty: f64,
}

impl PwmBrush {
    pub fn new(config: &MarjaniConfig) -> Result<Self> {
        let gpio = Gpio::new()?;
        Ok(Self {
            pin_a: gpio.get(config.pins.brush_a)?.into_output_low(),
            pin_b: gpio.get(config.pins.brush_b)?.into_output_low(),
            frequency_hz: config.motor.pwm_frequency_hz,
            duty: config.motor.brush_duty,
        })
    }
}

impl BrushActuator for PwmBrush {
    fn enable(&mut self) -> Result<()> {
        self.pin_a.set_pwm_frequency(self.frequency_hz, 0.0)?;
        self.pin_b.set_pwm_frequency(self.frequency_hz, self.duty)?;
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        self.pin_a.set_pwm_frequency(self.frequency_hz, 0.0)?;
        self.pin_b.set_pwm_frequency(self.frequency_hz, 0.0)?;
        Ok(())
    }
}
