//! DS1307-compatible real-time clock over a register bus
//!
//! Time registers are BCD encoded:
//!
//! | Register | Field                 |
//! |----------|-----------------------|
//! | 0x00     | seconds (bit 7 = CH)  |
//! | 0x01     | minutes               |
//! | 0x02     | hours (24h mode)      |
//! | 0x03     | weekday 1..7          |
//!
//! Each field is a separate bus transaction, so a reading taken across a
//! rollover can be off by one unit for a single tick.

use crate::drivers::ClockSource;
use crate::error::Result;
use crate::schedule::ClockTime;

pub const REG_SECONDS: u8 = 0x00;
pub const REG_MINUTES: u8 = 0x01;
pub const REG_HOURS: u8 = 0x02;
pub const REG_WEEKDAY: u8 = 0x03;

/// Clock-halt bit in the seconds register
const CLOCK_HALT: u8 = 0x80;

/// Byte-wide register access (SMBus read/write byte data)
pub trait RegisterBus: Send {
    fn read_register(&mut self, register: u8) -> Result<u8>;

    fn write_register(&mut self, register: u8, value: u8) -> Result<()>;
}

pub fn to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

pub fn from_bcd(value: u8) -> u8 {
    (value >> 4) * 10 + (value & 0x0F)
}

/// RTC chip driver
pub struct Ds1307Clock<B: RegisterBus> {
    bus: B,
}

impl<B: RegisterBus> Ds1307Clock<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn into_inner(self) -> B {
        self.bus
    }
}

impl<B: RegisterBus> ClockSource for Ds1307Clock<B> {
    fn read_time(&mut self) -> Result<ClockTime> {
        let second = from_bcd(self.bus.read_register(REG_SECONDS)? & !CLOCK_HALT);
        let minute = from_bcd(self.bus.read_register(REG_MINUTES)?);
        let hour = from_bcd(self.bus.read_register(REG_HOURS)? & 0x3F);
        let weekday = from_bcd(self.bus.read_register(REG_WEEKDAY)? & 0x07);
        Ok(ClockTime::new(weekday, hour, minute, second))
    }

    fn write_time(&mut self, time: ClockTime) -> Result<()> {
        // Writing seconds with CH clear also starts the oscillator
        self.bus.write_register(REG_SECONDS, to_bcd(time.second))?;
        self.bus.write_register(REG_MINUTES, to_bcd(time.minute))?;
        self.bus.write_register(REG_HOURS, to_bcd(time.hour))?;
        self.bus.write_register(REG_WEEKDAY, to_bcd(time.weekday))?;
        Ok(())
    }
}
