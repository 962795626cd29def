//! Serial command link over a UART

use crate::drivers::{LineWriter, SerialChannel};
use crate::error::Result;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{Read, Write};
use std::time::Duration;

/// Read half of the UART link
pub struct SerialPortChannel {
    port: Box<dyn SerialPort>,
}

/// Write half of the UART link (a cloned port handle)
pub struct SerialPortWriter {
    port: Box<dyn SerialPort>,
}

/// Open a serial port and split it into reader and writer halves
///
/// # Arguments
/// * `path` - Serial port path (e.g., "/dev/ttyAMA2")
/// * `baud_rate` - Baud rate (e.g., 115200)
pub fn open(path: &str, baud_rate: u32) -> Result<(SerialPortChannel, SerialPortWriter)> {
    let port = serialport::new(path, baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(Duration::from_millis(1))
        .open()?;
    let writer = port.try_clone()?;

    tracing::info!("Opened serial port: {} at {} baud", path, baud_rate);

    Ok((
        SerialPortChannel { port },
        SerialPortWriter { port: writer },
    ))
}

impl SerialChannel for SerialPortChannel {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        match self.port.read(buffer) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

impl LineWriter for SerialPortWriter {
    fn write_line(&mut self, line: &str) -> Result<()> {
        self.port.write_all(line.as_bytes())?;
        self.port.write_all(b"\n")?;
        self.port.flush()?;
        Ok(())
    }
}
