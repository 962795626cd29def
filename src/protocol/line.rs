//! Newline framing for the serial input

/// Input buffer size, including room for the terminator
pub const LINE_CAPACITY: usize = 128;

/// Accumulates bytes into lines.
///
/// When a line grows to `LINE_CAPACITY - 1` bytes without a newline the buffer
/// is silently reset and the bytes so far are dropped. Bytes after the reset
/// keep accumulating as a new line.
#[derive(Debug)]
pub struct LineAssembler {
    buffer: Vec<u8>,
    overflows: u64,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(LINE_CAPACITY),
            overflows: 0,
        }
    }

    /// Feed one byte; returns a completed line on `\n`.
    ///
    /// A trailing `\r` is stripped so CRLF hosts work.
    pub fn push(&mut self, byte: u8) -> Option<String> {
        if byte == b'\n' {
            if self.buffer.last() == Some(&b'\r') {
                self.buffer.pop();
            }
            let line = String::from_utf8_lossy(&self.buffer).into_owned();
            self.buffer.clear();
            return Some(line);
        }

        self.buffer.push(byte);
        if self.buffer.len() >= LINE_CAPACITY - 1 {
            self.overflows += 1;
            tracing::debug!("Input line exceeded {} bytes, discarded", LINE_CAPACITY - 1);
            self.buffer.clear();
        }
        None
    }

    /// Bytes waiting for a newline
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Number of discarded over-long lines
    pub fn overflows(&self) -> u64 {
        self.overflows
    }
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new()
    }
}
