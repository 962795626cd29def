//! Shared write side of the serial link
//!
//! The command thread owns the serial reader and attaches the writer here once
//! the port is open. Both the command and schedule threads report status
//! through the outbox, one whole line per lock.

use parking_lot::Mutex;

use crate::drivers::LineWriter;

/// Status line sink shared by all threads
#[derive(Default)]
pub struct StatusOutbox {
    writer: Mutex<Option<Box<dyn LineWriter>>>,
}

impl StatusOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the serial writer, replacing any previous one
    pub fn attach(&self, writer: Box<dyn LineWriter>) {
        *self.writer.lock() = Some(writer);
    }

    /// Remove the writer; later lines are dropped
    pub fn detach(&self) {
        *self.writer.lock() = None;
    }

    pub fn is_attached(&self) -> bool {
        self.writer.lock().is_some()
    }

    /// Send one line. Returns false if it was not written.
    pub fn send(&self, line: &str) -> bool {
        let mut writer = self.writer.lock();
        let Some(writer) = writer.as_mut() else {
            tracing::debug!("No serial link, dropped: {}", line);
            return false;
        };
        match writer.write_line(line) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to send '{}': {}", line, e);
                false
            }
        }
    }

    /// Send lines back to back without interleaving from other threads
    pub fn send_all<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut writer = self.writer.lock();
        let Some(writer) = writer.as_mut() else {
            tracing::debug!("No serial link, dropped line batch");
            return;
        };
        for line in lines {
            if let Err(e) = writer.write_line(line.as_ref()) {
                tracing::warn!("Failed to send '{}': {}", line.as_ref(), e);
                return;
            }
        }
    }
}
