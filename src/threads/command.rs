//! Command thread: serial polling and host command dispatch.
//!
//! Polls the serial link at a fixed interval, frames bytes into lines and
//! hands each line to [`CommandHandler`]. The serial writer is attached to the
//! shared status outbox so the schedule thread can report through it too.

use std::sync::Arc;

use crate::config::MarjaniConfig;
use crate::control::CleaningControl;
use crate::devices::DeviceFactory;
use crate::drivers::SerialChannel;
use crate::protocol::{Command, LineAssembler, schedule_dump, schedule_line, status_line};
use crate::schedule::Schedule;

/// Read chunk size per poll
const READ_CHUNK: usize = 64;

/// Executes host commands against the shared state
pub struct CommandHandler {
    control: Arc<CleaningControl>,
}

impl CommandHandler {
    pub fn new(control: Arc<CleaningControl>) -> Self {
        Self { control }
    }

    /// Dispatch one received line. Unknown and malformed lines are dropped.
    pub fn handle_line(&self, line: &str) {
        let Some(command) = Command::parse(line) else {
            if !line.is_empty() {
                tracing::debug!("Ignored line: {:?}", line);
            }
            return;
        };
        tracing::debug!("Command: {:?}", command);

        match command {
            Command::Connect => {
                self.send_schedule_dump();
                self.control.report_status();
            }
            Command::Start => self.control.start_manual(),
            Command::Stop => self.control.stop_manual(),
            Command::Status => self.control.report_status(),
            Command::AddSchedule {
                id,
                weekday,
                hour,
                minute,
                second: _,
                duration,
            } => self.add_schedule(id, weekday, hour, minute, duration),
            Command::DeleteSchedule { id } => {
                if let Ok(slot) = usize::try_from(id) {
                    self.control.shared().delete_schedule(slot);
                    tracing::info!("Schedule {} deleted", slot);
                }
                self.send_schedule_dump();
            }
        }
    }

    fn add_schedule(&self, id: i64, weekday: i64, hour: i64, minute: i64, duration: i64) {
        let Some(schedule) = Schedule::from_fields(id, weekday, hour, minute, duration) else {
            tracing::debug!("Schedule {} out of range, ignored", id);
            return;
        };

        let shared = self.control.shared();
        if !shared.add_schedule(schedule) {
            tracing::warn!("Schedule table full, schedule {} rejected", id);
            return;
        }
        tracing::info!(
            "Schedule {} set: day {} {:02}:{:02} for {}s",
            schedule.id,
            schedule.weekday,
            schedule.hour,
            schedule.minute,
            schedule.duration_secs
        );

        // Confirmation echoes the slot as stored, even past the live count
        if let Some(stored) = shared.schedule_slot(schedule.id) {
            self.control
                .outbox()
                .send(&schedule_line(schedule.id, &stored));
        }
    }

    fn send_schedule_dump(&self) {
        let schedules = self.control.shared().schedules();
        self.control.outbox().send_all(schedule_dump(&schedules));
    }

    /// Current status line, without sending it
    pub fn status(&self) -> &'static str {
        status_line(self.control.shared().is_cleaning())
    }
}

/// Command thread state and logic.
pub struct CommandThread {
    config: MarjaniConfig,
    factory: Arc<dyn DeviceFactory>,
    handler: CommandHandler,
    control: Arc<CleaningControl>,
    assembler: LineAssembler,
}

impl CommandThread {
    pub fn new(
        config: MarjaniConfig,
        factory: Arc<dyn DeviceFactory>,
        control: Arc<CleaningControl>,
    ) -> Self {
        Self {
            config,
            factory,
            handler: CommandHandler::new(Arc::clone(&control)),
            control,
            assembler: LineAssembler::new(),
        }
    }

    /// Feed raw bytes; every completed line is dispatched.
    pub fn process_bytes(&mut self, data: &[u8]) {
        for &byte in data {
            if let Some(line) = self.assembler.push(byte) {
                self.handler.handle_line(&line);
            }
        }
    }

    /// Run the command thread main loop.
    ///
    /// Returns early, leaving the other threads running, if the serial link
    /// cannot be opened.
    pub fn run(&mut self) {
        let mut reader = match self.factory.open_serial() {
            Ok((reader, writer)) => {
                self.control.outbox().attach(writer);
                reader
            }
            Err(e) => {
                tracing::error!("Failed to open serial link: {}", e);
                return;
            }
        };

        tracing::info!("Command thread started");
        let poll = self.config.timing.command_poll();
        let mut buffer = [0u8; READ_CHUNK];

        loop {
            if self.control.shared().should_shutdown() {
                tracing::info!("Command thread shutting down");
                break;
            }

            self.drain(reader.as_mut(), &mut buffer);
            std::thread::sleep(poll);
        }

        self.control.outbox().detach();
    }

    fn drain(&mut self, reader: &mut dyn SerialChannel, buffer: &mut [u8]) {
        loop {
            match reader.read(buffer) {
                Ok(0) => break,
                Ok(n) => self.process_bytes(&buffer[..n]),
                Err(e) => {
                    tracing::warn!("Serial read failed: {}", e);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::sim::MemoryChannel;
    use crate::protocol::StatusOutbox;
    use crate::shared::SharedState;

    fn handler() -> (CommandHandler, MemoryChannel) {
        let channel = MemoryChannel::new();
        let outbox = Arc::new(StatusOutbox::new());
        outbox.attach(Box::new(channel.clone()));
        let control = Arc::new(CleaningControl::new(Arc::new(SharedState::new()), outbox));
        (CommandHandler::new(control), channel)
    }

    #[test]
    fn test_add_then_connect() {
        let (handler, channel) = handler();
        handler.handle_line("ADD_SCHEDULE 0 1-9:30:0 1800");
        assert_eq!(channel.take_lines(), vec!["SCHEDULE 0 1-9:30:0 1800"]);

        handler.handle_line("CONNECT");
        assert_eq!(
            channel.take_lines(),
            vec!["SCHEDULE 0 1-9:30:0 1800", "SCHEDULE_COUNT 1", "STATUS IDLE"]
        );
    }

    #[test]
    fn test_start_stop_status() {
        let (handler, channel) = handler();
        handler.handle_line("START");
        assert_eq!(handler.status(), "STATUS WORKING");
        handler.handle_line("STATUS");
        handler.handle_line("STOP");
        assert_eq!(
            channel.take_lines(),
            vec!["STATUS WORKING", "STATUS WORKING", "STATUS IDLE"]
        );
        assert!(!handler.control.shared().cleaning().manual_override);
    }

    #[test]
    fn test_malformed_lines_silent() {
        let (handler, channel) = handler();
        handler.handle_line("ADD_SCHEDULE 0 1-9:30");
        handler.handle_line("HELLO");
        handler.handle_line("");
        assert!(channel.lines().is_empty());
    }

    #[test]
    fn test_rejected_add_silent() {
        let (handler, channel) = handler();
        // Out of range fields and ids
        handler.handle_line("ADD_SCHEDULE 0 8-9:30:0 1800");
        handler.handle_line("ADD_SCHEDULE 10 1-9:30:0 1800");
        handler.handle_line("ADD_SCHEDULE -1 1-9:30:0 1800");
        assert!(channel.lines().is_empty());

        // Table full
        for id in 0..10 {
            handler.handle_line(&format!("ADD_SCHEDULE {} 2-8:0:0 60", id));
        }
        channel.take_lines();
        handler.handle_line("ADD_SCHEDULE 10 2-8:0:0 60");
        handler.handle_line("ADD_SCHEDULE 3 2-8:0:0 60");
        assert!(channel.lines().is_empty());
        assert_eq!(handler.control.shared().schedule_count(), 10);
    }

    #[test]
    fn test_add_past_count_echoes_but_stays_absent() {
        let (handler, channel) = handler();
        handler.handle_line("ADD_SCHEDULE 4 3-7:15:0 900");
        assert_eq!(channel.take_lines(), vec!["SCHEDULE 4 3-7:15:0 900"]);
        assert_eq!(handler.control.shared().schedule_count(), 0);
    }

    #[test]
    fn test_delete_dumps_table() {
        let (handler, channel) = handler();
        handler.handle_line("ADD_SCHEDULE 0 1-9:30:0 1800");
        handler.handle_line("ADD_SCHEDULE 1 2-10:0:0 600");
        channel.take_lines();

        handler.handle_line("DELETE_SCHEDULE 0");
        assert_eq!(
            channel.take_lines(),
            vec!["SCHEDULE 0 2-10:0:0 600", "SCHEDULE_COUNT 1"]
        );

        // Out of range is a no-op but still dumps
        handler.handle_line("DELETE_SCHEDULE 7");
        handler.handle_line("DELETE_SCHEDULE -2");
        assert_eq!(
            channel.take_lines(),
            vec![
                "SCHEDULE 0 2-10:0:0 600",
                "SCHEDULE_COUNT 1",
                "SCHEDULE 0 2-10:0:0 600",
                "SCHEDULE_COUNT 1",
            ]
        );
    }
}
