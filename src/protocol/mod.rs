//! Line-oriented serial protocol
//!
//! ASCII commands arrive one per `\n`-terminated line; replies are status
//! lines on the same link.

mod command;
mod line;
mod outbox;
mod response;

pub use command::Command;
pub use line::{LINE_CAPACITY, LineAssembler};
pub use outbox::StatusOutbox;
pub use response::{
    STATUS_IDLE, STATUS_WORKING, schedule_count_line, schedule_dump, schedule_line, status_line,
};
