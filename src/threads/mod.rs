//! Multi-threaded control engine for Marjani.
//!
//! Three threads run concurrently and communicate only through shared state:
//! - Command thread (10 ms poll): serial protocol, manual start/stop, schedule edits
//! - Drive thread (100-300 ms): forward cruising and obstacle avoidance
//! - Schedule thread (1 s): RTC polling, scheduled start and duration stop
//!
//! Each thread opens its own devices. A device that fails to open ends only the
//! thread that needed it.

pub mod command;
pub mod drive;
pub mod schedule;

pub use command::{CommandHandler, CommandThread};
pub use drive::{DriveState, DriveThread};
pub use schedule::ScheduleThread;

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::config::MarjaniConfig;
use crate::control::CleaningControl;
use crate::devices::DeviceFactory;
use crate::error::Result;

/// Thread handles for the control engine.
pub struct ThreadHandles {
    pub command: JoinHandle<()>,
    pub drive: JoinHandle<()>,
    pub schedule: JoinHandle<()>,
}

impl ThreadHandles {
    /// Names of threads that have already exited
    pub fn finished(&self) -> Vec<&'static str> {
        [
            ("command", &self.command),
            ("drive", &self.drive),
            ("schedule", &self.schedule),
        ]
        .into_iter()
        .filter(|(_, handle)| handle.is_finished())
        .map(|(name, _)| name)
        .collect()
    }

    /// Wait for every thread to exit.
    pub fn join(self) {
        for (name, handle) in [
            ("command", self.command),
            ("drive", self.drive),
            ("schedule", self.schedule),
        ] {
            if let Err(e) = handle.join() {
                tracing::error!("{} thread panicked: {:?}", name, e);
            }
        }
    }
}

/// Spawn all threads and return handles.
pub fn spawn_threads(
    config: MarjaniConfig,
    factory: Arc<dyn DeviceFactory>,
    control: Arc<CleaningControl>,
) -> Result<ThreadHandles> {
    let command_config = config.clone();
    let command_factory = Arc::clone(&factory);
    let command_control = Arc::clone(&control);
    let command = thread::Builder::new()
        .name("command".into())
        .spawn(move || {
            CommandThread::new(command_config, command_factory, command_control).run();
        })?;

    let drive_config = config.clone();
    let drive_factory = Arc::clone(&factory);
    let drive_state = Arc::clone(control.shared());
    let drive = thread::Builder::new()
        .name("drive".into())
        .spawn(move || {
            match DriveThread::open(drive_config, drive_state, drive_factory.as_ref()) {
                Ok(mut drive_thread) => drive_thread.run(),
                Err(e) => tracing::error!("Failed to open drive hardware: {}", e),
            }
        })?;

    let schedule_control = Arc::clone(&control);
    let schedule = thread::Builder::new()
        .name("schedule".into())
        .spawn(move || {
            match ScheduleThread::open(config, schedule_control, factory.as_ref()) {
                Ok(mut schedule_thread) => schedule_thread.run(),
                Err(e) => tracing::error!("Failed to open RTC: {}", e),
            }
        })?;

    Ok(ThreadHandles {
        command,
        drive,
        schedule,
    })
}
