use super::{CommandLine, ProcessRunner, ProcessStatus};
use std::io;
use std::sync::{Arc, Mutex};

type Handler = Arc<dyn Fn(&CommandLine) -> ProcessStatus + Send + Sync>;

/// Process runner that records command lines instead of spawning processes
///
/// An optional handler sees each command while its temporary files still exist
/// (argument files, pathing jars) and decides the exit status.
#[derive(Clone, Default)]
pub struct RecordingRunner {
    commands: Arc<Mutex<Vec<CommandLine>>>,
    handler: Option<Handler>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler(handler: impl Fn(&CommandLine) -> ProcessStatus + Send + Sync + 'static) -> Self {
        Self {
            commands: Arc::default(),
            handler: Some(Arc::new(handler)),
        }
    }

    /// Every command run so far
    pub fn commands(&self) -> Vec<CommandLine> {
        self.commands.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<CommandLine> {
        self.commands().pop()
    }
}

impl ProcessRunner for RecordingRunner {
    fn run(&self, command: &CommandLine) -> io::Result<ProcessStatus> {
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(command.clone());
        }
        Ok(match &self.handler {
            Some(handler) => handler(command),
            None => ProcessStatus::ok(),
        })
    }
}
