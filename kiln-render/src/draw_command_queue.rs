use crate::DrawCommand;
use std::sync::{Arc, Mutex};

/// Lifecycle registry for live [`DrawCommand`] instances. Not on any per-draw hot
/// path; it exists so device teardown and recreation can find every command that must
/// be reset or released.
#[derive(Default)]
pub struct DrawCommandQueue {
    commands: Mutex<Vec<Arc<Mutex<DrawCommand>>>>,
}

impl DrawCommandQueue {
    pub fn new() -> Self {
        Default::default()
    }

    /// Register a command as in use for the current device lifetime
    pub fn add_command(
        &self,
        command: Arc<Mutex<DrawCommand>>,
    ) {
        self.commands.lock().unwrap().push(command);
    }

    /// Reset every registered command, marking all of their state dirty. Called after
    /// the caches are cleared so no command keeps resolved objects from the old
    /// generation.
    pub fn reset_all(&self) {
        for command in self.commands.lock().unwrap().iter() {
            command.lock().unwrap().reset();
        }
    }

    /// Drop every registered command. Called on device/context teardown.
    pub fn clear_stored_commands(&self) {
        self.commands.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.commands.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
