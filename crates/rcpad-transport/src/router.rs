use std::collections::HashMap;
use std::fmt;

use rcpad_frame::command_name;
use tracing::trace;

/// Callback for one command identifier. Runs on the receive thread, so it
/// must return quickly.
pub type Handler = Box<dyn FnMut(&[u8]) + Send>;

/// Maps received command identifiers to handlers.
///
/// Commands without a handler fall through to a no-op.
#[derive(Default)]
pub struct CommandRouter {
    handlers: HashMap<u8, Handler>,
}

impl CommandRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one for `command`.
    pub fn register<F>(&mut self, command: u8, handler: F) -> Option<Handler>
    where
        F: FnMut(&[u8]) + Send + 'static,
    {
        self.handlers.insert(command, Box::new(handler))
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_handler<F>(mut self, command: u8, handler: F) -> Self
    where
        F: FnMut(&[u8]) + Send + 'static,
    {
        self.register(command, handler);
        self
    }

    pub fn is_registered(&self, command: u8) -> bool {
        self.handlers.contains_key(&command)
    }

    /// Invoke the handler for `command`. Returns `false` if none is registered.
    pub fn dispatch(&mut self, command: u8, payload: &[u8]) -> bool {
        match self.handlers.get_mut(&command) {
            Some(handler) => {
                handler(payload);
                true
            }
            None => {
                trace!(
                    command,
                    name = command_name(command),
                    len = payload.len(),
                    "no handler registered"
                );
                false
            }
        }
    }
}

impl fmt::Debug for CommandRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut commands: Vec<_> = self.handlers.keys().copied().collect();
        commands.sort_unstable();
        f.debug_struct("CommandRouter")
            .field("commands", &commands)
            .finish()
    }
}
