use std::sync::{Mutex, PoisonError};

use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigateOptions {
    /// Replace the current history entry instead of pushing a new one.
    pub replace: bool,
}

impl NavigateOptions {
    pub fn replace() -> Self {
        NavigateOptions { replace: true }
    }
}

/// Moves the user to another place in the application.
pub trait Navigator: Send + Sync {
    fn navigate_to(&self, path: &str, options: NavigateOptions);
}

/// An in-process history stack.
#[derive(Debug)]
pub struct MemoryNavigator {
    history: Mutex<Vec<String>>,
}

impl MemoryNavigator {
    pub fn new(initial: impl Into<String>) -> Self {
        MemoryNavigator {
            history: Mutex::new(vec![initial.into()]),
        }
    }

    pub fn current(&self) -> String {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
            .unwrap_or_default()
    }

    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for MemoryNavigator {
    fn navigate_to(&self, path: &str, options: NavigateOptions) {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        if options.replace {
            history.pop();
        }
        history.push(path.to_string());
        info!(
            event_name = "navigation.changed",
            event_domain = "navigation",
            path,
            replace = options.replace,
            "navigated"
        );
    }
}
