// ABOUTME: Injected callback that receives human-readable failure diagnostics
// ABOUTME: Defaults to stdout; a tracing-backed sink is available for applications with a subscriber

use std::fmt;
use std::sync::Arc;

/// Receives one line per connection or statement failure. Never called on success.
#[derive(Clone)]
pub struct LogSink {
    callback: Arc<dyn Fn(&str) + Send + Sync>,
}

impl LogSink {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Print each line to standard output
    pub fn stdout() -> Self {
        Self::new(|line| println!("{}", line))
    }

    /// Forward each line to `tracing` at ERROR level
    pub fn tracing() -> Self {
        Self::new(|line| tracing::error!(target: "pgtab::client", "{}", line))
    }

    pub fn emit(&self, line: &str) {
        (self.callback)(line);
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::stdout()
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSink").finish_non_exhaustive()
    }
}
