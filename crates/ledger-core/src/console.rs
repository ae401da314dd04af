//! User-facing output.
//!
//! Messages the operator must see (the "check your Ledger" notice and the
//! EIP-712 hashes to compare against the device screen) are not log records:
//! they go through a [`Console`] so they are always shown regardless of the
//! tracing filter, and so tests can capture them.

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

/// A sink for operator-facing lines.
pub trait Console: Send + Sync + fmt::Debug {
    /// Prints one line. Implementations append the line terminator.
    fn print_line(&self, line: &str);
}

/// Writes to standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutConsole;

impl Console for StdoutConsole {
    fn print_line(&self, line: &str) {
        let mut stdout = io::stdout().lock();
        // A closed stdout is not a signing failure.
        let _ = writeln!(stdout, "{line}");
    }
}

/// Records lines in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct BufferConsole {
    lines: Arc<Mutex<Vec<String>>>,
}

impl BufferConsole {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every line printed so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Discards the recorded lines.
    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl Console for BufferConsole {
    fn print_line(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}
