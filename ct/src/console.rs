//! Console - line sink shared by the demos
//!
//! Demos print through a `Console` rather than `println!` directly so tests can
//! capture the exact lines and their arrival order.

use std::io::Write;
use std::sync::{Arc, Mutex};

/// Destination for demo output lines
#[derive(Clone, Debug)]
pub enum Console {
    /// Write each line to standard output
    Stdout,
    /// Keep lines in memory, in the order they were written
    Capture(Arc<Mutex<Vec<String>>>),
}

impl Console {
    /// Create a capturing console
    pub fn capture() -> Self {
        Self::Capture(Arc::new(Mutex::new(Vec::new())))
    }

    /// Emit one line
    pub fn line(&self, line: impl Into<String>) {
        let line = line.into();
        match self {
            Self::Stdout => {
                let mut stdout = std::io::stdout().lock();
                // A closed stdout (e.g. `ct | head -1`) is not worth failing a demo over
                let _ = writeln!(stdout, "{}", line);
                let _ = stdout.flush();
            }
            Self::Capture(lines) => {
                lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).push(line);
            }
        }
    }

    /// Lines written so far (empty for `Stdout`)
    pub fn lines(&self) -> Vec<String> {
        match self {
            Self::Stdout => Vec::new(),
            Self::Capture(lines) => lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone(),
        }
    }
}
