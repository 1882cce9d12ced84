//! Operator interaction: the only user-facing surface of the daemon.
//!
//! Three moments reach the operator: the first-run question for the store
//! name, a fatal startup error, and the one-time "running in the background"
//! notice. Everything after that goes to the log file only.

use std::io::{BufRead, Write};
use std::sync::Mutex;

/// Blocking operator interaction.
///
/// Implemented by [`ConsolePrompt`] for terminals and by stubs in tests.
pub trait UserPrompt: Send + Sync {
    /// Ask for a line of text. `None` when the operator gave nothing
    /// (cancelled, EOF, or an I/O failure).
    fn ask_string(&self, title: &str, message: &str) -> Option<String>;

    /// Report a fatal condition.
    fn show_error(&self, title: &str, message: &str);

    /// Report a purely informational notice.
    fn show_info(&self, title: &str, message: &str);
}

/// Prompt on stdin/stderr.
pub struct ConsolePrompt<R> {
    input: Mutex<R>,
}

impl ConsolePrompt<std::io::BufReader<std::io::Stdin>> {
    pub fn stdin() -> Self {
        Self::new(std::io::BufReader::new(std::io::stdin()))
    }
}

impl<R: BufRead> ConsolePrompt<R> {
    pub fn new(input: R) -> Self {
        Self {
            input: Mutex::new(input),
        }
    }
}

impl<R: BufRead + Send> UserPrompt for ConsolePrompt<R> {
    fn ask_string(&self, title: &str, message: &str) -> Option<String> {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "[{title}] {message} ");
        let _ = stderr.flush();

        let mut line = String::new();
        let mut input = self.input.lock().unwrap_or_else(|e| e.into_inner());
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }

    fn show_error(&self, title: &str, message: &str) {
        eprintln!("[{title}] ERROR: {message}");
    }

    fn show_info(&self, title: &str, message: &str) {
        eprintln!("[{title}] {message}");
    }
}
