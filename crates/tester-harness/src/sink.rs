//! Print sinks - where harness output lines go

use colored::*;
use std::cell::RefCell;
use std::fs::File;
use std::io::Write;
use std::sync::Arc;

/// How loud a line is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Message,
    Warning,
    Error,
}

/// Receiver for harness output
pub trait PrintSink {
    fn print(&self, severity: Severity, message: &str);
}

/// Messages to stdout, warnings and errors to stderr
#[derive(Debug, Clone, Copy)]
pub struct ConsoleSink {
    color: bool,
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConsoleSink {
    /// Console sink; `color` styles warnings and errors
    pub fn new(color: bool) -> Self {
        Self { color }
    }
}

impl PrintSink for ConsoleSink {
    fn print(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Debug | Severity::Message => println!("{message}"),
            Severity::Warning if self.color => eprintln!("{}", message.yellow()),
            Severity::Error if self.color => eprintln!("{}", message.red().bold()),
            Severity::Warning | Severity::Error => eprintln!("{message}"),
        }
    }
}

/// Appends every line to a shared file handle
#[derive(Debug, Clone)]
pub struct FileSink {
    file: Arc<File>,
}

impl FileSink {
    /// Sink appending to `file`
    pub fn new(file: Arc<File>) -> Self {
        Self { file }
    }
}

impl PrintSink for FileSink {
    fn print(&self, severity: Severity, message: &str) {
        let mut file = &*self.file;
        let result = match severity {
            Severity::Error => writeln!(file, "error: {message}"),
            Severity::Warning => writeln!(file, "warning: {message}"),
            Severity::Debug | Severity::Message => writeln!(file, "{message}"),
        };
        if let Err(err) = result {
            tracing::warn!(error = %err, "log file write failed");
        }
    }
}

/// Keeps lines in memory; used to inspect output in-process
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: RefCell<Vec<(Severity, String)>>,
}

impl MemorySink {
    /// Empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Every line with its severity, in order
    pub fn lines(&self) -> Vec<(Severity, String)> {
        self.lines.borrow().clone()
    }

    /// Message text only, in order
    pub fn messages(&self) -> Vec<String> {
        self.lines
            .borrow()
            .iter()
            .map(|(_, message)| message.clone())
            .collect()
    }

    /// All output joined with newlines
    pub fn text(&self) -> String {
        self.messages().join("\n")
    }

    /// Forget everything printed so far
    pub fn clear(&self) {
        self.lines.borrow_mut().clear();
    }
}

impl PrintSink for MemorySink {
    fn print(&self, severity: Severity, message: &str) {
        self.lines
            .borrow_mut()
            .push((severity, message.to_string()));
    }
}
