//! Streaming XML result report
//!
//! JUnit-shaped so CI servers can read it. Elements are written and flushed
//! as results arrive; a run that dies half way leaves a truncated document
//! behind rather than nothing.

use crate::engine::{FailureKind, FailureRecord, RunListener, RunSummary};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

/// XML report writer
pub struct XmlReport<W: Write> {
    writer: W,
    error: Option<io::Error>,
}

impl XmlReport<BufWriter<File>> {
    /// Create (or truncate) `path` and write the document header
    pub fn create(path: &Path, run_name: &str) -> io::Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file), run_name)
    }
}

impl<W: Write> XmlReport<W> {
    /// Start a report on `writer`
    pub fn new(writer: W, run_name: &str) -> io::Result<Self> {
        let mut report = Self {
            writer,
            error: None,
        };
        report.emit(&format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<testsuites name=\"{}\">\n",
            escape_xml(run_name)
        ));
        match report.error.take() {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }

    /// Close the document and hand back the writer
    ///
    /// Returns the first write error hit while streaming, if any.
    pub fn finish(mut self) -> io::Result<W> {
        self.emit("</testsuites>\n");
        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(self.writer),
        }
    }

    fn emit(&mut self, text: &str) {
        if self.error.is_some() {
            return;
        }
        let result = self
            .writer
            .write_all(text.as_bytes())
            .and_then(|()| self.writer.flush());
        if let Err(err) = result {
            tracing::warn!(error = %err, "XML report write failed");
            self.error = Some(err);
        }
    }
}

impl<W: Write> RunListener for XmlReport<W> {
    fn suite_started(&mut self, suite: &str) {
        self.emit(&format!("  <testsuite name=\"{}\">\n", escape_xml(suite)));
    }

    fn suite_completed(&mut self, _suite: &str, _failures: &[FailureRecord]) {
        self.emit("  </testsuite>\n");
    }

    fn test_completed(
        &mut self,
        suite: &str,
        test: &str,
        failures: &[FailureRecord],
        elapsed: Duration,
    ) {
        let open = format!(
            "    <testcase name=\"{}\" classname=\"{}\" time=\"{:.3}\"",
            escape_xml(test),
            escape_xml(suite),
            elapsed.as_secs_f64()
        );
        if failures.is_empty() {
            self.emit(&format!("{open}/>\n"));
            return;
        }

        let mut element = format!("{open}>\n");
        for failure in failures {
            element.push_str(&format!(
                "      <failure message=\"{}\" type=\"{}\">{}:{}</failure>\n",
                escape_xml(&failure.condition),
                failure.kind.as_str(),
                escape_xml(&failure.file),
                failure.line
            ));
        }
        element.push_str("    </testcase>\n");
        self.emit(&element);
    }

    fn suite_init_failed(&mut self, _suite: &str, reason: &str) {
        self.emit(&format!(
            "    <error message=\"suite initialization failed: {}\" type=\"{}\"/>\n",
            escape_xml(reason),
            FailureKind::SuiteInit.as_str()
        ));
    }

    fn suite_cleanup_failed(&mut self, _suite: &str, reason: &str) {
        self.emit(&format!(
            "    <error message=\"suite cleanup failed: {}\" type=\"{}\"/>\n",
            escape_xml(reason),
            FailureKind::SuiteCleanup.as_str()
        ));
    }

    fn all_completed(&mut self, summary: &RunSummary, _failures: &[FailureRecord]) {
        self.emit(&format!(
            "  <summary suites=\"{}\" suites_failed=\"{}\" tests=\"{}\" passed=\"{}\" failed=\"{}\" asserts=\"{}\" asserts_failed=\"{}\" time=\"{:.3}\"/>\n",
            summary.suites_run,
            summary.suites_failed,
            summary.tests_run,
            summary.tests_passed,
            summary.tests_failed,
            summary.asserts_run,
            summary.asserts_failed,
            summary.elapsed.as_secs_f64()
        ));
    }
}

/// Escape XML special characters
pub fn escape_xml(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
