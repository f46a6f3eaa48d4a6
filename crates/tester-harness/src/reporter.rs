//! Text progress reporter - formats engine callbacks for the print sink

use crate::engine::{FailureRecord, RunListener, RunSummary};
use crate::sink::{PrintSink, Severity};
use std::rc::Rc;
use std::time::Duration;

/// Engine listener that prints progress and results as text
pub struct ProgressReporter {
    sink: Rc<dyn PrintSink>,
}

impl ProgressReporter {
    /// Reporter printing through `sink`
    pub fn new(sink: Rc<dyn PrintSink>) -> Self {
        Self { sink }
    }
}

impl RunListener for ProgressReporter {
    fn suite_started(&mut self, suite: &str) {
        self.sink
            .print(Severity::Message, &format!("Suite [{suite}] started"));
    }

    fn suite_completed(&mut self, suite: &str, _failures: &[FailureRecord]) {
        self.sink
            .print(Severity::Message, &format!("Suite [{suite}] ended"));
    }

    fn test_started(&mut self, suite: &str, test: &str) {
        self.sink.print(
            Severity::Message,
            &format!("Suite [{suite}] Test [{test}] started"),
        );
    }

    fn test_completed(
        &mut self,
        suite: &str,
        test: &str,
        failures: &[FailureRecord],
        _elapsed: Duration,
    ) {
        self.sink
            .print(Severity::Message, &format_test_result(suite, test, failures));
    }

    fn suite_init_failed(&mut self, suite: &str, reason: &str) {
        tracing::debug!(suite, reason, "suite init failed");
        self.sink.print(
            Severity::Error,
            &format!("Suite initialization failed for [{suite}]."),
        );
    }

    fn suite_cleanup_failed(&mut self, suite: &str, reason: &str) {
        tracing::debug!(suite, reason, "suite cleanup failed");
        self.sink
            .print(Severity::Error, &format!("Suite cleanup failed for [{suite}]."));
    }

    fn all_completed(&mut self, summary: &RunSummary, _failures: &[FailureRecord]) {
        self.sink
            .print(Severity::Message, &format!("\n{}", format_summary(summary)));
    }
}

/// One test's verdict, with a numbered failure list when it failed
pub fn format_test_result(suite: &str, test: &str, failures: &[FailureRecord]) -> String {
    let mut result = format!("Suite [{suite}] Test [{test}]");
    if failures.is_empty() {
        result.push_str(" passed");
        return result;
    }

    result.push_str(" failed:");
    for (i, failure) in failures.iter().enumerate() {
        result.push_str(&format!("\n    {}. {}", i + 1, failure));
    }
    result
}

/// Run summary table
pub fn format_summary(summary: &RunSummary) -> String {
    let row = |kind: &str, ran: usize, passed: String, failed: usize| {
        format!("{:<12}{:>8}{:>7}{:>7}{:>7}", "", kind, ran, passed, failed)
    };

    [
        format!(
            "{:<12}{:>8}{:>7}{:>7}{:>7}",
            "Run Summary:", "Type", "Ran", "Passed", "Failed"
        ),
        row(
            "suites",
            summary.suites_run,
            "n/a".to_string(),
            summary.suites_failed,
        ),
        row(
            "tests",
            summary.tests_run,
            summary.tests_passed.to_string(),
            summary.tests_failed,
        ),
        row(
            "asserts",
            summary.asserts_run,
            summary
                .asserts_run
                .saturating_sub(summary.asserts_failed)
                .to_string(),
            summary.asserts_failed,
        ),
        String::new(),
        format!(
            "Elapsed time = {:.3} seconds",
            summary.elapsed.as_secs_f64()
        ),
    ]
    .join("\n")
}

/// Print every failure of the run, numbered, as a closing recap
pub fn print_failure_list(sink: &dyn PrintSink, failures: &[FailureRecord]) {
    if failures.is_empty() {
        return;
    }

    sink.print(Severity::Message, "\nFailures:");
    for (i, failure) in failures.iter().enumerate() {
        sink.print(
            Severity::Message,
            &format!("  {}. {} {}", i + 1, failure.scope(), failure),
        );
    }
    sink.print(Severity::Message, "");
}
