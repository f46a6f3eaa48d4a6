//! Execution engine seam
//!
//! The dispatcher talks to the engine only through [`Engine`]: build a fresh
//! engine registry, bind suites and tests into it, run all or part of it, and
//! read back failures. Progress is observed through a [`RunListener`].
//! [`BasicEngine`] is the in-process implementation the harness ships with.

mod basic;

pub use basic::BasicEngine;

use crate::registry::{SuiteHook, TestBody};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine registry is not initialized")]
    NoRegistry,

    #[error("Engine registry is already initialized")]
    AlreadyInitialized,

    #[error("Suite '{0}' is already registered in the engine")]
    DuplicateSuite(String),

    #[error("Test '{test}' is already registered in suite '{suite}'")]
    DuplicateTest { suite: String, test: String },

    #[error("Unknown suite id {0}")]
    UnknownSuite(usize),

    #[error("Unknown test id {0}")]
    UnknownTest(usize),

    #[error("No output path set for an automated run")]
    NoOutputPath,

    #[error("Failed to write XML results to {}: {source}", .path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Handle to a suite bound into an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SuiteId(pub usize);

/// Handle to a test within its suite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TestId(pub usize);

/// Where a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A `check!`-style assertion in a test body
    Assertion,
    /// A panic escaping a test body
    Panic,
    /// The suite's init hook failed; its tests did not run
    SuiteInit,
    /// The suite's cleanup hook failed
    SuiteCleanup,
}

impl FailureKind {
    /// Label used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Assertion => "assertion",
            FailureKind::Panic => "panic",
            FailureKind::SuiteInit => "init",
            FailureKind::SuiteCleanup => "cleanup",
        }
    }
}

/// One recorded failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub suite: String,
    /// `None` for suite-level failures
    pub test: Option<String>,
    pub file: String,
    pub line: u32,
    pub condition: String,
    pub kind: FailureKind,
}

impl FailureRecord {
    /// `suite/test` or just `suite` for suite-level failures
    pub fn scope(&self) -> String {
        match &self.test {
            Some(test) => format!("{}/{}", self.suite, test),
            None => self.suite.clone(),
        }
    }
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}  - {}", self.file, self.line, self.condition)
    }
}

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub suites_run: usize,
    pub suites_failed: usize,
    pub tests_run: usize,
    pub tests_passed: usize,
    pub tests_failed: usize,
    pub asserts_run: usize,
    pub asserts_failed: usize,
    pub elapsed: Duration,
}

/// Observer of run progress
///
/// Every callback has an empty default so listeners only implement what they
/// report on.
pub trait RunListener {
    fn suite_started(&mut self, _suite: &str) {}

    fn suite_completed(&mut self, _suite: &str, _failures: &[FailureRecord]) {}

    fn test_started(&mut self, _suite: &str, _test: &str) {}

    fn test_completed(
        &mut self,
        _suite: &str,
        _test: &str,
        _failures: &[FailureRecord],
        _elapsed: Duration,
    ) {
    }

    fn suite_init_failed(&mut self, _suite: &str, _reason: &str) {}

    fn suite_cleanup_failed(&mut self, _suite: &str, _reason: &str) {}

    fn all_completed(&mut self, _summary: &RunSummary, _failures: &[FailureRecord]) {}
}

/// The test-execution engine the dispatcher drives
pub trait Engine {
    /// Start a fresh, empty engine registry
    fn init_registry(&mut self) -> Result<(), EngineError>;

    /// Tear down the engine registry; safe to call when none exists
    fn cleanup_registry(&mut self);

    fn add_suite(
        &mut self,
        name: &str,
        init: Option<SuiteHook>,
        cleanup: Option<SuiteHook>,
    ) -> Result<SuiteId, EngineError>;

    fn add_test(&mut self, suite: SuiteId, name: &str, body: TestBody)
        -> Result<TestId, EngineError>;

    fn find_suite(&self, name: &str) -> Option<SuiteId>;

    fn find_test(&self, suite: SuiteId, name: &str) -> Option<TestId>;

    /// Names of all bound suites, in binding order
    fn suite_names(&self) -> Vec<&str>;

    /// Names of the tests of `suite`, in binding order
    fn test_names(&self, suite: SuiteId) -> Vec<&str>;

    /// Replace the progress listener
    fn set_listener(&mut self, listener: Box<dyn RunListener>);

    /// Where [`Engine::run_automated`] writes its XML report
    fn set_output_path(&mut self, path: &Path);

    fn run_all(&mut self) -> Result<(), EngineError>;

    fn run_suite(&mut self, suite: SuiteId) -> Result<(), EngineError>;

    fn run_test(&mut self, suite: SuiteId, test: TestId) -> Result<(), EngineError>;

    /// Run everything and write the XML report to the output path
    fn run_automated(&mut self) -> Result<(), EngineError>;

    /// Tests with at least one failure in the last run
    fn tests_failed(&self) -> usize;

    /// Failures of the last run, in the order they were recorded
    fn failures(&self) -> &[FailureRecord];

    fn summary(&self) -> &RunSummary;
}

/// Forwards every callback to two listeners
pub(crate) struct Tee<'a> {
    pub(crate) first: &'a mut dyn RunListener,
    pub(crate) second: &'a mut dyn RunListener,
}

impl RunListener for Tee<'_> {
    fn suite_started(&mut self, suite: &str) {
        self.first.suite_started(suite);
        self.second.suite_started(suite);
    }

    fn suite_completed(&mut self, suite: &str, failures: &[FailureRecord]) {
        self.first.suite_completed(suite, failures);
        self.second.suite_completed(suite, failures);
    }

    fn test_started(&mut self, suite: &str, test: &str) {
        self.first.test_started(suite, test);
        self.second.test_started(suite, test);
    }

    fn test_completed(
        &mut self,
        suite: &str,
        test: &str,
        failures: &[FailureRecord],
        elapsed: Duration,
    ) {
        self.first.test_completed(suite, test, failures, elapsed);
        self.second.test_completed(suite, test, failures, elapsed);
    }

    fn suite_init_failed(&mut self, suite: &str, reason: &str) {
        self.first.suite_init_failed(suite, reason);
        self.second.suite_init_failed(suite, reason);
    }

    fn suite_cleanup_failed(&mut self, suite: &str, reason: &str) {
        self.first.suite_cleanup_failed(suite, reason);
        self.second.suite_cleanup_failed(suite, reason);
    }

    fn all_completed(&mut self, summary: &RunSummary, failures: &[FailureRecord]) {
        self.first.all_completed(summary, failures);
        self.second.all_completed(summary, failures);
    }
}

/// Listener that ignores everything
pub(crate) struct NullListener;

impl RunListener for NullListener {}
