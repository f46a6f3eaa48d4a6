//! Tester Harness - registry-driven command-line test runner
//!
//! Test programs register named suites of zero-argument test bodies with a
//! [`Harness`] and hand it the command line. The harness provides:
//! - Suite/test selection and listing by name
//! - Text progress output or a JUnit-style XML report, staged through a
//!   temp file and renamed into place only when the run completes
//! - Log-file redirection and an interactive console menu
//! - Resource and writable directories test bodies resolve files against
//!
//! Test bodies report through [`check!`], [`check_eq!`], [`require!`] and
//! [`fail!`].

/// Harness version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod args;
pub mod assertion;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod harness;
pub mod interactive;
pub mod logging;
pub mod lookup;
pub mod paths;
pub mod registry;
pub mod reporter;
pub mod sink;
pub mod staging;
pub mod xml;

// Re-export commonly used types
pub use args::{HarnessArgs, Invocation, OutputMode, RunOptions, Selection};
pub use dispatcher::{DispatchState, Dispatcher, RunOutcome};
pub use engine::{
    BasicEngine, Engine, EngineError, FailureKind, FailureRecord, RunListener, RunSummary,
    SuiteId, TestId,
};
pub use error::{exit_code, HarnessError, HarnessResult};
pub use harness::{Harness, Outcome};
pub use paths::{resource_dir, resource_path, writable_dir, writable_path, TestDirs};
pub use registry::{Registry, RegistryError, Suite, SuiteHook, Test, TestBody};
pub use sink::{ConsoleSink, FileSink, MemorySink, PrintSink, Severity};
pub use staging::XmlStaging;
