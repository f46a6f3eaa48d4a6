//! Harness errors and process exit codes

use crate::engine::EngineError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes surfaced to the calling process.
///
/// Every failure class gets its own code so scripts can tell a bad selection
/// apart from failing tests.
pub mod exit_code {
    /// All selected tests passed, or a help/listing request was served.
    pub const SUCCESS: u8 = 0;
    /// At least one test failed.
    pub const TESTS_FAILED: u8 = 1;
    /// Bad, missing or conflicting command-line arguments.
    pub const CONFIG: u8 = 2;
    /// `--suite` named a suite that is not registered.
    pub const SUITE_NOT_FOUND: u8 = 3;
    /// `--test` named a test that is not part of the selected suite.
    pub const TEST_NOT_FOUND: u8 = 4;
    /// The execution engine refused to initialize its registry.
    pub const ENGINE_INIT: u8 = 5;
    /// The execution engine rejected a suite or test while binding.
    pub const REGISTRATION: u8 = 6;
    /// The `--log-file` target could not be opened.
    pub const LOG_FILE: u8 = 7;
    /// Any other I/O or engine failure during the run.
    pub const IO: u8 = 8;
}

/// Errors that stop a harness run
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Could not find suite '{0}'")]
    SuiteNotFound(String),

    #[error("Could not find test '{test}' in suite '{suite}'")]
    TestNotFound { suite: String, test: String },

    #[error("Failed to initialize the engine registry: {0}")]
    EngineInit(#[source] EngineError),

    #[error("Failed to bind suite '{suite}' into the engine: {source}")]
    Registration {
        suite: String,
        #[source]
        source: EngineError,
    },

    #[error("Engine run failed: {0}")]
    Engine(#[from] EngineError),

    #[error("Cannot open file [{}] for writing logs because [{source}]", .path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to finalize XML results [{}]: {source}", .path.display())]
    Staging {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl HarnessError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            HarnessError::Config(_) => exit_code::CONFIG,
            HarnessError::SuiteNotFound(_) => exit_code::SUITE_NOT_FOUND,
            HarnessError::TestNotFound { .. } => exit_code::TEST_NOT_FOUND,
            HarnessError::EngineInit(_) => exit_code::ENGINE_INIT,
            HarnessError::Registration { .. } => exit_code::REGISTRATION,
            HarnessError::LogFile { .. } => exit_code::LOG_FILE,
            HarnessError::Engine(_) | HarnessError::Io(_) | HarnessError::Staging { .. } => {
                exit_code::IO
            }
        }
    }
}

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let errors = [
            HarnessError::Config("bad".to_string()),
            HarnessError::SuiteNotFound("Core".to_string()),
            HarnessError::TestNotFound {
                suite: "Core".to_string(),
                test: "t9".to_string(),
            },
            HarnessError::EngineInit(EngineError::AlreadyInitialized),
            HarnessError::Registration {
                suite: "Core".to_string(),
                source: EngineError::DuplicateSuite("Core".to_string()),
            },
            HarnessError::LogFile {
                path: PathBuf::from("/nope/log.txt"),
                source: io::Error::from(io::ErrorKind::NotFound),
            },
        ];

        let mut codes: Vec<u8> = errors.iter().map(|e| e.exit_code()).collect();
        codes.push(exit_code::SUCCESS);
        codes.push(exit_code::TESTS_FAILED);
        let count = codes.len();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), count);
    }

    #[test]
    fn test_log_file_message_names_path_and_cause() {
        let err = HarnessError::LogFile {
            path: PathBuf::from("/nope/log.txt"),
            source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
        };
        assert_eq!(
            err.to_string(),
            "Cannot open file [/nope/log.txt] for writing logs because [No such file or directory]"
        );
    }
}
