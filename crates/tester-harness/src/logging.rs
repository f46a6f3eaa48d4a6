//! Tracing setup and `--log-file` redirection
//!
//! A [`LogSession`] lives for one harness run. It installs a thread-scoped
//! tracing subscriber and picks the print sink: the console, or the log file
//! when one was requested. Dropping the session closes the file and restores
//! the previous subscriber.
//!
//! While a log file is open, panic messages raised on the run's thread are
//! written to it as error traces instead of stderr.

use crate::error::{HarnessError, HarnessResult};
use crate::sink::{FileSink, PrintSink, Severity};
use std::cell::Cell;
use std::fs::File;
use std::io;
use std::panic;
use std::path::Path;
use std::rc::Rc;
use std::sync::{Arc, Once};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;

/// Filter directive variable; `RUST_LOG` is used when unset
pub const LOG_ENV: &str = "TESTER_LOG";

const DEFAULT_DIRECTIVE: &str = "warn";

thread_local! {
    static PANICS_TO_LOG: Cell<bool> = const { Cell::new(false) };
}

static PANIC_HOOK: Once = Once::new();

/// Logging state for one run
pub struct LogSession {
    sink: Rc<dyn PrintSink>,
    _panics: Option<PanicRedirect>,
    _guard: DefaultGuard,
}

impl LogSession {
    /// Start logging to stderr, or to `log_file` when given
    ///
    /// With a log file, harness output is redirected there as well; the
    /// redirect notice itself still goes to `console`.
    pub fn open(log_file: Option<&Path>, console: Rc<dyn PrintSink>) -> HarnessResult<Self> {
        let Some(path) = log_file else {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter())
                .with(fmt::layer().with_writer(io::stderr));
            return Ok(Self {
                sink: console,
                _panics: None,
                _guard: tracing::subscriber::set_default(subscriber),
            });
        };

        let file = File::create(path).map_err(|source| HarnessError::LogFile {
            path: path.to_path_buf(),
            source,
        })?;
        console.print(
            Severity::Message,
            &format!("Redirecting traces to file [{}]", path.display()),
        );

        let file = Arc::new(file);
        let subscriber = tracing_subscriber::registry().with(env_filter()).with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(file.clone()),
        );
        let guard = tracing::subscriber::set_default(subscriber);
        tracing::debug!(path = %path.display(), "log file opened");

        Ok(Self {
            sink: Rc::new(FileSink::new(file)),
            _panics: Some(PanicRedirect::enter()),
            _guard: guard,
        })
    }

    /// Sink harness output should go to for this run
    pub fn sink(&self) -> Rc<dyn PrintSink> {
        self.sink.clone()
    }
}

/// Sends this thread's panic messages to tracing until dropped
///
/// The process-wide hook is installed once and chains to whatever hook was
/// there before; threads without an active redirect still reach it.
struct PanicRedirect {
    previous: bool,
}

impl PanicRedirect {
    fn enter() -> Self {
        PANIC_HOOK.call_once(|| {
            let fallback = panic::take_hook();
            panic::set_hook(Box::new(move |info| {
                if PANICS_TO_LOG.with(Cell::get) {
                    tracing::error!("{info}");
                } else {
                    fallback(info);
                }
            }));
        });
        Self {
            previous: PANICS_TO_LOG.replace(true),
        }
    }
}

impl Drop for PanicRedirect {
    fn drop(&mut self) {
        PANICS_TO_LOG.set(self.previous);
    }
}

fn env_filter() -> EnvFilter {
    match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(&directive).unwrap_or_else(|err| {
            eprintln!("invalid {LOG_ENV} directive ({err}); defaulting to {DEFAULT_DIRECTIVE}");
            EnvFilter::new(DEFAULT_DIRECTIVE)
        }),
        Err(_) => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::exit_code;
    use crate::sink::MemorySink;
    use std::fs;

    #[test]
    fn test_console_session_uses_console_sink() {
        let console = Rc::new(MemorySink::new());
        let session = LogSession::open(None, console.clone()).unwrap();
        session.sink().print(Severity::Message, "hello");

        assert_eq!(console.messages(), vec!["hello"]);
    }

    #[test]
    fn test_log_file_receives_output_and_traces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let console = Rc::new(MemorySink::new());

        {
            let session = LogSession::open(Some(&path), console.clone()).unwrap();
            session.sink().print(Severity::Message, "Suite [Core] started");
            tracing::error!("engine hiccup");
        }

        assert_eq!(
            console.messages(),
            vec![format!("Redirecting traces to file [{}]", path.display())]
        );
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("Suite [Core] started"));
        assert!(contents.contains("engine hiccup"));
    }

    #[test]
    fn test_panic_message_goes_to_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let console = Rc::new(MemorySink::new());

        {
            let _session = LogSession::open(Some(&path), console.clone()).unwrap();
            let caught = panic::catch_unwind(|| panic!("kaboom in test body"));
            assert!(caught.is_err());
        }

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("kaboom in test body"));
        assert!(!PANICS_TO_LOG.with(Cell::get));
    }

    #[test]
    fn test_console_session_leaves_panics_alone() {
        let console = Rc::new(MemorySink::new());
        let _session = LogSession::open(None, console).unwrap();
        assert!(!PANICS_TO_LOG.with(Cell::get));
    }

    #[test]
    fn test_unopenable_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("run.log");
        let console = Rc::new(MemorySink::new());

        let err = LogSession::open(Some(&path), console.clone()).err().unwrap();
        assert_eq!(err.exit_code(), exit_code::LOG_FILE);
        assert!(err.to_string().starts_with("Cannot open file ["));
        assert!(console.messages().is_empty());
    }
}
