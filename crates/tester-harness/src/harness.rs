//! The harness object test programs build their `main` around

use crate::args::{self, Invocation, RunOptions};
use crate::dispatcher::{Dispatcher, RunOutcome};
use crate::engine::{BasicEngine, Engine};
use crate::error::{exit_code, HarnessError, HarnessResult};
use crate::logging::LogSession;
use crate::paths::{DirsScope, TestDirs};
use crate::registry::{Registry, RegistryError, Suite};
use crate::sink::{ConsoleSink, PrintSink, Severity};
use crate::staging::XmlStaging;
use clap::error::ErrorKind;
use std::ffi::OsString;
use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

/// How a harness invocation ended
#[derive(Debug)]
pub enum Outcome {
    /// `--help` or `--version` was printed
    Help,
    /// A listing was printed
    Listed,
    /// The run reached the end; tests may still have failed
    Completed(RunOutcome),
    /// The invocation stopped on an error, already reported
    Error(HarnessError),
}

impl Outcome {
    /// Process exit status for this outcome
    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::Help | Outcome::Listed => exit_code::SUCCESS,
            Outcome::Completed(outcome) if outcome.failed => exit_code::TESTS_FAILED,
            Outcome::Completed(_) => exit_code::SUCCESS,
            Outcome::Error(err) => err.exit_code(),
        }
    }
}

/// Registry, engine and output wiring for one test program
///
/// ```no_run
/// use tester_harness::{check_eq, Harness, Suite};
///
/// fn main() -> std::process::ExitCode {
///     let mut harness = Harness::new("my-tests");
///     harness
///         .register(Suite::new("Math").test("add", || {
///             check_eq!(1 + 1, 2);
///         }))
///         .expect("unique suite name");
///     harness.main()
/// }
/// ```
pub struct Harness<E: Engine = BasicEngine> {
    program: String,
    registry: Registry,
    engine: E,
    sink: Option<Rc<dyn PrintSink>>,
    extra_help: Option<String>,
    input: Option<Box<dyn BufRead>>,
    dirs: TestDirs,
}

impl Harness<BasicEngine> {
    /// Harness driving the built-in engine; `program` names the run
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        let engine = BasicEngine::new(program.clone());
        Self::with_engine(program, engine)
    }
}

impl<E: Engine> Harness<E> {
    /// Harness driving a caller-supplied engine
    pub fn with_engine(program: impl Into<String>, engine: E) -> Self {
        Self {
            program: program.into(),
            registry: Registry::new(),
            engine,
            sink: None,
            extra_help: None,
            input: None,
            dirs: TestDirs::default(),
        }
    }

    /// Send output to `sink` instead of the console
    pub fn with_sink(mut self, sink: Rc<dyn PrintSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Text appended to `--help`
    pub fn with_extra_help(mut self, help: impl Into<String>) -> Self {
        self.extra_help = Some(help.into());
        self
    }

    /// Console-mode input; stdin when unset
    pub fn with_input(mut self, input: impl BufRead + 'static) -> Self {
        self.input = Some(Box::new(input));
        self
    }

    /// Default directory for [`resource_path`](crate::paths::resource_path);
    /// `--resource-dir` wins over it
    pub fn with_resource_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dirs.resource = dir.into();
        self
    }

    /// Default directory for [`writable_path`](crate::paths::writable_path);
    /// `--writable-dir` wins over it
    pub fn with_writable_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dirs.writable = dir.into();
        self
    }

    /// Add a suite; names must be unique
    pub fn register(&mut self, suite: impl Into<Rc<Suite>>) -> Result<(), RegistryError> {
        self.registry.register(suite)
    }

    /// Suites registered so far
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The engine, holding the counters of the last run
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Program name used in help and as the default XML prefix
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Parse `args` (program name first) and act on them
    pub fn run_from<I, T>(&mut self, args: I) -> Outcome
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let parsed = match args::parse(&self.program, self.extra_help.as_deref(), args) {
            Ok(parsed) => parsed,
            Err(err) => return self.clap_error(err),
        };

        let color = !parsed.no_color;
        match parsed.into_invocation(&self.program) {
            Ok(invocation) => self.invoke(invocation),
            Err(err) => self.fail(err, color),
        }
    }

    /// Act on an already-resolved invocation
    pub fn invoke(&mut self, invocation: Invocation) -> Outcome {
        match invocation {
            Invocation::ListSuites { color } => {
                let console = self.console(color);
                for name in self.registry.list_suite_names() {
                    console.print(Severity::Message, name);
                }
                Outcome::Listed
            }
            Invocation::ListTests { suite, color } => self.list_tests(&suite, color),
            Invocation::Run(options) => match self.run(&options) {
                Ok(outcome) => Outcome::Completed(outcome),
                Err(err) => self.fail(err, options.color),
            },
        }
    }

    /// Execute one run with the given options
    ///
    /// The log file, when requested, is open only for the duration of this
    /// call. XML results are renamed into place only when the dispatcher
    /// returns normally.
    pub fn run(&mut self, options: &RunOptions) -> HarnessResult<RunOutcome> {
        options.validate()?;

        let _dirs = DirsScope::enter(TestDirs {
            resource: options
                .resource_dir
                .clone()
                .unwrap_or_else(|| self.dirs.resource.clone()),
            writable: options
                .writable_dir
                .clone()
                .unwrap_or_else(|| self.dirs.writable.clone()),
        });

        let session = LogSession::open(options.log_file.as_deref(), self.console(options.color))?;
        let staging = options.output.results_path().map(XmlStaging::new);
        if let Some(staging) = &staging {
            staging.begin(&mut self.engine);
        }

        let mut dispatcher = Dispatcher::new(&self.registry, &mut self.engine, session.sink());
        if let Some(input) = self.input.as_deref_mut() {
            dispatcher = dispatcher.with_console_input(input);
        }
        let outcome = dispatcher.run(options)?;

        if let Some(staging) = staging {
            staging.commit()?;
        }
        tracing::debug!(failed = outcome.failed, "run finished");
        Ok(outcome)
    }

    /// Run with the process arguments and turn the outcome into an exit code
    pub fn main(mut self) -> ExitCode {
        let outcome = self.run_from(std::env::args_os());
        ExitCode::from(outcome.exit_code())
    }

    fn list_tests(&self, suite: &str, color: bool) -> Outcome {
        let console = self.console(color);
        if self.registry.find_suite(suite).is_none() {
            console.print(
                Severity::Error,
                &format!("Could not find suite '{suite}'. Available suites are:"),
            );
            for name in self.registry.list_suite_names() {
                console.print(Severity::Message, &format!("    {name}"));
            }
            return Outcome::Error(HarnessError::SuiteNotFound(suite.to_string()));
        }

        for name in self.registry.list_test_names(suite) {
            console.print(Severity::Message, name);
        }
        Outcome::Listed
    }

    fn clap_error(&self, err: clap::Error) -> Outcome {
        let display_only = matches!(
            err.kind(),
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
        );

        match &self.sink {
            Some(sink) => {
                let severity = if display_only {
                    Severity::Message
                } else {
                    Severity::Error
                };
                sink.print(severity, err.to_string().trim_end());
            }
            None => {
                let _ = err.print();
            }
        }

        if display_only {
            Outcome::Help
        } else {
            Outcome::Error(HarnessError::Config(err.to_string().trim_end().to_string()))
        }
    }

    /// Report `err` unless the dispatcher already explained it
    fn fail(&self, err: HarnessError, color: bool) -> Outcome {
        if !matches!(
            err,
            HarnessError::SuiteNotFound(_) | HarnessError::TestNotFound { .. }
        ) {
            self.console(color).print(Severity::Error, &err.to_string());
        }
        Outcome::Error(err)
    }

    fn console(&self, color: bool) -> Rc<dyn PrintSink> {
        match &self.sink {
            Some(sink) => sink.clone(),
            None => Rc::new(ConsoleSink::new(color)),
        }
    }
}
