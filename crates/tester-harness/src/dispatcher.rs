//! Run dispatcher
//!
//! Drives one run through the engine: fresh engine registry, bind every
//! registered suite, pick what to execute from the selection, report. The
//! engine registry is torn down on every path once it was initialized.

use crate::args::{RunOptions, Selection};
use crate::engine::{Engine, RunSummary, SuiteId};
use crate::error::{HarnessError, HarnessResult};
use crate::interactive;
use crate::registry::Registry;
use crate::reporter::{print_failure_list, ProgressReporter};
use crate::sink::{PrintSink, Severity};
use std::io::{self, BufRead};
use std::rc::Rc;

/// Where a dispatcher is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Initialized,
    Bound,
    Executing,
    Completed,
}

/// Result of a run that reached the end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// At least one test failed; suite hook failures are reported but do not count
    pub failed: bool,
    pub summary: RunSummary,
}

/// Binds the registry into an engine and executes one selection
pub struct Dispatcher<'a, E: Engine + ?Sized> {
    registry: &'a Registry,
    engine: &'a mut E,
    sink: Rc<dyn PrintSink>,
    console_input: Option<&'a mut dyn BufRead>,
    state: DispatchState,
}

impl<'a, E: Engine + ?Sized> Dispatcher<'a, E> {
    /// Dispatcher for one run of `registry` on `engine`, printing to `sink`
    pub fn new(registry: &'a Registry, engine: &'a mut E, sink: Rc<dyn PrintSink>) -> Self {
        Self {
            registry,
            engine,
            sink,
            console_input: None,
            state: DispatchState::Idle,
        }
    }

    /// Read console-mode commands from `input` instead of stdin
    pub fn with_console_input(mut self, input: &'a mut dyn BufRead) -> Self {
        self.console_input = Some(input);
        self
    }

    /// Current state of the run
    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Execute one run
    pub fn run(&mut self, options: &RunOptions) -> HarnessResult<RunOutcome> {
        options.validate()?;

        self.engine.init_registry().map_err(HarnessError::EngineInit)?;
        self.transition(DispatchState::Initialized);

        let result = self.bind().and_then(|()| self.execute(options));
        self.engine.cleanup_registry();
        tracing::debug!(state = ?self.state, ok = result.is_ok(), "engine registry cleaned up");
        result
    }

    fn transition(&mut self, next: DispatchState) {
        tracing::debug!(from = ?self.state, to = ?next, "dispatch state");
        self.state = next;
    }

    fn bind(&mut self) -> HarnessResult<()> {
        let registry = self.registry;
        for suite in registry.iter() {
            let registration = |source| HarnessError::Registration {
                suite: suite.name().to_string(),
                source,
            };

            let id = self
                .engine
                .add_suite(suite.name(), suite.init().cloned(), suite.cleanup().cloned())
                .map_err(registration)?;
            for test in suite.tests() {
                self.engine
                    .add_test(id, test.name(), test.body().clone())
                    .map_err(registration)?;
            }
            tracing::debug!(suite = suite.name(), tests = suite.len(), "suite bound");
        }

        self.transition(DispatchState::Bound);
        Ok(())
    }

    fn execute(&mut self, options: &RunOptions) -> HarnessResult<RunOutcome> {
        self.engine
            .set_listener(Box::new(ProgressReporter::new(self.sink.clone())));
        self.transition(DispatchState::Executing);

        if options.output.is_xml() {
            self.engine.run_automated()?;
        } else {
            match &options.selection {
                Selection::All if options.interactive => self.console()?,
                Selection::All => self.engine.run_all()?,
                Selection::Suite(suite) => {
                    let id = self.find_suite(suite)?;
                    self.engine.run_suite(id)?;
                }
                Selection::Test { suite, test } => {
                    let id = self.find_suite(suite)?;
                    let Some(test_id) = self.engine.find_test(id, test) else {
                        self.print(
                            Severity::Error,
                            &format!(
                                "Could not find test '{test}' in suite '{suite}'. Available tests are:"
                            ),
                        );
                        for name in self.engine.test_names(id) {
                            self.print(Severity::Message, &format!("    {name}"));
                        }
                        return Err(HarnessError::TestNotFound {
                            suite: suite.clone(),
                            test: test.clone(),
                        });
                    };
                    self.engine.run_test(id, test_id)?;
                }
            }
        }

        print_failure_list(self.sink.as_ref(), self.engine.failures());
        self.transition(DispatchState::Completed);

        let summary = self.engine.summary().clone();
        Ok(RunOutcome {
            failed: summary.tests_failed > 0,
            summary,
        })
    }

    fn find_suite(&self, suite: &str) -> HarnessResult<SuiteId> {
        if let Some(id) = self.engine.find_suite(suite) {
            return Ok(id);
        }

        self.print(
            Severity::Error,
            &format!("Could not find suite '{suite}'. Available suites are:"),
        );
        for name in self.engine.suite_names() {
            self.print(Severity::Message, &format!("    {name}"));
        }
        Err(HarnessError::SuiteNotFound(suite.to_string()))
    }

    fn console(&mut self) -> HarnessResult<()> {
        let sink = self.sink.clone();
        match self.console_input.as_deref_mut() {
            Some(input) => interactive::run_console(&mut *self.engine, sink.as_ref(), input),
            None => {
                let stdin = io::stdin();
                let mut input = stdin.lock();
                interactive::run_console(&mut *self.engine, sink.as_ref(), &mut input)
            }
        }
    }

    fn print(&self, severity: Severity, message: &str) {
        self.sink.print(severity, message);
    }
}
