//! In-process engine: runs bodies on the calling thread, one at a time

use super::{
    Engine, EngineError, FailureKind, FailureRecord, NullListener, RunListener, RunSummary,
    SuiteId, Tee, TestId,
};
use crate::assertion::{self, CaptureScope};
use crate::registry::{SuiteHook, TestBody};
use crate::xml::XmlReport;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Instant;

struct BoundTest {
    name: String,
    body: TestBody,
}

struct BoundSuite {
    name: String,
    init: Option<SuiteHook>,
    cleanup: Option<SuiteHook>,
    tests: Vec<BoundTest>,
}

/// What a single run covers
#[derive(Debug, Clone, Copy)]
enum Plan {
    All,
    Suite(usize),
    Test(usize, usize),
}

/// Sequential engine with catch-unwind isolation between test bodies
pub struct BasicEngine {
    run_name: String,
    suites: Option<Vec<BoundSuite>>,
    listener: Option<Box<dyn RunListener>>,
    output_path: Option<PathBuf>,
    failures: Vec<FailureRecord>,
    summary: RunSummary,
}

impl Default for BasicEngine {
    fn default() -> Self {
        Self::new("tester")
    }
}

impl BasicEngine {
    /// Create an engine; `run_name` labels the XML report
    pub fn new(run_name: impl Into<String>) -> Self {
        Self {
            run_name: run_name.into(),
            suites: None,
            listener: None,
            output_path: None,
            failures: Vec::new(),
            summary: RunSummary::default(),
        }
    }

    fn suites(&self) -> Result<&Vec<BoundSuite>, EngineError> {
        self.suites.as_ref().ok_or(EngineError::NoRegistry)
    }

    fn suites_mut(&mut self) -> Result<&mut Vec<BoundSuite>, EngineError> {
        self.suites.as_mut().ok_or(EngineError::NoRegistry)
    }

    fn suite(&self, id: SuiteId) -> Result<&BoundSuite, EngineError> {
        self.suites()?
            .get(id.0)
            .ok_or(EngineError::UnknownSuite(id.0))
    }

    /// Run `plan` with the installed listener
    fn run_plan(&mut self, plan: Plan) -> Result<(), EngineError> {
        let mut listener = self
            .listener
            .take()
            .unwrap_or_else(|| Box::new(NullListener));
        let result = self.execute(plan, listener.as_mut());
        self.listener = Some(listener);
        result
    }

    fn execute(&mut self, plan: Plan, listener: &mut dyn RunListener) -> Result<(), EngineError> {
        let suites = self.suites.as_ref().ok_or(EngineError::NoRegistry)?;
        let started = Instant::now();
        let mut run = RunState::default();

        tracing::debug!(?plan, "engine run started");
        match plan {
            Plan::All => {
                for suite in suites {
                    run.suite(suite, None, listener);
                }
            }
            Plan::Suite(index) => run.suite(&suites[index], None, listener),
            Plan::Test(index, test) => run.suite(&suites[index], Some(test), listener),
        }

        run.summary.elapsed = started.elapsed();
        listener.all_completed(&run.summary, &run.failures);
        tracing::debug!(
            tests = run.summary.tests_run,
            failed = run.summary.tests_failed,
            "engine run finished"
        );

        self.failures = run.failures;
        self.summary = run.summary;
        Ok(())
    }
}

impl Engine for BasicEngine {
    fn init_registry(&mut self) -> Result<(), EngineError> {
        if self.suites.is_some() {
            return Err(EngineError::AlreadyInitialized);
        }
        self.suites = Some(Vec::new());
        self.failures.clear();
        self.summary = RunSummary::default();
        Ok(())
    }

    fn cleanup_registry(&mut self) {
        self.suites = None;
        self.listener = None;
    }

    fn add_suite(
        &mut self,
        name: &str,
        init: Option<SuiteHook>,
        cleanup: Option<SuiteHook>,
    ) -> Result<SuiteId, EngineError> {
        let suites = self.suites_mut()?;
        if suites.iter().any(|suite| suite.name == name) {
            return Err(EngineError::DuplicateSuite(name.to_string()));
        }
        suites.push(BoundSuite {
            name: name.to_string(),
            init,
            cleanup,
            tests: Vec::new(),
        });
        Ok(SuiteId(suites.len() - 1))
    }

    fn add_test(
        &mut self,
        suite: SuiteId,
        name: &str,
        body: TestBody,
    ) -> Result<TestId, EngineError> {
        let bound = self
            .suites_mut()?
            .get_mut(suite.0)
            .ok_or(EngineError::UnknownSuite(suite.0))?;
        if bound.tests.iter().any(|test| test.name == name) {
            return Err(EngineError::DuplicateTest {
                suite: bound.name.clone(),
                test: name.to_string(),
            });
        }
        bound.tests.push(BoundTest {
            name: name.to_string(),
            body,
        });
        Ok(TestId(bound.tests.len() - 1))
    }

    fn find_suite(&self, name: &str) -> Option<SuiteId> {
        self.suites
            .as_ref()?
            .iter()
            .position(|suite| suite.name == name)
            .map(SuiteId)
    }

    fn find_test(&self, suite: SuiteId, name: &str) -> Option<TestId> {
        self.suite(suite)
            .ok()?
            .tests
            .iter()
            .position(|test| test.name == name)
            .map(TestId)
    }

    fn suite_names(&self) -> Vec<&str> {
        self.suites
            .iter()
            .flatten()
            .map(|suite| suite.name.as_str())
            .collect()
    }

    fn test_names(&self, suite: SuiteId) -> Vec<&str> {
        self.suite(suite)
            .map(|suite| suite.tests.iter().map(|test| test.name.as_str()).collect())
            .unwrap_or_default()
    }

    fn set_listener(&mut self, listener: Box<dyn RunListener>) {
        self.listener = Some(listener);
    }

    fn set_output_path(&mut self, path: &Path) {
        self.output_path = Some(path.to_path_buf());
    }

    fn run_all(&mut self) -> Result<(), EngineError> {
        self.run_plan(Plan::All)
    }

    fn run_suite(&mut self, suite: SuiteId) -> Result<(), EngineError> {
        self.suite(suite)?;
        self.run_plan(Plan::Suite(suite.0))
    }

    fn run_test(&mut self, suite: SuiteId, test: TestId) -> Result<(), EngineError> {
        if test.0 >= self.suite(suite)?.tests.len() {
            return Err(EngineError::UnknownTest(test.0));
        }
        self.run_plan(Plan::Test(suite.0, test.0))
    }

    fn run_automated(&mut self) -> Result<(), EngineError> {
        self.suites()?;
        let path = self.output_path.clone().ok_or(EngineError::NoOutputPath)?;
        let report_error = |source| EngineError::Report {
            path: path.clone(),
            source,
        };

        let mut report = XmlReport::create(&path, &self.run_name).map_err(report_error)?;
        let mut listener = self
            .listener
            .take()
            .unwrap_or_else(|| Box::new(NullListener));
        let result = self.execute(
            Plan::All,
            &mut Tee {
                first: listener.as_mut(),
                second: &mut report,
            },
        );
        self.listener = Some(listener);
        result?;

        report.finish().map_err(report_error)?;
        Ok(())
    }

    fn tests_failed(&self) -> usize {
        self.summary.tests_failed
    }

    fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    fn summary(&self) -> &RunSummary {
        &self.summary
    }
}

/// Accumulates one run's results
#[derive(Default)]
struct RunState {
    failures: Vec<FailureRecord>,
    summary: RunSummary,
}

impl RunState {
    fn suite(&mut self, suite: &BoundSuite, only: Option<usize>, listener: &mut dyn RunListener) {
        let first_failure = self.failures.len();
        self.summary.suites_run += 1;
        listener.suite_started(&suite.name);

        if let Some(init) = &suite.init {
            if let Err(reason) = run_hook(init) {
                self.suite_failure(suite, FailureKind::SuiteInit, &reason);
                listener.suite_init_failed(&suite.name, &reason);
                listener.suite_completed(&suite.name, &self.failures[first_failure..]);
                return;
            }
        }

        let tests = match only {
            Some(index) => &suite.tests[index..=index],
            None => &suite.tests[..],
        };
        for test in tests {
            self.test(&suite.name, test, listener);
        }

        if let Some(cleanup) = &suite.cleanup {
            if let Err(reason) = run_hook(cleanup) {
                self.suite_failure(suite, FailureKind::SuiteCleanup, &reason);
                listener.suite_cleanup_failed(&suite.name, &reason);
            }
        }

        listener.suite_completed(&suite.name, &self.failures[first_failure..]);
    }

    fn suite_failure(&mut self, suite: &BoundSuite, kind: FailureKind, reason: &str) {
        let what = match kind {
            FailureKind::SuiteInit => "Suite initialization failed - suite skipped",
            _ => "Suite cleanup failed",
        };
        self.summary.suites_failed += 1;
        self.failures.push(FailureRecord {
            suite: suite.name.clone(),
            test: None,
            file: String::new(),
            line: 0,
            condition: format!("{what}: {reason}"),
            kind,
        });
    }

    fn test(&mut self, suite: &str, test: &BoundTest, listener: &mut dyn RunListener) {
        listener.test_started(suite, &test.name);
        let started = Instant::now();

        let scope = CaptureScope::begin();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (test.body)()));
        let captured = scope.finish();

        let record = |file: String, line: u32, condition: String, kind: FailureKind| {
            FailureRecord {
                suite: suite.to_string(),
                test: Some(test.name.clone()),
                file,
                line,
                condition,
                kind,
            }
        };
        let mut failures: Vec<FailureRecord> = captured
            .failures
            .into_iter()
            .map(|f| record(f.file, f.line, f.condition, FailureKind::Assertion))
            .collect();
        self.summary.asserts_run += captured.asserts;
        self.summary.asserts_failed += failures.len();

        if let Err(payload) = outcome {
            if !assertion::is_fatal_assertion(payload.as_ref()) {
                let message = assertion::panic_message(payload.as_ref());
                failures.push(record(
                    String::new(),
                    0,
                    format!("test panicked: {message}"),
                    FailureKind::Panic,
                ));
            }
        }

        self.summary.tests_run += 1;
        if failures.is_empty() {
            self.summary.tests_passed += 1;
        } else {
            self.summary.tests_failed += 1;
        }

        listener.test_completed(suite, &test.name, &failures, started.elapsed());
        self.failures.extend(failures);
    }
}

/// Run a suite hook, turning errors and panics into a reason string
fn run_hook(hook: &SuiteHook) -> Result<(), String> {
    match panic::catch_unwind(AssertUnwindSafe(|| hook())) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(format!("{err:#}")),
        Err(payload) => Err(format!("panicked: {}", assertion::panic_message(payload.as_ref()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{check, check_eq, require};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    /// Listener that logs callbacks as short strings
    #[derive(Clone, Default)]
    struct EventLog(Rc<RefCell<Vec<String>>>);

    impl EventLog {
        fn events(&self) -> Vec<String> {
            self.0.borrow().clone()
        }
    }

    impl RunListener for EventLog {
        fn suite_started(&mut self, suite: &str) {
            self.0.borrow_mut().push(format!("suite+ {suite}"));
        }

        fn suite_completed(&mut self, suite: &str, _failures: &[FailureRecord]) {
            self.0.borrow_mut().push(format!("suite- {suite}"));
        }

        fn test_completed(
            &mut self,
            _suite: &str,
            test: &str,
            failures: &[FailureRecord],
            _elapsed: Duration,
        ) {
            self.0
                .borrow_mut()
                .push(format!("test {test} failures={}", failures.len()));
        }

        fn suite_init_failed(&mut self, suite: &str, _reason: &str) {
            self.0.borrow_mut().push(format!("init-failed {suite}"));
        }

        fn suite_cleanup_failed(&mut self, suite: &str, _reason: &str) {
            self.0.borrow_mut().push(format!("cleanup-failed {suite}"));
        }

        fn all_completed(&mut self, summary: &RunSummary, _failures: &[FailureRecord]) {
            self.0
                .borrow_mut()
                .push(format!("done run={} failed={}", summary.tests_run, summary.tests_failed));
        }
    }

    fn body(f: impl Fn() + 'static) -> TestBody {
        Rc::new(f)
    }

    fn hook(f: impl Fn() -> anyhow::Result<()> + 'static) -> Option<SuiteHook> {
        Some(Rc::new(f))
    }

    fn engine_with_core() -> (BasicEngine, SuiteId, EventLog) {
        let mut engine = BasicEngine::new("unit");
        engine.init_registry().unwrap();
        let core = engine.add_suite("Core", None, None).unwrap();
        engine
            .add_test(core, "t1", body(|| {
                check!(true);
            }))
            .unwrap();
        engine
            .add_test(core, "t2", body(|| {
                check_eq!(1 + 1, 3);
                check!(false);
            }))
            .unwrap();
        let log = EventLog::default();
        engine.set_listener(Box::new(log.clone()));
        (engine, core, log)
    }

    #[test]
    fn test_requires_initialized_registry() {
        let mut engine = BasicEngine::default();
        assert!(matches!(
            engine.add_suite("Core", None, None),
            Err(EngineError::NoRegistry)
        ));
        assert!(matches!(engine.run_all(), Err(EngineError::NoRegistry)));

        engine.init_registry().unwrap();
        assert!(matches!(
            engine.init_registry(),
            Err(EngineError::AlreadyInitialized)
        ));

        engine.cleanup_registry();
        engine.cleanup_registry();
        assert!(engine.find_suite("Core").is_none());
    }

    #[test]
    fn test_rejects_duplicates() {
        let mut engine = BasicEngine::default();
        engine.init_registry().unwrap();
        let core = engine.add_suite("Core", None, None).unwrap();
        assert!(matches!(
            engine.add_suite("Core", None, None),
            Err(EngineError::DuplicateSuite(_))
        ));

        engine.add_test(core, "t1", body(|| {})).unwrap();
        let err = engine.add_test(core, "t1", body(|| {})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Test 't1' is already registered in suite 'Core'"
        );
    }

    #[test]
    fn test_run_all_records_failures() {
        let (mut engine, _, log) = engine_with_core();
        engine.run_all().unwrap();

        assert_eq!(engine.tests_failed(), 1);
        let summary = engine.summary();
        assert_eq!(summary.tests_run, 2);
        assert_eq!(summary.tests_passed, 1);
        assert_eq!(summary.asserts_run, 3);
        assert_eq!(summary.asserts_failed, 2);

        let failures = engine.failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].scope(), "Core/t2");
        assert_eq!(failures[0].condition, "1 + 1 == 3 (2 != 3)");
        assert!(failures[0].file.ends_with("basic.rs"));
        assert_eq!(failures[1].condition, "false");

        assert_eq!(
            log.events(),
            vec![
                "suite+ Core",
                "test t1 failures=0",
                "test t2 failures=2",
                "suite- Core",
                "done run=2 failed=1",
            ]
        );
    }

    #[test]
    fn test_run_single_test() {
        let (mut engine, core, _) = engine_with_core();
        let t1 = engine.find_test(core, "t1").unwrap();
        engine.run_test(core, t1).unwrap();

        assert_eq!(engine.tests_failed(), 0);
        assert_eq!(engine.summary().tests_run, 1);
        assert!(engine.failures().is_empty());

        assert!(matches!(
            engine.run_test(core, TestId(9)),
            Err(EngineError::UnknownTest(9))
        ));
    }

    #[test]
    fn test_each_run_starts_clean() {
        let (mut engine, core, _) = engine_with_core();
        engine.run_all().unwrap();
        assert_eq!(engine.tests_failed(), 1);

        let t1 = engine.find_test(core, "t1").unwrap();
        engine.run_test(core, t1).unwrap();
        assert_eq!(engine.tests_failed(), 0);
        assert!(engine.failures().is_empty());
    }

    #[test]
    fn test_require_stops_body_and_panics_are_caught() {
        let reached = Rc::new(RefCell::new(false));
        let flag = reached.clone();

        let mut engine = BasicEngine::default();
        engine.init_registry().unwrap();
        let suite = engine.add_suite("Edge", None, None).unwrap();
        engine
            .add_test(suite, "fatal", body(move || {
                require!(false);
                *flag.borrow_mut() = true;
            }))
            .unwrap();
        engine
            .add_test(suite, "panics", body(|| panic!("boom")))
            .unwrap();
        engine.run_suite(suite).unwrap();

        assert!(!*reached.borrow());
        assert_eq!(engine.tests_failed(), 2);
        let failures = engine.failures();
        assert_eq!(failures[0].kind, FailureKind::Assertion);
        assert_eq!(failures[1].kind, FailureKind::Panic);
        assert_eq!(failures[1].condition, "test panicked: boom");
    }

    #[test]
    fn test_init_failure_skips_tests() {
        let ran = Rc::new(RefCell::new(0));
        let counter = ran.clone();

        let mut engine = BasicEngine::default();
        engine.init_registry().unwrap();
        let suite = engine
            .add_suite("Db", hook(|| anyhow::bail!("no connection")), None)
            .unwrap();
        engine
            .add_test(suite, "query", body(move || *counter.borrow_mut() += 1))
            .unwrap();
        let log = EventLog::default();
        engine.set_listener(Box::new(log.clone()));
        engine.run_all().unwrap();

        assert_eq!(*ran.borrow(), 0);
        assert_eq!(engine.summary().suites_failed, 1);
        assert_eq!(engine.summary().tests_run, 0);
        assert_eq!(engine.failures()[0].kind, FailureKind::SuiteInit);
        assert_eq!(
            engine.failures()[0].condition,
            "Suite initialization failed - suite skipped: no connection"
        );
        assert_eq!(
            log.events(),
            vec!["suite+ Db", "init-failed Db", "suite- Db", "done run=0 failed=0"]
        );
    }

    #[test]
    fn test_cleanup_failure_is_recorded() {
        let mut engine = BasicEngine::default();
        engine.init_registry().unwrap();
        let suite = engine
            .add_suite("Files", None, hook(|| panic!("cleanup exploded")))
            .unwrap();
        engine.add_test(suite, "ok", body(|| {})).unwrap();
        engine.run_all().unwrap();

        assert_eq!(engine.tests_failed(), 0);
        assert_eq!(engine.summary().suites_failed, 1);
        assert_eq!(engine.failures()[0].kind, FailureKind::SuiteCleanup);
        assert_eq!(
            engine.failures()[0].condition,
            "Suite cleanup failed: panicked: cleanup exploded"
        );
    }

    #[test]
    fn test_run_automated_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.xml");

        let (mut engine, _, log) = engine_with_core();
        assert!(matches!(
            engine.run_automated(),
            Err(EngineError::NoOutputPath)
        ));

        engine.set_output_path(&path);
        engine.run_automated().unwrap();

        let xml = std::fs::read_to_string(&path).unwrap();
        assert!(xml.contains(r#"<testsuites name="unit">"#));
        assert!(xml.contains(r#"<testcase name="t1" classname="Core""#));
        assert!(xml.contains(r#"<failure message="false" type="assertion">"#));
        assert!(xml.trim_end().ends_with("</testsuites>"));
        // The installed listener still sees the run.
        assert_eq!(log.events().last().unwrap(), "done run=2 failed=1");
    }

    #[test]
    fn test_run_automated_reports_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, _, _) = engine_with_core();
        engine.set_output_path(&dir.path().join("missing").join("run.xml"));

        assert!(matches!(
            engine.run_automated(),
            Err(EngineError::Report { .. })
        ));
    }

    #[test]
    fn test_names_in_binding_order() {
        let (engine, core, _) = engine_with_core();
        assert_eq!(engine.suite_names(), vec!["Core"]);
        assert_eq!(engine.test_names(core), vec!["t1", "t2"]);
        assert!(engine.test_names(SuiteId(4)).is_empty());
    }
}
