//! Suite registry - the ordered set of suites a harness can run
//!
//! Suites are built by the program embedding the harness and registered once
//! at startup. Registration order is execution order, for suites and for the
//! tests inside each suite.

use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// A test body: takes nothing, signals failures through the assertion macros
pub type TestBody = Rc<dyn Fn()>;

/// A suite setup or teardown hook
pub type SuiteHook = Rc<dyn Fn() -> anyhow::Result<()>>;

/// Storage grows by this many slots at a time
const GROWTH_CHUNK: usize = 10;

/// Registration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Suite '{0}' is already registered")]
    DuplicateSuite(String),

    #[error("Suite '{suite}' declares test '{test}' more than once")]
    DuplicateTest { suite: String, test: String },
}

/// A named test inside a suite
#[derive(Clone)]
pub struct Test {
    name: String,
    body: TestBody,
}

impl Test {
    /// Create a test from a name and a body
    pub fn new(name: impl Into<String>, body: impl Fn() + 'static) -> Self {
        Self {
            name: name.into(),
            body: Rc::new(body),
        }
    }

    /// Test name, unique within its suite
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Callable run by the engine
    pub fn body(&self) -> &TestBody {
        &self.body
    }
}

impl fmt::Debug for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Test").field("name", &self.name).finish()
    }
}

/// A named, ordered group of tests with optional setup and teardown
///
/// ```
/// use tester_harness::{check, Suite};
///
/// let suite = Suite::new("Core")
///     .with_init(|| Ok(()))
///     .test("adds", || {
///         check!(1 + 1 == 2);
///     });
/// assert_eq!(suite.len(), 1);
/// ```
#[derive(Clone)]
pub struct Suite {
    name: String,
    init: Option<SuiteHook>,
    cleanup: Option<SuiteHook>,
    tests: Vec<Test>,
}

impl Suite {
    /// Create an empty suite with no hooks
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            init: None,
            cleanup: None,
            tests: Vec::new(),
        }
    }

    /// Run `init` before the suite's tests; an error skips the whole suite
    pub fn with_init(mut self, init: impl Fn() -> anyhow::Result<()> + 'static) -> Self {
        self.init = Some(Rc::new(init));
        self
    }

    /// Run `cleanup` after the suite's tests
    pub fn with_cleanup(mut self, cleanup: impl Fn() -> anyhow::Result<()> + 'static) -> Self {
        self.cleanup = Some(Rc::new(cleanup));
        self
    }

    /// Append a test
    pub fn test(mut self, name: impl Into<String>, body: impl Fn() + 'static) -> Self {
        self.tests.push(Test::new(name, body));
        self
    }

    /// Suite name, unique within the registry
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Setup hook, if any
    pub fn init(&self) -> Option<&SuiteHook> {
        self.init.as_ref()
    }

    /// Teardown hook, if any
    pub fn cleanup(&self) -> Option<&SuiteHook> {
        self.cleanup.as_ref()
    }

    /// Tests in execution order
    pub fn tests(&self) -> &[Test] {
        &self.tests
    }

    /// Number of tests
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    /// Check if the suite has no tests
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// First test name that appears twice, if any
    fn duplicate_test(&self) -> Option<&str> {
        self.tests.iter().enumerate().find_map(|(i, test)| {
            self.tests[..i]
                .iter()
                .any(|earlier| earlier.name == test.name)
                .then_some(test.name.as_str())
        })
    }
}

impl fmt::Debug for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suite")
            .field("name", &self.name)
            .field("init", &self.init.is_some())
            .field("cleanup", &self.cleanup.is_some())
            .field("tests", &self.tests)
            .finish()
    }
}

/// Append-only, insertion-ordered list of suites
#[derive(Debug, Default)]
pub struct Registry {
    suites: Vec<Rc<Suite>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a suite
    ///
    /// Rejects a suite whose name is already registered and a suite that
    /// declares the same test name twice.
    pub fn register(&mut self, suite: impl Into<Rc<Suite>>) -> Result<(), RegistryError> {
        let suite = suite.into();

        if self.find_suite_index(suite.name()).is_some() {
            return Err(RegistryError::DuplicateSuite(suite.name().to_string()));
        }
        if let Some(test) = suite.duplicate_test() {
            return Err(RegistryError::DuplicateTest {
                suite: suite.name().to_string(),
                test: test.to_string(),
            });
        }

        if self.suites.len() == self.suites.capacity() {
            self.suites.reserve_exact(GROWTH_CHUNK);
        }
        tracing::debug!(suite = suite.name(), tests = suite.len(), "registered suite");
        self.suites.push(suite);
        Ok(())
    }

    /// Number of registered suites
    pub fn suite_count(&self) -> usize {
        self.suites.len()
    }

    /// Check if no suite is registered
    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }

    /// Name of the suite at `index`, in registration order
    pub fn suite_name_at(&self, index: usize) -> Option<&str> {
        self.suite_at(index).map(Suite::name)
    }

    /// Suite at `index`, in registration order
    pub fn suite_at(&self, index: usize) -> Option<&Suite> {
        self.suites.get(index).map(|suite| suite.as_ref())
    }

    /// Suites in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Suite> {
        self.suites.iter().map(|suite| suite.as_ref())
    }

    /// Drop every suite and release the backing storage
    pub fn reset(&mut self) {
        self.suites = Vec::new();
    }

    #[cfg(test)]
    fn capacity(&self) -> usize {
        self.suites.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_register_preserves_order() {
        let mut registry = Registry::new();
        registry.register(Suite::new("alpha")).unwrap();
        registry.register(Suite::new("beta")).unwrap();
        registry.register(Suite::new("gamma")).unwrap();

        assert_eq!(registry.suite_count(), 3);
        assert_eq!(registry.suite_name_at(0), Some("alpha"));
        assert_eq!(registry.suite_name_at(1), Some("beta"));
        assert_eq!(registry.suite_name_at(2), Some("gamma"));
        assert_eq!(registry.suite_name_at(3), None);
    }

    #[test]
    fn test_register_rejects_duplicate_suite() {
        let mut registry = Registry::new();
        registry.register(Suite::new("Core")).unwrap();

        let err = registry.register(Suite::new("Core")).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateSuite("Core".to_string()));
        assert_eq!(registry.suite_count(), 1);
    }

    #[test]
    fn test_register_rejects_duplicate_test() {
        let mut registry = Registry::new();
        let suite = Suite::new("Core")
            .test("t1", || {})
            .test("t2", || {})
            .test("t1", || {});

        let err = registry.register(suite).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateTest {
                suite: "Core".to_string(),
                test: "t1".to_string(),
            }
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_names_differing_only_in_case_are_distinct() {
        let mut registry = Registry::new();
        registry.register(Suite::new("core")).unwrap();
        registry.register(Suite::new("Core")).unwrap();
        assert_eq!(registry.suite_count(), 2);
    }

    #[test]
    fn test_reset_empties_and_is_idempotent() {
        let mut registry = Registry::new();
        registry.reset();
        assert!(registry.is_empty());

        registry.register(Suite::new("one")).unwrap();
        registry.reset();
        assert_eq!(registry.suite_count(), 0);
        assert_eq!(registry.capacity(), 0);
        assert_eq!(registry.suite_name_at(0), None);

        registry.reset();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_storage_grows_in_chunks() {
        let mut registry = Registry::new();
        registry.register(Suite::new("s0")).unwrap();
        assert_eq!(registry.capacity(), GROWTH_CHUNK);

        for i in 1..GROWTH_CHUNK {
            registry.register(Suite::new(format!("s{i}"))).unwrap();
        }
        assert_eq!(registry.capacity(), GROWTH_CHUNK);

        registry.register(Suite::new("overflow")).unwrap();
        assert_eq!(registry.capacity(), 2 * GROWTH_CHUNK);
    }

    #[test]
    fn test_suite_builder_keeps_hooks_and_order() {
        let suite = Suite::new("Core")
            .with_init(|| Ok(()))
            .test("a", || {})
            .test("b", || {});

        assert!(suite.init().is_some());
        assert!(suite.cleanup().is_none());
        let names: Vec<_> = suite.tests().iter().map(Test::name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    proptest! {
        #[test]
        fn prop_listing_matches_registration(names in proptest::collection::hash_set("[a-zA-Z0-9_]{1,12}", 0..40)) {
            let names: Vec<String> = names.into_iter().collect();
            let mut registry = Registry::new();
            for name in &names {
                registry.register(Suite::new(name.clone())).unwrap();
            }

            prop_assert_eq!(registry.suite_count(), names.len());
            for (i, name) in names.iter().enumerate() {
                prop_assert_eq!(registry.suite_name_at(i), Some(name.as_str()));
            }
        }
    }
}
