//! Name lookup over the registry
//!
//! Plain linear scans in registration order. Names match exactly: same bytes,
//! same length, same case.

use crate::registry::{Registry, Suite, Test};

impl Registry {
    /// Index of the first suite named exactly `name`
    pub fn find_suite_index(&self, name: &str) -> Option<usize> {
        self.iter().position(|suite| suite.name() == name)
    }

    /// The first suite named exactly `name`
    pub fn find_suite(&self, name: &str) -> Option<&Suite> {
        self.find_suite_index(name)
            .and_then(|index| self.suite_at(index))
    }

    /// Name of the test at `test_index` in the suite named `suite_name`
    pub fn find_test_name(&self, suite_name: &str, test_index: usize) -> Option<&str> {
        self.find_suite(suite_name)?
            .tests()
            .get(test_index)
            .map(Test::name)
    }

    /// Number of tests in the named suite, 0 when the suite is unknown
    pub fn count_tests(&self, suite_name: &str) -> usize {
        self.find_suite(suite_name).map_or(0, Suite::len)
    }

    /// All suite names in registration order
    pub fn list_suite_names(&self) -> Vec<&str> {
        self.iter().map(Suite::name).collect()
    }

    /// Test names of the named suite in registration order
    pub fn list_test_names(&self, suite_name: &str) -> Vec<&str> {
        self.find_suite(suite_name)
            .map(|suite| suite.tests().iter().map(Test::name).collect())
            .unwrap_or_default()
    }
}
