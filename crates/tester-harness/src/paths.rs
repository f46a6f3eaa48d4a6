//! Resource and writable directories for test bodies
//!
//! Test bodies take no arguments, so the directories a run was configured
//! with are published per thread for the duration of [`Harness::run`]. Both
//! default to the current directory.
//!
//! [`Harness::run`]: crate::Harness::run

use std::cell::RefCell;
use std::path::{Path, PathBuf};

thread_local! {
    static CURRENT: RefCell<TestDirs> = RefCell::new(TestDirs::default());
}

/// Where test bodies read fixtures from and write scratch files to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDirs {
    pub resource: PathBuf,
    pub writable: PathBuf,
}

impl Default for TestDirs {
    fn default() -> Self {
        Self {
            resource: PathBuf::from("."),
            writable: PathBuf::from("."),
        }
    }
}

/// Directory fixtures are read from
pub fn resource_dir() -> PathBuf {
    CURRENT.with(|dirs| dirs.borrow().resource.clone())
}

/// Directory tests may write into
pub fn writable_dir() -> PathBuf {
    CURRENT.with(|dirs| dirs.borrow().writable.clone())
}

/// `name` under the resource directory
pub fn resource_path(name: impl AsRef<Path>) -> PathBuf {
    CURRENT.with(|dirs| dirs.borrow().resource.join(name))
}

/// `name` under the writable directory
pub fn writable_path(name: impl AsRef<Path>) -> PathBuf {
    CURRENT.with(|dirs| dirs.borrow().writable.join(name))
}

/// Publishes `dirs` to this thread until dropped
pub(crate) struct DirsScope {
    previous: TestDirs,
}

impl DirsScope {
    pub(crate) fn enter(dirs: TestDirs) -> Self {
        tracing::debug!(
            resource = %dirs.resource.display(),
            writable = %dirs.writable.display(),
            "test directories set"
        );
        Self {
            previous: CURRENT.with(|current| current.replace(dirs)),
        }
    }
}

impl Drop for DirsScope {
    fn drop(&mut self) {
        let previous = std::mem::take(&mut self.previous);
        CURRENT.with(|current| *current.borrow_mut() = previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_current_directory() {
        assert_eq!(resource_dir(), PathBuf::from("."));
        assert_eq!(writable_path("out.txt"), PathBuf::from("./out.txt"));
    }

    #[test]
    fn test_scope_sets_and_restores() {
        {
            let _scope = DirsScope::enter(TestDirs {
                resource: PathBuf::from("fixtures"),
                writable: PathBuf::from("scratch"),
            });
            assert_eq!(resource_path("data.txt"), PathBuf::from("fixtures/data.txt"));
            assert_eq!(writable_dir(), PathBuf::from("scratch"));

            {
                let _inner = DirsScope::enter(TestDirs {
                    resource: PathBuf::from("inner"),
                    ..TestDirs::default()
                });
                assert_eq!(resource_dir(), PathBuf::from("inner"));
                assert_eq!(writable_dir(), PathBuf::from("."));
            }
            assert_eq!(resource_dir(), PathBuf::from("fixtures"));
        }
        assert_eq!(resource_dir(), PathBuf::from("."));
    }
}
