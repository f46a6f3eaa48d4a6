//! Assertion channel between test bodies and the engine
//!
//! Test bodies take no arguments. They report through the `check!` family of
//! macros, which write into a per-thread capture the engine opens around each
//! body. `check!` records and carries on; `require!` records and abandons the
//! rest of the body.

use std::any::Any;
use std::cell::RefCell;
use std::panic;

/// A failed assertion inside a test body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailure {
    pub file: String,
    pub line: u32,
    pub condition: String,
}

/// What a test body reported while it ran
#[derive(Debug, Default)]
pub(crate) struct Captured {
    pub(crate) asserts: usize,
    pub(crate) failures: Vec<AssertionFailure>,
}

thread_local! {
    static CAPTURE: RefCell<Option<Captured>> = const { RefCell::new(None) };
}

/// Unwind payload used by `require!`
struct FatalAssertion;

/// Open capture for the body currently running on this thread
pub(crate) struct CaptureScope {
    _private: (),
}

impl CaptureScope {
    pub(crate) fn begin() -> Self {
        CAPTURE.with(|cell| *cell.borrow_mut() = Some(Captured::default()));
        Self { _private: () }
    }

    pub(crate) fn finish(self) -> Captured {
        CAPTURE
            .with(|cell| cell.borrow_mut().take())
            .unwrap_or_default()
    }
}

impl Drop for CaptureScope {
    fn drop(&mut self) {
        CAPTURE.with(|cell| cell.borrow_mut().take());
    }
}

/// Record the outcome of one assertion; returns `passed`
#[doc(hidden)]
pub fn record(passed: bool, file: &'static str, line: u32, condition: &str) -> bool {
    CAPTURE.with(|cell| match cell.borrow_mut().as_mut() {
        Some(captured) => {
            captured.asserts += 1;
            if !passed {
                captured.failures.push(AssertionFailure {
                    file: file.to_string(),
                    line,
                    condition: condition.to_string(),
                });
            }
        }
        None if !passed => {
            tracing::warn!(file, line, condition, "assertion failed outside of a running test");
        }
        None => {}
    });
    passed
}

/// Abandon the running test body
#[doc(hidden)]
pub fn abort_test() -> ! {
    panic::resume_unwind(Box::new(FatalAssertion))
}

/// Whether an unwind payload came from `require!`
pub(crate) fn is_fatal_assertion(payload: &(dyn Any + Send)) -> bool {
    payload.is::<FatalAssertion>()
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Check a condition; on failure record it and keep running the test
///
/// Evaluates to `true` when the condition held.
#[macro_export]
macro_rules! check {
    ($cond:expr $(,)?) => {
        $crate::assertion::record($cond, file!(), line!(), stringify!($cond))
    };
}

/// Check two values for equality; on failure record both and keep running
#[macro_export]
macro_rules! check_eq {
    ($left:expr, $right:expr $(,)?) => {
        match (&$left, &$right) {
            (left, right) => {
                if *left == *right {
                    $crate::assertion::record(true, file!(), line!(), "")
                } else {
                    $crate::assertion::record(
                        false,
                        file!(),
                        line!(),
                        &format!(
                            "{} == {} ({:?} != {:?})",
                            stringify!($left),
                            stringify!($right),
                            left,
                            right
                        ),
                    )
                }
            }
        }
    };
}

/// Check a condition; on failure record it and stop the test
#[macro_export]
macro_rules! require {
    ($cond:expr $(,)?) => {
        if !$crate::check!($cond) {
            $crate::assertion::abort_test();
        }
    };
}

/// Record an unconditional failure with a formatted message
#[macro_export]
macro_rules! fail {
    ($($arg:tt)+) => {
        $crate::assertion::record(false, file!(), line!(), &format!($($arg)+))
    };
}
