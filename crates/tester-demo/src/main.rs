//! Demo test program built on tester-harness
//!
//! Registers a handful of suites, one with a failing test, and hands the
//! command line to the harness.

use std::cell::RefCell;
use std::process::ExitCode;
use std::rc::Rc;
use tester_harness::{check, check_eq, exit_code, fail, require, Harness, RegistryError, Suite};

/// Adds a suite whose only test aborts the process mid-run
const CRASH_ENV: &str = "TESTER_DEMO_CRASH";

const EXTRA_HELP: &str = "ENVIRONMENT VARIABLES:
    TESTER_DEMO_CRASH  Set to register a 'Crash' suite that aborts the process
    TESTER_LOG         Trace filter directive (falls back to RUST_LOG)
    NO_COLOR           Set to disable colored output";

fn core_suite() -> Suite {
    Suite::new("Core")
        .test("t1", || {
            check!(true);
        })
        .test("t2", || {
            check_eq!(1 + 1, 3);
        })
}

fn strings_suite() -> Suite {
    let words: Rc<RefCell<Vec<String>>> = Rc::default();

    let init_words = words.clone();
    let cleanup_words = words.clone();
    let upper_words = words.clone();
    let join_words = words;

    Suite::new("Strings")
        .with_init(move || {
            init_words
                .borrow_mut()
                .extend(["alpha", "beta"].map(String::from));
            Ok(())
        })
        .with_cleanup(move || {
            let mut words = cleanup_words.borrow_mut();
            if words.is_empty() {
                anyhow::bail!("fixture was never populated");
            }
            words.clear();
            Ok(())
        })
        .test("upper", move || {
            let words = upper_words.borrow();
            require!(!words.is_empty());
            check_eq!(words[0].to_uppercase(), "ALPHA");
        })
        .test("join", move || {
            let joined = join_words.borrow().join("-");
            if joined != "alpha-beta" {
                fail!("unexpected join result '{joined}'");
            }
        })
}

fn crash_suite() -> Suite {
    Suite::new("Crash").test("abort", || {
        check!(true);
        std::process::abort();
    })
}

fn register_all(harness: &mut Harness) -> Result<(), RegistryError> {
    harness.register(core_suite())?;
    harness.register(strings_suite())?;
    if std::env::var_os(CRASH_ENV).is_some() {
        harness.register(crash_suite())?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let mut harness = Harness::new("tester-demo").with_extra_help(EXTRA_HELP);
    if let Err(err) = register_all(&mut harness) {
        eprintln!("{err}");
        return ExitCode::from(exit_code::REGISTRATION);
    }
    harness.main()
}
