//! Console mode - pick what to run from a line-oriented menu

use crate::engine::Engine;
use crate::error::HarnessResult;
use crate::reporter::print_failure_list;
use crate::sink::{PrintSink, Severity};
use std::io::BufRead;

const MENU: &str = "Commands:
  r          run all suites
  s <suite>  run one suite
  l          list suites
  f          show failures of the last run
  q          quit";

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    RunAll,
    RunSuite(&'a str),
    List,
    Failures,
    Quit,
    Empty,
    Unknown(&'a str),
}

fn parse_command(line: &str) -> Command<'_> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match (head, rest) {
        ("", _) => Command::Empty,
        ("r", "") => Command::RunAll,
        ("s", suite) if !suite.is_empty() => Command::RunSuite(suite),
        ("l", "") => Command::List,
        ("f", "") => Command::Failures,
        ("q", "") => Command::Quit,
        _ => Command::Unknown(line),
    }
}

/// Read commands from `input` until `q` or end of input
///
/// Runs go through the engine's installed listener, so progress is reported
/// the same way as a non-interactive run.
pub fn run_console<E: Engine + ?Sized>(
    engine: &mut E,
    sink: &dyn PrintSink,
    input: &mut dyn BufRead,
) -> HarnessResult<()> {
    sink.print(Severity::Message, MENU);

    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            tracing::debug!("console input closed");
            return Ok(());
        }

        match parse_command(&line) {
            Command::RunAll => engine.run_all()?,
            Command::RunSuite(name) => match engine.find_suite(name) {
                Some(suite) => engine.run_suite(suite)?,
                None => sink.print(
                    Severity::Warning,
                    &format!("Could not find suite '{name}'."),
                ),
            },
            Command::List => {
                for name in engine.suite_names() {
                    sink.print(Severity::Message, name);
                }
            }
            Command::Failures => {
                if engine.failures().is_empty() {
                    sink.print(Severity::Message, "No failures.");
                } else {
                    print_failure_list(sink, engine.failures());
                }
            }
            Command::Quit => return Ok(()),
            Command::Empty => {}
            Command::Unknown(text) => {
                sink.print(Severity::Warning, &format!("Unknown command '{text}'"));
                sink.print(Severity::Message, MENU);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::BasicEngine;
    use crate::sink::MemorySink;
    use crate::{check, check_eq};
    use rstest::rstest;
    use std::io::Cursor;
    use std::rc::Rc;

    #[rstest]
    #[case("r\n", Command::RunAll)]
    #[case("  s Core \n", Command::RunSuite("Core"))]
    #[case("s My Suite", Command::RunSuite("My Suite"))]
    #[case("l", Command::List)]
    #[case("f", Command::Failures)]
    #[case("q\n", Command::Quit)]
    #[case("\n", Command::Empty)]
    #[case("s", Command::Unknown("s"))]
    #[case("run", Command::Unknown("run"))]
    #[case("r now", Command::Unknown("r now"))]
    fn test_parse_command(#[case] line: &str, #[case] expected: Command<'_>) {
        assert_eq!(parse_command(line), expected);
    }

    fn engine() -> BasicEngine {
        let mut engine = BasicEngine::new("console");
        engine.init_registry().unwrap();
        let core = engine.add_suite("Core", None, None).unwrap();
        engine
            .add_test(core, "t1", Rc::new(|| {
                check!(true);
            }))
            .unwrap();
        engine
            .add_test(core, "t2", Rc::new(|| {
                check_eq!(1 + 1, 3);
            }))
            .unwrap();
        let other = engine.add_suite("Other", None, None).unwrap();
        engine
            .add_test(other, "ok", Rc::new(|| {
                check!(true);
            }))
            .unwrap();
        engine
    }

    fn console(script: &str) -> (BasicEngine, MemorySink) {
        let mut engine = engine();
        let sink = MemorySink::new();
        let mut input = Cursor::new(script.as_bytes().to_vec());
        run_console(&mut engine, &sink, &mut input).unwrap();
        (engine, sink)
    }

    #[test]
    fn test_eof_quits() {
        let (engine, sink) = console("");
        assert_eq!(engine.summary().tests_run, 0);
        assert_eq!(sink.messages(), vec![MENU]);
    }

    #[test]
    fn test_run_all_then_failures() {
        let (engine, sink) = console("r\nf\nq\nr\n");

        assert_eq!(engine.summary().tests_run, 3);
        assert_eq!(engine.tests_failed(), 1);
        assert!(sink.text().contains("\nFailures:"));
        assert!(sink.text().contains("Core/t2"));
    }

    #[test]
    fn test_run_single_suite() {
        let (engine, _) = console("s Other\n");
        assert_eq!(engine.summary().tests_run, 1);
        assert_eq!(engine.tests_failed(), 0);
    }

    #[test]
    fn test_list_and_unknown_suite() {
        let (engine, sink) = console("l\ns Nope\nf\n");

        assert_eq!(engine.summary().tests_run, 0);
        let messages = sink.messages();
        assert!(messages.contains(&"Core".to_string()));
        assert!(messages.contains(&"Other".to_string()));
        assert!(messages.contains(&"Could not find suite 'Nope'.".to_string()));
        assert!(messages.contains(&"No failures.".to_string()));
    }

    #[test]
    fn test_unknown_command_reprints_menu() {
        let (_, sink) = console("x\n");
        assert_eq!(
            sink.messages(),
            vec![MENU.to_string(), "Unknown command 'x'".to_string(), MENU.to_string()]
        );
    }
}
