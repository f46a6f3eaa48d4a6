//! Command-line flags and the run options they resolve to
//!
//! [`HarnessArgs`] is a `clap::Args` struct so a test program with flags of
//! its own can `#[command(flatten)]` it into its parser. Programs without
//! extra flags go through [`parse`].

use crate::error::{HarnessError, HarnessResult};
use clap::builder::FalseyValueParser;
use clap::{Args, CommandFactory, FromArgMatches, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

/// Suffix appended to an XML prefix to form the results file name
pub const RESULTS_SUFFIX: &str = "-Results.xml";

/// Harness flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct HarnessArgs {
    /// Run only the named suite
    #[arg(long, value_name = "SUITE")]
    pub suite: Option<String>,

    /// Run only the named test (requires --suite)
    #[arg(long, value_name = "TEST", requires = "suite")]
    pub test: Option<String>,

    /// List registered suites and exit
    #[arg(long)]
    pub list_suites: bool,

    /// List the tests of a suite and exit
    #[arg(long, value_name = "SUITE")]
    pub list_tests: Option<String>,

    /// Write XML results to <PREFIX>-Results.xml
    #[arg(long, value_name = "PREFIX", conflicts_with_all = ["suite", "test"])]
    pub xml_file: Option<PathBuf>,

    /// Write XML results using the program name as prefix
    #[arg(long, conflicts_with_all = ["suite", "test"])]
    pub xml: bool,

    /// Redirect output and traces to a file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Directory test bodies read fixtures from
    #[arg(long, value_name = "DIR")]
    pub resource_dir: Option<PathBuf>,

    /// Directory test bodies may write into
    #[arg(long, value_name = "DIR")]
    pub writable_dir: Option<PathBuf>,

    /// Pick what to run from a text menu
    #[arg(long, conflicts_with_all = ["xml", "xml_file"])]
    pub interactive: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR", value_parser = FalseyValueParser::new())]
    pub no_color: bool,
}

#[derive(Debug, Parser)]
#[command(version, about = "Run registered test suites")]
struct Cli {
    #[command(flatten)]
    harness: HarnessArgs,
}

/// Which registered tests a run executes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    All,
    Suite(String),
    Test { suite: String, test: String },
}

impl Selection {
    pub fn suite(&self) -> Option<&str> {
        match self {
            Selection::All => None,
            Selection::Suite(suite) | Selection::Test { suite, .. } => Some(suite),
        }
    }
}

/// Result format
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputMode {
    #[default]
    Text,
    Xml { prefix: PathBuf },
}

impl OutputMode {
    pub fn is_xml(&self) -> bool {
        matches!(self, OutputMode::Xml { .. })
    }

    /// `<prefix>-Results.xml` in XML mode
    pub fn results_path(&self) -> Option<PathBuf> {
        match self {
            OutputMode::Text => None,
            OutputMode::Xml { prefix } => {
                let mut name = prefix.as_os_str().to_owned();
                name.push(RESULTS_SUFFIX);
                Some(PathBuf::from(name))
            }
        }
    }
}

/// Everything a run needs to know, set once before it starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub selection: Selection,
    pub output: OutputMode,
    pub interactive: bool,
    pub log_file: Option<PathBuf>,
    pub color: bool,
    /// Overrides the harness resource directory for this run
    pub resource_dir: Option<PathBuf>,
    /// Overrides the harness writable directory for this run
    pub writable_dir: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            selection: Selection::All,
            output: OutputMode::Text,
            interactive: false,
            log_file: None,
            color: true,
            resource_dir: None,
            writable_dir: None,
        }
    }
}

impl RunOptions {
    /// Reject combinations that cannot run
    pub fn validate(&self) -> HarnessResult<()> {
        if self.output.is_xml() && self.selection != Selection::All {
            return Err(HarnessError::Config(
                "Cannot use both XML and specific test suite".to_string(),
            ));
        }
        if self.output.is_xml() && self.interactive {
            return Err(HarnessError::Config(
                "Cannot use both XML and interactive mode".to_string(),
            ));
        }
        Ok(())
    }
}

/// What the command line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Run(RunOptions),
    ListSuites { color: bool },
    ListTests { suite: String, color: bool },
}

impl HarnessArgs {
    /// Resolve flags into an invocation; `program` is the default XML prefix
    pub fn into_invocation(self, program: &str) -> HarnessResult<Invocation> {
        let color = !self.no_color;
        if self.list_suites {
            return Ok(Invocation::ListSuites { color });
        }
        if let Some(suite) = self.list_tests {
            return Ok(Invocation::ListTests { suite, color });
        }

        let selection = match (self.suite, self.test) {
            (None, None) => Selection::All,
            (Some(suite), None) => Selection::Suite(suite),
            (Some(suite), Some(test)) => Selection::Test { suite, test },
            (None, Some(test)) => {
                return Err(HarnessError::Config(format!(
                    "--test {test} requires --suite"
                )))
            }
        };
        let output = match (self.xml_file, self.xml) {
            (Some(prefix), _) => OutputMode::Xml { prefix },
            (None, true) => OutputMode::Xml {
                prefix: PathBuf::from(program),
            },
            (None, false) => OutputMode::Text,
        };

        let options = RunOptions {
            selection,
            output,
            interactive: self.interactive,
            log_file: self.log_file,
            color,
            resource_dir: self.resource_dir,
            writable_dir: self.writable_dir,
        };
        options.validate()?;
        Ok(Invocation::Run(options))
    }
}

/// Parse a full argument list (program name first)
///
/// `extra_help` is appended to `--help` output, for programs documenting
/// their own environment or options.
pub fn parse<I, T>(program: &str, extra_help: Option<&str>, args: I) -> Result<HarnessArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut command = Cli::command().bin_name(program.to_string());
    if let Some(help) = extra_help {
        command = command.after_help(help.to_string());
    }
    let matches = command.try_get_matches_from(args)?;
    Ok(Cli::from_arg_matches(&matches)?.harness)
}
