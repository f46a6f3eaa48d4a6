//! XML result staging
//!
//! The engine writes to `<final>.tmp`. Only a run that reaches the end gets
//! the file renamed into place, so a crashed or killed run leaves just the
//! temp file and no results that look complete.

use crate::engine::Engine;
use crate::error::{HarnessError, HarnessResult};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

const TEMP_SUFFIX: &str = ".tmp";

/// Temp-then-rename bookkeeping for one XML run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlStaging {
    final_path: PathBuf,
    temp_path: PathBuf,
}

impl XmlStaging {
    /// Stage results for `final_path`; the temp path is `<final_path>.tmp`
    pub fn new(final_path: impl Into<PathBuf>) -> Self {
        let final_path = final_path.into();
        let mut temp: OsString = final_path.as_os_str().to_owned();
        temp.push(TEMP_SUFFIX);
        Self {
            final_path,
            temp_path: PathBuf::from(temp),
        }
    }

    /// Where results end up after a completed run
    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Where the engine writes while the run is in progress
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Point the engine's XML output at the temp path
    pub fn begin<E: Engine + ?Sized>(&self, engine: &mut E) {
        tracing::debug!(temp = %self.temp_path.display(), "staging XML results");
        engine.set_output_path(&self.temp_path);
    }

    /// Move the finished temp file to the final path
    pub fn commit(self) -> HarnessResult<PathBuf> {
        fs::rename(&self.temp_path, &self.final_path).map_err(|source| {
            HarnessError::Staging {
                path: self.final_path.clone(),
                source,
            }
        })?;
        tracing::debug!(path = %self.final_path.display(), "XML results committed");
        Ok(self.final_path)
    }
}
