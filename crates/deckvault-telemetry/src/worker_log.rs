//! Per-run worker log file handle.
//!
//! Each bootstrap run gets a self-contained log: the controller truncates
//! the file before starting the new worker, so the log never spans runs.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

const DEFAULT_FILE_NAME: &str = "deckvault-worker.log";

/// Handle to the append-only worker activity log.
#[derive(Debug, Clone)]
pub struct WorkerLog {
    path: PathBuf,
}

impl WorkerLog {
    /// Use an explicit log file location.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location under the system temporary directory.
    #[must_use]
    pub fn default_location() -> Self {
        Self::at(std::env::temp_dir().join(DEFAULT_FILE_NAME))
    }

    /// Location of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file if absent and discard any content from earlier runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or truncated.
    pub fn truncate(&self) -> Result<()> {
        File::create(&self.path)
            .with_context(|| format!("failed to truncate worker log at {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn truncate_discards_previous_run_content() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let log = WorkerLog::at(dir.path().join("worker.log"));

        fs::write(log.path(), "stale lines from the previous run\n")?;
        log.truncate()?;

        assert_eq!(fs::read_to_string(log.path())?, "");
        Ok(())
    }

    #[test]
    fn truncate_creates_missing_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let log = WorkerLog::at(dir.path().join("fresh.log"));

        log.truncate()?;
        assert!(log.path().exists());
        Ok(())
    }
}
