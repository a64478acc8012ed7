//! Recursive directory listing through an external program.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Default program used for recursive listings.
pub const DEFAULT_LS_PROGRAM: &str = "/bin/ls";

/// Captured output of a listing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Produces a recursive listing of a directory.
pub trait RecursiveLister: Send + Sync + 'static {
    /// Lists `path` recursively.
    ///
    /// Returns `Ok(None)` when `path` is not a directory.
    fn run(&self, path: &Path) -> io::Result<Option<ListingOutput>>;
}

/// Runs `ls --recursive <path>` and captures both output streams.
#[derive(Debug, Clone)]
pub struct LsCommand {
    program: PathBuf,
}

impl LsCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for LsCommand {
    fn default() -> Self {
        Self::new(DEFAULT_LS_PROGRAM)
    }
}

impl RecursiveLister for LsCommand {
    fn run(&self, path: &Path) -> io::Result<Option<ListingOutput>> {
        if !path.is_dir() {
            return Ok(None);
        }

        tracing::debug!(
            "Running {} --recursive {}",
            self.program.display(),
            path.display()
        );
        let output = Command::new(&self.program)
            .arg("--recursive")
            .arg(path)
            .stdin(Stdio::null())
            .output()?;

        Ok(Some(ListingOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }))
    }
}
