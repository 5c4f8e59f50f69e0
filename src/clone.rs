//! Fetching the repository snapshot.

use crate::error::{Error, Result};
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Fetches a remote repository into a local directory.
///
/// Abstracting the clone lets the pipeline run against fixture trees in
/// tests without network access.
pub trait RepoCloner {
    /// Clones `url` into the existing, empty directory `dest`, fetching only
    /// the latest `depth` commits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Clone`] if the repository cannot be fetched.
    fn clone_repo(&self, url: &str, dest: &Path, depth: u32) -> Result<()>;
}

/// Clones by shelling out to the `git` CLI.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
}

impl GitCli {
    /// Uses `git` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: "git".to_string(),
        }
    }

    /// Uses a specific git executable.
    #[must_use]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl RepoCloner for GitCli {
    fn clone_repo(&self, url: &str, dest: &Path, depth: u32) -> Result<()> {
        debug!("Running {} clone --depth {} {}", self.program, depth, url);

        let output = Command::new(&self.program)
            .arg("clone")
            .arg("--depth")
            .arg(depth.to_string())
            .arg("--quiet")
            .arg("--")
            .arg(url)
            .arg(dest)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .map_err(|e| Error::clone_failed(url, format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::clone_failed(
                url,
                format!("git clone exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    #[test]
    fn test_missing_program_is_clone_failure() {
        let temp = assert_fs::TempDir::new().unwrap();
        let git = GitCli::with_program("/nonexistent/bin/git-readme-gen");

        let err = git
            .clone_repo("https://example.invalid/repo.git", temp.path(), 1)
            .unwrap_err();

        assert_eq!(err.failure_kind(), FailureKind::Clone);
        assert!(err.diagnostic().contains("failed to run"));
    }

    #[test]
    fn test_clone_of_missing_local_path_fails() {
        // A plain path sidesteps the network; git still needs to be installed.
        if Command::new("git").arg("--version").output().is_err() {
            return;
        }

        let temp = assert_fs::TempDir::new().unwrap();
        let dest = temp.path().join("dest");
        let err = GitCli::new()
            .clone_repo("/nonexistent/readme-gen/source", &dest, 1)
            .unwrap_err();

        assert!(matches!(err, Error::Clone { .. }));
    }
}
