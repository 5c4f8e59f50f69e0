use crate::error::{Error, Result};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::SystemTime,
};
use tracing::{debug, info};

/// File name of the generated document.
pub const README_FILE_NAME: &str = "README.md";

/// Writes the generated README to disk.
#[derive(Debug, Clone)]
pub struct Writer {
    path: PathBuf,
    backup_existing: bool,
}

impl Writer {
    /// Creates a writer targeting `path`.
    ///
    /// If `path` is an existing directory, `README.md` inside it is used.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let path = if path.is_dir() {
            path.join(README_FILE_NAME)
        } else {
            path
        };

        Self {
            path,
            backup_existing: true,
        }
    }

    /// Enables or disables the timestamped backup of an existing file.
    #[must_use]
    pub const fn backup_existing(mut self, enabled: bool) -> Self {
        self.backup_existing = enabled;
        self
    }

    /// Target path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `markdown` to the target path.
    ///
    /// # Process
    ///
    /// 1. Creates backup if file exists and backup is enabled
    /// 2. Writes content to temporary file
    /// 3. Syncs temporary file to disk
    /// 4. Atomically renames temporary file to target path
    ///
    /// # Errors
    ///
    /// Returns an IO error if any step fails.
    pub fn write(&self, markdown: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        if self.path.exists() && self.backup_existing {
            self.backup_file()?;
        }

        let temp_path = self.path.with_extension("md.tmp");
        let mut temp_file = fs::File::create(&temp_path).map_err(|e| Error::io(&temp_path, e))?;

        temp_file
            .write_all(markdown.as_bytes())
            .map_err(|e| Error::io(&temp_path, e))?;

        // Ensure data is flushed to disk
        temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;

        drop(temp_file);

        fs::rename(&temp_path, &self.path).map_err(|e| Error::io(&self.path, e))?;

        info!("Wrote {} bytes to {}", markdown.len(), self.path.display());
        Ok(())
    }

    /// Creates a timestamped backup of the existing file.
    fn backup_file(&self) -> Result<()> {
        let timestamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_err(|e| Error::config(format!("system clock before UNIX epoch: {e}")))?
            .as_nanos();

        let filename = self
            .path
            .file_name()
            .ok_or_else(|| Error::config("Invalid file path"))?
            .to_string_lossy();

        let backup_path = self.path.with_file_name(format!("{filename}.backup.{timestamp}"));

        fs::copy(&self.path, &backup_path).map_err(|e| Error::io(&backup_path, e))?;

        debug!("Created backup: {}", backup_path.display());
        Ok(())
    }
}
