//! File selection for repository sampling.
//!
//! Two independent checks decide whether a walked file becomes a snippet:
//! the extension [`AllowList`] and the directory exclusion globs held by
//! [`FileFilter`].

use crate::error::{Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use std::path::Path;

/// Data, config and documentation formats.
const NARROW_EXTENSIONS: &[&str] = &["md", "txt", "yml", "yaml", "json", "toml", "cfg", "ini"];

/// Common programming-language sources, sampled on top of the narrow set.
const SOURCE_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "jsx", "tsx", "rs", "go", "java", "kt", "c", "cpp", "h", "hpp", "cs", "rb",
    "php", "swift", "scala", "sh", "bash", "html", "css", "scss", "sql", "lua",
];

/// Set of file extensions eligible for sampling.
///
/// Extensions are stored lowercase without the leading dot; matching is
/// case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    extensions: BTreeSet<String>,
}

impl AllowList {
    /// Data, config and documentation formats only.
    #[must_use]
    pub fn narrow() -> Self {
        Self::from_extensions(NARROW_EXTENSIONS.iter().copied())
    }

    /// The narrow set plus common source-code extensions.
    #[must_use]
    pub fn broad() -> Self {
        Self::from_extensions(NARROW_EXTENSIONS.iter().chain(SOURCE_EXTENSIONS).copied())
    }

    /// Builds a list from arbitrary extensions such as `"rs"`, `".MD"`.
    ///
    /// Empty entries are ignored.
    pub fn from_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();

        Self { extensions }
    }

    /// Returns true if the path's extension is on the list.
    #[must_use]
    pub fn allows(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext.to_ascii_lowercase()))
    }

    /// Number of extensions on the list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Returns true if nothing can ever match.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Iterates the extensions in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self::broad()
    }
}

/// Configuration for directory exclusion with glob patterns.
#[derive(Debug, Clone, Default)]
pub struct FileFilterConfig {
    exclude_directories: Vec<String>,
}

impl FileFilterConfig {
    /// Creates an empty configuration that excludes nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the directory glob patterns whose subtrees are skipped.
    #[must_use]
    pub fn exclude_directories(mut self, patterns: Vec<String>) -> Self {
        self.exclude_directories = patterns;
        self
    }

    /// Returns the configured directory patterns.
    #[must_use]
    pub fn excluded_directories(&self) -> &[String] {
        &self.exclude_directories
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FileFilter {
    exclude_directories: GlobSet,
}

impl FileFilter {
    /// Compiles the configured patterns.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid glob.
    pub(crate) fn new(config: &FileFilterConfig) -> Result<Self> {
        Ok(Self {
            exclude_directories: Self::build_globset(&config.exclude_directories)?,
        })
    }

    fn build_globset(patterns: &[String]) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();

        for pattern in patterns {
            let glob = Glob::new(pattern)
                .map_err(|e| Error::config(format!("Invalid glob pattern '{pattern}': {e}")))?;
            builder.add(glob);
        }

        builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build glob set: {e}")))
    }

    /// Returns true if a directory (relative to the sampled root) is excluded.
    pub(crate) fn is_excluded_dir(&self, relative: &Path) -> bool {
        self.exclude_directories.is_match(relative)
    }
}
