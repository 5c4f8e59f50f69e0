use crate::{
    config::Config,
    corpus::{read_capped, Corpus, Snippet},
    error::{Error, Result},
    filter::{AllowList, FileFilter},
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};
use walkdir::{DirEntry, WalkDir};

/// Statistics collected during sampling.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SampleStats {
    /// Regular files visited by the walk
    pub visited_files: usize,

    /// Files whose extension is on the allow-list
    pub matched_files: usize,

    /// Snippets produced
    pub sampled_files: usize,

    /// Matched files dropped because they could not be read or decoded
    pub unreadable_files: usize,

    /// Snippets cut at the byte cap
    pub truncated_files: usize,

    /// Total sampled content bytes
    pub corpus_bytes: usize,
}

/// Result of sampling one directory tree.
#[derive(Debug, Clone)]
pub struct Sample {
    /// The ordered, non-empty corpus
    pub corpus: Corpus,

    /// Counters describing the walk
    pub stats: SampleStats,
}

/// Walks a repository snapshot and turns allow-listed files into snippets.
#[derive(Debug, Clone)]
pub struct Sampler {
    allow_list: AllowList,
    byte_cap: usize,
    file_filter: FileFilter,
}

impl Sampler {
    /// Creates a new sampler from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an exclusion glob is invalid.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            allow_list: config.allow_list.clone(),
            byte_cap: config.byte_cap,
            file_filter: FileFilter::new(&config.file_filter_config)?,
        })
    }

    /// Samples every allow-listed file under `root`.
    ///
    /// Snippets are ordered by relative path. Files that fail to read or
    /// decode are skipped without surfacing an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyCorpus`] if no file produced a snippet, or an IO
    /// error if `root` itself is not a readable directory.
    pub fn sample(&self, root: &Path) -> Result<Sample> {
        if !root.is_dir() {
            return Err(Error::io(
                root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            ));
        }

        debug!("Sampling {}", root.display());

        // Symlinked files are only read if they resolve inside the snapshot.
        let canonical_root = root.canonicalize().map_err(|e| Error::io(root, e))?;

        let mut stats = SampleStats::default();
        let mut snippets = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_excluded(entry, root));

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Walk error: {}", e);
                    continue;
                }
            };

            if !is_file(&entry) {
                continue;
            }
            stats.visited_files += 1;

            let path = entry.path();
            if !self.allow_list.allows(path) {
                trace!("Skipping (extension not allowed): {}", path.display());
                continue;
            }
            stats.matched_files += 1;

            let relative_path = relative_path(path, root);
            if !stays_within(&entry, &canonical_root) {
                debug!("Skipping symlink leaving the repository: {}", relative_path);
                stats.unreadable_files += 1;
                continue;
            }

            match read_capped(path, self.byte_cap) {
                Ok(read) => {
                    trace!("Sampled {} ({} bytes)", relative_path, read.content.len());
                    if read.truncated {
                        stats.truncated_files += 1;
                    }
                    stats.corpus_bytes += read.content.len();
                    snippets.push(Snippet::new(relative_path, read.content, read.truncated));
                }
                Err(e) => {
                    debug!("Skipping unreadable file {}: {}", relative_path, e);
                    stats.unreadable_files += 1;
                }
            }
        }

        if snippets.is_empty() {
            return Err(Error::empty_corpus(root));
        }

        // Sort for deterministic ordering
        snippets.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        stats.sampled_files = snippets.len();

        debug!(
            "Sample complete: {} visited, {} matched, {} sampled, {} unreadable, {} truncated",
            stats.visited_files,
            stats.matched_files,
            stats.sampled_files,
            stats.unreadable_files,
            stats.truncated_files
        );

        Ok(Sample {
            corpus: Corpus::new(snippets),
            stats,
        })
    }

    fn is_excluded(&self, entry: &DirEntry, root: &Path) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let excluded = self.file_filter.is_excluded_dir(relative);
        if excluded {
            debug!("Skipping excluded directory: {}", relative.display());
        }
        excluded
    }
}

/// Regular files, plus symlinks that resolve to one.
fn is_file(entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    file_type.is_file() || (file_type.is_symlink() && entry.path().is_file())
}

/// False for a symlink whose target is outside `canonical_root` or missing.
fn stays_within(entry: &DirEntry, canonical_root: &Path) -> bool {
    if !entry.file_type().is_symlink() {
        return true;
    }

    entry
        .path()
        .canonicalize()
        .is_ok_and(|target| target.starts_with(canonical_root))
}

/// Root-relative path with `/` separators on every platform.
fn relative_path(path: &Path, root: &Path) -> String {
    let relative: PathBuf =
        pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf());

    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FileFilterConfig;
    use assert_fs::prelude::*;

    fn sampler() -> Sampler {
        Sampler {
            allow_list: AllowList::broad(),
            byte_cap: crate::corpus::DEFAULT_BYTE_CAP,
            file_filter: FileFilter::new(&FileFilterConfig::default()).unwrap(),
        }
    }

    fn paths(sample: &Sample) -> Vec<&str> {
        sample
            .corpus
            .snippets()
            .iter()
            .map(|s| s.relative_path.as_str())
            .collect()
    }

    #[test]
    fn test_sampler_readme_app_and_binary() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("README.md").write_str(&"r".repeat(200)).unwrap();
        temp.child("app.py").write_str("print(1)\n\n").unwrap();
        temp.child("node_modules/x.bin")
            .write_binary(&[0u8, 159, 146, 150, 0, 1])
            .unwrap();

        let sample = sampler().sample(temp.path()).unwrap();

        assert_eq!(sample.corpus.len(), 2);
        assert_eq!(paths(&sample), vec!["README.md", "app.py"]);
        assert_eq!(sample.stats.visited_files, 3);
        assert_eq!(sample.stats.matched_files, 2);
        assert!(!sample.corpus.render().contains("x.bin"));
    }

    #[test]
    fn test_sampler_one_snippet_per_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("src/main.rs").write_str("fn main() {}").unwrap();
        temp.child("src/lib.rs").write_str("pub fn test() {}").unwrap();
        temp.child("docs/guide/intro.md").write_str("# Intro").unwrap();
        temp.child("Cargo.toml").write_str("[package]").unwrap();

        let sample = sampler().sample(temp.path()).unwrap();

        assert_eq!(
            paths(&sample),
            vec!["Cargo.toml", "docs/guide/intro.md", "src/lib.rs", "src/main.rs"]
        );
        assert_eq!(sample.stats.sampled_files, 4);
    }

    #[test]
    fn test_sampler_caps_large_files() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("big.txt").write_str(&"z".repeat(50_000)).unwrap();

        let sample = sampler().sample(temp.path()).unwrap();
        let snippet = &sample.corpus.snippets()[0];

        assert!(snippet.content.len() <= crate::corpus::DEFAULT_BYTE_CAP);
        assert!(snippet.truncated);
        assert_eq!(sample.stats.truncated_files, 1);
    }

    #[test]
    fn test_sampler_skips_unreadable_but_keeps_others() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("bad.md").write_binary(&[0xc3, 0x28, 0xff]).unwrap();
        temp.child("good.md").write_str("# Good").unwrap();

        let sample = sampler().sample(temp.path()).unwrap();

        assert_eq!(paths(&sample), vec!["good.md"]);
        assert_eq!(sample.stats.unreadable_files, 1);
    }

    #[test]
    fn test_sampler_empty_directory() {
        let temp = assert_fs::TempDir::new().unwrap();

        let err = sampler().sample(temp.path()).unwrap_err();
        assert!(err.is_empty_corpus());
    }

    #[test]
    fn test_sampler_only_non_qualifying_files() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("image.png").write_binary(&[137, 80, 78, 71]).unwrap();
        temp.child("Makefile").write_str("all:").unwrap();
        temp.child("broken.json").write_binary(&[0xff, 0xfe]).unwrap();

        let err = sampler().sample(temp.path()).unwrap_err();
        assert!(err.is_empty_corpus());
    }

    #[test]
    fn test_sampler_narrow_list() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("app.py").write_str("print(1)").unwrap();
        temp.child("setup.cfg").write_str("[metadata]").unwrap();

        let mut sampler = sampler();
        sampler.allow_list = AllowList::narrow();
        let sample = sampler.sample(temp.path()).unwrap();

        assert_eq!(paths(&sample), vec!["setup.cfg"]);
    }

    #[test]
    fn test_sampler_excluded_directories() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(".git/description").write_str("repo").unwrap();
        temp.child(".git/info/exclude.txt").write_str("x").unwrap();
        temp.child("README.md").write_str("# Hi").unwrap();

        let mut sampler = sampler();
        sampler.file_filter = FileFilter::new(
            &FileFilterConfig::new().exclude_directories(vec![".git".to_string()]),
        )
        .unwrap();
        let sample = sampler.sample(temp.path()).unwrap();

        assert_eq!(paths(&sample), vec!["README.md"]);
        assert_eq!(sample.stats.visited_files, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_sampler_ignores_symlinks_leaving_the_repository() {
        let outside = assert_fs::TempDir::new().unwrap();
        let secret = outside.child("credentials.txt");
        secret.write_str("AWS_SECRET=hunter2").unwrap();

        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("README.md").write_str("# Repo").unwrap();
        std::os::unix::fs::symlink(secret.path(), temp.path().join("notes.txt")).unwrap();

        let sample = sampler().sample(temp.path()).unwrap();

        assert_eq!(paths(&sample), vec!["README.md"]);
        assert!(!sample.corpus.render().contains("hunter2"));
        assert_eq!(sample.stats.unreadable_files, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_sampler_follows_symlinks_inside_the_repository() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("docs/guide.md").write_str("# Guide").unwrap();
        std::os::unix::fs::symlink("docs/guide.md", temp.path().join("GUIDE.md")).unwrap();

        let sample = sampler().sample(temp.path()).unwrap();

        assert_eq!(paths(&sample), vec!["GUIDE.md", "docs/guide.md"]);
        assert_eq!(sample.stats.unreadable_files, 0);
    }

    #[test]
    fn test_sampler_missing_root() {
        let err = sampler()
            .sample(Path::new("/nonexistent/readme-gen/root"))
            .unwrap_err();
        assert!(err.is_io());
    }
}
