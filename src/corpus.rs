use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Default per-file read cap in bytes.
pub const DEFAULT_BYTE_CAP: usize = 4_000;

/// Separator placed between rendered snippets.
const SNIPPET_SEPARATOR: &str = "\n\n";

/// One file's contribution to the corpus: a path header plus truncated content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    /// Path relative to the sampled root, `/`-separated
    pub relative_path: String,

    /// Up to the byte cap of the file's UTF-8 content
    pub content: String,

    /// Whether the file held more bytes than were read
    pub truncated: bool,
}

impl Snippet {
    /// Creates a new snippet.
    #[must_use]
    pub fn new(relative_path: impl Into<String>, content: impl Into<String>, truncated: bool) -> Self {
        Self {
            relative_path: relative_path.into(),
            content: content.into(),
            truncated,
        }
    }

    /// Size of the sampled content in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.content.len()
    }

    /// Renders the `### path` header and fenced content block.
    #[must_use]
    pub fn render(&self) -> String {
        format!("### {}\n```\n{}\n```", self.relative_path, self.content)
    }
}

/// Ordered snippets sampled from one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    snippets: Vec<Snippet>,
}

impl Corpus {
    /// Wraps already ordered snippets.
    #[must_use]
    pub fn new(snippets: Vec<Snippet>) -> Self {
        Self { snippets }
    }

    /// Returns the snippets in corpus order.
    #[must_use]
    pub fn snippets(&self) -> &[Snippet] {
        &self.snippets
    }

    /// Number of snippets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    /// Returns true if no file was sampled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    /// Total sampled content bytes, headers and fences excluded.
    #[must_use]
    pub fn content_bytes(&self) -> usize {
        self.snippets.iter().map(Snippet::size_bytes).sum()
    }

    /// Joins every rendered snippet with blank-line separators.
    #[must_use]
    pub fn render(&self) -> String {
        self.snippets
            .iter()
            .map(Snippet::render)
            .collect::<Vec<_>>()
            .join(SNIPPET_SEPARATOR)
    }
}

/// Content read from the head of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CappedRead {
    pub content: String,
    pub truncated: bool,
}

/// Reads at most `cap` bytes of `path` and decodes them as UTF-8.
///
/// A multi-byte character split by the cap is dropped from the tail, so the
/// result never exceeds `cap` bytes.
///
/// # Errors
///
/// Returns an IO error if the file cannot be opened or read, and an IO error
/// of kind `InvalidData` if the bytes are not UTF-8 text.
pub(crate) fn read_capped(path: &Path, cap: usize) -> Result<CappedRead> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;

    // One extra byte tells a file of exactly `cap` bytes from a longer one.
    let limit = u64::try_from(cap).unwrap_or(u64::MAX).saturating_add(1);
    let mut buffer = Vec::with_capacity(cap.saturating_add(1).min(64 * 1024));
    file.take(limit)
        .read_to_end(&mut buffer)
        .map_err(|e| Error::io(path, e))?;

    let truncated = buffer.len() > cap;
    buffer.truncate(cap);

    let content = match String::from_utf8(buffer) {
        Ok(text) => text,
        Err(e) => {
            let utf8 = e.utf8_error();
            // Only an incomplete sequence at the cut is tolerated.
            if truncated && utf8.error_len().is_none() {
                let valid = utf8.valid_up_to();
                let mut bytes = e.into_bytes();
                bytes.truncate(valid);
                String::from_utf8(bytes).map_err(|_| invalid_utf8(path))?
            } else {
                return Err(invalid_utf8(path));
            }
        }
    };

    Ok(CappedRead { content, truncated })
}

fn invalid_utf8(path: &Path) -> Error {
    Error::io(
        path,
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "stream did not contain valid UTF-8",
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_snippet_render() {
        let snippet = Snippet::new("src/app.py", "print('hi')", false);
        assert_eq!(snippet.render(), "### src/app.py\n```\nprint('hi')\n```");
    }

    #[test]
    fn test_corpus_render_joins_with_blank_line() {
        let corpus = Corpus::new(vec![
            Snippet::new("a.md", "A", false),
            Snippet::new("b.md", "B", false),
        ]);

        assert_eq!(corpus.render(), "### a.md\n```\nA\n```\n\n### b.md\n```\nB\n```");
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.content_bytes(), 2);
    }

    #[test]
    fn test_empty_corpus() {
        let corpus = Corpus::default();
        assert!(corpus.is_empty());
        assert_eq!(corpus.render(), "");
    }

    #[test]
    fn test_read_small_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("small.txt");
        file.write_str("Hello, world!").unwrap();

        let read = read_capped(file.path(), DEFAULT_BYTE_CAP).unwrap();
        assert_eq!(read.content, "Hello, world!");
        assert!(!read.truncated);
    }

    #[test]
    fn test_read_caps_large_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("large.md");
        file.write_str(&"x".repeat(10_000)).unwrap();

        let read = read_capped(file.path(), DEFAULT_BYTE_CAP).unwrap();
        assert_eq!(read.content.len(), DEFAULT_BYTE_CAP);
        assert!(read.truncated);
    }

    #[test]
    fn test_read_exactly_cap_is_not_truncated() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("exact.txt");
        file.write_str(&"y".repeat(16)).unwrap();

        let read = read_capped(file.path(), 16).unwrap();
        assert_eq!(read.content.len(), 16);
        assert!(!read.truncated);
    }

    #[test]
    fn test_read_drops_split_character() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("utf8.txt");
        // "é" is two bytes; a cap of 4 cuts the third one in half.
        file.write_str("aéé").unwrap();

        let read = read_capped(file.path(), 4).unwrap();
        assert_eq!(read.content, "aé");
        assert!(read.truncated);
        assert!(read.content.len() <= 4);
    }

    #[test]
    fn test_read_rejects_invalid_utf8() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("latin1.txt");
        file.write_binary(&[0x48, 0x69, 0xff, 0xfe, 0x21]).unwrap();

        let err = read_capped(file.path(), DEFAULT_BYTE_CAP).unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_capped(Path::new("/nonexistent/readme-gen/file.md"), 10).unwrap_err();
        assert!(err.is_io());
    }
}
