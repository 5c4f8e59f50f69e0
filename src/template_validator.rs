use crate::error::{Error, Result};
use std::fs;
use std::path::Path;
use tera::Tera;

/// Maximum template file size (1MB)
const MAX_TEMPLATE_SIZE: u64 = 1024 * 1024;

/// Variables a prompt template has to use
const REQUIRED_VARIABLES: &[&str] = &["corpus"];

/// Variables a prompt template may use
const OPTIONAL_VARIABLES: &[&str] = &["repo_url", "file_count"];

/// Validates external prompt templates
pub(crate) struct TemplateValidator;

impl TemplateValidator {
    /// Validates an external template file
    ///
    /// Performs the following checks:
    /// 1. File exists and is a regular file
    /// 2. File size is within limits
    /// 3. Template syntax is valid (can be compiled by Tera)
    /// 4. Template uses the corpus
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file is missing or unreadable, and a
    /// template error for every other failed check.
    pub(crate) fn validate_template(path: &Path) -> Result<()> {
        let name = path.to_string_lossy().to_string();

        let metadata = fs::metadata(path).map_err(|e| Error::io(path, e))?;
        if !metadata.is_file() {
            return Err(Error::template(name, "Path is not a file"));
        }

        if metadata.len() > MAX_TEMPLATE_SIZE {
            return Err(Error::template(
                name,
                format!(
                    "Template file too large: {} bytes (max: {} bytes)",
                    metadata.len(),
                    MAX_TEMPLATE_SIZE
                ),
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        if content.trim().is_empty() {
            return Err(Error::template(name, "Template file is empty"));
        }

        Tera::default()
            .add_raw_template("validation", &content)
            .map_err(|e| Error::template(&name, format!("Template syntax error: {e}")))?;

        Self::check_required_variables(&content, &name)?;
        Self::check_optional_variables(&content);

        Ok(())
    }

    /// Heuristic presence check: the variable name must appear inside a
    /// `{{ ... }}` or `{% ... %}` tag.
    fn check_required_variables(content: &str, name: &str) -> Result<()> {
        let missing: Vec<&str> = REQUIRED_VARIABLES
            .iter()
            .filter(|var| !uses_variable(content, var))
            .copied()
            .collect();

        if !missing.is_empty() {
            return Err(Error::template(
                name,
                format!(
                    "Template is missing required variables: {}. \
                    Prompt templates must include the sampled files via {{{{ corpus }}}}.",
                    missing.join(", ")
                ),
            ));
        }

        Ok(())
    }

    fn check_optional_variables(content: &str) {
        for var in OPTIONAL_VARIABLES {
            if !uses_variable(content, var) {
                tracing::debug!("Template does not use optional variable: {}", var);
            }
        }
    }
}

fn uses_variable(content: &str, var: &str) -> bool {
    content
        .split("{{")
        .skip(1)
        .chain(content.split("{%").skip(1))
        .filter_map(|rest| rest.split(['}', '%']).next())
        .any(|tag| {
            tag.split(|c: char| !(c.is_alphanumeric() || c == '_'))
                .any(|word| word == var)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_validate_valid_template() {
        let temp = assert_fs::TempDir::new().unwrap();
        let template_file = temp.child("prompt.tera");
        template_file
            .write_str("Files from {{ repo_url }}:\n{{ corpus }}\nWrite a README.")
            .unwrap();

        assert!(TemplateValidator::validate_template(template_file.path()).is_ok());
    }

    #[test]
    fn test_validate_nonexistent_file() {
        let result = TemplateValidator::validate_template(Path::new("/nonexistent/template.tera"));
        assert!(result.unwrap_err().is_io());
    }

    #[test]
    fn test_validate_directory() {
        let temp = assert_fs::TempDir::new().unwrap();
        let err = TemplateValidator::validate_template(temp.path()).unwrap_err();
        assert!(err.to_string().contains("not a file"));
    }

    #[test]
    fn test_validate_empty_template() {
        let temp = assert_fs::TempDir::new().unwrap();
        let template_file = temp.child("empty.tera");
        template_file.write_str("   \n  \n  ").unwrap();

        let err = TemplateValidator::validate_template(template_file.path()).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_validate_syntax_error() {
        let temp = assert_fs::TempDir::new().unwrap();
        let template_file = temp.child("invalid.tera");
        template_file
            .write_str("{{ corpus }}{% if condition %}\nUnclosed if")
            .unwrap();

        let err = TemplateValidator::validate_template(template_file.path()).unwrap_err();
        assert!(err.to_string().contains("Template syntax error"));
    }

    #[test]
    fn test_validate_missing_corpus() {
        let temp = assert_fs::TempDir::new().unwrap();
        let template_file = temp.child("incomplete.tera");
        template_file
            .write_str("Write a README for {{ repo_url }}. The corpus is not included.")
            .unwrap();

        let err = TemplateValidator::validate_template(template_file.path()).unwrap_err();
        assert!(err.to_string().contains("missing required variables"));
    }

    #[test]
    fn test_validate_file_too_large() {
        let temp = assert_fs::TempDir::new().unwrap();
        let template_file = temp.child("large.tera");
        let large_content = format!("{{{{ corpus }}}}{}", "x".repeat(MAX_TEMPLATE_SIZE as usize));
        template_file.write_str(&large_content).unwrap();

        let err = TemplateValidator::validate_template(template_file.path()).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_uses_variable() {
        assert!(uses_variable("{{ corpus }}", "corpus"));
        assert!(uses_variable("{{corpus|trim}}", "corpus"));
        assert!(uses_variable("{% if corpus %}x{% endif %}", "corpus"));
        assert!(!uses_variable("corpus outside tags", "corpus"));
        assert!(!uses_variable("{{ corpus_size }}", "corpus"));
    }
}
