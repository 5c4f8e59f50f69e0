use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error types for the readme-gen library.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// Request is missing a required input; raised before any I/O.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// What is missing or malformed
        message: String,
    },

    /// The remote repository could not be cloned.
    #[error("Unable to clone repository '{url}': {message}")]
    Clone {
        /// Repository URL that was requested
        url: String,
        /// Diagnostic text from the version-control client
        message: String,
    },

    /// Repository was fetched but yielded no usable files.
    #[error("The repository at '{path}' appears to be empty or contains no readable files")]
    EmptyCorpus {
        /// Directory that was sampled
        path: PathBuf,
    },

    /// The model call did not succeed.
    #[error("Something went wrong while processing the repository: {message}")]
    Synthesis {
        /// Diagnostic text carried by the failure
        message: String,
    },

    /// IO error with context about the file path.
    #[error("IO error accessing '{path}': {message}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Template rendering error.
    #[error("Failed to render template '{template}': {message}")]
    Template {
        /// Template name
        template: String,
        /// Error message
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Detailed error message
        message: String,
    },

    /// JSON serialization error.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message
        message: String,
    },
}

/// Terminal failure classes of a generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Missing URL or credential
    InvalidRequest,
    /// Repository could not be fetched
    Clone,
    /// Repository fetched but nothing was sampled
    EmptyCorpus,
    /// Sampling or prompt construction failed for another reason
    Sampling,
    /// The model call failed
    Synthesis,
}

impl FailureKind {
    /// Returns the message shown to the user for this failure class.
    #[must_use]
    pub const fn user_message(self) -> &'static str {
        match self {
            Self::InvalidRequest => "Please provide a repository URL and an API key.",
            Self::Clone => "Unable to clone repository. Please check the URL and try again.",
            Self::EmptyCorpus => {
                "The repository appears to be empty or contains no readable files."
            }
            Self::Sampling | Self::Synthesis => {
                "Something went wrong while processing the repository."
            }
        }
    }
}

impl Error {
    /// Creates an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a clone error.
    #[must_use]
    pub fn clone_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Clone {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates an empty corpus error.
    #[must_use]
    pub fn empty_corpus(path: impl Into<PathBuf>) -> Self {
        Self::EmptyCorpus { path: path.into() }
    }

    /// Creates a synthesis error.
    #[must_use]
    pub fn synthesis(message: impl Into<String>) -> Self {
        Self::Synthesis {
            message: message.into(),
        }
    }

    /// Creates an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a template error.
    #[must_use]
    pub fn template(template: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Template {
            template: template.into(),
            message: message.into(),
        }
    }

    /// Maps this error onto the request failure taxonomy.
    #[must_use]
    pub const fn failure_kind(&self) -> FailureKind {
        match self {
            Self::InvalidRequest { .. } | Self::Config { .. } => FailureKind::InvalidRequest,
            Self::Clone { .. } => FailureKind::Clone,
            Self::EmptyCorpus { .. } => FailureKind::EmptyCorpus,
            Self::Synthesis { .. } | Self::Serialization { .. } => FailureKind::Synthesis,
            Self::Io { .. } | Self::Template { .. } => FailureKind::Sampling,
        }
    }

    /// Returns the diagnostic text carried by the failure, without the
    /// user-facing prefix.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        match self {
            Self::InvalidRequest { message }
            | Self::Clone { message, .. }
            | Self::Synthesis { message }
            | Self::Config { message }
            | Self::Serialization { message } => message.clone(),
            Self::EmptyCorpus { path } => path.display().to_string(),
            Self::Io { path, message } => format!("{}: {message}", path.display()),
            Self::Template { template, message } => format!("{template}: {message}"),
        }
    }

    /// Returns true if this is an IO error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Returns true if the sampled repository yielded nothing.
    #[must_use]
    pub const fn is_empty_corpus(&self) -> bool {
        matches!(self, Self::EmptyCorpus { .. })
    }
}

impl From<tera::Error> for Error {
    fn from(e: tera::Error) -> Self {
        Self::Template {
            template: "unknown".to_string(),
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
        }
    }
}
