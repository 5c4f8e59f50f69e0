use crate::corpus::DEFAULT_BYTE_CAP;
use crate::error::{Error, Result};
use crate::filter::{AllowList, FileFilterConfig};
use crate::token::TokenizerKind;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "moonshotai/kimi-k2";
/// Default OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
/// Default ceiling on generated tokens.
pub const DEFAULT_MAX_TOKENS: u32 = 4_000;

const DEFAULT_CONTEXT_WINDOW: usize = 128_000;
const DEFAULT_CLONE_DEPTH: u32 = 1;

/// Everything the model call needs, passed explicitly at call time.
#[derive(Clone, PartialEq, Eq)]
pub struct ModelConfig {
    /// Model identifier understood by the endpoint
    pub model: String,

    /// Bearer credential
    pub api_key: String,

    /// Endpoint root, e.g. `https://openrouter.ai/api/v1`
    pub base_url: String,

    /// Output token ceiling
    pub max_tokens: u32,

    /// Ask the model to answer in markdown
    pub markdown: bool,

    /// Overall timeout for the single request; `None` waits as long as the
    /// transport does
    pub timeout: Option<Duration>,
}

impl ModelConfig {
    /// Creates a configuration with default model, endpoint and limits.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Returns the chat-completions URL for this endpoint.
    #[must_use]
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn validate(&self, require_key: bool) -> Result<()> {
        if require_key && self.api_key.trim().is_empty() {
            return Err(Error::invalid_request("an API key is required"));
        }

        if self.model.trim().is_empty() {
            return Err(Error::config("model identifier must not be empty"));
        }

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Error::config(format!(
                "base URL must start with http:// or https://: {}",
                self.base_url
            )));
        }

        if self.max_tokens == 0 {
            return Err(Error::config("max_tokens must be greater than 0"));
        }

        Ok(())
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            markdown: true,
            timeout: None,
        }
    }
}

// Keeps the credential out of logs.
impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("markdown", &self.markdown)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Configuration for one README generation request.
///
/// Use [`Config::builder()`] to construct a new configuration.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Repository to clone
    pub repo_url: String,

    /// History depth passed to the clone
    pub clone_depth: u32,

    /// Extensions eligible for sampling
    pub allow_list: AllowList,

    /// Per-file read cap in bytes
    pub byte_cap: usize,

    /// Directory exclusion globs
    pub file_filter_config: FileFilterConfig,

    /// Path to an instruction template replacing the built-in one
    pub template_path: Option<PathBuf>,

    /// Model call configuration
    pub model: ModelConfig,

    /// Heuristic used for the prompt token estimate
    pub tokenizer: TokenizerKind,

    /// Context window used for the size warning
    pub context_window: usize,

    /// Sample and build the prompt without calling the model
    pub dry_run: bool,
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use readme_gen::{AllowList, Config};
    ///
    /// let config = Config::builder()
    ///     .repo_url("https://github.com/user/repo")
    ///     .api_key("sk-test")
    ///     .allow_list(AllowList::narrow())
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the URL or credential is missing,
    /// and a configuration error for bad limits, globs or templates.
    pub fn validate(&self) -> Result<()> {
        if self.repo_url.trim().is_empty() {
            return Err(Error::invalid_request("a repository URL is required"));
        }

        self.model.validate(!self.dry_run)?;

        if self.clone_depth == 0 {
            return Err(Error::config("clone_depth must be greater than 0"));
        }

        if self.byte_cap == 0 {
            return Err(Error::config("byte_cap must be greater than 0"));
        }

        if self.allow_list.is_empty() {
            return Err(Error::config("allow list must contain at least one extension"));
        }

        if self.context_window == 0 {
            return Err(Error::config("context_window must be greater than 0"));
        }

        crate::filter::FileFilter::new(&self.file_filter_config)?;

        if let Some(ref template_path) = self.template_path {
            crate::template_validator::TemplateValidator::validate_template(template_path)?;
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repo_url: String::new(),
            clone_depth: DEFAULT_CLONE_DEPTH,
            allow_list: AllowList::default(),
            byte_cap: DEFAULT_BYTE_CAP,
            file_filter_config: FileFilterConfig::default(),
            template_path: None,
            model: ModelConfig::default(),
            tokenizer: TokenizerKind::Simple,
            context_window: DEFAULT_CONTEXT_WINDOW,
            dry_run: false,
        }
    }
}

/// Builder for creating a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    repo_url: Option<String>,
    clone_depth: Option<u32>,
    allow_list: Option<AllowList>,
    byte_cap: Option<usize>,
    file_filter_config: Option<FileFilterConfig>,
    template_path: Option<PathBuf>,
    model: Option<ModelConfig>,
    api_key: Option<String>,
    tokenizer: Option<TokenizerKind>,
    context_window: Option<usize>,
    dry_run: bool,
}

impl ConfigBuilder {
    /// Sets the repository URL to clone.
    #[must_use]
    pub fn repo_url(mut self, url: impl Into<String>) -> Self {
        self.repo_url = Some(url.into());
        self
    }

    /// Sets the clone depth.
    #[must_use]
    pub fn clone_depth(mut self, depth: u32) -> Self {
        self.clone_depth = Some(depth);
        self
    }

    /// Sets the extension allow-list.
    #[must_use]
    pub fn allow_list(mut self, allow_list: AllowList) -> Self {
        self.allow_list = Some(allow_list);
        self
    }

    /// Sets the per-file byte cap.
    #[must_use]
    pub fn byte_cap(mut self, cap: usize) -> Self {
        self.byte_cap = Some(cap);
        self
    }

    /// Sets the directory exclusion configuration.
    #[must_use]
    pub fn file_filter_config(mut self, config: FileFilterConfig) -> Self {
        self.file_filter_config = Some(config);
        self
    }

    /// Sets the path to an external prompt template.
    ///
    /// The template must compile with Tera and reference `corpus`.
    #[must_use]
    pub fn template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_path = Some(path.into());
        self
    }

    /// Sets the full model configuration.
    #[must_use]
    pub fn model(mut self, model: ModelConfig) -> Self {
        self.model = Some(model);
        self
    }

    /// Sets only the credential, keeping the other model settings.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the token estimation heuristic.
    #[must_use]
    pub fn tokenizer(mut self, kind: TokenizerKind) -> Self {
        self.tokenizer = Some(kind);
        self
    }

    /// Sets the context window used for the size warning.
    #[must_use]
    pub fn context_window(mut self, tokens: usize) -> Self {
        self.context_window = Some(tokens);
        self
    }

    /// Enables dry run mode (no model call).
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<Config> {
        let mut model = self.model.unwrap_or_default();
        if let Some(key) = self.api_key {
            model.api_key = key;
        }

        let config = Config {
            repo_url: self.repo_url.unwrap_or_default().trim().to_string(),
            clone_depth: self.clone_depth.unwrap_or(DEFAULT_CLONE_DEPTH),
            allow_list: self.allow_list.unwrap_or_default(),
            byte_cap: self.byte_cap.unwrap_or(DEFAULT_BYTE_CAP),
            file_filter_config: self.file_filter_config.unwrap_or_default(),
            template_path: self.template_path,
            model,
            tokenizer: self.tokenizer.unwrap_or_default(),
            context_window: self.context_window.unwrap_or(DEFAULT_CONTEXT_WINDOW),
            dry_run: self.dry_run,
        };

        config.validate()?;
        Ok(config)
    }
}
