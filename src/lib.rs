//! # readme-gen
//!
//! Generates a README for a public git repository with a single call to a
//! generative model.
//!
//! ## Features
//!
//! - Shallow clone into a temporary workspace that never outlives the request
//! - Extension allow-list with per-file byte cap and UTF-8 safe truncation
//! - Tera prompt template, replaceable at runtime
//! - Any OpenAI-compatible `chat/completions` endpoint
//! - Atomic README writes with automatic backups
//!
//! ## Quick Start
//!
//! ```no_run
//! use readme_gen::{Config, GitCli, OpenAiCompatibleClient, Session, Synthesizer};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::builder()
//!     .repo_url("https://github.com/user/repo")
//!     .api_key(std::env::var("KIMI_API_KEY")?)
//!     .build()?;
//!
//! let mut session = Session::new();
//! let synthesizer = Synthesizer::new(OpenAiCompatibleClient::new());
//! let generation = session.generate(config, &GitCli::new(), &synthesizer)?;
//! println!("{}", generation.markdown);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! One request flows through three stages:
//! 1. **Clone**: shallow `git clone` into a temporary directory
//! 2. **Sample**: walk the snapshot and collect allow-listed file prefixes
//! 3. **Synthesize**: render the prompt and ask the model for the README
//!
//! [`Session`] tracks the request as a state machine and holds the result.

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod clone;
mod config;
mod corpus;
mod error;
mod filter;
mod pipeline;
mod prompt;
mod sampler;
mod session;
mod synth;
mod template_validator;
mod token;
mod writer;

pub mod preview;

pub use clone::{GitCli, RepoCloner};
pub use config::{
    Config, ConfigBuilder, ModelConfig, DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
};
pub use corpus::{Corpus, Snippet, DEFAULT_BYTE_CAP};
pub use error::{Error, FailureKind, Result};
pub use filter::{AllowList, FileFilterConfig};
pub use pipeline::{Generation, Pipeline, PipelineStats, PreparedPrompt, Step};
pub use prompt::{Prompt, PromptBuilder};
pub use sampler::{Sample, SampleStats, Sampler};
pub use session::{Failure, Session, Stage, StageKind};
pub use synth::{ModelClient, OpenAiCompatibleClient, Synthesizer};
pub use token::{Budget, TokenizerKind};
pub use writer::{Writer, README_FILE_NAME};

/// Generates a README with the `git` CLI and an OpenAI-compatible endpoint.
///
/// # Errors
///
/// Returns an error if:
/// - The URL or API key is missing
/// - The repository cannot be cloned
/// - No readable, allow-listed files are found
/// - The model call fails
///
/// # Examples
///
/// ```no_run
/// use readme_gen::{Config, run};
///
/// # fn main() -> anyhow::Result<()> {
/// let config = Config::builder()
///     .repo_url("https://github.com/user/repo")
///     .api_key("sk-...")
///     .build()?;
///
/// let generation = run(config)?;
/// print!("{}", generation.markdown);
/// # Ok(())
/// # }
/// ```
pub fn run(config: Config) -> Result<Generation> {
    let synthesizer = Synthesizer::new(OpenAiCompatibleClient::new());
    let (generation, _) = Pipeline::new(config)?.run(&GitCli::new(), &synthesizer, |_| {})?;
    Ok(generation)
}
