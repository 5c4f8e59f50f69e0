use crate::{
    clone::RepoCloner,
    config::Config,
    error::{Error, Result},
    prompt::{Prompt, PromptBuilder},
    sampler::{SampleStats, Sampler},
    synth::{ModelClient, Synthesizer},
    token::Budget,
};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, info, instrument, warn};

const WORKSPACE_PREFIX: &str = "readme-gen-";

/// Stage a request is currently executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Step {
    /// Fetching the repository
    Cloning,
    /// Walking the snapshot
    Sampling,
    /// Waiting for the model
    Synthesizing,
}

/// The generated README and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Generation {
    /// Markdown returned by the model, verbatim
    pub markdown: String,

    /// Repository the README describes
    pub repo_url: String,

    /// Model that wrote it
    pub model: String,

    /// Local time of completion
    pub generated_at: String,
}

/// Statistics collected during pipeline execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    /// Sampling counters
    pub sample: SampleStats,

    /// Estimated tokens of the rendered prompt
    pub prompt_tokens: usize,

    /// Time spent cloning
    pub clone_secs: f64,

    /// Time spent sampling and rendering the prompt
    pub sample_secs: f64,

    /// Time spent waiting for the model
    pub synthesis_secs: f64,

    /// Total execution time
    pub total_secs: f64,
}

impl PipelineStats {
    /// Prints a human-readable summary to stderr.
    pub fn print_summary(&self) {
        eprintln!("\n╔═══════════════════════════════════════════════════════╗");
        eprintln!("║            README Generation Summary                  ║");
        eprintln!("╠═══════════════════════════════════════════════════════╣");
        eprintln!(
            "║ Files Visited:        {:>8}                        ║",
            self.sample.visited_files
        );
        eprintln!(
            "║   - Allow-listed:     {:>8}                        ║",
            self.sample.matched_files
        );
        eprintln!(
            "║   - Sampled:          {:>8}                        ║",
            self.sample.sampled_files
        );
        eprintln!(
            "║   - Unreadable:       {:>8}                        ║",
            self.sample.unreadable_files
        );
        eprintln!(
            "║   - Truncated:        {:>8}                        ║",
            self.sample.truncated_files
        );
        eprintln!("║                                                       ║");
        eprintln!(
            "║ Corpus Size:          {:>8} bytes                  ║",
            self.sample.corpus_bytes
        );
        eprintln!(
            "║ Prompt Estimate:      {:>8} tokens                 ║",
            self.prompt_tokens
        );
        eprintln!("║                                                       ║");
        eprintln!("║ Timing Breakdown:                                     ║");
        eprintln!(
            "║   - Cloning:          {:>8.2}s                     ║",
            self.clone_secs
        );
        eprintln!(
            "║   - Sampling:         {:>8.2}s                     ║",
            self.sample_secs
        );
        eprintln!(
            "║   - Synthesis:        {:>8.2}s                     ║",
            self.synthesis_secs
        );
        eprintln!(
            "║   - Total:            {:>8.2}s                     ║",
            self.total_secs
        );
        eprintln!("╚═══════════════════════════════════════════════════════╝\n");
    }
}

/// Prompt produced by a dry run.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedPrompt {
    /// Messages that would be sent
    pub prompt: Prompt,
    /// Statistics up to the synthesis stage
    pub stats: PipelineStats,
}

/// Orchestrates clone, sample and synthesis for one repository.
pub struct Pipeline {
    config: Config,
    sampler: Sampler,
    prompt_builder: PromptBuilder,
}

impl Pipeline {
    /// Creates a new pipeline with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails or the prompt
    /// template cannot be loaded.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let sampler = Sampler::new(&config)?;
        let prompt_builder = PromptBuilder::new(&config)?;

        Ok(Self {
            config,
            sampler,
            prompt_builder,
        })
    }

    /// Returns the configuration this pipeline runs with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Executes the complete pipeline.
    ///
    /// `on_step` is called as each stage starts. The temporary clone is
    /// removed before this returns, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns the first terminal failure: [`Error::Clone`],
    /// [`Error::EmptyCorpus`] or [`Error::Synthesis`].
    #[instrument(skip_all, fields(repo = %self.config.repo_url))]
    pub fn run<R, C>(
        &self,
        cloner: &R,
        synthesizer: &Synthesizer<C>,
        mut on_step: impl FnMut(Step),
    ) -> Result<(Generation, PipelineStats)>
    where
        R: RepoCloner + ?Sized,
        C: ModelClient,
    {
        let start_time = Instant::now();
        info!("Starting README generation");

        let workspace = Workspace::create()?;
        let outcome = self
            .prepare_in(workspace.path(), cloner, &mut on_step)
            .and_then(|(prompt, mut stats)| {
                info!("Stage 3/3: Synthesizing README...");
                on_step(Step::Synthesizing);
                let synth_start = Instant::now();
                let markdown = synthesizer.synthesize(&self.config.model, &prompt)?;
                stats.synthesis_secs = synth_start.elapsed().as_secs_f64();

                info!(
                    "✓ Received {} bytes of markdown in {:.2}s",
                    markdown.len(),
                    stats.synthesis_secs
                );
                Ok((markdown, stats))
            });
        workspace.dispose();

        let (markdown, mut stats) = outcome?;
        stats.total_secs = start_time.elapsed().as_secs_f64();

        let generation = Generation {
            markdown,
            repo_url: self.config.repo_url.clone(),
            model: self.config.model.model.clone(),
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };

        info!(
            "✓ README generated successfully in {:.2}s",
            stats.total_secs
        );
        Ok((generation, stats))
    }

    /// Clones and samples without calling the model.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Clone`] or [`Error::EmptyCorpus`].
    pub fn prepare<R>(&self, cloner: &R) -> Result<PreparedPrompt>
    where
        R: RepoCloner + ?Sized,
    {
        let start_time = Instant::now();
        let workspace = Workspace::create()?;
        let outcome = self.prepare_in(workspace.path(), cloner, &mut |_| {});
        workspace.dispose();

        let (prompt, mut stats) = outcome?;
        stats.total_secs = start_time.elapsed().as_secs_f64();
        Ok(PreparedPrompt { prompt, stats })
    }

    fn prepare_in<R>(
        &self,
        dir: &Path,
        cloner: &R,
        on_step: &mut dyn FnMut(Step),
    ) -> Result<(Prompt, PipelineStats)>
    where
        R: RepoCloner + ?Sized,
    {
        let mut stats = PipelineStats::default();

        // Stage 1: Cloning
        info!("Stage 1/3: Cloning repository...");
        on_step(Step::Cloning);
        let clone_start = Instant::now();
        cloner.clone_repo(&self.config.repo_url, dir, self.config.clone_depth)?;
        stats.clone_secs = clone_start.elapsed().as_secs_f64();
        info!("✓ Cloned in {:.2}s", stats.clone_secs);

        // Stage 2: Sampling
        info!("Stage 2/3: Sampling files...");
        on_step(Step::Sampling);
        let sample_start = Instant::now();
        let sample = self.sampler.sample(dir)?;
        let prompt = self.prompt_builder.build(&sample.corpus, &self.config.repo_url)?;
        stats.sample_secs = sample_start.elapsed().as_secs_f64();
        stats.sample = sample.stats;

        info!(
            "✓ Sampled {} files ({} bytes) in {:.2}s",
            stats.sample.sampled_files,
            stats.sample.corpus_bytes,
            stats.sample_secs
        );

        stats.prompt_tokens = self.config.tokenizer.estimate(&prompt.system)
            + self.config.tokenizer.estimate(&prompt.user);
        self.check_budget(stats.prompt_tokens);

        Ok((prompt, stats))
    }

    fn check_budget(&self, prompt_tokens: usize) {
        let budget = Budget {
            prompt_tokens,
            output_tokens: self.config.model.max_tokens as usize,
            context_window: self.config.context_window,
        };

        if budget.exceeds_window() {
            warn!(
                "  Prompt estimate of {} tokens plus {} output tokens exceeds the {} token context window",
                budget.prompt_tokens, budget.output_tokens, budget.context_window
            );
        } else {
            debug!("Prompt estimate: {} tokens", prompt_tokens);
        }
    }
}

/// Temporary directory exclusively owned by one request.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn create() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir()
            .map_err(|e| Error::io(std::env::temp_dir(), e))?;

        debug!("Created workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Best-effort recursive removal; failures are only logged.
    fn dispose(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!("Removed workspace {}", path.display()),
            Err(e) => warn!("Failed to remove workspace {}: {}", path.display(), e),
        }
    }
}
