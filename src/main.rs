use anyhow::Context;
use clap::Parser;
use readme_gen::{
    preview, AllowList, Config, Failure, FileFilterConfig, Generation, GitCli, ModelConfig,
    OpenAiCompatibleClient, Pipeline, PipelineStats, Session, Stage, Synthesizer, TokenizerKind,
    Writer, DEFAULT_BASE_URL, DEFAULT_BYTE_CAP, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "readme-gen",
    version,
    author,
    about = "Generate a README.md for a public git repository",
    long_about = "Generate a README.md for a public git repository.\n\n\
    The repository is shallow-cloned into a temporary directory, a prefix of every \
    allow-listed file is collected, and a single request to an OpenAI-compatible \
    model turns the samples into a README.\n\n\
    USAGE EXAMPLES:\n  \
      # Generate and save README.md in the current directory\n  \
      readme-gen https://github.com/user/repo\n\n  \
      # Only look at documentation and config files\n  \
      readme-gen https://github.com/user/repo --allow narrow\n\n  \
      # Inspect the prompt without calling the model\n  \
      readme-gen https://github.com/user/repo --dry-run\n\n  \
      # Preview in the terminal and offer to regenerate\n  \
      readme-gen https://github.com/user/repo --no-write --preview --interactive"
)]
struct Cli {
    /// Public git repository URL
    #[arg(value_name = "URL")]
    url: String,

    /// API key for the model endpoint
    #[arg(long, env = "KIMI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model identifier
    #[arg(long, env = "README_GEN_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Root of the OpenAI-compatible API
    #[arg(long, env = "README_GEN_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Max tokens the model may generate
    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    max_tokens: u32,

    /// Overall timeout for the model request in seconds (none by default)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Extension preset to sample
    #[arg(long, value_enum, default_value = "broad")]
    allow: CliAllowList,

    /// Custom extension to sample, replacing the preset (repeatable)
    ///
    /// Example: readme-gen <URL> --ext rs --ext toml --ext md
    #[arg(long, value_name = "EXT")]
    ext: Vec<String>,

    /// Bytes read from each sampled file
    #[arg(long, default_value_t = DEFAULT_BYTE_CAP, value_name = "BYTES")]
    byte_cap: usize,

    /// Directory glob to skip while sampling (repeatable)
    ///
    /// Example: readme-gen <URL> --exclude-dir "**/vendor" --exclude-dir "**/.git"
    #[arg(long, value_name = "GLOB")]
    exclude_dir: Vec<String>,

    /// Path to custom Tera template file
    ///
    /// The template receives `corpus`, `repo_url` and `file_count` and must
    /// use `corpus`.
    #[arg(long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// Tokenizer used for the prompt size estimate
    #[arg(long, value_enum, default_value = "simple")]
    tokenizer: CliTokenizer,

    /// Where to save the README (a directory gets README.md inside it)
    #[arg(short, long, default_value = "README.md", value_name = "PATH")]
    out: PathBuf,

    /// Don't write the README to disk
    #[arg(long)]
    no_write: bool,

    /// Also render the README in the terminal (on stderr, after the source)
    #[arg(long)]
    preview: bool,

    /// Offer to regenerate after each attempt
    #[arg(short, long)]
    interactive: bool,

    /// Dry run (clone and sample, print the prompt, don't call the model)
    #[arg(long)]
    dry_run: bool,

    /// Print the result and statistics as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliAllowList {
    /// Documentation and configuration files only
    Narrow,
    /// Documentation, configuration and source files
    Broad,
}

impl From<CliAllowList> for AllowList {
    fn from(a: CliAllowList) -> Self {
        match a {
            CliAllowList::Narrow => Self::narrow(),
            CliAllowList::Broad => Self::broad(),
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliTokenizer {
    Simple,
    Enhanced,
}

impl From<CliTokenizer> for TokenizerKind {
    fn from(t: CliTokenizer) -> Self {
        match t {
            CliTokenizer::Simple => Self::Simple,
            CliTokenizer::Enhanced => Self::Enhanced,
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Env-backed flags must see values from .env
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    setup_tracing(cli.verbose)?;

    let config = build_config(&cli).context("Failed to build configuration")?;

    if cli.dry_run {
        return dry_run(&cli, config);
    }

    let cloner = GitCli::new();
    let synthesizer = Synthesizer::new(OpenAiCompatibleClient::new());
    let mut session = Session::new();

    loop {
        let outcome = session
            .generate(config.clone(), &cloner, &synthesizer)
            .cloned();

        match outcome {
            Ok(generation) => {
                let stats = session.stats().cloned().unwrap_or_default();
                emit(&cli, &generation, &stats)?;
            }
            Err(e) => {
                let failure = match session.stage() {
                    Stage::Failed(failure) => failure.clone(),
                    _ => Failure::from(&e),
                };

                if !cli.interactive {
                    anyhow::bail!("{failure}");
                }
                eprintln!("{failure}");
            }
        }

        if !cli.interactive
            || !offer_regenerate(&mut session, &mut io::stdin().lock(), &mut io::stderr())?
        {
            break;
        }
    }

    Ok(())
}

fn build_config(cli: &Cli) -> readme_gen::Result<Config> {
    let allow_list = if cli.ext.is_empty() {
        cli.allow.into()
    } else {
        AllowList::from_extensions(&cli.ext)
    };

    let model = ModelConfig {
        model: cli.model.clone(),
        api_key: cli.api_key.clone().unwrap_or_default(),
        base_url: cli.base_url.clone(),
        max_tokens: cli.max_tokens,
        timeout: cli.timeout.map(Duration::from_secs),
        ..ModelConfig::default()
    };

    let mut builder = Config::builder()
        .repo_url(&cli.url)
        .model(model)
        .allow_list(allow_list)
        .byte_cap(cli.byte_cap)
        .tokenizer(cli.tokenizer.into())
        .file_filter_config(FileFilterConfig::new().exclude_directories(cli.exclude_dir.clone()))
        .dry_run(cli.dry_run);

    if let Some(template_path) = &cli.template {
        builder = builder.template_path(template_path);
    }

    builder.build()
}

fn dry_run(cli: &Cli, config: Config) -> anyhow::Result<()> {
    let prepared = Pipeline::new(config)
        .context("Failed to create pipeline")?
        .prepare(&GitCli::new())
        .context("Failed to prepare prompt")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&prepared)?);
    } else {
        println!("{}\n\n{}", prepared.prompt.system, prepared.prompt.user);
        prepared.stats.print_summary();
    }

    Ok(())
}

fn emit(cli: &Cli, generation: &Generation, stats: &PipelineStats) -> anyhow::Result<()> {
    if cli.json {
        let document = serde_json::json!({
            "generation": generation,
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else {
        preview::print_readme(&generation.markdown, cli.preview)
            .context("Failed to print README")?;
    }

    if !cli.no_write {
        let writer = Writer::new(&cli.out);
        writer
            .write(&generation.markdown)
            .with_context(|| format!("Failed to save {}", writer.path().display()))?;
        info!("Saved {}", writer.path().display());
    }

    if !cli.json {
        stats.print_summary();
    }

    Ok(())
}

/// Asks whether to discard the held result, then whether to start a new
/// request. Returns true if a new request should run.
fn offer_regenerate<R, W>(session: &mut Session, input: &mut R, prompt: &mut W) -> anyhow::Result<bool>
where
    R: BufRead,
    W: Write,
{
    if !confirm("Discard this result and regenerate?", input, prompt)? {
        return Ok(false);
    }
    session.regenerate();

    // The session stays idle until another request is asked for.
    confirm("Generate a new README?", input, prompt)
}

fn confirm<R: BufRead, W: Write>(question: &str, input: &mut R, prompt: &mut W) -> anyhow::Result<bool> {
    write!(prompt, "{question} [y/N] ")?;
    prompt.flush()?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("Failed to read answer")?;

    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn setup_tracing(verbosity: u8) -> anyhow::Result<()> {
    let filter = match verbosity {
        0 => EnvFilter::new("readme_gen=info"),
        1 => EnvFilter::new("readme_gen=debug"),
        _ => EnvFilter::new("readme_gen=trace"),
    };

    // stdout carries the README
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_thread_ids(false),
        )
        .init();

    Ok(())
}
