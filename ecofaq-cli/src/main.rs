//! `ecofaq` - generate illustrated FAQs from Project Regeneration Nexus pages.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use ecofaq_rag::openai::{OpenAICompletionProvider, OpenAIEmbeddingProvider, OpenAIImageProvider};
use ecofaq_rag::{
    CompletionProvider, EmbeddingProvider, FaqConfig, FaqPipeline, FaqRequest,
    FaqService, HashEmbeddingProvider, HttpTextSource, IllustrationProvider,
    MockCompletionProvider, NexusSolution, PipelineRequest, PlaceholderIllustrator, RetryConfig,
    Retrying, extract_article_text,
};
use ecofaq_telemetry::LogFormat;

mod output;

#[derive(Parser, Debug)]
#[command(name = "ecofaq")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate FAQs for climate solutions with retrieval-augmented prompting")]
#[command(long_about = r#"Generate FAQs for climate solutions with retrieval-augmented prompting

EXAMPLES:
    # FAQ about the azolla fern page, for students, focused on action items
    ecofaq generate azolla-fern

    # Four questions about carbon for farmers, as JSON
    ecofaq generate agroforestry --topic "carbon sequestration" --audience farmers -n 4 --json

    # Run on a local text file without calling any model
    ecofaq --offline from-file article.txt

    # Run on a saved solution page; HTML files are reduced to their article text
    ecofaq --offline from-file azolla-fern.html

ENVIRONMENT VARIABLES:
    OPENAI_API_KEY      API key for embeddings, completions and images
    RUST_LOG            Log filter (overrides --verbose)"#)]
struct Cli {
    /// Use deterministic local backends instead of OpenAI (`generate` still
    /// fetches the solution page over HTTP)
    #[arg(long, global = true)]
    offline: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Load pipeline settings from a JSON file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate an illustrated FAQ for a Nexus solution
    Generate {
        /// Solution slug or name, e.g. `azolla-fern` (see `ecofaq list`)
        solution: NexusSolution,

        #[command(flatten)]
        faq: FaqArgs,
    },

    /// Generate an FAQ from a local text file
    FromFile {
        /// Text or HTML (`.html`, `.htm`) file to use as source
        path: PathBuf,

        #[command(flatten)]
        faq: FaqArgs,
    },

    /// List the available Nexus solutions
    List,
}

#[derive(Args, Debug)]
struct FaqArgs {
    /// Topic the questions should focus on (empty for none)
    #[arg(long, default_value = ecofaq_rag::service::DEFAULT_TOPIC)]
    topic: String,

    /// Intended readers (empty for a general audience)
    #[arg(long, default_value = ecofaq_rag::service::DEFAULT_AUDIENCE)]
    audience: String,

    /// Number of questions, 2 to 5
    #[arg(short = 'n', long, default_value_t = ecofaq_rag::service::DEFAULT_NUM_QUESTIONS)]
    num_questions: usize,

    /// Chunks used as context for each prompt
    #[arg(long)]
    top_k: Option<usize>,

    /// Maximum chunk size in characters (or tokens, per config)
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Overlap between consecutive chunks
    #[arg(long)]
    chunk_overlap: Option<usize>,

    /// Answers generated concurrently
    #[arg(long)]
    concurrency: Option<usize>,
}

impl FaqArgs {
    /// Apply command-line overrides on top of `config`.
    fn apply(&self, mut config: FaqConfig) -> ecofaq_rag::Result<FaqConfig> {
        if let Some(top_k) = self.top_k {
            config.top_k = top_k;
        }
        if let Some(size) = self.chunk_size {
            config.chunk_size = size;
        }
        if let Some(overlap) = self.chunk_overlap {
            config.chunk_overlap = overlap;
        }
        if let Some(concurrency) = self.concurrency {
            config.answer_concurrency = concurrency;
        }
        config.validate()?;
        Ok(config)
    }
}

struct Backends {
    embedder: Arc<dyn EmbeddingProvider>,
    completer: Arc<dyn CompletionProvider>,
    illustrator: Arc<dyn IllustrationProvider>,
}

impl Backends {
    fn new(offline: bool) -> anyhow::Result<Self> {
        if offline {
            return Ok(Self {
                embedder: Arc::new(HashEmbeddingProvider::default()),
                completer: Arc::new(MockCompletionProvider::offline()),
                illustrator: Arc::new(PlaceholderIllustrator::default()),
            });
        }

        let retry = RetryConfig::default();
        Ok(Self {
            embedder: Arc::new(Retrying::new(OpenAIEmbeddingProvider::from_env()?, retry)),
            completer: Arc::new(Retrying::new(OpenAICompletionProvider::from_env()?, retry)),
            illustrator: Arc::new(Retrying::new(OpenAIImageProvider::from_env()?, retry)),
        })
    }

    fn pipeline(&self, config: FaqConfig) -> ecofaq_rag::Result<FaqPipeline> {
        FaqPipeline::builder()
            .config(config)
            .embedding_provider(self.embedder.clone())
            .completion_provider(self.completer.clone())
            .build()
    }
}

async fn load_config(path: Option<&Path>) -> anyhow::Result<FaqConfig> {
    let Some(path) = path else {
        return Ok(FaqConfig::default());
    };
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read config file {}", path.display()))?;
    Ok(FaqConfig::from_json_str(&json)?)
}

async fn generate(cli: &Cli, solution: NexusSolution, faq: &FaqArgs) -> anyhow::Result<()> {
    let config = faq.apply(load_config(cli.config.as_deref()).await?)?;
    let backends = Backends::new(cli.offline)?;
    let service = FaqService::new(
        backends.pipeline(config)?,
        Arc::new(HttpTextSource::new()?),
        backends.illustrator.clone(),
    );

    let request = FaqRequest {
        source: solution,
        topic: faq.topic.clone(),
        audience: faq.audience.clone(),
        num_questions: faq.num_questions,
    };
    let response = service.generate(&request).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print!("{}", output::render_response(&response));
    }
    Ok(())
}

/// Read a source file, reducing HTML pages to their article text.
async fn read_source(path: &Path) -> anyhow::Result<String> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read source file {}", path.display()))?;

    let is_html = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"));
    if !is_html {
        return Ok(text);
    }
    extract_article_text(&text)
        .with_context(|| format!("no readable text in {}", path.display()))
}

async fn from_file(cli: &Cli, path: &Path, faq: &FaqArgs) -> anyhow::Result<()> {
    let config = faq.apply(load_config(cli.config.as_deref()).await?)?;
    let text = read_source(path).await?;

    let pipeline = Backends::new(cli.offline)?.pipeline(config)?;
    let request = PipelineRequest::new(text, faq.num_questions)
        .topic(faq.topic.as_str())
        .audience(faq.audience.as_str());
    let pairs = pipeline.run(&request).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&pairs)?);
    } else {
        print!("{}", output::render_pairs(&pairs));
    }
    Ok(())
}

fn list(cli: &Cli) -> anyhow::Result<()> {
    if cli.json {
        println!("{}", serde_json::to_string_pretty(NexusSolution::ALL)?);
    } else {
        print!("{}", output::render_catalog(NexusSolution::ALL));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    ecofaq_telemetry::init_with_options("ecofaq", LogFormat::Pretty, filter)?;

    match &cli.command {
        Command::Generate { solution, faq } => generate(&cli, *solution, faq).await,
        Command::FromFile { path, faq } => from_file(&cli, path, faq).await,
        Command::List => list(&cli),
    }
}
