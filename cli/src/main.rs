//! docbot CLI
//!
//! Answers questions about a GitHub documentation repository through a
//! retrieval pipeline: fetch and cache the corpus, chunk it, embed the
//! chunks into a cached vector index, then hand the best-matching chunks
//! to a chat model alongside the question.

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use docbot_core::corpus::{CorpusSource, DocumentStore, GithubFetcher};
use docbot_core::error::AppError;
use docbot_rag::chunk::{SplitConfig, TextSplitter};
use docbot_rag::embed::openai_embed::OpenAiEmbedder;
use docbot_rag::index::IndexStore;
use docbot_rag::llm::openai_chat::OpenAiChat;
use docbot_rag::openai::OpenAiClient;
use docbot_rag::pipeline::Pipeline;
use docbot_rag::prompt::{PromptAssembler, DEFAULT_PERSONA};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "docbot")]
#[command(about = "Ask questions about a GitHub documentation corpus", long_about = None)]
struct Cli {
    /// Documentation repository, as owner/name
    #[arg(long, global = true, default_value = "SAP-docs/sapui5")]
    repo: String,

    /// Branch the corpus is fetched from
    #[arg(long, global = true, default_value = "main")]
    branch: String,

    /// Directory holding the corpus and index caches
    #[arg(long, global = true, default_value = ".docbot")]
    data_dir: PathBuf,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, global = true, default_value = "https://api.openai.com/v1")]
    api_base: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a question; prompts for one when none is given
    Ask(AskArgs),
    /// Show what is cached under the data directory
    Status,
    /// Drop cached state; with no flags both caches are removed
    Clear {
        /// Remove only the corpus snapshot
        #[arg(long)]
        corpus: bool,
        /// Remove only the vector index
        #[arg(long)]
        index: bool,
    },
    /// Check that the configured API accepts the credentials
    Health,
}

#[derive(Args)]
struct AskArgs {
    /// The question; read interactively when omitted
    question: Option<String>,

    /// How many context chunks to hand the chat model
    #[arg(long, default_value = "4")]
    top_k: usize,

    /// Chunk size in bytes
    #[arg(long, default_value = "1000")]
    chunk_size: usize,

    /// Overlap between consecutive chunks in bytes
    #[arg(long, default_value = "200")]
    chunk_overlap: usize,

    /// Embedding model identifier
    #[arg(long, default_value = "text-embedding-3-small")]
    embed_model: String,

    /// Chat model identifier
    #[arg(long, default_value = "gpt-4")]
    chat_model: String,

    /// System persona for the chat model
    #[arg(long, default_value = DEFAULT_PERSONA)]
    persona: String,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.render());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let source = CorpusSource::parse(&cli.repo, &cli.branch)?;
    tracing::debug!(
        source = %source.label(),
        data_dir = %cli.data_dir.display(),
        "resolved configuration"
    );
    let store = DocumentStore::open(cli.data_dir.join("corpus"), source.clone());
    let index_store = IndexStore::open(cli.data_dir.join("index"));

    match cli.command {
        Commands::Ask(args) => ask(&cli.api_base, source, &store, &index_store, args),
        Commands::Status => status(&store, &index_store),
        Commands::Clear { corpus, index } => clear(&store, &index_store, corpus, index),
        Commands::Health => health(&cli.api_base),
    }
}

fn ask(
    api_base: &str,
    source: CorpusSource,
    store: &DocumentStore,
    index_store: &IndexStore,
    args: AskArgs,
) -> Result<(), AppError> {
    let question = match args.question {
        Some(q) => q,
        None => prompt_for_question()?,
    };
    let question = question.trim().to_string();
    if question.is_empty() {
        return Err(AppError::new(
            "QUESTION_MISSING",
            "Provide a question as an argument or type one at the prompt",
        ));
    }

    let api_key = require_env("OPENAI_API_KEY")?;
    let client = OpenAiClient::new(api_base, &api_key)?;
    let embedder = OpenAiEmbedder::new(client.clone(), &args.embed_model);
    let chat = OpenAiChat::new(client, &args.chat_model);
    let fetcher = GithubFetcher::new(source, github_token());
    let splitter = TextSplitter::new(SplitConfig {
        max_chars: args.chunk_size,
        overlap: args.chunk_overlap,
    })?;
    let assembler = PromptAssembler::new(args.persona);

    let pipeline = Pipeline {
        store,
        fetcher: &fetcher,
        splitter: &splitter,
        index_store,
        embedder: &embedder,
        chat: &chat,
        assembler: &assembler,
        top_k: args.top_k,
    };

    let answer = pipeline.answer(&question)?;
    println!("{answer}");
    Ok(())
}

fn status(store: &DocumentStore, index_store: &IndexStore) -> Result<(), AppError> {
    let snapshot = store.snapshot()?;
    match &snapshot {
        Some(snap) => println!(
            "corpus: cached ({}; documents={}; fetched_at={})",
            snap.source.label(),
            snap.documents.len(),
            snap.fetched_at
        ),
        None => println!("corpus: not cached"),
    }

    match index_store.status()? {
        Some(meta) => {
            println!(
                "index: cached (provider={}; records={}; dims={}; built_at={})",
                meta.provider, meta.record_count, meta.dims, meta.built_at
            );
            if let Some(snap) = &snapshot {
                if snap.fingerprint != meta.corpus_fingerprint {
                    println!(
                        "index: built from an older corpus snapshot; run `docbot clear --index` to rebuild"
                    );
                }
            }
        }
        None => println!("index: not cached"),
    }
    Ok(())
}

fn clear(
    store: &DocumentStore,
    index_store: &IndexStore,
    corpus: bool,
    index: bool,
) -> Result<(), AppError> {
    let everything = !corpus && !index;
    if corpus || everything {
        store.clear()?;
        println!("corpus cache cleared");
    }
    if index || everything {
        index_store.clear()?;
        println!("index cache cleared");
    }
    Ok(())
}

fn health(api_base: &str) -> Result<(), AppError> {
    let api_key = require_env("OPENAI_API_KEY")?;
    let client = OpenAiClient::new(api_base, &api_key)?;
    client.health_check()?;
    println!("ok: {}", client.base_url());
    Ok(())
}

fn prompt_for_question() -> Result<String, AppError> {
    print!("Ask me a question: ");
    io::stdout().flush().map_err(|e| {
        AppError::new("QUESTION_MISSING", "Failed to prompt for a question")
            .with_details(e.to_string())
    })?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).map_err(|e| {
        AppError::new("QUESTION_MISSING", "Failed to read a question from stdin")
            .with_details(e.to_string())
    })?;
    Ok(line)
}

fn require_env(name: &str) -> Result<String, AppError> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::new(
            "PROVIDER_CONFIG_INVALID",
            "Missing required environment variable",
        )
        .with_details(format!("var={name}"))),
    }
}

fn github_token() -> Option<String> {
    env::var("GITHUB_TOKEN").ok().filter(|t| !t.trim().is_empty())
}
