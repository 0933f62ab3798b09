//! lumen: search the images attached to notes and classify document photos.
//!
//! Vision work goes to a local Ollama model configured through the
//! environment or a `.env` file: `OLLAMA_VISION_MODEL`, `OLLAMA_BASE`,
//! `LUMEN_VISION_TIMEOUT_SECS`, `LUMEN_MAX_CONCURRENT_ANALYSES`,
//! `LUMEN_SNIPPET_LENGTH`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use lumen_classify::DocumentClassifier;
use lumen_cli::{FsImageLoader, JsonNoteRepository};
use lumen_core::defaults::{DEFAULT_OLLAMA_VISION_MODEL, ENV_OLLAMA_VISION_MODEL};
use lumen_core::{NoteRepository, SearchHit, VisionProvider};
use lumen_inference::OllamaVisionBackend;
use lumen_search::{ImageSearchEngine, SearchConfig};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "lumen")]
#[command(author, version, about = "Search note images and classify document photos")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the image attachments of notes
    Search {
        /// Free-text query
        query: String,

        /// JSON file holding an array of notes
        #[arg(short, long)]
        notes: PathBuf,

        /// Directory attachment storage paths are relative to (default: the notes file's directory)
        #[arg(short, long)]
        images: Option<PathBuf>,

        /// Maximum number of hits to print
        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Print hits as JSON
        #[arg(long)]
        json: bool,
    },

    /// Analyze every image attachment and print what was found
    Index {
        /// JSON file holding an array of notes
        #[arg(short, long)]
        notes: PathBuf,

        /// Directory attachment storage paths are relative to (default: the notes file's directory)
        #[arg(short, long)]
        images: Option<PathBuf>,
    },

    /// Classify the document type of an image
    Classify {
        /// Image file to classify
        image: PathBuf,

        /// Print the full classification as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the vision model is reachable
    Health,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _log_guard = init_logging();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Install the tracing subscriber.
///
/// Environment variables:
///   LOG_FORMAT - "json" or "text" (default: "text")
///   LOG_FILE   - path to a log file, rotated daily (default: stderr)
///   RUST_LOG   - standard env filter (default: "lumen=info")
fn init_logging() -> Option<WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lumen=info".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    if let Some(ref path) = log_file {
        let path = Path::new(path);
        let file_dir = path.parent().unwrap_or(Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("lumen.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(non_blocking),
                )
                .init();
        }
        Some(guard)
    } else {
        // Stdout is reserved for command output.
        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
        None
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Search {
            query,
            notes,
            images,
            limit,
            json,
        } => cmd_search(&query, &notes, images.as_deref(), limit, json).await,
        Commands::Index { notes, images } => cmd_index(&notes, images.as_deref()).await,
        Commands::Classify { image, json } => cmd_classify(&image, json).await,
        Commands::Health => cmd_health().await,
    }
}

fn vision_backend() -> anyhow::Result<Arc<dyn VisionProvider>> {
    let backend = OllamaVisionBackend::from_env().with_context(|| {
        format!(
            "{} is not set (for example {}={})",
            ENV_OLLAMA_VISION_MODEL, ENV_OLLAMA_VISION_MODEL, DEFAULT_OLLAMA_VISION_MODEL
        )
    })?;
    Ok(Arc::new(backend))
}

fn build_engine(
    notes_path: &Path,
    images_dir: Option<&Path>,
) -> anyhow::Result<(ImageSearchEngine, Arc<JsonNoteRepository>)> {
    let images_dir = match images_dir {
        Some(dir) => dir.to_path_buf(),
        None => notes_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    let repository = Arc::new(JsonNoteRepository::new(notes_path));
    let engine = ImageSearchEngine::new(
        vision_backend()?,
        Arc::new(FsImageLoader::new(images_dir)),
        SearchConfig::from_env(),
    )
    .with_repository(repository.clone());
    Ok((engine, repository))
}

async fn cmd_search(
    query: &str,
    notes_path: &Path,
    images_dir: Option<&Path>,
    limit: usize,
    json: bool,
) -> anyhow::Result<()> {
    let (engine, _) = build_engine(notes_path, images_dir)?;
    let hits = engine
        .search(query, None)
        .await
        .with_context(|| format!("search failed for notes file {}", notes_path.display()))?;
    let hits: Vec<SearchHit> = hits.into_iter().take(limit).collect();

    if json {
        let output: Vec<serde_json::Value> = hits.iter().map(hit_summary).collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No matching images.");
        return Ok(());
    }
    for hit in &hits {
        println!(
            "{:.3}  {:<16}  {} / {}",
            hit.score,
            hit.match_type.to_string(),
            hit.note.title,
            hit.attachment.filename
        );
        if !hit.snippet.is_empty() {
            println!("       {}", hit.snippet);
        }
    }
    Ok(())
}

fn hit_summary(hit: &SearchHit) -> serde_json::Value {
    serde_json::json!({
        "score": hit.score,
        "match_type": hit.match_type,
        "note_id": hit.note.id,
        "note_title": hit.note.title,
        "attachment_id": hit.attachment.id,
        "filename": hit.attachment.filename,
        "snippet": hit.snippet,
    })
}

async fn cmd_index(notes_path: &Path, images_dir: Option<&Path>) -> anyhow::Result<()> {
    let (engine, repository) = build_engine(notes_path, images_dir)?;
    let notes = repository.fetch_all_notes().await?;

    engine.index_images(&notes).await;

    let mut output = Vec::new();
    for note in &notes {
        for attachment in note.image_attachments() {
            let context = engine.get_context(attachment.id).unwrap_or_default();
            output.push(serde_json::json!({
                "note_title": note.title,
                "filename": attachment.filename,
                "attachment_id": attachment.id,
                "context": context,
            }));
        }
    }

    let stats = engine.cache_stats();
    info!(
        result_count = stats.entries,
        computations = stats.computations,
        "Index pass finished"
    );
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn cmd_classify(image_path: &Path, json: bool) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(image_path)
        .await
        .with_context(|| format!("cannot read {}", image_path.display()))?;
    let classifier = DocumentClassifier::new(vision_backend()?);
    let classification = classifier.classify_bytes(&bytes).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&classification)?);
    } else {
        println!(
            "{} (confidence {:.2}), OCR strategy: {}",
            classification.category, classification.confidence, classification.ocr_strategy
        );
    }
    Ok(())
}

async fn cmd_health() -> anyhow::Result<()> {
    let backend = vision_backend()?;
    let healthy = backend.health_check().await?;

    let output = serde_json::json!({
        "model": backend.model_name(),
        "healthy": healthy,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    if !healthy {
        bail!("vision backend is not reachable");
    }
    Ok(())
}
