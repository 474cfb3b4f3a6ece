mod http;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use qa_search_core::{
    extract_page_texts, join_pages, segment, CharacterNgramEmbedder, Embedder, HttpEmbedder,
    HttpEmbedderConfig, LopdfExtractor, QaCoordinator, ServiceOptions, EMBEDDING_MODEL_ID,
    MINILM_DIMENSIONS,
};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "qa-search-server", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// OpenAI-compatible embeddings endpoint serving all-MiniLM-L6-v2.
    /// The local trigram embedder is used when unset.
    #[arg(long, env = "QA_EMBEDDING_ENDPOINT")]
    embedding_endpoint: Option<String>,

    /// Bearer token for the embeddings endpoint
    #[arg(long, env = "QA_EMBEDDING_API_KEY", hide_env_values = true)]
    embedding_api_key: Option<String>,

    /// Vector size returned by the embeddings endpoint
    #[arg(long, default_value_t = MINILM_DIMENSIONS)]
    embedding_dimensions: usize,

    /// Seconds before a single embedding request is abandoned
    #[arg(long, default_value = "30")]
    embedding_timeout_secs: u64,

    /// Upper bound for processing one upload
    #[arg(long, default_value = "120")]
    upload_timeout_secs: u64,

    /// Upper bound for answering one question
    #[arg(long, default_value = "30")]
    query_timeout_secs: u64,

    /// Largest accepted upload, in MiB
    #[arg(long, default_value = "25")]
    max_upload_mb: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the upload/ask/reset HTTP API.
    Serve {
        /// Address to bind (host:port)
        #[arg(long, env = "QA_SEARCH_BIND", default_value = "127.0.0.1:8000")]
        bind: String,
    },
    /// Load one PDF and answer questions against it.
    Ask {
        /// PDF with Question:/Answer: pairs
        #[arg(long)]
        pdf: PathBuf,
        /// Question to answer; repeat for several.
        #[arg(long, required = true)]
        question: Vec<String>,
    },
    /// Print the Q/A pairs found in a PDF.
    Pairs {
        /// PDF with Question:/Answer: pairs
        #[arg(long)]
        pdf: PathBuf,
    },
}

impl Cli {
    fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            upload_timeout: Duration::from_secs(self.upload_timeout_secs.max(1)),
            query_timeout: Duration::from_secs(self.query_timeout_secs.max(1)),
            max_upload_bytes: self.max_upload_mb.max(1) * 1024 * 1024,
            ..ServiceOptions::default()
        }
    }

    fn embedder(&self) -> anyhow::Result<Arc<dyn Embedder>> {
        match &self.embedding_endpoint {
            Some(endpoint) if !endpoint.trim().is_empty() => {
                let embedder = HttpEmbedder::new(HttpEmbedderConfig {
                    endpoint: endpoint.clone(),
                    api_key: self.embedding_api_key.clone(),
                    dimensions: self.embedding_dimensions,
                    timeout: Duration::from_secs(self.embedding_timeout_secs.max(1)),
                })
                .context("invalid embedding endpoint configuration")?;
                info!(
                    endpoint = %embedder.endpoint(),
                    model = EMBEDDING_MODEL_ID,
                    "using remote embeddings"
                );
                Ok(Arc::new(embedder))
            }
            _ => {
                warn!("no embedding endpoint configured, using local trigram embedder");
                Ok(Arc::new(CharacterNgramEmbedder::default()))
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let options = cli.service_options();
    let coordinator = Arc::new(QaCoordinator::new(
        cli.embedder()?,
        Arc::new(LopdfExtractor),
        options.clone(),
    ));

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "qa-search-server boot"
    );

    match cli.command {
        Command::Serve { bind } => {
            let addr: SocketAddr = bind
                .parse()
                .with_context(|| format!("invalid bind address {bind}"))?;
            // multipart framing needs headroom above the raw file size
            let body_limit = options.max_upload_bytes + 64 * 1024;
            let app = http::router(http::AppState::new(coordinator), body_limit);

            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;
            info!(%addr, "listening");
            axum::serve(listener, app)
                .with_graceful_shutdown(http::shutdown_signal())
                .await
                .context("http server failed")?;
        }
        Command::Ask { pdf, question } => {
            let file_name = file_name_of(&pdf)?;
            let bytes = tokio::fs::read(&pdf)
                .await
                .with_context(|| format!("failed to read {}", pdf.display()))?;

            let receipt = coordinator.upload(&file_name, bytes).await?;
            println!("{} Q&A pairs loaded from {}", receipt.pairs, receipt.file_name);

            for text in question {
                let outcome = coordinator.ask(&text).await?;
                match outcome.score {
                    Some(score) => {
                        println!("Q: {text}\nA: {} (score={score:.4})", outcome.answer)
                    }
                    None => println!("Q: {text}\nA: {}", outcome.answer),
                }
            }
        }
        Command::Pairs { pdf } => {
            let pages = extract_page_texts(&pdf)?;
            let records = segment(&join_pages(&pages))?;

            if records.is_empty() {
                println!("0 Q&A pairs found in {}", pdf.display());
            }
            for record in &records {
                println!("[{}]\n{}\n", record.position, record.content);
            }
            info!(pages = pages.len(), pairs = records.len(), "segmented document");
        }
    }

    Ok(())
}

fn file_name_of(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .with_context(|| format!("path has no file name: {}", path.display()))
}
