use anyhow::Context;
use bilingual_pdf_core::config::{API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL};
use bilingual_pdf_core::{
    CharacterNgramEmbedder, DocumentRecord, Embedder, ExtractionOptions, GenerationParams,
    OpenAiCompatibleEmbedder, OpenRouterChat, PdfDocument, ProviderConfig, RagOptions, RagSession,
    TesseractCli, DEFAULT_TOP_K,
};
use chrono::Utc;
use clap::Parser;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-ask", version)]
struct Cli {
    /// PDF file to question.
    pdf_path: PathBuf,

    /// Question to ask. Repeat for several; reads stdin when omitted.
    #[arg(short, long = "question")]
    questions: Vec<String>,

    /// Number of chunks handed to the model.
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    top_k: usize,

    /// Language the answer is written in.
    #[arg(long, default_value = "Arabic")]
    language: String,

    /// Chat completion model.
    #[arg(long, default_value = DEFAULT_CHAT_MODEL)]
    model: String,

    /// Embedding model.
    #[arg(long, default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// OpenAI-compatible API base URL.
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    /// Embed locally with character trigrams instead of the embedding API.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Tesseract executable.
    #[arg(long, env = "TESSERACT_PATH", default_value = "tesseract")]
    tesseract: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "pdf-ask boot"
    );

    let config = ProviderConfig {
        base_url: cli.base_url.clone(),
        chat_model: cli.model.clone(),
        embedding_model: cli.embedding_model.clone(),
        ..ProviderConfig::default()
    }
    .with_api_key(cli.api_key.clone());

    let document = PdfDocument::open(&cli.pdf_path)?;
    let engine = TesseractCli::new(&cli.tesseract);
    if !engine.is_available() {
        warn!(binary = %cli.tesseract.display(), "tesseract not runnable; images will have no ocr text");
    }
    let record = tokio::task::spawn_blocking(move || {
        document.extract_all(engine, &ExtractionOptions::default())
    })
    .await
    .context("extraction task panicked")??;

    if cli.offline {
        run(&cli, &config, &record, CharacterNgramEmbedder::default()).await
    } else {
        run(&cli, &config, &record, OpenAiCompatibleEmbedder::new(&config)?).await
    }
}

async fn run<E: Embedder>(
    cli: &Cli,
    config: &ProviderConfig,
    record: &DocumentRecord,
    embedder: E,
) -> anyhow::Result<()> {
    let params = GenerationParams {
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };
    let options = RagOptions {
        top_k: cli.top_k,
        answer_language: cli.language.clone(),
        ..RagOptions::default()
    };
    let session = RagSession::build(record, embedder, OpenRouterChat::new(config)?, params, options).await?;

    if !cli.questions.is_empty() {
        for question in &cli.questions {
            let answer = session.ask(question).await?;
            println!("Q: {question}\nA: {answer}\n");
        }
        return Ok(());
    }

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("question> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let question = line?;
        let question = question.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "exit" | "quit") {
            break;
        }

        match session.ask(question).await {
            Ok(answer) => println!("{answer}\n"),
            Err(error) => warn!(%error, "question failed"),
        }
    }

    Ok(())
}
