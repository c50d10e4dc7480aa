use bilingual_pdf_core::{save_json, ExtractionOptions, PdfDocument, TesseractCli};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-extract", version)]
struct Cli {
    /// PDF file to extract.
    pdf_path: PathBuf,

    /// Where the JSON record is written.
    #[arg(short, long, default_value = "output.json")]
    output: PathBuf,

    /// Leave base64 image payloads out of the record.
    #[arg(long, default_value_t = false)]
    no_images: bool,

    /// Tesseract executable.
    #[arg(long, env = "TESSERACT_PATH", default_value = "tesseract")]
    tesseract: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "pdf-extract boot"
    );

    let engine = TesseractCli::new(&cli.tesseract);
    if !engine.is_available() {
        warn!(binary = %cli.tesseract.display(), "tesseract not runnable; images will have no ocr text");
    }

    let options = ExtractionOptions {
        embed_images: !cli.no_images,
        ..ExtractionOptions::default()
    };

    let document = PdfDocument::open(&cli.pdf_path)?;
    let record = document.extract_all(engine, &options)?;
    save_json(&record, &cli.output)?;

    println!("Extraction completed: {}", cli.output.display());
    Ok(())
}
