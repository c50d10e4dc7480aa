use crate::error::{ExtractError, Result};
use crate::extractor::{extract_tables, extract_text, LopdfSource, PageSource, RawImage};
use crate::models::{DocumentRecord, ExtractionOptions, ImageMeta};
use crate::ocr::{ImageOcr, OcrEngine, OcrOutcome};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct PdfDocument {
    path: PathBuf,
    source_name: String,
}

impl PdfDocument {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ExtractError::NotFound(path.display().to_string()));
        }

        let source_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ExtractError::MissingFileName(path.display().to_string()))?
            .to_string();

        Ok(Self {
            path: path.to_path_buf(),
            source_name,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn extract_all<E: OcrEngine>(
        &self,
        engine: E,
        options: &ExtractionOptions,
    ) -> Result<DocumentRecord> {
        info!(source = %self.source_name, "starting full pdf extraction");
        let source = LopdfSource::load(&self.path)?;
        Ok(aggregate(&self.source_name, &source, &ImageOcr::new(engine, options), options))
    }
}

pub fn aggregate<E: OcrEngine>(
    source_name: &str,
    source: &dyn PageSource,
    ocr: &ImageOcr<E>,
    options: &ExtractionOptions,
) -> DocumentRecord {
    info!("extracting text");
    let text = extract_text(source);
    info!(arabic = text.arabic.len(), english = text.english.len(), "text extracted");

    info!("extracting tables");
    let tables = extract_tables(source);
    info!(tables = tables.len(), "tables extracted");

    info!("extracting images and running ocr");
    let mut images = Vec::new();
    let mut ocr_text = Vec::new();
    for page in source.pages() {
        let page_images = match source.images(page) {
            Ok(page_images) => page_images,
            Err(error) => {
                warn!(page, %error, "could not list page images");
                continue;
            }
        };

        for raw in page_images {
            let (meta, outcome) = process_image(&raw, ocr, options);
            images.push(meta);
            match outcome {
                OcrOutcome::Text(text) => ocr_text.push(text),
                OcrOutcome::Empty => debug!(page = raw.page, index = raw.index, "ocr found no text"),
                OcrOutcome::Failed(reason) => {
                    warn!(page = raw.page, index = raw.index, %reason, "ocr failed for image")
                }
            }
        }
    }
    info!(images = images.len(), ocr = ocr_text.len(), "ocr texts extracted");

    DocumentRecord {
        source_name: source_name.to_string(),
        text,
        tables,
        images,
        ocr: ocr_text,
    }
}

fn process_image<E: OcrEngine>(
    raw: &RawImage,
    ocr: &ImageOcr<E>,
    options: &ExtractionOptions,
) -> (ImageMeta, OcrOutcome) {
    let mut meta = ImageMeta {
        page: raw.page,
        index: raw.index,
        data_base64: None,
    };

    let png = match raw.to_png() {
        Ok(png) => png,
        Err(error) => return (meta, OcrOutcome::Failed(error.to_string())),
    };

    if options.embed_images {
        meta.data_base64 = Some(STANDARD.encode(&png));
    }

    (meta, ocr.run(&png))
}

pub fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    value.serialize(&mut serializer)?;
    writer.flush()?;
    info!(path = %path.display(), "saved json");
    Ok(())
}
