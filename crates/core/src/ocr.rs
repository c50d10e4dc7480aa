use crate::error::{ExtractError, Result};
use crate::models::ExtractionOptions;
use crate::normalizer::clean;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use std::path::PathBuf;
use std::process::Command;

const SMOOTH_KERNEL: [f32; 9] = [1.0, 1.0, 1.0, 1.0, 5.0, 1.0, 1.0, 1.0, 1.0];

pub trait OcrEngine {
    fn recognize(&self, image: &GrayImage, languages: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: PathBuf,
    engine_mode: u8,
    page_segmentation: u8,
}

impl TesseractCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            engine_mode: 3,
            page_segmentation: 6,
        }
    }

    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .output()
            .is_ok_and(|output| output.status.success())
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image: &GrayImage, languages: &str) -> Result<String> {
        let workdir = tempfile::tempdir()?;
        let input = workdir.path().join("ocr_input.png");
        image.save(&input)?;

        let output = Command::new(&self.binary)
            .arg(&input)
            .arg("stdout")
            .args(["-l", languages])
            .args(["--oem", &self.engine_mode.to_string()])
            .args(["--psm", &self.page_segmentation.to_string()])
            .output();

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => Err(ExtractError::OcrFailed(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                Err(ExtractError::OcrFailed(format!(
                    "{} not found (install tesseract-ocr with the ara and eng language packs)",
                    self.binary.display()
                )))
            }
            Err(error) => Err(ExtractError::Io(error)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrOutcome {
    Text(String),
    Empty,
    Failed(String),
}

impl OcrOutcome {
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text),
            Self::Empty | Self::Failed(_) => None,
        }
    }
}

pub struct ImageOcr<E> {
    engine: E,
    upscale: u32,
    threshold: Option<u8>,
    languages: &'static str,
}

impl<E: OcrEngine> ImageOcr<E> {
    pub fn new(engine: E, options: &ExtractionOptions) -> Self {
        Self {
            engine,
            upscale: options.ocr_upscale.max(1),
            threshold: options.ocr_threshold,
            languages: options.ocr_languages,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn run(&self, raw_image: &[u8]) -> OcrOutcome {
        let bitmap = match image::load_from_memory(raw_image) {
            Ok(bitmap) => bitmap,
            Err(error) => return OcrOutcome::Failed(format!("image decode: {error}")),
        };

        let prepared = self.preprocess(&bitmap);
        match self.engine.recognize(&prepared, self.languages) {
            Ok(text) => {
                let cleaned = clean(&text);
                if cleaned.is_empty() {
                    OcrOutcome::Empty
                } else {
                    OcrOutcome::Text(cleaned)
                }
            }
            Err(error) => OcrOutcome::Failed(error.to_string()),
        }
    }

    pub fn preprocess(&self, bitmap: &DynamicImage) -> GrayImage {
        let width = bitmap.width().saturating_mul(self.upscale);
        let height = bitmap.height().saturating_mul(self.upscale);

        let mut gray = bitmap
            .resize_exact(width, height, FilterType::CatmullRom)
            .grayscale()
            .filter3x3(&SMOOTH_KERNEL)
            .to_luma8();

        if let Some(threshold) = self.threshold {
            for pixel in gray.pixels_mut() {
                pixel.0[0] = if pixel.0[0] > threshold { 255 } else { 0 };
            }
        }

        gray
    }
}
