use crate::tables::{format_table_as_text, Table};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextBuckets {
    pub arabic: Vec<String>,
    pub english: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMeta {
    pub page: u32,
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_base64: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub source_name: String,
    pub text: TextBuckets,
    pub tables: Vec<Table>,
    pub images: Vec<ImageMeta>,
    pub ocr: Vec<String>,
}

impl DocumentRecord {
    pub fn combined_text(&self) -> String {
        let tables = self
            .tables
            .iter()
            .map(format_table_as_text)
            .collect::<Vec<_>>()
            .join("\n");

        [
            self.text.english.join("\n"),
            self.text.arabic.join("\n"),
            tables,
            self.ocr.join("\n"),
        ]
        .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub chunk_index: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct ExtractionOptions {
    pub embed_images: bool,
    pub ocr_upscale: u32,
    pub ocr_threshold: Option<u8>,
    pub ocr_languages: &'static str,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            embed_images: true,
            ocr_upscale: 3,
            ocr_threshold: Some(160),
            ocr_languages: "ara+eng",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RagOptions {
    pub chunk_words: usize,
    pub top_k: usize,
    pub answer_language: String,
    pub fallback_chars: usize,
}

impl Default for RagOptions {
    fn default() -> Self {
        Self {
            chunk_words: crate::chunking::DEFAULT_CHUNK_WORDS,
            top_k: crate::index::DEFAULT_TOP_K,
            answer_language: "Arabic".to_string(),
            fallback_chars: crate::answer::FALLBACK_CONTEXT_CHARS,
        }
    }
}
