pub mod aggregator;
pub mod answer;
pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod index;
pub mod models;
pub mod normalizer;
pub mod ocr;
pub mod orchestrator;
pub mod tables;
pub mod traits;

pub use aggregator::{aggregate, save_json, PdfDocument};
pub use answer::{build_prompt, Answerer, OpenRouterChat, FALLBACK_CONTEXT_CHARS};
pub use chunking::{build_chunks, chunk_words, DEFAULT_CHUNK_WORDS};
pub use config::ProviderConfig;
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, OpenAiCompatibleEmbedder, DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{ExtractError, RagError};
pub use extractor::{extract_tables, extract_text, LopdfSource, PageSource, RawBlock, RawImage};
pub use index::{ChunkIndex, MemoryVectorIndex, DEFAULT_TOP_K};
pub use models::{
    Chunk, DocumentRecord, ExtractionOptions, ImageMeta, RagOptions, ScoredChunk, TextBuckets,
};
pub use normalizer::{clean, detect_script, reshape_for_display, Script};
pub use ocr::{ImageOcr, OcrEngine, OcrOutcome, TesseractCli};
pub use orchestrator::RagSession;
pub use tables::{format_table_as_text, Table, TableRow};
pub use traits::{GenerationParams, LanguageModel, VectorIndex};
