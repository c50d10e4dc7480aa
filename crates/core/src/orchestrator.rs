use crate::answer::Answerer;
use crate::chunking::build_chunks;
use crate::embeddings::Embedder;
use crate::error::RagError;
use crate::index::ChunkIndex;
use crate::models::{DocumentRecord, RagOptions, ScoredChunk};
use crate::traits::{GenerationParams, LanguageModel};
use tracing::info;

pub struct RagSession<E, M> {
    index: ChunkIndex<E>,
    answerer: Answerer<M>,
    combined_text: String,
    top_k: usize,
}

impl<E: Embedder, M: LanguageModel> RagSession<E, M> {
    pub async fn build(
        record: &DocumentRecord,
        embedder: E,
        model: M,
        params: GenerationParams,
        options: RagOptions,
    ) -> Result<Self, RagError> {
        let combined_text = record.combined_text();
        let chunks = build_chunks(&combined_text, options.chunk_words);
        info!(source = %record.source_name, chunks = chunks.len(), "chunked document");

        let index = ChunkIndex::build(chunks, embedder).await?;
        info!(indexed = index.len(), "index ready");

        let answerer = Answerer::new(model, params, options.answer_language)
            .with_fallback_chars(options.fallback_chars);

        Ok(Self {
            index,
            answerer,
            combined_text,
            top_k: options.top_k,
        })
    }

    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }

    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>, RagError> {
        let hits = self.index.retrieve(query, self.top_k).await?;
        info!(retrieved = hits.len(), "retrieved chunks");
        Ok(hits)
    }

    pub async fn ask(&self, query: &str) -> Result<String, RagError> {
        let hits = self.retrieve(query).await?;
        self.answerer.answer(&hits, query, &self.combined_text).await
    }

    pub fn answerer(&self) -> &Answerer<M> {
        &self.answerer
    }
}
