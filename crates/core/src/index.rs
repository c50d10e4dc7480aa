use crate::embeddings::Embedder;
use crate::error::RagError;
use crate::models::{Chunk, ScoredChunk};
use crate::traits::VectorIndex;
use tracing::debug;

pub const DEFAULT_TOP_K: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct MemoryVectorIndex {
    entries: Vec<(Chunk, Vec<f32>)>,
}

impl VectorIndex for MemoryVectorIndex {
    fn insert(&mut self, chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>) -> Result<(), RagError> {
        if chunks.len() != embeddings.len() {
            return Err(RagError::Embedding(format!(
                "embedding count {} doesn't match chunk count {}",
                embeddings.len(),
                chunks.len()
            )));
        }
        self.entries.extend(chunks.into_iter().zip(embeddings));
        Ok(())
    }

    fn search(&self, query_vector: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored = self
            .entries
            .iter()
            .map(|(chunk, vector)| ScoredChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(query_vector, vector),
            })
            .collect::<Vec<_>>();

        scored.sort_by(|left, right| {
            right
                .score
                .total_cmp(&left.score)
                .then_with(|| left.chunk.chunk_index.cmp(&right.chunk.chunk_index))
        });
        scored.truncate(k);
        scored
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    let dot = left.iter().zip(right).map(|(a, b)| a * b).sum::<f32>();
    let norm = |values: &[f32]| values.iter().map(|value| value * value).sum::<f32>().sqrt();
    let denominator = norm(left) * norm(right);
    if denominator > 0.0 {
        dot / denominator
    } else {
        0.0
    }
}

pub struct ChunkIndex<E, V = MemoryVectorIndex> {
    embedder: E,
    store: V,
}

impl<E: Embedder> ChunkIndex<E, MemoryVectorIndex> {
    pub async fn build(chunks: Vec<Chunk>, embedder: E) -> Result<Self, RagError> {
        Self::build_with(chunks, embedder, MemoryVectorIndex::default()).await
    }
}

impl<E: Embedder, V: VectorIndex> ChunkIndex<E, V> {
    pub async fn build_with(chunks: Vec<Chunk>, embedder: E, mut store: V) -> Result<Self, RagError> {
        if !chunks.is_empty() {
            let texts = chunks.iter().map(|chunk| chunk.text.clone()).collect::<Vec<_>>();
            let embeddings = embedder.embed_documents(&texts).await?;
            store.insert(chunks, embeddings)?;
        }
        debug!(chunks = store.len(), "vector index built");

        Ok(Self { embedder, store })
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Top `k` chunks for `query`. An empty index answers with no chunks and
    /// never calls the embedder.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, RagError> {
        if self.store.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let query_vector = self.embedder.embed_query(query).await?;
        Ok(self.store.search(&query_vector, k))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::chunking::build_chunks;
    use crate::embeddings::CharacterNgramEmbedder;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    pub(crate) struct KeywordEmbedder {
        pub calls: AtomicUsize,
        pub vocabulary: Vec<&'static str>,
    }

    impl KeywordEmbedder {
        fn vector(&self, text: &str) -> Vec<f32> {
            self.vocabulary
                .iter()
                .map(|word| if text.contains(word) { 1.0 } else { 0.0 })
                .collect()
        }
    }

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|text| self.vector(text)).collect())
        }
    }

    struct ShortEmbedder;

    #[async_trait]
    impl Embedder for ShortEmbedder {
        async fn embed_documents(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
            Ok(vec![vec![1.0]])
        }
    }

    const FIVE_CHUNKS: &str = "apple banana cherry dates \
        mountain river forest lake \
        hydraulic pump pressure valve \
        violin piano guitar drums \
        winter summer autumn spring";

    #[tokio::test]
    async fn empty_index_returns_nothing_without_embedding() {
        let index = ChunkIndex::build(Vec::new(), KeywordEmbedder::default())
            .await
            .expect("empty index is valid");

        assert!(index.is_empty());
        for query in ["anything", "", "مرحبا"] {
            let hits = index.retrieve(query, DEFAULT_TOP_K).await.expect("empty retrieval");
            assert!(hits.is_empty());
        }
        assert_eq!(index.embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn chunks_are_embedded_in_one_batch() {
        let embedder = KeywordEmbedder {
            vocabulary: vec!["apple", "river"],
            ..KeywordEmbedder::default()
        };
        let index = ChunkIndex::build(build_chunks(FIVE_CHUNKS, 4), embedder)
            .await
            .expect("index should build");

        assert_eq!(index.len(), 5);
        assert_eq!(index.embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn results_are_ranked_by_similarity() {
        let embedder = KeywordEmbedder {
            vocabulary: vec!["pump", "valve", "piano"],
            ..KeywordEmbedder::default()
        };
        let index = ChunkIndex::build(build_chunks(FIVE_CHUNKS, 4), embedder)
            .await
            .expect("index should build");

        let hits = index.retrieve("pump valve", 2).await.expect("retrieval");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.chunk_index, 2);
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn verbatim_term_in_third_chunk_is_in_top_four() {
        let index = ChunkIndex::build(build_chunks(FIVE_CHUNKS, 4), CharacterNgramEmbedder::default())
            .await
            .expect("index should build");

        let hits = index.retrieve("hydraulic", DEFAULT_TOP_K).await.expect("retrieval");
        assert_eq!(hits.len(), 4);
        assert!(hits.iter().any(|hit| hit.chunk.chunk_index == 2));
        assert_eq!(hits[0].chunk.text, "hydraulic pump pressure valve");
    }

    #[tokio::test]
    async fn mismatched_embedding_count_is_rejected() {
        let result = ChunkIndex::build(build_chunks("a b c", 1), ShortEmbedder).await;
        assert!(matches!(result, Err(RagError::Embedding(_))));
    }

    #[test]
    fn zero_vectors_score_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 1.0], &[2.0, 2.0]) - 1.0).abs() < 1e-6);
    }
}
