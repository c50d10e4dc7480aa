use crate::config::ProviderConfig;
use crate::error::RagError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

const DEFAULT: usize = 128;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, RagError> {
        self.embed_documents(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("no vector returned for query".to_string()))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let buckets = vector.len() as u64;

        for word in fold_for_matching(text).split_whitespace() {
            vector[(feature_hash(b'w', word) % buckets) as usize] += 1.0;

            let marked = format!("<{word}>").chars().collect::<Vec<_>>();
            for gram in marked.windows(3) {
                let gram = gram.iter().collect::<String>();
                vector[(feature_hash(b'g', &gram) % buckets) as usize] += 1.0;
            }
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            vector.iter_mut().for_each(|value| *value /= magnitude);
        }
        vector
    }
}

/// Lowercases and drops Arabic harakat and tatweel so vocalized and plain
/// spellings of a word collide.
fn fold_for_matching(text: &str) -> String {
    text.chars()
        .filter(|ch| !matches!(ch, '\u{064B}'..='\u{0652}' | '\u{0670}' | '\u{0640}'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn feature_hash(kind: u8, feature: &str) -> u64 {
    // FNV-1a
    std::iter::once(kind)
        .chain(feature.bytes())
        .fold(0xcbf2_9ce4_8422_2325u64, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
        })
}

#[async_trait]
impl Embedder for CharacterNgramEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }
}

pub fn prepare_input(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

pub struct OpenAiCompatibleEmbedder {
    client: Client,
    endpoint: Url,
    model: String,
    api_key: Option<String>,
}

impl OpenAiCompatibleEmbedder {
    pub fn new(config: &ProviderConfig) -> Result<Self, RagError> {
        Ok(Self {
            client: Client::new(),
            endpoint: config.endpoint("embeddings")?,
            model: config.embedding_model.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

fn into_vectors(mut response: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>, RagError> {
    if response.data.len() != expected {
        return Err(RagError::Embedding(format!(
            "provider returned {} embeddings for {} inputs",
            response.data.len(),
            expected
        )));
    }
    response.data.sort_by_key(|entry| entry.index);
    Ok(response.data.into_iter().map(|entry| entry.embedding).collect())
}

#[async_trait]
impl Embedder for OpenAiCompatibleEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let api_key = self.api_key.as_deref().ok_or(RagError::MissingApiKey)?;

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts.iter().map(|text| prepare_input(text)).collect(),
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!("{} returned {status}: {body}", self.endpoint)));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|error| RagError::Embedding(format!("malformed embedding response: {error}")))?;
        into_vectors(parsed, texts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocalized_arabic_matches_plain_spelling() {
        let embedder = CharacterNgramEmbedder::default();
        assert_eq!(embedder.embed("كَتَبَ الطالبُ"), embedder.embed("كتب الطالب"));
        assert_eq!(embedder.embed("Pump  PRESSURE"), embedder.embed("pump pressure"));
    }

    #[test]
    fn shared_words_score_higher_than_unrelated_text() {
        let embedder = CharacterNgramEmbedder { dimensions: 512 };
        let dot = |left: &[f32], right: &[f32]| left.iter().zip(right).map(|(a, b)| a * b).sum::<f32>();

        let query = embedder.embed("hydraulic pressure");
        let related = embedder.embed("the hydraulic pump pressure valve");
        let unrelated = embedder.embed("violin piano guitar drums");
        assert!(dot(&query, &related) > dot(&query, &unrelated));
        assert_eq!(query.len(), 512);
    }

    #[test]
    fn blank_text_embeds_to_zero_vector() {
        let vector = CharacterNgramEmbedder { dimensions: 8 }.embed(" \n ");
        assert_eq!(vector, vec![0.0; 8]);
    }

    #[test]
    fn newlines_are_flattened_before_submission() {
        assert_eq!(prepare_input("line one\nline two\r\nthree"), "line one line two  three");
    }

    #[tokio::test]
    async fn query_embedding_matches_document_embedding() {
        let embedder = CharacterNgramEmbedder::default();
        let documents = embedder
            .embed_documents(&["نص عربي".to_string()])
            .await
            .expect("offline embedding cannot fail");
        let query = embedder.embed_query("نص عربي").await.expect("offline embedding cannot fail");
        assert_eq!(documents[0], query);
    }

    #[tokio::test]
    async fn missing_key_fails_on_first_use() {
        let embedder = OpenAiCompatibleEmbedder::new(&ProviderConfig::default())
            .expect("default endpoint is valid");
        let result = embedder.embed_documents(&["hello".to_string()]).await;
        assert!(matches!(result, Err(RagError::MissingApiKey)));

        let empty = embedder.embed_documents(&[]).await.expect("no request for empty input");
        assert!(empty.is_empty());
    }

    #[test]
    fn response_vectors_are_reordered_by_index() {
        let response: EmbeddingResponse = serde_json::from_str(
            r#"{"data":[{"index":1,"embedding":[0.0,1.0]},{"index":0,"embedding":[1.0,0.0]}]}"#,
        )
        .expect("response should parse");
        let vectors = into_vectors(response, 2).expect("counts match");
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn count_mismatch_is_an_embedding_error() {
        let response: EmbeddingResponse =
            serde_json::from_str(r#"{"data":[{"index":0,"embedding":[1.0]}]}"#)
                .expect("response should parse");
        assert!(matches!(into_vectors(response, 3), Err(RagError::Embedding(_))));
    }
}
