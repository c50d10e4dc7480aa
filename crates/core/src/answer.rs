use crate::config::ProviderConfig;
use crate::error::RagError;
use crate::models::ScoredChunk;
use crate::traits::{GenerationParams, LanguageModel};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

pub const FALLBACK_CONTEXT_CHARS: usize = 500;

pub fn assemble_context(retrieved: &[ScoredChunk], fallback_text: &str, fallback_chars: usize) -> String {
    let context = retrieved
        .iter()
        .map(|hit| hit.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    if !context.trim().is_empty() {
        return context;
    }

    info!(chars = fallback_chars, "context empty, using document excerpt");
    fallback_text.chars().take(fallback_chars).collect()
}

pub fn build_prompt(context: &str, query: &str, language: &str) -> String {
    format!(
        "You are a data extraction assistant. Answer the user's question based strictly \
on the provided context only.\n\
\n\
Important instructions:\n\
1. Answer in {language}.\n\
2. Include all retrieved text that is relevant to the question, whatever its \
original script, including English text and text recognized from images.\n\
\n\
Context:\n{context}\n\nQuestion: {query}\nAnswer:"
    )
}

pub struct Answerer<M> {
    model: M,
    params: GenerationParams,
    language: String,
    fallback_chars: usize,
}

impl<M: LanguageModel> Answerer<M> {
    pub fn new(model: M, params: GenerationParams, language: impl Into<String>) -> Self {
        Self {
            model,
            params,
            language: language.into(),
            fallback_chars: FALLBACK_CONTEXT_CHARS,
        }
    }

    pub fn with_fallback_chars(mut self, fallback_chars: usize) -> Self {
        self.fallback_chars = fallback_chars;
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub async fn answer(
        &self,
        retrieved: &[ScoredChunk],
        query: &str,
        fallback_text: &str,
    ) -> Result<String, RagError> {
        let context = assemble_context(retrieved, fallback_text, self.fallback_chars);
        let prompt = build_prompt(&context, query, &self.language);

        self.model
            .complete(&prompt, self.params)
            .await
            .map_err(|error| match error {
                RagError::Generation(_) => error,
                other => RagError::Generation(other.to_string()),
            })
    }
}

pub struct OpenRouterChat {
    client: Client,
    endpoint: Url,
    model: String,
    api_key: Option<String>,
    referer: String,
    title: String,
}

impl OpenRouterChat {
    pub fn new(config: &ProviderConfig) -> Result<Self, RagError> {
        Ok(Self {
            client: Client::new(),
            endpoint: config.endpoint("chat/completions")?,
            model: config.chat_model.clone(),
            api_key: config.api_key.clone(),
            referer: config.app_referer.clone(),
            title: config.app_title.clone(),
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: usize,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

fn first_completion(response: ChatResponse) -> Result<String, RagError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| RagError::Generation("response carried no completion".to_string()))
}

#[async_trait]
impl LanguageModel for OpenRouterChat {
    async fn complete(&self, prompt: &str, params: GenerationParams) -> Result<String, RagError> {
        let api_key = self.api_key.as_deref().ok_or(RagError::MissingApiKey)?;
        let body = ChatRequest {
            model: &self.model,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(&body)
            .send()
            .await
            .map_err(|error| RagError::Generation(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RagError::Generation(format!("{} returned {status}: {text}", self.endpoint)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|error| RagError::Generation(format!("malformed completion: {error}")))?;
        first_completion(parsed)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::Chunk;
    use std::sync::Mutex;

    pub(crate) struct ScriptedModel {
        pub reply: Result<String, String>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn last_prompt(&self) -> String {
            self.prompts
                .lock()
                .map(|prompts| prompts.last().cloned().unwrap_or_default())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete(&self, prompt: &str, _params: GenerationParams) -> Result<String, RagError> {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(prompt.to_string());
            }
            self.reply.clone().map_err(|details| RagError::BackendResponse {
                backend: "scripted".to_string(),
                details,
            })
        }
    }

    fn hit(index: usize, text: &str) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                chunk_id: format!("c{index}"),
                chunk_index: index,
                text: text.to_string(),
            },
            score: 1.0,
        }
    }

    #[test]
    fn context_joins_retrieved_chunks() {
        let context = assemble_context(&[hit(0, "first"), hit(1, "ثاني")], "fallback", 500);
        assert_eq!(context, "first\nثاني");
    }

    #[test]
    fn blank_retrieval_falls_back_to_char_bounded_excerpt() {
        let fallback = "مرحبا ".repeat(200);
        let context = assemble_context(&[hit(0, "  ")], &fallback, 500);
        assert_eq!(context.chars().count(), 500);
        assert!(fallback.starts_with(&context));
        assert_eq!(assemble_context(&[], "short", 500), "short");
    }

    #[test]
    fn prompt_names_language_context_and_question() {
        let prompt = build_prompt("the context", "what is it?", "Arabic");
        assert!(prompt.contains("Answer in Arabic."));
        assert!(prompt.contains("strictly on the provided context"));
        assert!(prompt.contains("Context:\nthe context\n\nQuestion: what is it?\nAnswer:"));
    }

    #[tokio::test]
    async fn answer_returns_model_reply_verbatim() {
        let answerer = Answerer::new(
            ScriptedModel::replying("  الجواب هنا \n"),
            GenerationParams::default(),
            "Arabic",
        );
        let reply = answerer
            .answer(&[hit(2, "pump pressure is 5 bar")], "pressure?", "")
            .await
            .expect("scripted reply");

        assert_eq!(reply, "  الجواب هنا \n");
        assert!(answerer.model().last_prompt().contains("pump pressure is 5 bar"));
    }

    #[tokio::test]
    async fn empty_retrieval_still_answers_from_fallback() {
        let answerer = Answerer::new(ScriptedModel::replying("ok"), GenerationParams::default(), "Arabic");
        let reply = answerer
            .answer(&[], "anything?", "raw document text")
            .await
            .expect("scripted reply");

        assert_eq!(reply, "ok");
        assert!(answerer.model().last_prompt().contains("Context:\nraw document text"));
    }

    #[tokio::test]
    async fn model_failure_is_a_generation_error() {
        let model = ScriptedModel {
            reply: Err("bad".to_string()),
            prompts: Mutex::new(Vec::new()),
        };
        let answerer = Answerer::new(model, GenerationParams::default(), "Arabic");
        let error = answerer
            .answer(&[hit(0, "x")], "q", "")
            .await
            .expect_err("failure should surface");
        assert!(matches!(error, RagError::Generation(_)));
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let chat = OpenRouterChat::new(&ProviderConfig::default()).expect("default endpoint");
        let error = chat
            .complete("hi", GenerationParams::default())
            .await
            .expect_err("no key configured");
        assert!(matches!(error, RagError::MissingApiKey));
    }

    #[test]
    fn completion_text_is_taken_from_first_choice() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"first"}},{"message":{"content":"second"}}]}"#,
        )
        .expect("response should parse");
        assert_eq!(first_completion(parsed).expect("has content"), "first");

        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).expect("parses");
        assert!(matches!(first_completion(empty), Err(RagError::Generation(_))));
    }
}
