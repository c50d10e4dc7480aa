use crate::error::RagError;
use tracing::{info, warn};
use url::Url;

pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_CHAT_MODEL: &str = "mistralai/mistral-7b-instruct:free";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub app_referer: String,
    pub app_title: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            temperature: 0.2,
            max_tokens: 512,
            app_referer: "http://localhost:8000".to_string(),
            app_title: "PDF Extractor App".to_string(),
        }
    }
}

impl ProviderConfig {
    pub fn from_env() -> Self {
        Self::default().with_api_key(std::env::var(API_KEY_ENV).ok())
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        if self.api_key.is_some() {
            info!("api key loaded");
        } else {
            warn!(env = API_KEY_ENV, "api key not found; remote calls will fail");
        }
        self
    }

    pub fn require_api_key(&self) -> Result<&str, RagError> {
        self.api_key.as_deref().ok_or(RagError::MissingApiKey)
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, RagError> {
        let base = format!("{}/", self.base_url.trim_end_matches('/'));
        Ok(Url::parse(&base)?.join(path)?)
    }
}
