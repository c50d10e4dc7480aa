use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("pdf not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("image decode error: {0}")]
    Image(String),

    #[error("ocr failed: {0}")]
    OcrFailed(String),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<lopdf::Error> for ExtractError {
    fn from(error: lopdf::Error) -> Self {
        Self::PdfParse(error.to_string())
    }
}

impl From<image::ImageError> for ExtractError {
    fn from(error: image::ImageError) -> Self {
        Self::Image(error.to_string())
    }
}

#[derive(Debug, Error)]
pub enum RagError {
    #[error("no api key configured; set OPENROUTER_API_KEY")]
    MissingApiKey,

    #[error("embedding request failed: {0}")]
    Embedding(String),

    #[error("generation request failed: {0}")]
    Generation(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },
}

pub type Result<T, E = ExtractError> = std::result::Result<T, E>;
