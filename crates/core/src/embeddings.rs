use crate::error::SearchError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const DEFAULT: usize = 128;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

/// Identifier of the sentence-transformer model served by remote backends.
pub const EMBEDDING_MODEL_ID: &str = "all-MiniLM-L6-v2";

pub const MINILM_DIMENSIONS: usize = 384;

/// Maps text to a fixed-length vector. Index and query must share one embedder.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_id(&self) -> &str;
    fn dimensions(&self) -> usize;
    async fn embed(&self, text: &str) -> Result<Vec<f32>, SearchError>;
}

/// Hashed character trigrams, L2-normalised. Deterministic and offline.
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
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl Embedder for CharacterNgramEmbedder {
    fn model_id(&self) -> &str {
        "char-trigram-hash"
    }

    fn dimensions(&self) -> usize {
        self.dimensions.max(1)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        Ok(self.embed_text(text))
    }
}

#[derive(Debug, Clone)]
pub struct HttpEmbedderConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub dimensions: usize,
    pub timeout: Duration,
}

impl HttpEmbedderConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            dimensions: MINILM_DIMENSIONS,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingEntry>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingEntry {
    embedding: Vec<f32>,
}

/// Client for an OpenAI-compatible `/embeddings` endpoint serving
/// [`EMBEDDING_MODEL_ID`].
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    dimensions: usize,
}

impl HttpEmbedder {
    pub fn new(config: HttpEmbedderConfig) -> Result<Self, SearchError> {
        let endpoint = Url::parse(config.endpoint.trim())?;
        let client = Client::builder().timeout(config.timeout).build()?;
        let api_key = config
            .api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        Ok(Self {
            client,
            endpoint,
            api_key,
            dimensions: config.dimensions,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_id(&self) -> &str {
        EMBEDDING_MODEL_ID
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        let payload = EmbeddingRequest {
            model: EMBEDDING_MODEL_ID,
            input: [text],
        };

        let mut request = self.client.post(self.endpoint.clone()).json(&payload);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::BackendResponse {
                backend: self.endpoint.to_string(),
                details: format!("status {status}: {body}"),
            });
        }

        let body = response.bytes().await?;
        parse_embedding_response(&body, self.dimensions, self.endpoint.as_str())
    }
}

fn parse_embedding_response(
    body: &[u8],
    dimensions: usize,
    backend: &str,
) -> Result<Vec<f32>, SearchError> {
    let parsed: EmbeddingResponse =
        serde_json::from_slice(body).map_err(|error| SearchError::BackendResponse {
            backend: backend.to_string(),
            details: error.to_string(),
        })?;

    let entry = parsed
        .data
        .into_iter()
        .next()
        .ok_or_else(|| SearchError::BackendResponse {
            backend: backend.to_string(),
            details: "response contained no embeddings".to_string(),
        })?;

    if entry.embedding.len() != dimensions {
        return Err(SearchError::DimensionMismatch {
            expected: dimensions,
            actual: entry.embedding.len(),
        });
    }

    Ok(entry.embedding)
}
