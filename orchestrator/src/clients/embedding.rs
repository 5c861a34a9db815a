use super::{Embedder, EMBEDDING_DIM};
use crate::error::BackendError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// Client for the sentence-embedding service (`POST /embed`).
#[derive(Clone)]
pub struct EmbeddingClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl EmbeddingClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BackendError> {
        let resp = self
            .http
            .post(format!("{}/embed", self.base_url))
            .json(&json!({ "texts": texts }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        let data: EmbedResponse = resp.json().await?;
        if data.embeddings.len() != texts.len() {
            return Err(BackendError::Decode(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                data.embeddings.len()
            )));
        }
        if let Some(bad) = data.embeddings.iter().find(|v| v.len() != EMBEDDING_DIM) {
            return Err(BackendError::Decode(format!(
                "embedding has dimension {}, expected {}",
                bad.len(),
                EMBEDDING_DIM
            )));
        }
        Ok(data.embeddings)
    }
}
