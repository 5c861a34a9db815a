//! Interfaces to the services the routing agent depends on, with their
//! HTTP implementations.

use crate::error::BackendError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod embedding;
pub mod gemini;
pub mod qdrant;
pub mod tavily;

pub use embedding::EmbeddingClient;
pub use gemini::GeminiClient;
pub use qdrant::QdrantStore;
pub use tavily::TavilyClient;

/// Dimension of the sentence embeddings stored in the knowledge base.
pub const EMBEDDING_DIM: usize = 384;

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BackendError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: serde_json::Value,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl ScoredPoint {
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(|v| v.as_str())
    }
}

/// Cosine-similarity vector store.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Creates the collection if missing. Returns true when it was created.
    async fn ensure_collection(&self, dim: usize) -> Result<bool, BackendError>;

    async fn upsert(
        &self,
        id: &str,
        vector: Vec<f32>,
        payload: serde_json::Value,
    ) -> Result<(), BackendError>;

    /// Hits ranked by descending score.
    async fn search(
        &self,
        vector: Vec<f32>,
        limit: usize,
        score_threshold: Option<f32>,
    ) -> Result<Vec<ScoredPoint>, BackendError>;

    async fn list_all(&self) -> Result<Vec<ScoredPoint>, BackendError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    pub query: String,
    pub search_depth: String,
    pub max_results: usize,
    pub include_domains: Vec<String>,
    pub exclude_domains: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub url: String,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, BackendError>;
}

/// Raw generation output. Backends answer either with a flat `text` field
/// or with the nested candidates/content/parts layout.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationResponse {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

impl GenerationResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            candidates: vec![],
        }
    }

    /// Direct text first, then the first part of the first candidate.
    pub fn text(&self) -> Option<&str> {
        if let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) {
            return Some(text);
        }
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Label reported as the source when an answer has no external evidence.
    fn model(&self) -> &str;

    async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<GenerationResponse, BackendError>;
}
