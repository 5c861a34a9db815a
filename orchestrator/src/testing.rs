//! In-process doubles for the external services, used by unit tests.

use crate::agents::retriever::EvidenceSource;
use crate::clients::{Embedder, GenerationBackend, GenerationResponse, ScoredPoint, VectorStore, EMBEDDING_DIM};
use crate::error::BackendError;
use crate::models::EvidenceResult;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use warp::http::StatusCode;
use warp::Filter;

/// Evidence source returning the same result on every call.
pub struct ScriptedSource {
    result: EvidenceResult,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(result: EvidenceResult) -> Arc<Self> {
        Arc::new(Self {
            result,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EvidenceSource for ScriptedSource {
    async fn search(&self, _query: &str) -> EvidenceResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Generation backend that replays a script of outcomes in order.
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<GenerationResponse, BackendError>>>,
    fallback: Option<GenerationResponse>,
    delay: Duration,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Result<GenerationResponse, BackendError>>) -> Arc<Self> {
        Arc::new(Self::build(script, None))
    }

    /// Answers every call with `response`.
    pub fn repeating(response: GenerationResponse) -> Arc<Self> {
        Arc::new(Self::build(vec![], Some(response)))
    }

    fn build(
        script: Vec<Result<GenerationResponse, BackendError>>,
        fallback: Option<GenerationResponse>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn with_delay(self: Arc<Self>, delay: Duration) -> Arc<Self> {
        let mut inner = Arc::try_unwrap(self).unwrap_or_else(|_| panic!("backend already shared"));
        inner.delay = delay;
        Arc::new(inner)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn generate(
        &self,
        prompt: &str,
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<GenerationResponse, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        match (next, &self.fallback) {
            (Some(outcome), _) => outcome,
            (None, Some(response)) => Ok(response.clone()),
            (None, None) => Err(BackendError::Decode("script exhausted".to_string())),
        }
    }
}

/// Embeds every text as the same unit-length vector.
pub struct FixedEmbedder;

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BackendError> {
        let mut vector = vec![0.0; EMBEDDING_DIM];
        vector[0] = 1.0;
        Ok(texts.iter().map(|_| vector.clone()).collect())
    }
}

/// Vector store keeping upserts in memory, replaced by id; search answers from canned hits.
#[derive(Default)]
pub struct MemoryVectorStore {
    created: Mutex<bool>,
    points: Mutex<Vec<ScoredPoint>>,
    hits: Mutex<Vec<ScoredPoint>>,
    failing: bool,
}

impl MemoryVectorStore {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn push_hit(&self, score: f32, payload: Value) {
        let mut hits = self.hits.lock().unwrap();
        let id = Value::from(hits.len());
        hits.push(ScoredPoint {
            id,
            score,
            payload,
        });
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    }

    fn check(&self) -> Result<(), BackendError> {
        if self.failing {
            Err(BackendError::Status {
                status: 503,
                body: "store offline".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn ensure_collection(&self, _dim: usize) -> Result<bool, BackendError> {
        self.check()?;
        let mut created = self.created.lock().unwrap();
        let newly = !*created;
        *created = true;
        Ok(newly)
    }

    async fn upsert(&self, id: &str, _vector: Vec<f32>, payload: Value) -> Result<(), BackendError> {
        self.check()?;
        let mut points = self.points.lock().unwrap();
        points.retain(|p| p.id.as_str() != Some(id));
        points.push(ScoredPoint {
            id: Value::from(id),
            score: 0.0,
            payload,
        });
        Ok(())
    }

    async fn search(
        &self,
        _vector: Vec<f32>,
        limit: usize,
        score_threshold: Option<f32>,
    ) -> Result<Vec<ScoredPoint>, BackendError> {
        self.check()?;
        let floor = score_threshold.unwrap_or(f32::MIN);
        Ok(self
            .hits
            .lock()
            .unwrap()
            .iter()
            .filter(|hit| hit.score >= floor)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<ScoredPoint>, BackendError> {
        self.check()?;
        Ok(self.points.lock().unwrap().clone())
    }
}

/// Serves `body` with `status` on every path from an ephemeral local port.
/// Returns the base URL.
pub fn canned_server(status: u16, body: &'static str) -> String {
    let status = StatusCode::from_u16(status).unwrap();
    let route = warp::any().map(move || {
        warp::reply::with_status(
            warp::reply::with_header(body, "content-type", "application/json"),
            status,
        )
    });
    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    format!("http://{}", addr)
}
