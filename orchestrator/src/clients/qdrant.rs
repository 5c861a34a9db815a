use super::{ScoredPoint, VectorStore};
use crate::error::BackendError;
use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

const SCROLL_PAGE: usize = 256;

/// Qdrant REST client bound to one collection.
#[derive(Clone)]
pub struct QdrantStore {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    collection: String,
}

#[derive(Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Deserialize)]
struct ScrollPage {
    points: Vec<ScoredPoint>,
    next_page_offset: Option<Value>,
}

impl QdrantStore {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            collection: collection.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/collections/{}{}", self.base_url, self.collection, path)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("api-key", key),
            None => req,
        }
    }

    async fn send<T: for<'de> Deserialize<'de>>(&self, req: RequestBuilder) -> Result<T, BackendError> {
        let resp = self.authed(req).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }
        let envelope: Envelope<T> = resp.json().await?;
        Ok(envelope.result)
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(&self, dim: usize) -> Result<bool, BackendError> {
        let resp = self.authed(self.http.get(self.url(""))).send().await?;
        match resp.status() {
            s if s.is_success() => return Ok(false),
            StatusCode::NOT_FOUND => {}
            s => {
                let body = resp.text().await.unwrap_or_default();
                return Err(BackendError::Status { status: s.as_u16(), body });
            }
        }

        let body = json!({ "vectors": { "size": dim, "distance": "Cosine" } });
        let _: Value = self.send(self.http.put(self.url("")).json(&body)).await?;
        info!("Created collection: {}", self.collection);
        Ok(true)
    }

    async fn upsert(&self, id: &str, vector: Vec<f32>, payload: Value) -> Result<(), BackendError> {
        let body = json!({ "points": [{ "id": id, "vector": vector, "payload": payload }] });
        let _: Value = self
            .send(self.http.put(self.url("/points?wait=true")).json(&body))
            .await?;
        Ok(())
    }

    async fn search(
        &self,
        vector: Vec<f32>,
        limit: usize,
        score_threshold: Option<f32>,
    ) -> Result<Vec<ScoredPoint>, BackendError> {
        let mut body = json!({ "vector": vector, "limit": limit, "with_payload": true });
        if let Some(threshold) = score_threshold {
            body["score_threshold"] = json!(threshold);
        }
        self.send(self.http.post(self.url("/points/search")).json(&body))
            .await
    }

    async fn list_all(&self) -> Result<Vec<ScoredPoint>, BackendError> {
        let mut points = Vec::new();
        let mut offset: Option<Value> = None;
        loop {
            let mut body = json!({ "limit": SCROLL_PAGE, "with_payload": true });
            if let Some(next) = offset.take() {
                body["offset"] = next;
            }
            let page: ScrollPage = self
                .send(self.http.post(self.url("/points/scroll")).json(&body))
                .await?;
            points.extend(page.points);
            match page.next_page_offset {
                Some(next) if !next.is_null() => offset = Some(next),
                _ => break,
            }
        }
        Ok(points)
    }
}
