use super::{SearchHit, SearchProvider, SearchRequest};
use crate::error::BackendError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct TavilyClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    #[serde(flatten)]
    search: &'a SearchRequest,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

impl TavilyClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl SearchProvider for TavilyClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, BackendError> {
        let body = TavilyRequest {
            api_key: &self.api_key,
            search: request,
        };
        let resp = self
            .http
            .post(format!("{}/search", self.base_url))
            .json(&body)
            .send()
            .await?;

        match resp.status().as_u16() {
            200..=299 => {}
            429 => {
                let body = resp.text().await.unwrap_or_default();
                return Err(BackendError::RateLimited(body));
            }
            status => {
                let body = resp.text().await.unwrap_or_default();
                return Err(BackendError::Status { status, body });
            }
        }

        let data: TavilyResponse = resp.json().await?;
        Ok(data.results)
    }
}
