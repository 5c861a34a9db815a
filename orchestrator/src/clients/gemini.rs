use super::{GenerationBackend, GenerationResponse};
use crate::error::BackendError;
use async_trait::async_trait;
use serde_json::json;

/// Gemini `generateContent` over REST.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<GenerationResponse, BackendError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": temperature,
                "maxOutputTokens": max_tokens,
                "topP": 0.8,
                "topK": 40
            }
        });

        let resp = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if (200..300).contains(&status) {
            return Ok(resp.json().await?);
        }

        let body = resp.text().await.unwrap_or_default();
        if status == 429 || body.contains("RESOURCE_EXHAUSTED") {
            Err(BackendError::RateLimited(body))
        } else {
            Err(BackendError::Status { status, body })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::canned_server;
    use serde_json::Value;
    use std::collections::HashMap;
    use warp::Filter;

    fn client(base_url: String) -> GeminiClient {
        GeminiClient::new(reqwest::Client::new(), base_url, "test-key", "gemini-test")
    }

    #[tokio::test]
    async fn test_429_is_rate_limited() {
        let base = canned_server(429, r#"{"error": {"code": 429, "message": "slow down"}}"#);
        let err = client(base).generate("q", 10, 0.3).await.unwrap_err();
        assert!(err.is_rate_limit());
    }

    #[tokio::test]
    async fn test_resource_exhausted_body_is_rate_limited() {
        let base = canned_server(
            400,
            r#"{"error": {"code": 400, "status": "RESOURCE_EXHAUSTED", "message": "quota"}}"#,
        );
        let err = client(base).generate("q", 10, 0.3).await.unwrap_err();
        assert!(err.is_rate_limit());
    }

    #[tokio::test]
    async fn test_server_error_is_not_retryable() {
        let base = canned_server(500, r#"{"error": {"code": 500, "status": "INTERNAL"}}"#);
        let err = client(base).generate("q", 10, 0.3).await.unwrap_err();
        assert!(!err.is_rate_limit());
        assert!(matches!(err, BackendError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_decodes_candidates_from_generate_content() {
        let route = warp::path!("models" / String)
            .and(warp::post())
            .and(warp::query::<HashMap<String, String>>())
            .and(warp::body::json())
            .map(|method: String, query: HashMap<String, String>, body: Value| {
                let ok = method == "gemini-test:generateContent"
                    && query.get("key").map(String::as_str) == Some("test-key")
                    && body["contents"][0]["parts"][0]["text"] == "What is 2 + 2?"
                    && body["generationConfig"]["maxOutputTokens"] == 20
                    && body["generationConfig"]["topK"] == 40;
                let reply = if ok {
                    serde_json::json!({
                        "candidates": [{"content": {"parts": [{"text": "FINAL ANSWER: 4"}]}}]
                    })
                } else {
                    serde_json::json!({"candidates": []})
                };
                warp::reply::json(&reply)
            });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let resp = client(format!("http://{}/", addr))
            .generate("What is 2 + 2?", 20, 0.1)
            .await
            .unwrap();
        assert_eq!(resp.text(), Some("FINAL ANSWER: 4"));
    }
}
