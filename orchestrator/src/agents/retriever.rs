// Retriever Agent: evidence lookup against the web, behind the shared EvidenceSource seam

use crate::clients::{SearchHit, SearchProvider, SearchRequest};
use crate::models::EvidenceResult;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

/// A place the route selector can look for supporting material.
///
/// Implementations absorb their own failures and report them as
/// `found = false`, so callers never see an error.
#[async_trait]
pub trait EvidenceSource: Send + Sync {
    async fn search(&self, query: &str) -> EvidenceResult;
}

const QUERY_PREFIX: &str = "mathematics solve step by step: ";

const INCLUDE_DOMAINS: &[&str] = &[
    "khanacademy.org",
    "mathway.com",
    "wolframalpha.com",
    "stackoverflow.com",
    "math.stackexchange.com",
];

const EXCLUDE_DOMAINS: &[&str] = &["pinterest.com", "instagram.com"];

pub struct WebSearchRetriever {
    provider: Arc<dyn SearchProvider>,
    max_results: usize,
}

impl WebSearchRetriever {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            provider,
            max_results: 3,
        }
    }

    fn request_for(&self, question: &str) -> SearchRequest {
        SearchRequest {
            query: format!("{}{}", QUERY_PREFIX, question),
            search_depth: "advanced".to_string(),
            max_results: self.max_results,
            include_domains: INCLUDE_DOMAINS.iter().map(|d| d.to_string()).collect(),
            exclude_domains: EXCLUDE_DOMAINS.iter().map(|d| d.to_string()).collect(),
        }
    }
}

#[async_trait]
impl EvidenceSource for WebSearchRetriever {
    async fn search(&self, query: &str) -> EvidenceResult {
        info!("Retriever: Web search for: {}", query);
        let request = self.request_for(query);

        let hits = match self.provider.search(&request).await {
            Ok(hits) => hits,
            Err(e) => {
                error!("Error in web search: {}", e);
                return EvidenceResult::not_found();
            }
        };

        if hits.is_empty() {
            return EvidenceResult::not_found();
        }

        let hits: Vec<SearchHit> = hits.into_iter().take(self.max_results).collect();
        EvidenceResult {
            found: true,
            content: Some(combine_hits(&hits)),
            score: None,
            sources: hits.into_iter().map(|h| h.url).collect(),
        }
    }
}

/// Labels each non-empty snippet as "Source i - title:" and joins them.
fn combine_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .filter(|(_, hit)| !hit.content.is_empty())
        .map(|(i, hit)| {
            let n = i + 1;
            let title = if hit.title.is_empty() {
                format!("Source {}", n)
            } else {
                hit.title.clone()
            };
            format!("Source {} - {}:\n{}\n", n, title, hit.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
