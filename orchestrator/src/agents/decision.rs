// Decision Agent: picks the evidence route for a question and blends its confidence

use super::retriever::EvidenceSource;
use crate::config::RoutingThresholds;
use crate::models::{Route, RouteDecision};
use std::sync::Arc;
use tracing::info;

/// Confidence credited to web evidence when it is used.
const WEB_FOUND_CONFIDENCE: f32 = 0.7;
/// Confidence credited to the web side of a hybrid blend when it came back empty.
const WEB_MISSING_CONFIDENCE: f32 = 0.3;
/// Confidence when the answer rests on the model alone.
const NO_EVIDENCE_CONFIDENCE: f32 = 0.5;

pub struct RouteSelector {
    knowledge_base: Arc<dyn EvidenceSource>,
    web: Arc<dyn EvidenceSource>,
    thresholds: RoutingThresholds,
    /// Source label used when no evidence backs the answer.
    model_label: String,
}

impl RouteSelector {
    pub fn new(
        knowledge_base: Arc<dyn EvidenceSource>,
        web: Arc<dyn EvidenceSource>,
        thresholds: RoutingThresholds,
        model_label: impl Into<String>,
    ) -> Self {
        Self {
            knowledge_base,
            web,
            thresholds,
            model_label: model_label.into(),
        }
    }

    /// KB score above `knowledge_base` trusts the index alone; above `hybrid`
    /// corroborates with the web; otherwise falls through to web search.
    /// Never fails: retrievers report problems as `found = false`.
    pub async fn decide(&self, question: &str) -> RouteDecision {
        let kb = self.knowledge_base.search(question).await;
        let score = kb.score.unwrap_or(0.0);

        if kb.found && score > self.thresholds.knowledge_base {
            info!("Using knowledge base route (similarity: {:.3})", score);
            return RouteDecision::new(
                Route::KnowledgeBase,
                kb.content,
                kb.sources.into_iter().take(1).collect(),
                score,
            );
        }

        if kb.found && score > self.thresholds.hybrid {
            info!("Using hybrid route (KB similarity: {:.3})", score);
            let web = self.web.search(question).await;

            let mut evidence = String::new();
            let mut sources = Vec::new();
            if let Some(content) = kb.content.as_deref().filter(|c| !c.is_empty()) {
                evidence.push_str(&format!("Knowledge Base: {}\n\n", content));
                sources.extend(kb.sources.into_iter().take(1));
            }
            if web.found {
                if let Some(content) = web.content.as_deref().filter(|c| !c.is_empty()) {
                    evidence.push_str(&format!("Web Search: {}", content));
                    sources.extend(web.sources);
                }
            }

            let web_confidence = if web.found {
                WEB_FOUND_CONFIDENCE
            } else {
                WEB_MISSING_CONFIDENCE
            };
            let evidence = (!evidence.is_empty()).then_some(evidence);
            return RouteDecision::new(
                Route::Hybrid,
                evidence,
                sources,
                (score + web_confidence) / 2.0,
            );
        }

        info!("Using web search route (KB similarity: {:.3})", score);
        let web = self.web.search(question).await;
        if web.found {
            return RouteDecision::new(Route::WebSearch, web.content, web.sources, WEB_FOUND_CONFIDENCE);
        }

        info!("No external sources found, answering from {} alone", self.model_label);
        RouteDecision::new(
            Route::WebSearch,
            None,
            vec![self.model_label.clone()],
            NO_EVIDENCE_CONFIDENCE,
        )
    }
}
