use crate::agents::KnowledgeBase;
use crate::feedback::FeedbackStore;
use crate::models::HealthCheck;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;
use warp::{Rejection, Reply};

/// Probes the stateful collaborators. Always answers 200; a failing probe
/// turns the status to "degraded".
pub async fn handle_health(
    knowledge_base: Arc<KnowledgeBase>,
    feedback: Arc<dyn FeedbackStore>,
) -> Result<impl Reply, Rejection> {
    let mut services = BTreeMap::new();

    let kb_ok = match knowledge_base.stats().await {
        Ok(_) => true,
        Err(e) => {
            warn!("Knowledge base health probe failed: {}", e);
            false
        }
    };
    services.insert("knowledge_base".to_string(), kb_ok);

    let feedback_ok = feedback.analytics().await.is_ok();
    services.insert("feedback_service".to_string(), feedback_ok);

    let status = if services.values().all(|ok| *ok) {
        "healthy"
    } else {
        "degraded"
    };

    Ok(warp::reply::json(&HealthCheck {
        status: status.to_string(),
        timestamp: Utc::now(),
        services,
    }))
}
