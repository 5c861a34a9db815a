use crate::error::reject;
use crate::feedback::{self, FeedbackStore};
use crate::models::{FeedbackRequest, FeedbackResponse};
use std::sync::Arc;
use tracing::info;
use warp::{Rejection, Reply};

pub async fn handle_feedback(
    request: FeedbackRequest,
    store: Arc<dyn FeedbackStore>,
) -> Result<impl Reply, Rejection> {
    let response_id = request.response_id.clone();
    let feedback_id = feedback::submit(store.as_ref(), request)
        .await
        .map_err(reject)?;
    info!("Stored feedback {} for response {}", feedback_id, response_id);

    Ok(warp::reply::json(&FeedbackResponse {
        message: "Thank you for your feedback! We'll use it to improve our responses.".to_string(),
        feedback_id,
        status: "processed".to_string(),
    }))
}

pub async fn handle_analytics(store: Arc<dyn FeedbackStore>) -> Result<impl Reply, Rejection> {
    let analytics = store.analytics().await.map_err(reject)?;
    Ok(warp::reply::json(&analytics))
}
