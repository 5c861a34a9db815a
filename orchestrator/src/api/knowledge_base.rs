use crate::agents::KnowledgeBase;
use crate::error::reject;
use std::sync::Arc;
use warp::{Rejection, Reply};

pub async fn handle_stats(knowledge_base: Arc<KnowledgeBase>) -> Result<impl Reply, Rejection> {
    let stats = knowledge_base.stats().await.map_err(reject)?;
    Ok(warp::reply::json(&stats))
}
