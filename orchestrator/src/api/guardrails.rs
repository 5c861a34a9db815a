use crate::agents::GuardrailsAgent;
use crate::models::{OutputCheckRequest, Question};
use std::sync::Arc;
use warp::{Rejection, Reply};

pub async fn handle_input_check(
    question: Question,
    guardrails: Arc<GuardrailsAgent>,
) -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&guardrails.validate_input(&question)))
}

pub async fn handle_output_check(
    request: OutputCheckRequest,
    guardrails: Arc<GuardrailsAgent>,
) -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&guardrails.validate_output(&request.text)))
}
