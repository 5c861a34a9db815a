use crate::agents::{RoutingAgent, SolverAgent};
use crate::error::{reject, ApiError};
use crate::models::{DifficultyRequest, DifficultyResponse, ImproveRequest, Question};
use std::sync::Arc;
use tracing::info;
use warp::{Rejection, Reply};

pub async fn handle_ask(
    question: Question,
    routing: Arc<RoutingAgent>,
) -> Result<impl Reply, Rejection> {
    if question.question.trim().is_empty() {
        return Err(reject(ApiError::BadRequest("question must not be empty".to_string())));
    }

    let response = routing.process(&question).await.map_err(reject)?;
    Ok(warp::reply::json(&response))
}

pub async fn handle_difficulty(
    request: DifficultyRequest,
    solver: Arc<SolverAgent>,
) -> Result<impl Reply, Rejection> {
    if request.question.trim().is_empty() {
        return Err(reject(ApiError::BadRequest("question must not be empty".to_string())));
    }

    let difficulty = solver.assess_difficulty(&request.question).await;
    Ok(warp::reply::json(&DifficultyResponse { difficulty }))
}

pub async fn handle_improve(
    request: ImproveRequest,
    solver: Arc<SolverAgent>,
) -> Result<impl Reply, Rejection> {
    info!("Improving solution with reviewer feedback");
    let solution = solver
        .improve_with_feedback(&request.question, &request.solution, &request.feedback)
        .await;
    Ok(warp::reply::json(&solution))
}
