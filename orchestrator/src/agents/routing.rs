// Routing Agent: guardrails -> route selection -> solution -> output check, one question at a time

use super::decision::RouteSelector;
use super::guardrails::GuardrailsAgent;
use super::solver::SolverAgent;
use crate::error::AgentError;
use crate::metrics;
use crate::models::{Difficulty, MathResponse, Question, Route, StructuredSolution};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

pub struct RoutingAgent {
    guardrails: Arc<GuardrailsAgent>,
    selector: RouteSelector,
    solver: Arc<SolverAgent>,
    timeout: Duration,
}

impl RoutingAgent {
    pub fn new(
        guardrails: Arc<GuardrailsAgent>,
        selector: RouteSelector,
        solver: Arc<SolverAgent>,
        timeout: Duration,
    ) -> Self {
        Self {
            guardrails,
            selector,
            solver,
            timeout,
        }
    }

    /// Answers a question. The only error is an input-guardrail rejection;
    /// every later failure becomes a degraded response.
    pub async fn process(&self, question: &Question) -> Result<MathResponse, AgentError> {
        let started = Instant::now();
        info!(
            "Processing question: {}... (topic: {:?}, level: {:?})",
            preview(&question.question),
            question.topic,
            question.difficulty_level
        );

        let verdict = self.guardrails.validate_input(question);
        if !verdict.is_valid {
            metrics::GUARDRAIL_REJECTIONS.with_label_values(&["input"]).inc();
            warn!("Input validation failed: {}", verdict.reason);
            return Err(AgentError::Validation(verdict.reason));
        }

        let outcome = match tokio::time::timeout(self.timeout, self.route_and_solve(question)).await {
            Ok(result) => result,
            Err(_) => Err(AgentError::Timeout(self.timeout)),
        };

        let response = match outcome {
            Ok((route, solution, sources, confidence)) => {
                metrics::QUESTIONS_BY_ROUTE.with_label_values(&[route.as_str()]).inc();
                MathResponse {
                    question: question.question.clone(),
                    solution,
                    route_used: route,
                    confidence_score: confidence,
                    sources,
                    response_time: started.elapsed().as_secs_f64(),
                    timestamp: Utc::now(),
                }
            }
            Err(e) => {
                error!("Error processing question: {}", e);
                metrics::DEGRADED_RESPONSES.inc();
                degraded_response(question, &e, started)
            }
        };

        metrics::REQUEST_SECONDS.observe(response.response_time);
        info!(
            "Processed question using {} route in {:.2}s",
            response.route_used, response.response_time
        );
        Ok(response)
    }

    async fn route_and_solve(
        &self,
        question: &Question,
    ) -> Result<(Route, StructuredSolution, Vec<String>, f32), AgentError> {
        let decision = self.selector.decide(&question.question).await;

        let solution = self
            .solver
            .solve(
                &question.question,
                question.context.as_deref(),
                decision.evidence.as_deref(),
            )
            .await?;

        let verdict = self.guardrails.validate_output(&solution.as_text());
        if !verdict.is_valid {
            metrics::GUARDRAIL_REJECTIONS.with_label_values(&["output"]).inc();
            warn!("Output validation warning: {}", verdict.reason);
            if self.guardrails.enforces_output() {
                return Err(AgentError::Validation(format!(
                    "generated solution failed output checks: {}",
                    verdict.reason
                )));
            }
        }

        Ok((decision.route, solution, decision.sources, decision.confidence))
    }
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}

fn degraded_response(question: &Question, err: &AgentError, started: Instant) -> MathResponse {
    MathResponse {
        question: question.question.clone(),
        solution: StructuredSolution {
            steps: vec![format!("Error: {}", err)],
            explanation: "An error occurred while processing your question.".to_string(),
            final_answer: "Please try rephrasing your question.".to_string(),
            difficulty_assessment: Difficulty::Intermediate,
        },
        route_used: Route::Hybrid,
        confidence_score: 0.0,
        sources: vec![],
        response_time: started.elapsed().as_secs_f64(),
        timestamp: Utc::now(),
    }
}
