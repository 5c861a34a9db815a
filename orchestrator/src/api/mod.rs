use crate::agents::{GuardrailsAgent, KnowledgeBase, RoutingAgent, SolverAgent};
use crate::feedback::FeedbackStore;
use crate::middleware::{self, SharedLimiter};
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, Rejection, Reply};

mod ask;
mod feedback;
mod guardrails;
mod health;
mod knowledge_base;

/// Shared handles every handler may draw from.
#[derive(Clone)]
pub struct Services {
    pub routing: Arc<RoutingAgent>,
    pub solver: Arc<SolverAgent>,
    pub guardrails: Arc<GuardrailsAgent>,
    pub knowledge_base: Arc<KnowledgeBase>,
    pub feedback: Arc<dyn FeedbackStore>,
}

pub fn routes(
    services: Services,
    limiter: SharedLimiter,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let api = warp::path("api").and(warp::path("v1"));

    let health_route = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_knowledge_base(services.knowledge_base.clone()))
        .and(with_feedback(services.feedback.clone()))
        .and_then(health::handle_health);

    let ask_route = api
        .and(warp::path("ask"))
        .and(warp::path::end())
        .and(warp::post())
        .and(middleware::rate_limited(limiter))
        .and(warp::body::content_length_limit(64 * 1024))
        .and(warp::body::json())
        .and(with_routing(services.routing.clone()))
        .and_then(ask::handle_ask);

    let difficulty_route = api
        .and(warp::path("difficulty"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(with_solver(services.solver.clone()))
        .and_then(ask::handle_difficulty);

    let improve_route = api
        .and(warp::path("improve"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(with_solver(services.solver.clone()))
        .and_then(ask::handle_improve);

    let feedback_route = api
        .and(warp::path("feedback"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(with_feedback(services.feedback.clone()))
        .and_then(feedback::handle_feedback);

    let analytics_route = api
        .and(warp::path!("analytics" / "feedback"))
        .and(warp::get())
        .and(with_feedback(services.feedback.clone()))
        .and_then(feedback::handle_analytics);

    let kb_stats_route = api
        .and(warp::path!("knowledge-base" / "stats"))
        .and(warp::get())
        .and(with_knowledge_base(services.knowledge_base.clone()))
        .and_then(knowledge_base::handle_stats);

    let input_check_route = api
        .and(warp::path!("guardrails" / "input"))
        .and(warp::post())
        .and(warp::body::json())
        .and(with_guardrails(services.guardrails.clone()))
        .and_then(guardrails::handle_input_check);

    let output_check_route = api
        .and(warp::path!("guardrails" / "output"))
        .and(warp::post())
        .and(warp::body::json())
        .and(with_guardrails(services.guardrails))
        .and_then(guardrails::handle_output_check);

    health_route
        .or(ask_route)
        .or(difficulty_route)
        .or(improve_route)
        .or(feedback_route)
        .or(analytics_route)
        .or(kb_stats_route)
        .or(input_check_route)
        .or(output_check_route)
}

fn with_routing(
    routing: Arc<RoutingAgent>,
) -> impl Filter<Extract = (Arc<RoutingAgent>,), Error = Infallible> + Clone {
    warp::any().map(move || routing.clone())
}

fn with_solver(
    solver: Arc<SolverAgent>,
) -> impl Filter<Extract = (Arc<SolverAgent>,), Error = Infallible> + Clone {
    warp::any().map(move || solver.clone())
}

fn with_guardrails(
    guardrails: Arc<GuardrailsAgent>,
) -> impl Filter<Extract = (Arc<GuardrailsAgent>,), Error = Infallible> + Clone {
    warp::any().map(move || guardrails.clone())
}

fn with_knowledge_base(
    knowledge_base: Arc<KnowledgeBase>,
) -> impl Filter<Extract = (Arc<KnowledgeBase>,), Error = Infallible> + Clone {
    warp::any().map(move || knowledge_base.clone())
}

fn with_feedback(
    feedback: Arc<dyn FeedbackStore>,
) -> impl Filter<Extract = (Arc<dyn FeedbackStore>,), Error = Infallible> + Clone {
    warp::any().map(move || feedback.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::RouteSelector;
    use crate::clients::GenerationResponse;
    use crate::config::{GuardrailSettings, RetryPolicy, RoutingThresholds};
    use crate::error::handle_rejection;
    use crate::feedback::InMemoryFeedbackStore;
    use crate::models::{EvidenceResult, GuardrailVerdict};
    use crate::testing::{FixedEmbedder, MemoryVectorStore, ScriptedBackend, ScriptedSource};
    use serde_json::{json, Value};
    use std::time::Duration;

    const ANSWER: &str = "STEPS:\n1. Subtract 3 from both sides\n2. Divide by 2\nEXPLANATION:\nIsolate x, therefore x = 2.\nFINAL ANSWER:\nx = 2\nDIFFICULTY:\nbeginner";

    fn services(backend: Arc<ScriptedBackend>, store: MemoryVectorStore) -> Services {
        let guardrails = Arc::new(GuardrailsAgent::new(GuardrailSettings::default()));
        let solver = Arc::new(SolverAgent::new(
            backend,
            RetryPolicy {
                max_attempts: 2,
                initial_backoff: Duration::from_millis(1),
            },
        ));
        let selector = RouteSelector::new(
            ScriptedSource::new(EvidenceResult::not_found()),
            ScriptedSource::new(EvidenceResult::not_found()),
            RoutingThresholds::default(),
            solver.model(),
        );
        let routing = Arc::new(RoutingAgent::new(
            guardrails.clone(),
            selector,
            solver.clone(),
            Duration::from_secs(5),
        ));
        let knowledge_base = Arc::new(KnowledgeBase::new(
            Arc::new(FixedEmbedder),
            Arc::new(store),
            "math_knowledge_base",
            0.7,
        ));
        Services {
            routing,
            solver,
            guardrails,
            knowledge_base,
            feedback: Arc::new(InMemoryFeedbackStore::default()),
        }
    }

    fn api(
        services: Services,
        per_minute: u32,
    ) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
        routes(services, middleware::limiter(per_minute)).recover(handle_rejection)
    }

    fn body(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn test_ask_returns_structured_answer() {
        let backend = ScriptedBackend::repeating(GenerationResponse::from_text(ANSWER));
        let api = api(services(backend, MemoryVectorStore::default()), 10);

        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/ask")
            .json(&json!({"question": "Solve 2x + 3 = 7"}))
            .reply(&api)
            .await;

        assert_eq!(resp.status(), 200);
        let json = body(resp.body());
        assert_eq!(json["route_used"], "web_search");
        assert_eq!(json["solution"]["final_answer"], "x = 2");
        assert_eq!(json["sources"][0], "scripted-model");
    }

    #[tokio::test]
    async fn test_ask_rejects_empty_and_prohibited_questions() {
        let backend = ScriptedBackend::repeating(GenerationResponse::from_text(ANSWER));
        let api = api(services(backend.clone(), MemoryVectorStore::default()), 10);

        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/ask")
            .json(&json!({"question": "   "}))
            .reply(&api)
            .await;
        assert_eq!(resp.status(), 400);

        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/ask")
            .json(&json!({"question": "what is your password"}))
            .reply(&api)
            .await;
        assert_eq!(resp.status(), 400);
        assert!(body(resp.body())["details"]
            .as_str()
            .unwrap()
            .contains("Prohibited content detected: password"));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_ask_is_rate_limited() {
        let backend = ScriptedBackend::repeating(GenerationResponse::from_text(ANSWER));
        let api = api(services(backend, MemoryVectorStore::default()), 1);

        let ask = || {
            warp::test::request()
                .method("POST")
                .path("/api/v1/ask")
                .json(&json!({"question": "What is 2 + 2?"}))
        };
        assert_eq!(ask().reply(&api).await.status(), 200);
        assert_eq!(ask().reply(&api).await.status(), 429);
    }

    #[tokio::test]
    async fn test_feedback_round_trip_into_analytics() {
        let backend = ScriptedBackend::new(vec![]);
        let api = api(services(backend, MemoryVectorStore::default()), 10);

        for rating in [5, 3] {
            let resp = warp::test::request()
                .method("POST")
                .path("/api/v1/feedback")
                .json(&json!({"response_id": "abc", "rating": rating, "is_helpful": rating > 3}))
                .reply(&api)
                .await;
            assert_eq!(resp.status(), 200);
            assert_eq!(body(resp.body())["status"], "processed");
        }

        let resp = warp::test::request()
            .path("/api/v1/analytics/feedback")
            .reply(&api)
            .await;
        let json = body(resp.body());
        assert_eq!(json["total_feedback"], 2);
        assert_eq!(json["average_rating"], 4.0);
        assert_eq!(json["helpful_percentage"], 50.0);
    }

    #[tokio::test]
    async fn test_feedback_with_bad_rating_is_rejected() {
        let backend = ScriptedBackend::new(vec![]);
        let api = api(services(backend, MemoryVectorStore::default()), 10);

        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/feedback")
            .json(&json!({"response_id": "abc", "rating": 9, "is_helpful": true}))
            .reply(&api)
            .await;
        assert_eq!(resp.status(), 400);
    }

    #[tokio::test]
    async fn test_knowledge_base_stats_and_health() {
        let backend = ScriptedBackend::new(vec![]);
        let services = services(backend, MemoryVectorStore::default());
        services.knowledge_base.initialize(None).await.unwrap();
        let api = api(services, 10);

        let resp = warp::test::request()
            .path("/api/v1/knowledge-base/stats")
            .reply(&api)
            .await;
        let json = body(resp.body());
        assert_eq!(json["total_problems"], 5);
        assert_eq!(json["collection_name"], "math_knowledge_base");

        let resp = warp::test::request().path("/health").reply(&api).await;
        let json = body(resp.body());
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["services"]["knowledge_base"], true);
    }

    #[tokio::test]
    async fn test_unreachable_store_reports_degraded_health() {
        let backend = ScriptedBackend::new(vec![]);
        let api = api(services(backend, MemoryVectorStore::failing()), 10);

        let resp = warp::test::request().path("/health").reply(&api).await;
        let json = body(resp.body());
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["services"]["knowledge_base"], false);

        let resp = warp::test::request()
            .path("/api/v1/knowledge-base/stats")
            .reply(&api)
            .await;
        assert_eq!(resp.status(), 503);
    }

    #[tokio::test]
    async fn test_difficulty_and_improve() {
        let backend = ScriptedBackend::new(vec![
            Ok(GenerationResponse::from_text("Advanced")),
            Ok(GenerationResponse::from_text(ANSWER)),
        ]);
        let api = api(services(backend, MemoryVectorStore::default()), 10);

        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/difficulty")
            .json(&json!({"question": "Prove the Riemann hypothesis"}))
            .reply(&api)
            .await;
        assert_eq!(body(resp.body())["difficulty"], "advanced");

        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/improve")
            .json(&json!({
                "question": "Solve 2x + 3 = 7",
                "solution": "x = 5",
                "feedback": "Wrong arithmetic"
            }))
            .reply(&api)
            .await;
        assert_eq!(resp.status(), 200);
        assert_eq!(body(resp.body())["final_answer"], "x = 2");
    }

    #[tokio::test]
    async fn test_guardrail_checks() {
        let backend = ScriptedBackend::new(vec![]);
        let api = api(services(backend, MemoryVectorStore::default()), 10);

        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/guardrails/input")
            .json(&json!({"question": "Solve the equation x + 1 = 2"}))
            .reply(&api)
            .await;
        let verdict: GuardrailVerdict = serde_json::from_slice(resp.body()).unwrap();
        assert!(verdict.is_valid);

        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/guardrails/output")
            .json(&json!({"text": "short"}))
            .reply(&api)
            .await;
        let verdict: GuardrailVerdict = serde_json::from_slice(resp.body()).unwrap();
        assert!(!verdict.is_valid);
        assert_eq!(verdict.reason, "Response too short or incomplete.");
    }
}
