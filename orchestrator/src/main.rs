use std::sync::Arc;
use tracing::info;
use warp::Filter;

mod agents;
mod api;
mod clients;
mod config;
mod error;
mod feedback;
mod metrics;
mod middleware;
mod models;
mod redis_client;
#[cfg(test)]
mod testing;

use agents::{GuardrailsAgent, KnowledgeBase, RouteSelector, RoutingAgent, SolverAgent, WebSearchRetriever};
use clients::{EmbeddingClient, GeminiClient, QdrantStore, TavilyClient};
use config::FeedbackBackend;
use feedback::{FeedbackStore, InMemoryFeedbackStore, RedisFeedbackStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        )
        .json()
        .init();

    info!("Starting Math Routing Agent");

    let config = config::Config::from_env()?;
    info!("Configuration loaded");

    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;

    // Knowledge base
    let store = QdrantStore::new(
        http.clone(),
        &config.qdrant_url,
        config.qdrant_api_key.clone(),
        &config.kb_collection,
    );
    let knowledge_base = Arc::new(KnowledgeBase::new(
        Arc::new(EmbeddingClient::new(http.clone(), &config.embedding_service_url)),
        Arc::new(store),
        &config.kb_collection,
        config.routing.similarity_floor,
    ));
    knowledge_base.initialize(config.kb_seed_file.as_deref()).await?;
    info!("Knowledge base ready");

    // Agents
    let web = Arc::new(WebSearchRetriever::new(Arc::new(TavilyClient::new(
        http.clone(),
        &config.tavily_base_url,
        &config.tavily_api_key,
    ))));
    let solver = Arc::new(SolverAgent::new(
        Arc::new(GeminiClient::new(
            http.clone(),
            &config.gemini_base_url,
            &config.gemini_api_key,
            &config.gemini_model,
        )),
        config.generation.clone(),
    ));
    let guardrails = Arc::new(GuardrailsAgent::new(config.guardrails.clone()));
    let selector = RouteSelector::new(
        knowledge_base.clone(),
        web,
        config.routing.clone(),
        solver.model(),
    );
    let routing = Arc::new(RoutingAgent::new(
        guardrails.clone(),
        selector,
        solver.clone(),
        config.request_timeout,
    ));

    let feedback: Arc<dyn FeedbackStore> = match config.feedback_backend {
        FeedbackBackend::Memory => Arc::new(InMemoryFeedbackStore::default()),
        FeedbackBackend::Redis => {
            let client = redis_client::RedisClient::new(&config.redis_url).await?;
            info!("Redis connection established");
            Arc::new(RedisFeedbackStore::new(client))
        }
    };

    let services = api::Services {
        routing,
        solver,
        guardrails,
        knowledge_base,
        feedback,
    };

    // Build API routes
    let api_routes = api::routes(services, middleware::limiter(config.rate_limit_per_minute))
        .with(warp::log("api"));

    // Metrics route
    let metrics = warp::path("metrics")
        .and(warp::get())
        .map(|| {
            let (buffer, content_type) = metrics::render();
            warp::reply::with_header(buffer, "Content-Type", content_type)
        });

    let routes = metrics
        .or(api_routes)
        .recover(error::handle_rejection)
        .with(middleware::cors(&config.allowed_origins));

    // Start server
    let addr = ([0, 0, 0, 0], config.port);
    info!("Server listening on {}", addr.1);

    warp::serve(routes)
        .run(addr)
        .await;

    Ok(())
}
