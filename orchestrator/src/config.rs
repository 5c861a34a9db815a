use crate::error::AgentError;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use warp::http::uri::{Authority, Scheme};

/// Upper bounds keeping the doubling backoff within a sane wall-clock range.
const MAX_GENERATION_ATTEMPTS: u32 = 10;
const MAX_GENERATION_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub tavily_api_key: String,
    pub tavily_base_url: String,
    pub embedding_service_url: String,
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub kb_collection: String,
    pub kb_seed_file: Option<String>,
    pub guardrails: GuardrailSettings,
    pub routing: RoutingThresholds,
    pub generation: RetryPolicy,
    pub request_timeout: Duration,
    pub feedback_backend: FeedbackBackend,
    pub redis_url: String,
    pub rate_limit_per_minute: u32,
    pub allowed_origins: AllowedOrigins,
}

/// CORS origins. `*` anywhere in the list allows every origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct GuardrailSettings {
    pub max_question_length: usize,
    /// Questions scoring strictly below this are rejected as off-topic.
    pub min_math_relevance: f32,
    /// When false, a failed output check is only logged.
    pub enforce_output: bool,
}

impl Default for GuardrailSettings {
    fn default() -> Self {
        Self {
            max_question_length: 1000,
            min_math_relevance: 0.0,
            enforce_output: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoutingThresholds {
    /// KB score above which the knowledge base is trusted alone.
    pub knowledge_base: f32,
    /// KB score above which the web is consulted to corroborate.
    pub hybrid: f32,
    /// Minimum similarity for a KB hit to count as found.
    pub similarity_floor: f32,
}

impl RoutingThresholds {
    /// All thresholds lie in [0, 1] and the hybrid band sits below the KB one.
    pub fn validate(&self) -> Result<(), AgentError> {
        for (name, value) in [
            ("KB_ROUTE_THRESHOLD", self.knowledge_base),
            ("HYBRID_ROUTE_THRESHOLD", self.hybrid),
            ("KB_SIMILARITY_FLOOR", self.similarity_floor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AgentError::Configuration(format!(
                    "{} must lie in [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.hybrid >= self.knowledge_base {
            return Err(AgentError::Configuration(format!(
                "HYBRID_ROUTE_THRESHOLD ({}) must be below KB_ROUTE_THRESHOLD ({})",
                self.hybrid, self.knowledge_base
            )));
        }
        Ok(())
    }
}

impl Default for RoutingThresholds {
    fn default() -> Self {
        Self {
            knowledge_base: 0.8,
            hybrid: 0.6,
            similarity_floor: 0.7,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn validate(&self) -> Result<(), AgentError> {
        if !(1..=MAX_GENERATION_ATTEMPTS).contains(&self.max_attempts) {
            return Err(AgentError::Configuration(format!(
                "GENERATION_MAX_ATTEMPTS must be between 1 and {}, got {}",
                MAX_GENERATION_ATTEMPTS, self.max_attempts
            )));
        }
        if self.initial_backoff > MAX_GENERATION_BACKOFF {
            return Err(AgentError::Configuration(format!(
                "GENERATION_BACKOFF_MS must be at most {}, got {}",
                MAX_GENERATION_BACKOFF.as_millis(),
                self.initial_backoff.as_millis()
            )));
        }
        Ok(())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AgentError> {
        dotenvy::dotenv().ok();

        let feedback_backend = match var_or("FEEDBACK_BACKEND", "memory").to_lowercase().as_str() {
            "memory" => FeedbackBackend::Memory,
            "redis" => FeedbackBackend::Redis,
            other => {
                return Err(AgentError::Configuration(format!(
                    "FEEDBACK_BACKEND must be 'memory' or 'redis', got '{}'",
                    other
                )))
            }
        };

        let routing = RoutingThresholds {
            knowledge_base: parse_or("KB_ROUTE_THRESHOLD", 0.8)?,
            hybrid: parse_or("HYBRID_ROUTE_THRESHOLD", 0.6)?,
            similarity_floor: parse_or("KB_SIMILARITY_FLOOR", 0.7)?,
        };
        routing.validate()?;

        let generation = RetryPolicy {
            max_attempts: parse_or("GENERATION_MAX_ATTEMPTS", 3)?,
            initial_backoff: Duration::from_millis(parse_or("GENERATION_BACKOFF_MS", 1000)?),
        };
        generation.validate()?;

        Ok(Config {
            port: parse_or("PORT", 8000)?,
            gemini_api_key: required("GEMINI_API_KEY")?,
            gemini_model: var_or("GEMINI_MODEL", "gemini-1.5-flash"),
            gemini_base_url: var_or(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            tavily_api_key: required("TAVILY_API_KEY")?,
            tavily_base_url: var_or("TAVILY_BASE_URL", "https://api.tavily.com"),
            embedding_service_url: var_or("EMBEDDING_SERVICE_URL", "http://localhost:8002"),
            qdrant_url: var_or("QDRANT_URL", "http://localhost:6333"),
            qdrant_api_key: env::var("QDRANT_API_KEY").ok().filter(|k| !k.is_empty()),
            kb_collection: var_or("KB_COLLECTION", "math_knowledge_base"),
            kb_seed_file: env::var("KB_SEED_FILE").ok().filter(|p| !p.is_empty()),
            guardrails: GuardrailSettings {
                max_question_length: parse_or("MAX_QUESTION_LENGTH", 1000)?,
                min_math_relevance: parse_or("MIN_MATH_RELEVANCE", 0.0)?,
                enforce_output: parse_or("ENFORCE_OUTPUT_GUARDRAILS", false)?,
            },
            routing,
            generation,
            request_timeout: Duration::from_secs(parse_or("REQUEST_TIMEOUT_SECS", 60)?),
            feedback_backend,
            redis_url: var_or("REDIS_URL", "redis://localhost:6379"),
            rate_limit_per_minute: parse_or("RATE_LIMIT_PER_MINUTE", 60)?,
            allowed_origins: parse_origins(&var_or(
                "ALLOWED_ORIGINS",
                "http://localhost:3000,http://127.0.0.1:3000",
            ))?,
        })
    }
}

/// Comma-separated `scheme://host[:port]` origins, or `*`.
pub fn parse_origins(raw: &str) -> Result<AllowedOrigins, AgentError> {
    let mut origins = Vec::new();
    for origin in raw.split(',').map(str::trim).filter(|o| !o.is_empty()) {
        if origin == "*" {
            return Ok(AllowedOrigins::Any);
        }
        if !is_valid_origin(origin) {
            return Err(AgentError::Configuration(format!(
                "ALLOWED_ORIGINS entry '{}' is not of the form scheme://host[:port]",
                origin
            )));
        }
        origins.push(origin.to_string());
    }
    if origins.is_empty() {
        return Err(AgentError::Configuration(
            "ALLOWED_ORIGINS must name at least one origin".to_string(),
        ));
    }
    Ok(AllowedOrigins::List(origins))
}

fn is_valid_origin(origin: &str) -> bool {
    let Some((scheme, authority)) = origin.split_once("://") else {
        return false;
    };
    !authority.contains('@')
        && scheme.parse::<Scheme>().is_ok()
        && authority.parse::<Authority>().is_ok()
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn required(key: &str) -> Result<String, AgentError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AgentError::Configuration(format!("{} is not set", key))),
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T, AgentError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AgentError::Configuration(format!("{} has invalid value '{}'", key, raw))),
        Err(_) => Ok(default),
    }
}
