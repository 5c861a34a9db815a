use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};
use std::sync::LazyLock;

pub static QUESTIONS_BY_ROUTE: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "math_agent_questions_total",
        "Questions answered, by evidence route",
        &["route"]
    )
    .expect("questions counter registers once")
});

pub static DEGRADED_RESPONSES: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        "math_agent_degraded_responses_total",
        "Responses replaced by the error fallback"
    )
    .expect("degraded counter registers once")
});

pub static GUARDRAIL_REJECTIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "math_agent_guardrail_rejections_total",
        "Guardrail failures, by stage",
        &["stage"]
    )
    .expect("guardrail counter registers once")
});

pub static GENERATION_RETRIES: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        "math_agent_generation_retries_total",
        "Generation calls retried after a rate limit"
    )
    .expect("retry counter registers once")
});

pub static REQUEST_SECONDS: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!(
        "math_agent_request_seconds",
        "Wall-clock time to answer a question"
    )
    .expect("latency histogram registers once")
});

/// Prometheus text exposition of the default registry.
pub fn render() -> (Vec<u8>, String) {
    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    (buffer, encoder.format_type().to_string())
}
