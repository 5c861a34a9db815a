use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Clamp a heuristic score into [0, 1]. NaN collapses to 0.
pub fn clamp_unit(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Algebra,
    Calculus,
    Geometry,
    Statistics,
    Trigonometry,
    LinearAlgebra,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl Difficulty {
    const ALL: [Difficulty; 3] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Advanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    /// First label contained in `text` (case-insensitive), checked in
    /// beginner/intermediate/advanced order. Anything else is intermediate.
    pub fn from_loose(text: &str) -> Self {
        let lower = text.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|d| lower.contains(d.as_str()))
            .unwrap_or_default()
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Incoming question. Never mutated once received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    #[serde(default)]
    pub topic: Option<Topic>,
    #[serde(default)]
    pub difficulty_level: Option<Difficulty>,
    #[serde(default)]
    pub context: Option<String>,
}

impl Question {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            question: text.into(),
            topic: None,
            difficulty_level: None,
            context: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardrailVerdict {
    pub is_valid: bool,
    pub reason: String,
    pub confidence_score: f32,
}

impl GuardrailVerdict {
    pub fn pass(reason: impl Into<String>, confidence: f32) -> Self {
        Self {
            is_valid: true,
            reason: reason.into(),
            confidence_score: clamp_unit(confidence),
        }
    }

    pub fn reject(reason: impl Into<String>, confidence: f32) -> Self {
        Self {
            is_valid: false,
            reason: reason.into(),
            confidence_score: clamp_unit(confidence),
        }
    }
}

/// Result of a single evidence lookup (knowledge base or web).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceResult {
    pub found: bool,
    pub content: Option<String>,
    pub score: Option<f32>,
    pub sources: Vec<String>,
}

impl EvidenceResult {
    pub fn not_found() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    KnowledgeBase,
    WebSearch,
    Hybrid,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::KnowledgeBase => "knowledge_base",
            Route::WebSearch => "web_search",
            Route::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of route selection: which sources back the answer and the
/// evidence text handed to the generator.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteDecision {
    pub route: Route,
    pub evidence: Option<String>,
    pub sources: Vec<String>,
    pub confidence: f32,
}

impl RouteDecision {
    pub fn new(route: Route, evidence: Option<String>, sources: Vec<String>, confidence: f32) -> Self {
        Self {
            route,
            evidence,
            sources,
            confidence: clamp_unit(confidence),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredSolution {
    pub steps: Vec<String>,
    pub explanation: String,
    pub final_answer: String,
    pub difficulty_assessment: Difficulty,
}

impl StructuredSolution {
    /// Flattened text used by the output guardrail.
    pub fn as_text(&self) -> String {
        format!(
            "{} {} {}",
            self.explanation,
            self.steps.join(" "),
            self.final_answer
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MathResponse {
    pub question: String,
    pub solution: StructuredSolution,
    pub route_used: Route,
    pub confidence_score: f32,
    pub sources: Vec<String>,
    /// Wall-clock seconds.
    pub response_time: f64,
    pub timestamp: DateTime<Utc>,
}

// API Request/Response models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub response_id: String,
    pub rating: u8,
    #[serde(default)]
    pub feedback_text: Option<String>,
    pub is_helpful: bool,
    #[serde(default)]
    pub suggested_improvement: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub solution: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: Uuid,
    pub feedback: FeedbackRequest,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub message: String,
    pub feedback_id: Uuid,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeedbackAnalytics {
    pub total_feedback: usize,
    pub average_rating: f64,
    pub helpful_percentage: f64,
    pub rating_distribution: BTreeMap<String, usize>,
}

#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub services: BTreeMap<String, bool>,
}

#[derive(Debug, Serialize)]
pub struct KnowledgeBaseStats {
    pub total_problems: usize,
    pub collection_name: String,
}

#[derive(Debug, Deserialize)]
pub struct DifficultyRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct DifficultyResponse {
    pub difficulty: Difficulty,
}

#[derive(Debug, Deserialize)]
pub struct ImproveRequest {
    pub question: String,
    pub solution: String,
    pub feedback: String,
}

#[derive(Debug, Deserialize)]
pub struct OutputCheckRequest {
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_first_match_wins() {
        assert_eq!(Difficulty::from_loose("Advanced"), Difficulty::Advanced);
        assert_eq!(
            Difficulty::from_loose("beginner to intermediate"),
            Difficulty::Beginner
        );
        assert_eq!(Difficulty::from_loose("hard"), Difficulty::Intermediate);
        assert_eq!(Difficulty::from_loose(""), Difficulty::Intermediate);
    }

    #[test]
    fn test_route_decision_clamps_confidence() {
        let decision = RouteDecision::new(Route::Hybrid, None, vec![], 1.4);
        assert_eq!(decision.confidence, 1.0);
        let decision = RouteDecision::new(Route::Hybrid, None, vec![], f32::NAN);
        assert_eq!(decision.confidence, 0.0);
    }

    #[test]
    fn test_route_serializes_snake_case() {
        let json = serde_json::to_string(&Route::KnowledgeBase).unwrap();
        assert_eq!(json, "\"knowledge_base\"");
    }
}
