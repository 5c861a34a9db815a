// Guardrails Agent: relevance and safety checks on questions and generated solutions

use crate::config::GuardrailSettings;
use crate::models::{clamp_unit, GuardrailVerdict, Question};
use regex::Regex;
use std::sync::LazyLock;

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+\.?\d*\b").expect("number regex is valid"));

const MATH_KEYWORDS: &[&str] = &[
    "solve", "calculate", "find", "equation", "formula", "theorem", "proof", "derivative",
    "integral", "limit", "matrix", "vector", "angle", "area", "volume", "probability",
    "statistics", "graph", "function", "polynomial", "logarithm", "exponential",
    "trigonometry", "circle", "radius", "perimeter", "geometry", "shape", "length", "width",
    "height", "distance", "arc", "sector", "diameter", "circumference", "rectangle", "square",
    "triangle", "polygon", "ellipse", "sphere", "cube", "cylinder", "cone", "pyramid",
    "surface", "solid", "dimension", "coordinate", "axis", "plane", "line", "segment", "point",
    "degree", "radian", "pi", "π",
];

const MATH_SYMBOLS: &[char] = &[
    '+', '-', '*', '/', '=', '<', '>', '≤', '≥', '∑', '∫', '∏', '√', '∆', '∇', '∂',
];

const PROHIBITED_TERMS: &[&str] = &[
    "illegal",
    "harmful",
    "violence",
    "hate",
    "discrimination",
    "personal information",
    "private data",
    "password",
    "credit card",
];

const SOLUTION_INDICATORS: &[&str] = &["step", "solution", "answer", "therefore", "thus", "result"];

const MIN_OUTPUT_CHARS: usize = 20;

pub struct GuardrailsAgent {
    settings: GuardrailSettings,
}

impl GuardrailsAgent {
    pub fn new(settings: GuardrailSettings) -> Self {
        Self { settings }
    }

    pub fn enforces_output(&self) -> bool {
        self.settings.enforce_output
    }

    /// Checks length, prohibited terms and math relevance, stopping at the first failure.
    pub fn validate_input(&self, question: &Question) -> GuardrailVerdict {
        let text = &question.question;
        let max = self.settings.max_question_length;

        if text.chars().count() > max {
            return GuardrailVerdict::reject(
                format!("Question too long. Maximum {} characters allowed.", max),
                1.0,
            );
        }

        if let Some(term) = prohibited_term(text) {
            return GuardrailVerdict::reject(format!("Prohibited content detected: {}", term), 0.9);
        }

        let score = math_relevance(text);
        if score < self.settings.min_math_relevance {
            return GuardrailVerdict::reject(
                "Question does not appear to be mathematics-related.",
                score,
            );
        }

        GuardrailVerdict::pass("Question passed all guardrails checks.", score)
    }

    pub fn validate_output(&self, text: &str) -> GuardrailVerdict {
        if let Some(term) = prohibited_term(text) {
            return GuardrailVerdict::reject(format!("Prohibited content in response: {}", term), 0.9);
        }

        if text.trim().chars().count() < MIN_OUTPUT_CHARS {
            return GuardrailVerdict::reject("Response too short or incomplete.", 0.7);
        }

        let lower = text.to_lowercase();
        let structured = SOLUTION_INDICATORS.iter().any(|w| lower.contains(w));
        let confidence = if structured { 0.8 } else { 0.6 };

        GuardrailVerdict::pass("Response passed output validation.", confidence)
    }
}

fn prohibited_term(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    PROHIBITED_TERMS.iter().copied().find(|term| lower.contains(term))
}

/// Weighted relevance in [0, 1]: keywords 0.2 each (max 1.0), symbols 0.1
/// each (max 0.5), numeric literals 0.05 each (max 0.3).
pub fn math_relevance(text: &str) -> f32 {
    let lower = text.to_lowercase();

    let keywords = MATH_KEYWORDS.iter().filter(|k| lower.contains(*k)).count();
    let symbols = text.chars().filter(|c| MATH_SYMBOLS.contains(c)).count();
    let numbers = NUMBER_RE.find_iter(text).count();

    let keyword_score = (keywords as f32 * 0.2).min(1.0);
    let symbol_score = (symbols as f32 * 0.1).min(0.5);
    let number_score = (numbers as f32 * 0.05).min(0.3);

    clamp_unit(keyword_score + symbol_score + number_score)
}
