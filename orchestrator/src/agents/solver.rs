// Solver Agent: prompts the generation backend and parses its answer into a structured solution

use crate::clients::{GenerationBackend, GenerationResponse};
use crate::config::RetryPolicy;
use crate::error::AgentError;
use crate::metrics;
use crate::models::{Difficulty, StructuredSolution};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

const SOLVE_MAX_TOKENS: u32 = 2000;
const SOLVE_TEMPERATURE: f32 = 0.3;
const DIFFICULTY_MAX_TOKENS: u32 = 20;
const DIFFICULTY_TEMPERATURE: f32 = 0.1;

pub const EXTRACTION_ERROR: &str = "Error: Unable to extract response from the generation backend";

const STEPS_MARKER: &str = "STEPS:";
const EXPLANATION_MARKER: &str = "EXPLANATION:";
const ANSWER_MARKER: &str = "FINAL ANSWER:";
const DIFFICULTY_MARKER: &str = "DIFFICULTY:";

const NO_STEPS: &str = "No steps provided in the solution.";
const NO_EXPLANATION: &str = "Detailed explanation provided in steps.";
const NO_ANSWER: &str = "Answer provided in solution.";

const TUTOR_PROMPT: &str = "You are an expert mathematics professor with years of teaching experience.
Your goal is to help students understand mathematical concepts by providing
clear, step-by-step solutions that are easy to follow.

When solving problems:
1. Break down complex problems into simple, logical steps
2. Explain the reasoning behind each step
3. Use clear mathematical notation
4. Provide helpful insights and tips
5. Connect the solution to broader mathematical concepts
6. Ensure the final answer is clearly stated

Always format your response with:
- STEPS: A numbered list of solution steps
- EXPLANATION: A detailed explanation of the approach
- FINAL ANSWER: The clear final answer
- DIFFICULTY: Assessment of problem difficulty (beginner/intermediate/advanced)";

pub struct SolverAgent {
    backend: Arc<dyn GenerationBackend>,
    retry: RetryPolicy,
}

impl SolverAgent {
    pub fn new(backend: Arc<dyn GenerationBackend>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Solves a question, folding any failure into an error-flavoured solution.
    pub async fn generate_solution(
        &self,
        question: &str,
        context: Option<&str>,
        evidence: Option<&str>,
    ) -> StructuredSolution {
        match self.solve(question, context, evidence).await {
            Ok(solution) => solution,
            Err(e) => {
                error!("Error generating solution: {}", e);
                error_solution(&e)
            }
        }
    }

    /// Fallible form of [`generate_solution`](Self::generate_solution).
    pub async fn solve(
        &self,
        question: &str,
        context: Option<&str>,
        evidence: Option<&str>,
    ) -> Result<StructuredSolution, AgentError> {
        let prompt = format!("{}\n\n{}", TUTOR_PROMPT, user_prompt(question, context, evidence));
        self.run(&prompt).await
    }

    /// Revises a previous answer in light of reviewer feedback. Failures are
    /// folded the same way as [`generate_solution`](Self::generate_solution).
    pub async fn improve_with_feedback(
        &self,
        question: &str,
        prior_solution: &str,
        feedback: &str,
    ) -> StructuredSolution {
        match self.improve(question, prior_solution, feedback).await {
            Ok(solution) => solution,
            Err(e) => {
                error!("Error improving solution: {}", e);
                error_solution(&e)
            }
        }
    }

    pub async fn improve(
        &self,
        question: &str,
        prior_solution: &str,
        feedback: &str,
    ) -> Result<StructuredSolution, AgentError> {
        let prompt = format!(
            "{}\n\nAs a mathematics professor, improve this solution based on the feedback:\n\n\
             Original Question: {}\n\
             Original Solution: {}\n\
             Feedback: {}\n\n\
             Please provide an improved step-by-step solution that addresses the feedback.\n\
             Format your response exactly as specified above.",
            TUTOR_PROMPT, question, prior_solution, feedback
        );
        self.run(&prompt).await
    }

    /// Single-label difficulty classification; any failure means intermediate.
    pub async fn assess_difficulty(&self, question: &str) -> Difficulty {
        let prompt = format!(
            "As a mathematics professor, assess the difficulty level of this question:\n\n\
             Question: {}\n\n\
             Respond with only one word: \"beginner\", \"intermediate\", or \"advanced\"",
            question
        );
        match self
            .generate_with_retry(&prompt, DIFFICULTY_MAX_TOKENS, DIFFICULTY_TEMPERATURE)
            .await
        {
            Ok(resp) => Difficulty::from_loose(extract_text(&resp).trim()),
            Err(e) => {
                error!("Error assessing difficulty: {}", e);
                Difficulty::Intermediate
            }
        }
    }

    async fn run(&self, prompt: &str) -> Result<StructuredSolution, AgentError> {
        let resp = self
            .generate_with_retry(prompt, SOLVE_MAX_TOKENS, SOLVE_TEMPERATURE)
            .await?;
        Ok(parse_solution(extract_text(&resp)))
    }

    /// Retries only rate-limit errors, doubling the delay after each one.
    async fn generate_with_retry(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<GenerationResponse, AgentError> {
        let attempts = self.retry.max_attempts.max(1);
        let mut delay = self.retry.initial_backoff;

        for attempt in 1..=attempts {
            match self.backend.generate(prompt, max_tokens, temperature).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_rate_limit() => {
                    if attempt == attempts {
                        warn!("{}. Giving up after {} attempts", e, attempts);
                        break;
                    }
                    warn!(
                        "{}. Retrying in {:?}... (Attempt {}/{})",
                        e, delay, attempt, attempts
                    );
                    metrics::GENERATION_RETRIES.inc();
                    tokio::time::sleep(delay).await;
                    delay = next_backoff(delay);
                }
                Err(e) => {
                    error!("Unexpected error in content generation: {}", e);
                    return Err(AgentError::Generation(e));
                }
            }
        }

        Err(AgentError::Exhausted { attempts })
    }
}

/// Doubles the delay, saturating instead of overflowing.
fn next_backoff(delay: Duration) -> Duration {
    delay.saturating_mul(2)
}

fn user_prompt(question: &str, context: Option<&str>, evidence: Option<&str>) -> String {
    let mut prompt = format!(
        "Please solve this mathematical problem step by step:\n\nQuestion: {}",
        question
    );
    if let Some(context) = context.filter(|c| !c.is_empty()) {
        prompt.push_str(&format!("\n\nContext: {}", context));
    }
    if let Some(evidence) = evidence.filter(|e| !e.is_empty()) {
        prompt.push_str(&format!("\n\nReference Material: {}", evidence));
    }
    prompt.push_str("\n\nPlease provide a detailed step-by-step solution following the format specified above.");
    prompt
}

pub fn error_solution(err: &AgentError) -> StructuredSolution {
    StructuredSolution {
        steps: vec![
            format!("Error occurred: {}", err),
            "Please try rephrasing your question.".to_string(),
        ],
        explanation: "An error occurred while generating the solution.".to_string(),
        final_answer: "Unable to provide solution due to technical error.".to_string(),
        difficulty_assessment: Difficulty::Intermediate,
    }
}

fn extract_text(resp: &GenerationResponse) -> &str {
    resp.text().unwrap_or(EXTRACTION_ERROR)
}

/// Splits model output on the four section markers. Missing sections become
/// placeholders so every field is populated.
pub fn parse_solution(text: &str) -> StructuredSolution {
    let steps = extract_section(text, STEPS_MARKER, Some(EXPLANATION_MARKER));
    let explanation = extract_section(text, EXPLANATION_MARKER, Some(ANSWER_MARKER));
    let final_answer = extract_section(text, ANSWER_MARKER, Some(DIFFICULTY_MARKER));
    let difficulty = extract_section(text, DIFFICULTY_MARKER, None);

    StructuredSolution {
        steps: parse_steps(steps),
        explanation: or_placeholder(explanation, NO_EXPLANATION),
        final_answer: or_placeholder(final_answer, NO_ANSWER),
        difficulty_assessment: Difficulty::from_loose(difficulty),
    }
}

fn or_placeholder(section: &str, placeholder: &str) -> String {
    if section.is_empty() {
        placeholder.to_string()
    } else {
        section.to_string()
    }
}

fn parse_steps(section: &str) -> Vec<String> {
    let steps: Vec<String> = section
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();
    if steps.is_empty() {
        vec![NO_STEPS.to_string()]
    } else {
        steps
    }
}

/// Text between `start` and the next `end` (or end of input), matched
/// ASCII-case-insensitively. Empty when `start` is absent.
fn extract_section<'a>(text: &'a str, start: &str, end: Option<&str>) -> &'a str {
    let Some(found) = find_ignore_case(text, start, 0) else {
        return "";
    };
    let from = found + start.len();
    let to = end
        .and_then(|marker| find_ignore_case(text, marker, from))
        .unwrap_or(text.len());
    text[from..to].trim()
}

/// Byte offset of `needle` in `haystack` at or after `from`, ignoring ASCII case.
fn find_ignore_case(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || hay.len() < needle.len() {
        return None;
    }
    (from..=hay.len() - needle.len()).find(|&i| hay[i..i + needle.len()].eq_ignore_ascii_case(needle))
}
