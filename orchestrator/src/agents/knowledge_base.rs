// Knowledge Base: embedded math problems in the vector store

use super::retriever::EvidenceSource;
use crate::clients::{Embedder, ScoredPoint, VectorStore, EMBEDDING_DIM};
use crate::error::{AgentError, BackendError};
use crate::models::{Difficulty, EvidenceResult, KnowledgeBaseStats};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

const SEARCH_LIMIT: usize = 3;
const DEFAULT_SOURCE: &str = "Knowledge Base";

/// One problem/solution pair to index.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedProblem {
    pub question: String,
    pub solution: String,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default)]
    pub difficulty: Difficulty,
}

fn default_topic() -> String {
    "general".to_string()
}

fn builtin_problems() -> Vec<SeedProblem> {
    let seed = |question: &str, solution: &str, topic: &str, difficulty| SeedProblem {
        question: question.to_string(),
        solution: solution.to_string(),
        topic: topic.to_string(),
        difficulty,
    };
    vec![
        seed(
            "What is the derivative of x^2?",
            "The derivative of x^2 is 2x. Using the power rule: d/dx(x^n) = n*x^(n-1), so d/dx(x^2) = 2*x^(2-1) = 2x.",
            "calculus",
            Difficulty::Beginner,
        ),
        seed(
            "Solve the quadratic equation x^2 + 5x + 6 = 0",
            "Step 1: Factor the quadratic. We need two numbers that multiply to 6 and add to 5. Those are 2 and 3.\nStep 2: x^2 + 5x + 6 = (x + 2)(x + 3) = 0\nStep 3: Set each factor to zero: x + 2 = 0 or x + 3 = 0\nStep 4: Solve: x = -2 or x = -3",
            "algebra",
            Difficulty::Intermediate,
        ),
        seed(
            "What is the area of a circle with radius r?",
            "The area of a circle with radius r is πr^2. This formula comes from integrating the circumference over the radius.",
            "geometry",
            Difficulty::Beginner,
        ),
        seed(
            "Find the integral of sin(x)",
            "The integral of sin(x) is -cos(x) + C, where C is the constant of integration. This is because d/dx(-cos(x)) = sin(x).",
            "calculus",
            Difficulty::Intermediate,
        ),
        seed(
            "What is the Pythagorean theorem?",
            "The Pythagorean theorem states that in a right triangle, the square of the hypotenuse (c) equals the sum of squares of the other two sides (a and b): a^2 + b^2 = c^2.",
            "geometry",
            Difficulty::Beginner,
        ),
    ]
}

fn point_id(content: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, content.as_bytes())
}

pub struct KnowledgeBase {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    collection: String,
    similarity_floor: f32,
}

impl KnowledgeBase {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        similarity_floor: f32,
    ) -> Self {
        Self {
            embedder,
            store,
            collection: collection.into(),
            similarity_floor,
        }
    }

    /// Ensures the collection exists and seeds the built-in problems when it
    /// was just created. Errors here abort startup.
    pub async fn initialize(&self, seed_file: Option<&str>) -> Result<(), AgentError> {
        let created = self
            .store
            .ensure_collection(EMBEDDING_DIM)
            .await
            .map_err(|e| AgentError::Configuration(format!("knowledge base unavailable: {}", e)))?;

        if created {
            let problems = builtin_problems();
            for problem in &problems {
                self.add_problem(problem, "initial_dataset").await?;
            }
            info!("Loaded {} initial problems into knowledge base", problems.len());
        } else {
            info!("Collection {} already exists", self.collection);
        }

        if let Some(path) = seed_file {
            let count = self.load_seed_file(path).await?;
            info!("Loaded {} additional problems from {}", count, path);
        }
        Ok(())
    }

    async fn load_seed_file(&self, path: &str) -> Result<usize, AgentError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AgentError::Configuration(format!("cannot read {}: {}", path, e)))?;
        let problems: Vec<SeedProblem> = serde_json::from_str(&raw)
            .map_err(|e| AgentError::Configuration(format!("invalid seed file {}: {}", path, e)))?;
        for problem in &problems {
            self.add_problem(problem, "setup_script").await?;
        }
        Ok(problems.len())
    }

    /// Upserts a problem. Ids derive from the content, so re-adding the same
    /// problem (e.g. the seed file on every start) replaces the existing point.
    pub async fn add_problem(&self, problem: &SeedProblem, source: &str) -> Result<Uuid, AgentError> {
        let content = format!("Question: {}\n\nSolution: {}", problem.question, problem.solution);
        let vector = self
            .embed_one(&content)
            .await
            .map_err(|e| AgentError::Storage(e.to_string()))?;

        let id = point_id(&content);
        let payload = json!({
            "question": problem.question,
            "solution": problem.solution,
            "content": content,
            "topic": problem.topic,
            "source": source,
            "difficulty": problem.difficulty,
        });
        self.store
            .upsert(&id.to_string(), vector, payload)
            .await
            .map_err(|e| AgentError::Storage(e.to_string()))?;

        info!("Added new content to knowledge base: {}", id);
        Ok(id)
    }

    pub async fn all_points(&self) -> Result<Vec<ScoredPoint>, AgentError> {
        self.store
            .list_all()
            .await
            .map_err(|e| AgentError::Storage(e.to_string()))
    }

    pub async fn stats(&self) -> Result<KnowledgeBaseStats, AgentError> {
        Ok(KnowledgeBaseStats {
            total_problems: self.all_points().await?.len(),
            collection_name: self.collection.clone(),
        })
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, BackendError> {
        self.embedder
            .embed(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| BackendError::Decode("embedding service returned nothing".to_string()))
    }

    async fn lookup(&self, query: &str) -> Result<EvidenceResult, BackendError> {
        let vector = self.embed_one(query).await?;
        let hits = self
            .store
            .search(vector, SEARCH_LIMIT, Some(self.similarity_floor))
            .await?;

        let Some(best) = hits.first() else {
            return Ok(EvidenceResult {
                score: Some(0.0),
                ..EvidenceResult::not_found()
            });
        };

        if best.score <= self.similarity_floor {
            return Ok(EvidenceResult {
                score: Some(best.score),
                ..EvidenceResult::not_found()
            });
        }

        Ok(EvidenceResult {
            found: true,
            content: Some(best.payload_str("content").unwrap_or_default().to_string()),
            score: Some(best.score),
            sources: vec![best.payload_str("source").unwrap_or(DEFAULT_SOURCE).to_string()],
        })
    }
}

#[async_trait]
impl EvidenceSource for KnowledgeBase {
    async fn search(&self, query: &str) -> EvidenceResult {
        match self.lookup(query).await {
            Ok(result) => result,
            Err(e) => {
                error!("Error searching knowledge base: {}", e);
                EvidenceResult {
                    score: Some(0.0),
                    ..EvidenceResult::not_found()
                }
            }
        }
    }
}
