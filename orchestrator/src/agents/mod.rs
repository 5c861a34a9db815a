pub mod decision;
pub mod guardrails;
pub mod knowledge_base;
pub mod retriever;
pub mod routing;
pub mod solver;

pub use decision::RouteSelector;
pub use guardrails::GuardrailsAgent;
pub use knowledge_base::KnowledgeBase;
pub use retriever::WebSearchRetriever;
pub use routing::RoutingAgent;
pub use solver::SolverAgent;
