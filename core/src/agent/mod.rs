pub mod context;
pub mod orchestrator;

pub use context::AgentContext;
pub use orchestrator::{AgentOrchestrator, OrchestrationError, TurnConfig};
