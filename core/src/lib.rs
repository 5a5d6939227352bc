// mcpilot Core Library

pub mod agent;
pub mod conversation;
pub mod model;
pub mod session;
pub mod tools;

#[cfg(test)]
mod test_support;

pub use agent::{AgentContext, AgentOrchestrator, OrchestrationError};
pub use conversation::{ConversationLoop, LoopState};
pub use session::{Session, SessionError};
