use serde::de::DeserializeOwned;
use thiserror::Error;

use mcpilot_mcp_client::McpClientError;

use crate::tools::handlers::web_search::SearchError;

/// Invocation payload passed to a tool handler.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
  pub name: String,
  pub arguments: serde_json::Value,
}

impl ToolInvocation {
  pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
    Self {
      name: name.into(),
      arguments,
    }
  }

  pub fn parse_arguments<T: DeserializeOwned>(&self) -> Result<T, CapabilityError> {
    serde_json::from_value(self.arguments.clone()).map_err(|e| CapabilityError::InvalidArguments {
      tool: self.name.clone(),
      reason: e.to_string(),
    })
  }
}

/// Standard output from a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
  pub content: String,
}

impl ToolOutput {
  pub fn success(content: impl Into<String>) -> Self {
    Self {
      content: content.into(),
    }
  }
}

/// Tool invocation failures, tagged with the capability that produced them.
///
/// The underlying error is carried as-is so callers can still inspect it.
#[derive(Error, Debug)]
pub enum CapabilityError {
  #[error("tool server: {source}")]
  External {
    tool: String,
    #[source]
    source: McpClientError,
  },

  #[error("built-in {tool}: {source}")]
  Builtin {
    tool: String,
    #[source]
    source: SearchError,
  },

  #[error("unknown tool `{0}`")]
  NotFound(String),

  #[error("invalid arguments for {tool}: {reason}")]
  InvalidArguments { tool: String, reason: String },
}

impl CapabilityError {
  /// Which side served (or would have served) the call
  pub fn provenance(&self) -> &'static str {
    match self {
      CapabilityError::External { .. } => "tool_server",
      CapabilityError::Builtin { .. } => "builtin",
      CapabilityError::NotFound(_) | CapabilityError::InvalidArguments { .. } => "adapter",
    }
  }
}
