//! Tool server client error types

use std::time::Duration;

use thiserror::Error;

/// Errors raised while talking to a stdio tool server
#[derive(Error, Debug)]
pub enum McpClientError {
  /// The server process could not be started
  #[error("failed to launch tool server `{command}`: {source}")]
  Launch {
    command: String,
    #[source]
    source: std::io::Error,
  },

  /// A message did not follow the protocol
  #[error("protocol error: {0}")]
  Protocol(String),

  /// Discovery advertised the same tool name twice
  #[error("protocol error: tool `{0}` advertised more than once")]
  DuplicateTool(String),

  /// No response arrived within the configured window
  #[error("`{method}` timed out after {timeout:?}")]
  Timeout { method: String, timeout: Duration },

  /// The server answered with a JSON-RPC error object
  #[error("server error {code}: {message}")]
  Rpc { code: i64, message: String },

  /// The server ran the operation and reported a failure
  #[error("operation `{tool}` failed: {message}")]
  OperationFailed { tool: String, message: String },

  /// The channel is closed or the process has exited
  #[error("tool server channel is closed")]
  Closed,
}

impl McpClientError {
  pub fn is_timeout(&self) -> bool {
    matches!(self, McpClientError::Timeout { .. })
  }

  pub fn is_protocol(&self) -> bool {
    matches!(
      self,
      McpClientError::Protocol(_) | McpClientError::DuplicateTool(_)
    )
  }
}

/// Alias for Result<T, McpClientError>
pub type Result<T> = std::result::Result<T, McpClientError>;
