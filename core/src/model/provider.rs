//! Model Provider trait
//!
//! This module defines the [ModelProvider] trait that every reasoning backend implements.

use async_trait::async_trait;

use super::error::{ModelError, Result};
use super::types::{ChatRequest, ChatResponse, ProviderConfig};

/// Model Provider trait
///
/// A provider turns a [ChatRequest] (conversation plus advertised tools) into
/// a [ChatResponse] that either asks for tool calls or carries a final answer.
#[async_trait]
pub trait ModelProvider: Send + Sync {
  /// Returns the unique identifier for this provider
  fn provider_id(&self) -> &'static str;

  /// Returns the display name for this provider
  fn provider_name(&self) -> &'static str;

  /// Returns the list of environment variables required by this provider
  fn required_env_vars(&self) -> Vec<&'static str> {
    Vec::new()
  }

  /// Creates a chat completion
  async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse>;

  /// Returns the configuration for this provider
  fn config(&self) -> &ProviderConfig;
}

/// Standard error handling for HTTP responses
pub async fn handle_response(response: reqwest::Response) -> Result<String> {
  let status = response.status();
  if status.is_success() {
    return Ok(response.text().await?);
  }

  let body = response.text().await.unwrap_or_default();
  if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
    return Err(ModelError::AuthError(format!("HTTP {}: {}", status, body)));
  }
  Err(ModelError::ApiError(format!("HTTP {}: {}", status, body)))
}
