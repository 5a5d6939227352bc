//! Model layer error types

use thiserror::Error;

/// Model provider errors
#[derive(Error, Debug)]
pub enum ModelError {
  /// Authentication failed
  #[error("Authentication failed: {0}")]
  AuthError(String),

  /// Invalid response from provider
  #[error("Invalid response: {0}")]
  InvalidResponse(String),

  /// Provider API error
  #[error("Provider API error: {0}")]
  ApiError(String),

  /// Network error
  #[error("Network error: {0}")]
  NetworkError(#[from] reqwest::Error),

  /// JSON parse error
  #[error("JSON parse error: {0}")]
  JsonError(#[from] serde_json::Error),

  /// Provider not found
  #[error("Provider not found: {0}")]
  ProviderNotFound(String),

  /// No default provider configured
  #[error("No default provider configured")]
  NoDefaultProvider,
}

/// Alias for Result<T, ModelError>
pub type Result<T> = std::result::Result<T, ModelError>;
