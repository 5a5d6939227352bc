// Configuration Types
// All configuration type definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Tool server launch settings
  pub server: ServerConfig,
  /// Reasoning service settings
  pub models: ModelsConfig,
  /// Agent behaviour
  pub agent: AgentConfig,
  /// Built-in web search
  pub search: SearchConfig,
}

// ============================================================================
// TOOL SERVER CONFIGURATION
// ============================================================================

/// Stdio tool server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  /// Display name
  pub name: String,
  /// Executable to launch
  pub command: String,
  /// Arguments passed to the executable
  pub args: Vec<String>,
  /// Extra environment variables
  pub env: HashMap<String, String>,
  /// Working directory for the process
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cwd: Option<PathBuf>,
  /// Handshake and discovery timeout in seconds
  pub startup_timeout_sec: u64,
  /// Per-invocation timeout in seconds
  pub tool_timeout_sec: u64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      name: "Kubernetes MCP Server".to_string(),
      command: "go".to_string(),
      args: vec![
        "run".to_string(),
        "-C".to_string(),
        "server".to_string(),
        "main.go".to_string(),
      ],
      env: HashMap::new(),
      cwd: None,
      startup_timeout_sec: 60,
      tool_timeout_sec: 60,
    }
  }
}

// ============================================================================
// MODELS CONFIGURATION
// ============================================================================

/// Models configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
  /// Model provider
  pub provider: String,
  /// Model name
  pub model: String,
  /// Base URL for API
  #[serde(skip_serializing_if = "Option::is_none")]
  pub base_url: Option<String>,
  /// Sampling temperature
  #[serde(skip_serializing_if = "Option::is_none")]
  pub temperature: Option<f32>,
  /// Completion token limit
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_tokens: Option<u32>,
  /// Request timeout in seconds
  pub timeout_sec: u64,
}

impl Default for ModelsConfig {
  fn default() -> Self {
    Self {
      provider: "openai".to_string(),
      model: "gpt-4o".to_string(),
      base_url: None,
      temperature: None,
      max_tokens: None,
      timeout_sec: 120,
    }
  }
}

// ============================================================================
// AGENT CONFIGURATION
// ============================================================================

pub const DEFAULT_INSTRUCTIONS: &str = "Use the kubernetes tools to answer questions about the \
kubernetes cluster. You can also use the web search tool to search the web for information.";

/// Agent configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
  /// Agent display name
  pub name: String,
  /// System instructions
  pub instructions: String,
  /// Maximum reasoning round trips per user turn
  pub max_turns: usize,
  /// Carry earlier exchanges into later turns
  pub remember_history: bool,
}

impl Default for AgentConfig {
  fn default() -> Self {
    Self {
      name: "Assistant".to_string(),
      instructions: DEFAULT_INSTRUCTIONS.to_string(),
      max_turns: 10,
      remember_history: false,
    }
  }
}

// ============================================================================
// SEARCH CONFIGURATION
// ============================================================================

/// Web search configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
  /// Offer the web search tool
  pub enabled: bool,
  /// Instant-answer endpoint
  pub endpoint: String,
  /// Related topics to include
  pub max_results: usize,
  /// Request timeout in seconds
  pub timeout_sec: u64,
}

impl Default for SearchConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      endpoint: "https://api.duckduckgo.com/".to_string(),
      max_results: 5,
      timeout_sec: 20,
    }
  }
}
