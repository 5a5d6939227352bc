//! Model layer types
//!
//! Request, response and tool-definition types for OpenAI-compatible chat APIs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Chat completion request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
  /// Model identifier, optionally prefixed with a provider id ("ollama/llama3")
  pub model: String,

  /// List of messages
  pub messages: Vec<Message>,

  /// Sampling temperature (0.0 to 2.0)
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub temperature: Option<f32>,

  /// Maximum tokens to generate
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_tokens: Option<u32>,

  /// Tools available for the model to call
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tools: Option<Vec<Tool>>,
}

/// Message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
  /// System message
  System { content: String },

  /// User message
  User { content: String },

  /// Assistant message
  Assistant {
    /// Content of the message
    content: Option<String>,

    /// Tool calls made by the assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCall>>,
  },

  /// Tool result message
  Tool {
    /// ID of the tool call this result is for
    tool_call_id: String,

    /// Content of the tool result
    content: String,
  },
}

impl Message {
  /// Create a system message
  pub fn system(content: impl Into<String>) -> Self {
    Message::System {
      content: content.into(),
    }
  }

  /// Create a user message
  pub fn user(content: impl Into<String>) -> Self {
    Message::User {
      content: content.into(),
    }
  }

  /// Create an assistant message
  pub fn assistant(content: Option<String>, tool_calls: Option<Vec<ToolCall>>) -> Self {
    Message::Assistant {
      content,
      tool_calls,
    }
  }

  /// Create a tool message
  pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
    Message::Tool {
      tool_call_id: tool_call_id.into(),
      content: content.into(),
    }
  }

  /// Get the text content of this message
  pub fn text(&self) -> Option<&str> {
    match self {
      Message::System { content } | Message::User { content } => Some(content),
      Message::Assistant { content, .. } => content.as_deref(),
      Message::Tool { content, .. } => Some(content),
    }
  }
}

/// Tool definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
  /// Tool type (currently only "function")
  #[serde(rename = "type")]
  pub tool_type: String,

  /// Function tool definition
  pub function: FunctionDefinition,
}

impl Tool {
  /// Create a function tool
  pub fn function(function: FunctionDefinition) -> Self {
    Self {
      tool_type: "function".to_string(),
      function,
    }
  }
}

/// Function definition for a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
  /// Name of the function
  pub name: String,

  /// Description of what the function does
  pub description: String,

  /// JSON schema for the function parameters
  #[serde(default)]
  pub parameters: serde_json::Value,
}

/// Tool call made by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
  /// ID of this tool call
  pub id: String,

  /// Type of tool call (currently only "function")
  #[serde(rename = "type", default = "function_call_type")]
  pub call_type: String,

  /// The function to call
  pub function: ToolCallFunction,
}

fn function_call_type() -> String {
  "function".to_string()
}

/// Function call in a tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallFunction {
  /// Name of the function
  pub name: String,

  /// Arguments as a JSON string
  #[serde(default)]
  pub arguments: String,
}

impl ToolCall {
  /// Parse the arguments as JSON. Empty arguments mean an empty object.
  pub fn parse_arguments(&self) -> serde_json::Result<serde_json::Value> {
    if self.function.arguments.trim().is_empty() {
      return Ok(serde_json::json!({}));
    }
    serde_json::from_str(&self.function.arguments)
  }
}

/// Chat completion response
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
  /// Unique identifier for this response
  #[serde(default)]
  pub id: String,

  /// Model used
  #[serde(default)]
  pub model: String,

  /// List of completion choices
  pub choices: Vec<Choice>,

  /// Usage statistics
  #[serde(default)]
  pub usage: Usage,

  /// Provider-specific fields
  #[serde(flatten)]
  pub extra: HashMap<String, serde_json::Value>,
}

/// A completion choice
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
  /// Index of this choice
  #[serde(default)]
  pub index: u32,

  /// The message
  pub message: ChoiceMessage,

  /// Why the assistant stopped
  #[serde(default)]
  pub finish_reason: Option<String>,
}

/// Message in a choice
#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
  /// Role of the message (always "assistant")
  #[serde(default)]
  pub role: String,

  /// Content of the message
  #[serde(default)]
  pub content: Option<String>,

  /// Tool calls made
  #[serde(default)]
  pub tool_calls: Option<Vec<ToolCall>>,
}

/// Token usage statistics
#[derive(Debug, Clone, Deserialize, Default, Serialize)]
pub struct Usage {
  /// Number of tokens in the prompt
  #[serde(default, rename = "prompt_tokens")]
  pub input_tokens: u32,

  /// Number of tokens in the completion
  #[serde(default, rename = "completion_tokens")]
  pub output_tokens: u32,

  /// Total tokens
  #[serde(default)]
  pub total_tokens: u32,
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
  /// Provider ID (e.g., "openai", "ollama")
  pub provider_id: String,

  /// API key, when the provider needs one
  #[serde(default)]
  pub api_key: Option<String>,

  /// Base URL (for custom endpoints or local models)
  #[serde(default)]
  pub base_url: Option<String>,

  /// Timeout in seconds
  #[serde(default)]
  pub timeout: Option<u64>,

  /// Custom headers
  #[serde(default)]
  pub headers: HashMap<String, String>,
}

impl Default for ProviderConfig {
  fn default() -> Self {
    Self {
      provider_id: String::new(),
      api_key: None,
      base_url: None,
      timeout: None,
      headers: HashMap::new(),
    }
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use serde_json::json;

  use super::*;

  #[test]
  fn messages_serialize_in_chat_completions_shape() {
    let call = ToolCall {
      id: "call_1".to_string(),
      call_type: "function".to_string(),
      function: ToolCallFunction {
        name: "list_pods".to_string(),
        arguments: r#"{"namespace":"default"}"#.to_string(),
      },
    };
    let messages = vec![
      Message::system("be brief"),
      Message::user("which pods?"),
      Message::assistant(None, Some(vec![call])),
      Message::tool("call_1", "pod-a"),
    ];

    assert_eq!(
      serde_json::to_value(&messages).expect("serialize"),
      json!([
        { "role": "system", "content": "be brief" },
        { "role": "user", "content": "which pods?" },
        {
          "role": "assistant",
          "content": null,
          "tool_calls": [{
            "id": "call_1",
            "type": "function",
            "function": { "name": "list_pods", "arguments": "{\"namespace\":\"default\"}" }
          }]
        },
        { "role": "tool", "tool_call_id": "call_1", "content": "pod-a" }
      ])
    );
  }

  #[test]
  fn request_omits_unset_options() {
    let request = ChatRequest {
      model: "gpt-4o".to_string(),
      messages: vec![Message::user("hi")],
      ..Default::default()
    };
    let value = serde_json::to_value(&request).expect("serialize");
    assert!(value.get("tools").is_none());
    assert!(value.get("temperature").is_none());
  }

  #[test]
  fn minimal_response_parses() {
    let response: ChatResponse = serde_json::from_value(json!({
      "choices": [{ "message": { "role": "assistant", "content": "done" } }]
    }))
    .expect("parse");
    assert_eq!(response.choices[0].message.content.as_deref(), Some("done"));
    assert_eq!(response.usage.total_tokens, 0);
  }

  #[test]
  fn empty_arguments_parse_as_object() {
    let call = ToolCall {
      id: "c".to_string(),
      call_type: "function".to_string(),
      function: ToolCallFunction {
        name: "cluster_name".to_string(),
        arguments: String::new(),
      },
    };
    assert_eq!(call.parse_arguments().expect("args"), json!({}));
  }
}
