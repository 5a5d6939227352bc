//! Tool server payloads as the rest of mcpilot sees them
//!
//! The `rmcp` model types are converted through their wire form, so only the
//! fields mcpilot reads are modelled here and newer protocol fields pass by.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{McpClientError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Implementation {
  pub name: String,
  #[serde(default)]
  pub version: String,
}

impl Implementation {
  pub(crate) fn from_server_info(info: &rmcp::model::ServerInfo) -> Self {
    Self {
      name: info.server_info.name.clone(),
      version: info.server_info.version.clone(),
    }
  }
}

/// Description of one operation the tool server can perform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDescriptor {
  pub name: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub description: String,
  #[serde(rename = "inputSchema", default = "default_input_schema")]
  pub input_schema: Value,
}

fn default_input_schema() -> Value {
  serde_json::json!({ "type": "object" })
}

impl ToolDescriptor {
  pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
    Self {
      name: name.into(),
      description: description.into(),
      input_schema,
    }
  }

  pub(crate) fn from_wire(tool: &rmcp::model::Tool) -> Result<Self> {
    rewire(tool, "tool descriptor")
  }
}

/// One block of tool output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
  Text {
    text: String,
  },
  Image {
    data: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
  },
  Resource {
    resource: Value,
  },
  #[serde(other)]
  Unsupported,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
  #[serde(default)]
  pub content: Vec<ContentBlock>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub is_error: bool,
}

impl CallToolResult {
  pub(crate) fn from_wire(result: &rmcp::model::CallToolResult) -> Result<Self> {
    rewire(result, "tools/call result")
  }

  /// Render the result as plain text for the reasoning service.
  pub fn text(&self) -> String {
    self
      .content
      .iter()
      .map(|block| match block {
        ContentBlock::Text { text } => text.clone(),
        ContentBlock::Image { mime_type, .. } => format!("[image: {mime_type}]"),
        ContentBlock::Resource { resource } => resource
          .get("text")
          .and_then(Value::as_str)
          .map(str::to_string)
          .unwrap_or_else(|| resource.to_string()),
        ContentBlock::Unsupported => "[unsupported content]".to_string(),
      })
      .collect::<Vec<_>>()
      .join("\n")
  }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn rewire<S: Serialize, T: DeserializeOwned>(wire: &S, what: &str) -> Result<T> {
  serde_json::to_value(wire)
    .and_then(serde_json::from_value)
    .map_err(|e| McpClientError::Protocol(format!("malformed {what}: {e}")))
}
