//! Fakes shared by the unit tests in this crate.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use mcpilot_mcp_client::{
  CallToolResult, ContentBlock, McpClientError, ToolCatalog, ToolDescriptor, ToolServer,
};

use crate::model::{
  ChatRequest, ChatResponse, Choice, ChoiceMessage, ModelClient, ModelError, ModelProvider,
  ProviderConfig, ProviderRegistry, ToolCall, ToolCallFunction, Usage,
};
use crate::tools::{SearchError, ToolRegistry, WebSearch};

/// Tool server with `cluster_name` and `echo`; any other name fails as a crashed server would.
pub(crate) struct FakeToolServer {
  tools: Vec<ToolDescriptor>,
}

impl FakeToolServer {
  pub(crate) fn with_tools(names: &[&str]) -> Self {
    Self {
      tools: names
        .iter()
        .map(|name| ToolDescriptor::new(*name, format!("{name} tool"), json!({ "type": "object" })))
        .collect(),
    }
  }
}

#[async_trait]
impl ToolServer for FakeToolServer {
  async fn list_operations(&self) -> mcpilot_mcp_client::Result<Vec<ToolDescriptor>> {
    Ok(self.tools.clone())
  }

  async fn invoke(&self, name: &str, arguments: Value) -> mcpilot_mcp_client::Result<CallToolResult> {
    let text = match name {
      "cluster_name" => "kind-test".to_string(),
      "echo" => arguments["message"].as_str().unwrap_or_default().to_string(),
      _ => return Err(McpClientError::Closed),
    };
    Ok(CallToolResult {
      content: vec![ContentBlock::Text { text }],
      is_error: false,
    })
  }
}

pub(crate) struct CannedSearch;

#[async_trait]
impl WebSearch for CannedSearch {
  async fn search(&self, query: &str) -> Result<String, SearchError> {
    Ok(format!("web results for {query}"))
  }
}

pub(crate) async fn registry_for(names: &[&str]) -> Arc<ToolRegistry> {
  let server = Arc::new(FakeToolServer::with_tools(names));
  let catalog = ToolCatalog::build(server.as_ref()).await.expect("catalog");
  Arc::new(ToolRegistry::new(&catalog, server, Some(Arc::new(CannedSearch))))
}

/// Provider that replays scripted replies and records every request.
#[derive(Clone, Default)]
pub(crate) struct ScriptedProvider {
  replies: Arc<Mutex<VecDeque<crate::model::Result<ChatResponse>>>>,
  requests: Arc<Mutex<Vec<ChatRequest>>>,
  config: ProviderConfig,
}

impl ScriptedProvider {
  pub(crate) fn new(replies: Vec<crate::model::Result<ChatResponse>>) -> Self {
    Self {
      replies: Arc::new(Mutex::new(replies.into())),
      requests: Arc::default(),
      config: ProviderConfig {
        provider_id: "mock".to_string(),
        ..Default::default()
      },
    }
  }

  pub(crate) fn requests(&self) -> Vec<ChatRequest> {
    self.requests.lock().expect("requests lock").clone()
  }

  pub(crate) async fn into_client(self) -> Arc<ModelClient> {
    let registry = Arc::new(ProviderRegistry::new());
    registry.register(self).await;
    registry.set_default("mock").await.expect("set mock default");
    Arc::new(ModelClient::new(registry))
  }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
  fn provider_id(&self) -> &'static str {
    "mock"
  }

  fn provider_name(&self) -> &'static str {
    "Mock Provider"
  }

  async fn chat_completion(&self, request: ChatRequest) -> crate::model::Result<ChatResponse> {
    self.requests.lock().expect("requests lock").push(request);
    self
      .replies
      .lock()
      .expect("replies lock")
      .pop_front()
      .unwrap_or_else(|| Err(ModelError::ApiError("script exhausted".to_string())))
  }

  fn config(&self) -> &ProviderConfig {
    &self.config
  }
}

fn response(content: Option<&str>, tool_calls: Option<Vec<ToolCall>>) -> ChatResponse {
  ChatResponse {
    id: "mock-response".to_string(),
    model: "mock/default".to_string(),
    choices: vec![Choice {
      index: 0,
      message: ChoiceMessage {
        role: "assistant".to_string(),
        content: content.map(str::to_string),
        tool_calls,
      },
      finish_reason: Some("stop".to_string()),
    }],
    usage: Usage::default(),
    extra: Default::default(),
  }
}

pub(crate) fn text_reply(content: &str) -> crate::model::Result<ChatResponse> {
  Ok(response(Some(content), None))
}

pub(crate) fn tool_reply(calls: &[(&str, &str, Value)]) -> crate::model::Result<ChatResponse> {
  let calls = calls
    .iter()
    .map(|(id, name, arguments)| ToolCall {
      id: id.to_string(),
      call_type: "function".to_string(),
      function: ToolCallFunction {
        name: name.to_string(),
        arguments: arguments.to_string(),
      },
    })
    .collect();
  Ok(response(None, Some(calls)))
}
