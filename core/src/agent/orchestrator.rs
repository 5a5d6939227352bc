use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use mcpilot_config::Config;

use crate::model::{ChatRequest, Message, ModelClient, ModelError, ToolCall};
use crate::tools::ToolRegistry;

use super::context::AgentContext;

#[derive(Error, Debug)]
pub enum OrchestrationError {
  #[error("reasoning service error: {0}")]
  Model(#[from] ModelError),

  #[error("reasoning service returned neither an answer nor tool calls")]
  EmptyResponse,

  #[error("no final answer after {0} reasoning rounds")]
  TurnLimitExceeded(usize),
}

/// Per-turn settings for the reasoning loop.
#[derive(Debug, Clone)]
pub struct TurnConfig {
  pub agent_name: String,
  pub model: String,
  pub instructions: String,
  pub max_turns: usize,
  pub temperature: Option<f32>,
  pub max_tokens: Option<u32>,
}

impl TurnConfig {
  pub fn from_config(config: &Config) -> Self {
    Self {
      agent_name: config.agent.name.clone(),
      model: config.models.model.clone(),
      instructions: config.agent.instructions.clone(),
      max_turns: config.agent.max_turns.max(1),
      temperature: config.models.temperature,
      max_tokens: config.models.max_tokens,
    }
  }
}

/// Drives one user utterance through the reasoning service, relaying any
/// tool calls it asks for until it produces a final answer.
pub struct AgentOrchestrator {
  model_client: Arc<ModelClient>,
  tool_registry: Arc<ToolRegistry>,
  turn_config: TurnConfig,
}

impl AgentOrchestrator {
  pub fn new(
    model_client: Arc<ModelClient>,
    tool_registry: Arc<ToolRegistry>,
    turn_config: TurnConfig,
  ) -> Self {
    Self {
      model_client,
      tool_registry,
      turn_config,
    }
  }

  pub async fn run(
    &self,
    utterance: &str,
    context: &mut AgentContext,
  ) -> Result<String, OrchestrationError> {
    let mut messages = Vec::with_capacity(context.history().len() + 2);
    messages.push(Message::system(self.turn_config.instructions.clone()));
    messages.extend(context.history().iter().cloned());
    messages.push(Message::user(utterance));

    // Some services reject an empty tool list outright.
    let tools = self.tool_registry.model_tools();
    let tools = (!tools.is_empty()).then_some(tools);

    for round in 1..=self.turn_config.max_turns {
      let request = ChatRequest {
        model: self.turn_config.model.clone(),
        messages: messages.clone(),
        temperature: self.turn_config.temperature,
        max_tokens: self.turn_config.max_tokens,
        tools: tools.clone(),
      };
      debug!(
        agent = %self.turn_config.agent_name,
        round,
        messages = request.messages.len(),
        "calling reasoning service"
      );

      let response = self.model_client.chat(request).await?;
      let message = response
        .choices
        .into_iter()
        .next()
        .ok_or(OrchestrationError::EmptyResponse)?
        .message;

      match message.tool_calls.filter(|calls| !calls.is_empty()) {
        Some(calls) => {
          messages.push(Message::assistant(message.content, Some(calls.clone())));
          for call in &calls {
            let output = self.dispatch(call).await;
            messages.push(Message::tool(call.id.clone(), output));
          }
        }
        None => {
          let answer = message
            .content
            .filter(|content| !content.trim().is_empty())
            .ok_or(OrchestrationError::EmptyResponse)?;
          context.record(utterance, &answer);
          return Ok(answer);
        }
      }
    }

    Err(OrchestrationError::TurnLimitExceeded(
      self.turn_config.max_turns,
    ))
  }

  /// Run one tool call; failures become the tool result text.
  async fn dispatch(&self, call: &ToolCall) -> String {
    let name = &call.function.name;
    let arguments = match call.parse_arguments() {
      Ok(arguments) => arguments,
      Err(e) => {
        warn!(tool = %name, "unparsable tool arguments: {e}");
        return format!("error: invalid arguments for {name}: {e}");
      }
    };

    match self.tool_registry.invoke_by_name(name, arguments).await {
      Ok(output) => {
        info!(tool = %name, bytes = output.content.len(), "tool call succeeded");
        output.content
      }
      Err(e) => {
        warn!(tool = %name, provenance = e.provenance(), "tool call failed: {e}");
        format!("error: {e}")
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use serde_json::json;

  use super::*;
  use crate::test_support::{ScriptedProvider, registry_for, text_reply, tool_reply};

  fn turn_config(max_turns: usize) -> TurnConfig {
    TurnConfig {
      agent_name: "Assistant".to_string(),
      model: "gpt-4o".to_string(),
      instructions: "be helpful".to_string(),
      max_turns,
      temperature: None,
      max_tokens: None,
    }
  }

  fn advertised(request: &ChatRequest) -> Vec<String> {
    request
      .tools
      .iter()
      .flatten()
      .map(|tool| tool.function.name.clone())
      .collect()
  }

  #[tokio::test]
  async fn relays_tool_calls_and_returns_final_answer() {
    let provider = ScriptedProvider::new(vec![
      tool_reply(&[("call_1", "cluster_name", json!({}))]),
      text_reply("The cluster is kind-test."),
    ]);
    let orchestrator = AgentOrchestrator::new(
      provider.clone().into_client().await,
      registry_for(&["cluster_name", "echo"]).await,
      turn_config(5),
    );

    let answer = orchestrator
      .run("what cluster is this?", &mut AgentContext::default())
      .await
      .expect("answer");
    assert_eq!(answer, "The cluster is kind-test.");

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
      advertised(&requests[0]),
      vec!["cluster_name", "echo", "web_search"]
    );
    assert_eq!(
      requests[1].messages.last(),
      Some(&Message::tool("call_1", "kind-test"))
    );
  }

  #[tokio::test]
  async fn tool_failure_is_reported_back_not_raised() {
    let provider = ScriptedProvider::new(vec![
      tool_reply(&[
        ("call_1", "list_pods", json!({})),
        ("call_2", "no_such_tool", json!({})),
      ]),
      text_reply("The tool server is unavailable."),
    ]);
    let orchestrator = AgentOrchestrator::new(
      provider.clone().into_client().await,
      registry_for(&["list_pods"]).await,
      turn_config(5),
    );

    let answer = orchestrator
      .run("list pods", &mut AgentContext::default())
      .await
      .expect("answer despite failure");
    assert_eq!(answer, "The tool server is unavailable.");

    let requests = provider.requests();
    let results: Vec<&str> = requests[1]
      .messages
      .iter()
      .filter(|m| matches!(m, Message::Tool { .. }))
      .filter_map(Message::text)
      .collect();
    assert_eq!(
      results,
      vec![
        "error: tool server: tool server channel is closed",
        "error: unknown tool `no_such_tool`",
      ]
    );
  }

  #[tokio::test]
  async fn empty_catalog_still_offers_search() {
    let provider = ScriptedProvider::new(vec![
      tool_reply(&[("call_1", "web_search", json!({ "query": "helm" }))]),
      text_reply("Helm is a package manager."),
    ]);
    let orchestrator = AgentOrchestrator::new(
      provider.clone().into_client().await,
      registry_for(&[]).await,
      turn_config(5),
    );

    orchestrator
      .run("what is helm?", &mut AgentContext::default())
      .await
      .expect("answer");

    let requests = provider.requests();
    assert_eq!(advertised(&requests[0]), vec!["web_search"]);
    assert_eq!(
      requests[1].messages.last(),
      Some(&Message::tool("call_1", "web results for helm"))
    );
  }

  #[tokio::test]
  async fn service_errors_fail_the_turn() {
    let provider = ScriptedProvider::new(vec![Err(ModelError::ApiError(
      "HTTP 500: boom".to_string(),
    ))]);
    let orchestrator = AgentOrchestrator::new(
      provider.into_client().await,
      registry_for(&["cluster_name"]).await,
      turn_config(5),
    );

    let mut context = AgentContext::new(true);
    let err = orchestrator
      .run("hello", &mut context)
      .await
      .expect_err("service down");
    assert!(matches!(err, OrchestrationError::Model(ModelError::ApiError(_))));
    assert!(context.history().is_empty());
  }

  #[test]
  fn turn_config_follows_agent_and_model_settings() {
    let mut config = Config::default();
    config.agent.name = "k8s-helper".to_string();
    config.agent.max_turns = 0;
    config.models.model = "ollama/llama3".to_string();

    let turn = TurnConfig::from_config(&config);
    assert_eq!(turn.agent_name, "k8s-helper");
    assert_eq!(turn.model, "ollama/llama3");
    assert_eq!(turn.max_turns, 1);
  }

  #[tokio::test]
  async fn stops_after_max_turns() {
    let provider = ScriptedProvider::new(vec![
      tool_reply(&[("call_1", "cluster_name", json!({}))]),
      tool_reply(&[("call_2", "cluster_name", json!({}))]),
      text_reply("never reached"),
    ]);
    let orchestrator = AgentOrchestrator::new(
      provider.clone().into_client().await,
      registry_for(&["cluster_name"]).await,
      turn_config(2),
    );

    let err = orchestrator
      .run("loop forever", &mut AgentContext::default())
      .await
      .expect_err("limit");
    assert!(matches!(err, OrchestrationError::TurnLimitExceeded(2)));
    assert_eq!(provider.requests().len(), 2);
  }

  #[tokio::test]
  async fn blank_reply_is_an_empty_response() {
    let provider = ScriptedProvider::new(vec![text_reply("  ")]);
    let orchestrator = AgentOrchestrator::new(
      provider.into_client().await,
      registry_for(&[]).await,
      turn_config(2),
    );

    let err = orchestrator
      .run("hello", &mut AgentContext::default())
      .await
      .expect_err("empty");
    assert!(matches!(err, OrchestrationError::EmptyResponse));
  }

  #[tokio::test]
  async fn history_is_carried_only_when_remembered() {
    for remember in [false, true] {
      let provider = ScriptedProvider::new(vec![text_reply("first"), text_reply("second")]);
      let orchestrator = AgentOrchestrator::new(
        provider.clone().into_client().await,
        registry_for(&[]).await,
        turn_config(2),
      );
      let mut context = AgentContext::new(remember);

      orchestrator.run("one", &mut context).await.expect("first");
      orchestrator.run("two", &mut context).await.expect("second");

      let second = &provider.requests()[1];
      let expected = if remember { 4 } else { 2 };
      assert_eq!(second.messages.len(), expected, "remember={remember}");
      assert_eq!(second.messages[0], Message::system("be helpful"));
    }
  }
}
