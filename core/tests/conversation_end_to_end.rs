use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mcpilot_config::{Config, ModelsConfig, SearchConfig};
use mcpilot_core::agent::{AgentContext, AgentOrchestrator, TurnConfig};
use mcpilot_core::conversation::{ConversationLoop, print_catalog};
use mcpilot_core::model::init_model_layer;
use mcpilot_core::tools::{DuckDuckGoSearch, ToolRegistry, WebSearch};
use mcpilot_mcp_client::{
  CallToolResult, ContentBlock, Implementation, ToolCatalog, ToolDescriptor, ToolServer,
};

/// In-process stand-in for the tool server that records what was invoked.
#[derive(Default)]
struct RecordingServer {
  tools: Vec<ToolDescriptor>,
  invoked: Mutex<Vec<String>>,
}

#[async_trait]
impl ToolServer for RecordingServer {
  async fn list_operations(&self) -> mcpilot_mcp_client::Result<Vec<ToolDescriptor>> {
    Ok(self.tools.clone())
  }

  async fn invoke(&self, name: &str, _arguments: Value) -> mcpilot_mcp_client::Result<CallToolResult> {
    self.invoked.lock().expect("lock").push(name.to_string());
    Ok(CallToolResult {
      content: vec![ContentBlock::Text {
        text: format!("{name} says kind-test"),
      }],
      is_error: false,
    })
  }
}

fn completion(message: Value) -> ResponseTemplate {
  ResponseTemplate::new(200).set_body_json(json!({
    "id": "chatcmpl-1",
    "object": "chat.completion",
    "model": "llama3",
    "choices": [{ "index": 0, "message": message, "finish_reason": "stop" }]
  }))
}

fn tool_call(name: &str, arguments: &str) -> Value {
  json!({
    "role": "assistant",
    "content": null,
    "tool_calls": [{
      "id": "call_1",
      "type": "function",
      "function": { "name": name, "arguments": arguments }
    }]
  })
}

async fn reasoning_service(first: Value, final_answer: &str) -> MockServer {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/v1/chat/completions"))
    .and(body_string_contains("\"tool_call_id\""))
    .respond_with(completion(json!({ "role": "assistant", "content": final_answer })))
    .with_priority(1)
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("POST"))
    .and(path("/v1/chat/completions"))
    .respond_with(completion(first))
    .expect(1)
    .mount(&server)
    .await;
  server
}

async fn orchestrator_for(
  llm: &MockServer,
  server: Arc<RecordingServer>,
  search: Option<Arc<dyn WebSearch>>,
) -> (AgentOrchestrator, ToolCatalog) {
  let models = ModelsConfig {
    provider: "ollama".to_string(),
    model: "llama3".to_string(),
    base_url: Some(format!("{}/v1", llm.uri())),
    timeout_sec: 10,
    ..Default::default()
  };
  let client = init_model_layer(&models).await.expect("model layer");
  let catalog = ToolCatalog::build(server.as_ref()).await.expect("catalog");
  let registry = Arc::new(ToolRegistry::new(&catalog, server, search));
  let orchestrator = AgentOrchestrator::new(client, registry, TurnConfig::from_config(&Config::default()));
  (orchestrator, catalog)
}

#[tokio::test]
async fn answers_from_tool_server_operations() {
  let llm = reasoning_service(
    tool_call("cluster_name", "{}"),
    "You are connected to kind-test.",
  )
  .await;
  let server = Arc::new(RecordingServer {
    tools: vec![
      ToolDescriptor::new("list_pods", "List pods in a namespace", json!({ "type": "object" })),
      ToolDescriptor::new(
        "cluster_name",
        "Get the name of the current cluster",
        json!({ "type": "object" }),
      ),
    ],
    ..Default::default()
  });
  let (orchestrator, catalog) = orchestrator_for(&llm, server.clone(), None).await;

  let info = Implementation {
    name: "k8s".to_string(),
    version: "1.0".to_string(),
  };
  let mut output = Vec::new();
  print_catalog(&mut output, &info, &catalog).await.expect("banner");

  let mut input = BufReader::new("Which cluster am I on?\nexit\n".as_bytes());
  let mut conversation = ConversationLoop::new(&orchestrator, AgentContext::default());
  conversation
    .run(&mut input, &mut output, &CancellationToken::new())
    .await
    .expect("conversation");

  assert_eq!(
    String::from_utf8(output).expect("utf8"),
    "Connected to k8s 1.0\n\n\
     Available tools:\n\
     list_pods: List pods in a namespace\n\
     cluster_name: Get the name of the current cluster\n\n\
     Enter your questions (type 'exit' to quit):\n\
     > You are connected to kind-test.\n\n> "
  );
  assert_eq!(*server.invoked.lock().expect("lock"), vec!["cluster_name"]);
}

#[tokio::test]
async fn empty_catalog_answers_with_web_search() {
  let llm = reasoning_service(
    tool_call("web_search", r#"{"query":"kubernetes"}"#),
    "Kubernetes orchestrates containers.",
  )
  .await;

  let ddg = MockServer::start().await;
  Mock::given(method("GET"))
    .and(query_param("q", "kubernetes"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "Heading": "Kubernetes",
      "AbstractText": "Container orchestration system.",
      "AbstractURL": "https://kubernetes.io",
      "RelatedTopics": []
    })))
    .expect(1)
    .mount(&ddg)
    .await;
  let search = DuckDuckGoSearch::new(&SearchConfig {
    endpoint: format!("{}/", ddg.uri()),
    ..Default::default()
  });

  let server = Arc::new(RecordingServer::default());
  let (orchestrator, catalog) = orchestrator_for(&llm, server.clone(), Some(Arc::new(search))).await;
  assert!(catalog.is_empty());

  let answer = orchestrator
    .run("what is kubernetes?", &mut AgentContext::default())
    .await
    .expect("answer");
  assert_eq!(answer, "Kubernetes orchestrates containers.");
  assert!(server.invoked.lock().expect("lock").is_empty());
}
