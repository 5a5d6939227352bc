// Web Search Handler
// Built-in search backed by the DuckDuckGo instant-answer API

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use mcpilot_config::SearchConfig;

use crate::tools::context::{CapabilityError, ToolInvocation, ToolOutput};
use crate::tools::spec::{ToolHandlerType, ToolSpec, obj, str_field};

pub const WEB_SEARCH_TOOL: &str = "web_search";

#[derive(Error, Debug)]
pub enum SearchError {
  #[error("search request failed: {0}")]
  Network(#[from] reqwest::Error),

  #[error("search service returned HTTP {status}: {body}")]
  Status { status: u16, body: String },

  #[error("could not decode search response: {0}")]
  Decode(#[from] serde_json::Error),
}

/// Free-text query in, retrieved text out.
#[async_trait]
pub trait WebSearch: Send + Sync {
  async fn search(&self, query: &str) -> Result<String, SearchError>;
}

pub fn web_search_spec() -> ToolSpec {
  let mut props = BTreeMap::new();
  props.insert("query".to_string(), str_field("Search terms"));
  ToolSpec::new(
    WEB_SEARCH_TOOL,
    "Search the web for information",
    obj(props, &["query"]).to_value(),
    ToolHandlerType::Builtin,
  )
}

#[derive(Deserialize)]
struct WebSearchArgs {
  query: String,
}

pub struct WebSearchHandler {
  backend: Arc<dyn WebSearch>,
}

impl WebSearchHandler {
  pub fn new(backend: Arc<dyn WebSearch>) -> Self {
    Self { backend }
  }

  pub async fn handle(&self, invocation: ToolInvocation) -> Result<ToolOutput, CapabilityError> {
    let args: WebSearchArgs = invocation.parse_arguments()?;
    if args.query.trim().is_empty() {
      return Err(CapabilityError::InvalidArguments {
        tool: invocation.name,
        reason: "query must not be empty".to_string(),
      });
    }

    self
      .backend
      .search(args.query.trim())
      .await
      .map(ToolOutput::success)
      .map_err(|source| CapabilityError::Builtin {
        tool: invocation.name,
        source,
      })
  }
}

/// DuckDuckGo instant-answer client
pub struct DuckDuckGoSearch {
  client: Client,
  endpoint: String,
  max_results: usize,
}

impl DuckDuckGoSearch {
  pub fn new(config: &SearchConfig) -> Self {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_sec))
      .build()
      .unwrap_or_else(|_| Client::new());

    Self {
      client,
      endpoint: config.endpoint.clone(),
      max_results: config.max_results,
    }
  }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
  async fn search(&self, query: &str) -> Result<String, SearchError> {
    debug!(query, "web search");
    let response = self
      .client
      .get(&self.endpoint)
      .query(&[
        ("q", query),
        ("format", "json"),
        ("no_html", "1"),
        ("skip_disambig", "1"),
      ])
      .send()
      .await?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
      return Err(SearchError::Status {
        status: status.as_u16(),
        body,
      });
    }

    let answer: InstantAnswer = serde_json::from_str(&body)?;
    Ok(render(query, &answer, self.max_results))
  }
}

#[derive(Debug, Default, Deserialize)]
struct InstantAnswer {
  #[serde(rename = "Heading", default)]
  heading: String,
  #[serde(rename = "Answer", default)]
  answer: serde_json::Value,
  #[serde(rename = "AbstractText", default)]
  abstract_text: String,
  #[serde(rename = "AbstractURL", default)]
  abstract_url: String,
  #[serde(rename = "RelatedTopics", default)]
  related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
  Group {
    #[serde(rename = "Topics")]
    topics: Vec<RelatedTopic>,
  },
  Entry {
    #[serde(rename = "Text", default)]
    text: String,
    #[serde(rename = "FirstURL", default)]
    first_url: String,
  },
}

fn collect_topics<'a>(topics: &'a [RelatedTopic], out: &mut Vec<(&'a str, &'a str)>) {
  for topic in topics {
    match topic {
      RelatedTopic::Group { topics } => collect_topics(topics, out),
      RelatedTopic::Entry { text, first_url } if !text.is_empty() => {
        out.push((text, first_url));
      }
      RelatedTopic::Entry { .. } => {}
    }
  }
}

fn render(query: &str, result: &InstantAnswer, max_results: usize) -> String {
  let mut lines = Vec::new();

  if let Some(answer) = result.answer.as_str().filter(|a| !a.is_empty()) {
    lines.push(format!("Answer: {answer}"));
  }

  if !result.abstract_text.is_empty() {
    if result.heading.is_empty() {
      lines.push(result.abstract_text.clone());
    } else {
      lines.push(format!("{}: {}", result.heading, result.abstract_text));
    }
    if !result.abstract_url.is_empty() {
      lines.push(format!("Source: {}", result.abstract_url));
    }
  }

  let mut topics = Vec::new();
  collect_topics(&result.related_topics, &mut topics);
  if !topics.is_empty() && max_results > 0 {
    lines.push("Related:".to_string());
    for (text, url) in topics.into_iter().take(max_results) {
      if url.is_empty() {
        lines.push(format!("- {text}"));
      } else {
        lines.push(format!("- {text} ({url})"));
      }
    }
  }

  if lines.is_empty() {
    return format!("No results found for \"{query}\".");
  }
  lines.join("\n")
}
