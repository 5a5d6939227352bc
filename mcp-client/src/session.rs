//! Tool server process lifecycle

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use rmcp::model::ClientInfo;
use rmcp::service::{Peer, RoleClient, RunningService, ServiceError, ServiceExt};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::channel::{PARSE_ERROR, StdoutRelay};
use crate::error::{McpClientError, Result};
use crate::protocol::{CallToolResult, Implementation, ToolDescriptor};

/// How long a server gets to exit on its own after stdin is closed.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

const METHOD_INITIALIZE: &str = "initialize";
const METHOD_LIST_TOOLS: &str = "tools/list";
const METHOD_CALL_TOOL: &str = "tools/call";

/// Launch parameters for a tool server process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerLaunch {
  pub name: String,
  pub command: String,
  pub args: Vec<String>,
  pub env: HashMap<String, String>,
  pub cwd: Option<PathBuf>,
}

impl ServerLaunch {
  pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
    let command = command.into();
    Self {
      name: command.clone(),
      command,
      args,
      ..Default::default()
    }
  }

  /// Command line as typed by a user, for messages.
  pub fn display_command(&self) -> String {
    std::iter::once(self.command.as_str())
      .chain(self.args.iter().map(String::as_str))
      .collect::<Vec<_>>()
      .join(" ")
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
  /// Bound on the initialize handshake and on discovery
  pub startup_timeout: Duration,
  /// Bound on each tool invocation
  pub request_timeout: Duration,
}

impl Default for SessionOptions {
  fn default() -> Self {
    Self {
      startup_timeout: Duration::from_secs(60),
      request_timeout: Duration::from_secs(60),
    }
  }
}

/// The operations a tool server offers to the rest of the system.
#[async_trait]
pub trait ToolServer: Send + Sync {
  /// Enumerate every operation the server advertises.
  async fn list_operations(&self) -> Result<Vec<ToolDescriptor>>;

  /// Run one operation. A server-reported failure is an error, not a result.
  async fn invoke(&self, name: &str, arguments: Value) -> Result<CallToolResult>;
}

/// One live tool server process and the protocol client talking to it.
///
/// The session is the only owner of the child's standard streams. `close`
/// must run on every exit path; the child is also killed if the session is
/// dropped without it.
pub struct ToolServerSession {
  launch: ServerLaunch,
  options: SessionOptions,
  peer: Peer<RoleClient>,
  service: Mutex<Option<RunningService<RoleClient, ClientInfo>>>,
  process: ServerProcess,
  server_info: Implementation,
}

impl ToolServerSession {
  /// Spawn the server and complete the initialize handshake.
  pub async fn open(launch: &ServerLaunch, options: SessionOptions) -> Result<Self> {
    let mut command = Command::new(&launch.command);
    command
      .args(&launch.args)
      .envs(&launch.env)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);
    if let Some(cwd) = &launch.cwd {
      command.current_dir(cwd);
    }

    let mut child = command.spawn().map_err(|source| McpClientError::Launch {
      command: launch.display_command(),
      source,
    })?;
    info!(
      server = %launch.name,
      pid = child.id(),
      "spawned tool server `{}`",
      launch.display_command()
    );

    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr_task = child
      .stderr
      .take()
      .map(|stderr| tokio::spawn(forward_stderr(launch.name.clone(), stderr)));
    let (Some(stdin), Some(stdout)) = (stdin, stdout) else {
      let process = ServerProcess::new(&launch.name, child, None, stderr_task);
      process.terminate().await;
      return Err(McpClientError::Protocol(
        "tool server stdio is not piped".to_string(),
      ));
    };

    let (relay, stdout) = StdoutRelay::spawn(&launch.name, stdout);
    let process = ServerProcess::new(&launch.name, child, Some(relay), stderr_task);

    let handshake = tokio::time::timeout(
      options.startup_timeout,
      client_info().serve((stdout, stdin)),
    )
    .await;
    let service = match handshake {
      Ok(Ok(service)) => service,
      Ok(Err(err)) => {
        let err = if process.output_ended() {
          McpClientError::Closed
        } else {
          McpClientError::Protocol(format!("initialize handshake failed: {err}"))
        };
        process.terminate().await;
        return Err(err);
      }
      Err(_) => {
        process.terminate().await;
        return Err(McpClientError::Timeout {
          method: METHOD_INITIALIZE.to_string(),
          timeout: options.startup_timeout,
        });
      }
    };

    let server_info = service
      .peer_info()
      .map(Implementation::from_server_info)
      .unwrap_or_default();
    info!(
      server = %launch.name,
      "handshake complete with {} {}",
      server_info.name,
      server_info.version
    );

    Ok(Self {
      launch: launch.clone(),
      options,
      peer: service.peer().clone(),
      service: Mutex::new(Some(service)),
      process,
      server_info,
    })
  }

  /// Name and version the server reported during the handshake.
  pub fn server_info(&self) -> &Implementation {
    &self.server_info
  }

  pub async fn is_open(&self) -> bool {
    self.service.lock().await.is_some() && !self.process.output_ended()
  }

  /// Stop the protocol client and terminate the server. Safe to call repeatedly.
  pub async fn close(&self) {
    let service = self.service.lock().await.take();
    if let Some(service) = service {
      match tokio::time::timeout(SHUTDOWN_GRACE, service.cancel()).await {
        Ok(Ok(_)) => debug!(server = %self.launch.name, "protocol client stopped"),
        Ok(Err(err)) => warn!(server = %self.launch.name, "protocol client task failed: {err}"),
        Err(_) => warn!(server = %self.launch.name, "protocol client did not stop in time"),
      }
    }
    self.process.terminate().await;
  }

  async fn request<T, F>(&self, method: &str, timeout: Duration, call: F) -> Result<T>
  where
    F: Future<Output = std::result::Result<T, ServiceError>>,
  {
    if !self.is_open().await {
      return Err(McpClientError::Closed);
    }

    match tokio::time::timeout(timeout, call).await {
      Ok(Ok(value)) => Ok(value),
      Ok(Err(ServiceError::McpError(error))) if error.code.0 == PARSE_ERROR => {
        Err(McpClientError::Protocol(error.message.to_string()))
      }
      Ok(Err(ServiceError::McpError(error))) => Err(McpClientError::Rpc {
        code: i64::from(error.code.0),
        message: error.message.to_string(),
      }),
      Ok(Err(ServiceError::TransportClosed)) => Err(McpClientError::Closed),
      Ok(Err(_)) if self.process.output_ended() => Err(McpClientError::Closed),
      Ok(Err(err)) => Err(McpClientError::Protocol(format!("`{method}` failed: {err}"))),
      Err(_) => {
        warn!(server = %self.launch.name, method, ?timeout, "request abandoned after timeout");
        Err(McpClientError::Timeout {
          method: method.to_string(),
          timeout,
        })
      }
    }
  }
}

#[async_trait]
impl ToolServer for ToolServerSession {
  async fn list_operations(&self) -> Result<Vec<ToolDescriptor>> {
    let tools = self
      .request(
        METHOD_LIST_TOOLS,
        self.options.startup_timeout,
        self.peer.list_all_tools(),
      )
      .await?;
    let tools = tools
      .iter()
      .map(ToolDescriptor::from_wire)
      .collect::<Result<Vec<_>>>()?;

    debug!(server = %self.launch.name, count = tools.len(), "discovered operations");
    Ok(tools)
  }

  async fn invoke(&self, name: &str, arguments: Value) -> Result<CallToolResult> {
    let params = serde_json::from_value(json!({ "name": name, "arguments": arguments }))
      .map_err(|e| McpClientError::Protocol(format!("cannot send arguments for `{name}`: {e}")))?;
    let result = self
      .request(
        METHOD_CALL_TOOL,
        self.options.request_timeout,
        self.peer.call_tool(params),
      )
      .await?;
    let result = CallToolResult::from_wire(&result)?;

    if result.is_error {
      return Err(McpClientError::OperationFailed {
        tool: name.to_string(),
        message: result.text(),
      });
    }
    Ok(result)
  }
}

/// The child process and the tasks reading its output.
struct ServerProcess {
  name: String,
  child: Mutex<Option<Child>>,
  relay: Option<StdoutRelay>,
  stderr_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl ServerProcess {
  fn new(
    name: &str,
    child: Child,
    relay: Option<StdoutRelay>,
    stderr_task: Option<JoinHandle<()>>,
  ) -> Self {
    Self {
      name: name.to_string(),
      child: Mutex::new(Some(child)),
      relay,
      stderr_task: std::sync::Mutex::new(stderr_task),
    }
  }

  fn output_ended(&self) -> bool {
    self.relay.as_ref().is_none_or(StdoutRelay::has_ended)
  }

  /// Wait out the grace period, then kill. Only the first call does anything.
  async fn terminate(&self) {
    let Some(mut child) = self.child.lock().await.take() else {
      return;
    };

    match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
      Ok(Ok(status)) => info!(server = %self.name, "tool server exited: {status}"),
      Ok(Err(err)) => warn!(server = %self.name, "failed to reap tool server: {err}"),
      Err(_) => {
        if let Err(err) = child.kill().await {
          warn!(server = %self.name, "failed to kill tool server: {err}");
        } else {
          info!(server = %self.name, "tool server killed");
        }
      }
    }

    if let Some(relay) = &self.relay {
      relay.abort();
    }
    if let Ok(mut task) = self.stderr_task.lock() {
      if let Some(task) = task.take() {
        task.abort();
      }
    }
  }
}

fn client_info() -> ClientInfo {
  let mut info = ClientInfo::default();
  info.client_info.name = env!("CARGO_PKG_NAME").to_string();
  info.client_info.version = env!("CARGO_PKG_VERSION").to_string();
  info
}

async fn forward_stderr(server: String, stderr: ChildStderr) {
  let mut lines = BufReader::new(stderr).lines();
  while let Ok(Some(line)) = lines.next_line().await {
    info!(target: "tool_server", server = %server, "{line}");
  }
}
