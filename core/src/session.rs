// mcpilot Session
// Owns the tool server process and everything built on top of it

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::info;

use mcpilot_config::{Config, ServerConfig};
use mcpilot_mcp_client::{
  Implementation, McpClientError, ServerLaunch, SessionOptions, ToolCatalog, ToolServer,
  ToolServerSession,
};

use crate::agent::{AgentContext, AgentOrchestrator, TurnConfig};
use crate::conversation::{ConversationLoop, print_catalog};
use crate::model::{ModelClient, ModelError, init_model_layer};
use crate::tools::build_default_tools;

#[derive(Error, Debug)]
pub enum SessionError {
  #[error(transparent)]
  ToolServer(#[from] McpClientError),

  #[error("reasoning service setup failed: {0}")]
  Model(#[from] ModelError),
}

pub fn server_launch(server: &ServerConfig) -> ServerLaunch {
  ServerLaunch {
    name: server.name.clone(),
    command: server.command.clone(),
    args: server.args.clone(),
    env: server.env.clone(),
    cwd: server.cwd.clone(),
  }
}

pub fn session_options(server: &ServerConfig) -> SessionOptions {
  SessionOptions {
    startup_timeout: Duration::from_secs(server.startup_timeout_sec),
    request_timeout: Duration::from_secs(server.tool_timeout_sec),
  }
}

/// One run: a live tool server, its catalog and the orchestrator using it.
///
/// The catalog is complete before the orchestrator exists. [`Session::shutdown`]
/// must be called on every exit path; it tears the server down once.
pub struct Session {
  config: Config,
  server: Arc<ToolServerSession>,
  catalog: ToolCatalog,
  orchestrator: AgentOrchestrator,
  shut_down: AtomicBool,
}

impl Session {
  /// Start with the reasoning service described by `config.models`.
  pub async fn start(config: Config) -> Result<Self, SessionError> {
    let model_client = init_model_layer(&config.models).await?;
    Self::start_with_model_client(config, model_client).await
  }

  pub async fn start_with_model_client(
    config: Config,
    model_client: Arc<ModelClient>,
  ) -> Result<Self, SessionError> {
    let launch = server_launch(&config.server);
    let server = Arc::new(ToolServerSession::open(&launch, session_options(&config.server)).await?);

    let catalog = match ToolCatalog::build(server.as_ref()).await {
      Ok(catalog) => catalog,
      Err(e) => {
        server.close().await;
        return Err(e.into());
      }
    };
    info!(
      server = %launch.name,
      tools = catalog.len(),
      "tool catalog ready"
    );

    let tool_server: Arc<dyn ToolServer> = server.clone();
    let tool_registry = build_default_tools(&catalog, tool_server, &config.search);
    let orchestrator = AgentOrchestrator::new(
      model_client,
      tool_registry,
      TurnConfig::from_config(&config),
    );

    Ok(Self {
      config,
      server,
      catalog,
      orchestrator,
      shut_down: AtomicBool::new(false),
    })
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn server_info(&self) -> &Implementation {
    self.server.server_info()
  }

  pub fn catalog(&self) -> &ToolCatalog {
    &self.catalog
  }

  pub fn new_context(&self) -> AgentContext {
    AgentContext::new(self.config.agent.remember_history)
  }

  /// Print the catalog, then converse until exit, end of input or cancellation.
  pub async fn converse<R, W>(
    &self,
    reader: &mut R,
    writer: &mut W,
    cancel: &CancellationToken,
  ) -> std::io::Result<()>
  where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
  {
    print_catalog(writer, self.server_info(), &self.catalog).await?;
    ConversationLoop::new(&self.orchestrator, self.new_context())
      .run(reader, writer, cancel)
      .await
  }

  /// Tear the tool server down. Returns false when an earlier call already did.
  pub async fn shutdown(&self) -> bool {
    if self.shut_down.swap(true, Ordering::SeqCst) {
      return false;
    }
    info!(server = %self.config.server.name, "shutting down session");
    self.server.close().await;
    true
  }
}
