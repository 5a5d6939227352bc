// Conversation Loop
// Reads user questions, dispatches them to the orchestrator, prints answers

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use mcpilot_mcp_client::{Implementation, ToolCatalog};

use crate::agent::{AgentContext, AgentOrchestrator};

pub const EXIT_SENTINEL: &str = "exit";
const PROMPT: &str = "> ";

/// Conversation loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
  /// Prompt shown, waiting on a line
  WaitingForInput,
  /// Orchestrator is working on the line
  Dispatching,
  /// Writing the answer or error
  Printing,
  /// Exit sentinel, end of input or interrupt
  Stopped,
}

impl LoopState {
  /// Check if state is final (no more turns)
  pub fn is_final(self) -> bool {
    matches!(self, LoopState::Stopped)
  }

  pub fn can_transition_to(self, next: LoopState) -> bool {
    use LoopState::*;
    matches!(
      (self, next),
      (WaitingForInput, Dispatching)
        | (Dispatching, Printing)
        | (Printing, WaitingForInput)
        | (WaitingForInput | Dispatching | Printing, Stopped)
    )
  }
}

/// True when the trimmed line is `exit` in any case
pub fn is_exit(line: &str) -> bool {
  line.trim().eq_ignore_ascii_case(EXIT_SENTINEL)
}

/// Print the server banner and its catalog ahead of the first prompt.
pub async fn print_catalog<W>(
  writer: &mut W,
  server: &Implementation,
  catalog: &ToolCatalog,
) -> std::io::Result<()>
where
  W: AsyncWrite + Unpin,
{
  let mut out = format!("Connected to {} {}", server.name, server.version)
    .trim_end()
    .to_string();
  out.push_str("\n\nAvailable tools:\n");
  if catalog.is_empty() {
    out.push_str("(the server advertised no tools)\n");
  }
  for tool in catalog.describe() {
    out.push_str(&format!("{}: {}\n", tool.name, tool.description));
  }
  out.push_str("\nEnter your questions (type 'exit' to quit):\n");

  writer.write_all(out.as_bytes()).await?;
  writer.flush().await
}

/// Drives repeated turns until exit, end of input or cancellation.
pub struct ConversationLoop<'a> {
  orchestrator: &'a AgentOrchestrator,
  context: AgentContext,
  state: LoopState,
}

impl<'a> ConversationLoop<'a> {
  pub fn new(orchestrator: &'a AgentOrchestrator, context: AgentContext) -> Self {
    Self {
      orchestrator,
      context,
      state: LoopState::WaitingForInput,
    }
  }

  pub fn state(&self) -> LoopState {
    self.state
  }

  pub fn context(&self) -> &AgentContext {
    &self.context
  }

  fn transition(&mut self, next: LoopState) {
    if self.state == next {
      return;
    }
    if !self.state.can_transition_to(next) {
      warn!(from = ?self.state, to = ?next, "unexpected conversation state change");
    }
    debug!(from = ?self.state, to = ?next, "conversation state");
    self.state = next;
  }

  /// Run until stopped. Only I/O failures on the terminal are errors;
  /// a failed turn is printed and the loop continues.
  pub async fn run<R, W>(
    &mut self,
    reader: &mut R,
    writer: &mut W,
    cancel: &CancellationToken,
  ) -> std::io::Result<()>
  where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
  {
    while !self.state.is_final() {
      self.transition(LoopState::WaitingForInput);
      writer.write_all(PROMPT.as_bytes()).await?;
      writer.flush().await?;

      let mut line = String::new();
      let read = tokio::select! {
        _ = cancel.cancelled() => None,
        read = reader.read_line(&mut line) => Some(read?),
      };
      let input = match read {
        None => {
          info!("interrupted; leaving conversation");
          writer.write_all(b"\n").await?;
          break;
        }
        Some(0) => {
          info!("end of input; leaving conversation");
          writer.write_all(b"\n").await?;
          break;
        }
        Some(_) => line.trim(),
      };

      if input.is_empty() {
        continue;
      }
      if is_exit(input) {
        info!("exit requested");
        break;
      }

      self.transition(LoopState::Dispatching);
      let result = tokio::select! {
        _ = cancel.cancelled() => {
          info!("interrupted during a turn");
          writer.write_all(b"\n").await?;
          break;
        }
        result = self.orchestrator.run(input, &mut self.context) => result,
      };

      self.transition(LoopState::Printing);
      let text = match result {
        Ok(answer) => format!("{answer}\n\n"),
        Err(e) => {
          warn!("turn failed: {e}");
          format!("error: {e}\n\n")
        }
      };
      writer.write_all(text.as_bytes()).await?;
      writer.flush().await?;
    }

    self.transition(LoopState::Stopped);
    writer.flush().await
  }
}
