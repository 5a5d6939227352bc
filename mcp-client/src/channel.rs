//! Line filter between a tool server's stdout and the protocol client
//!
//! The protocol client treats an undecodable line as the end of the stream.
//! The relay reads raw lines, decodes them lossily and forwards only lines the
//! client can read. A malformed reply that still names a request id is
//! replaced by a parse error for that id, so only that request fails.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rmcp::model::ServerJsonRpcMessage;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// JSON-RPC code used for replies the relay had to replace.
pub const PARSE_ERROR: i32 = -32700;

const RELAY_BUFFER: usize = 64 * 1024;
const PREVIEW_CHARS: usize = 200;

/// What to do with one line of server output.
#[derive(Debug, Clone, PartialEq)]
pub enum LineVerdict {
  Forward,
  /// Unreadable and not tied to any request
  Skip(String),
  /// A reply to request `id` that cannot be decoded
  Reject { id: Value, reason: String },
}

pub fn classify(line: &str) -> LineVerdict {
  let reason = match serde_json::from_str::<ServerJsonRpcMessage>(line) {
    Ok(_) => return LineVerdict::Forward,
    Err(e) => e.to_string(),
  };

  let reply_id = serde_json::from_str::<Value>(line).ok().and_then(|value| {
    let object = value.as_object()?;
    if object.contains_key("method") {
      return None;
    }
    object
      .get("id")
      .filter(|id| id.is_u64() || id.is_string())
      .cloned()
  });

  match reply_id {
    Some(id) => LineVerdict::Reject { id, reason },
    None => LineVerdict::Skip(reason),
  }
}

/// Background task copying decodable server output to the protocol client.
pub struct StdoutRelay {
  task: JoinHandle<()>,
  ended: Arc<AtomicBool>,
}

impl StdoutRelay {
  /// Start relaying `source`. The returned stream is what the client reads.
  pub fn spawn<R>(server: &str, source: R) -> (Self, DuplexStream)
  where
    R: AsyncRead + Unpin + Send + 'static,
  {
    let (client_end, relay_end) = tokio::io::duplex(RELAY_BUFFER);
    let ended = Arc::new(AtomicBool::new(false));
    let task = tokio::spawn(relay_lines(
      server.to_string(),
      source,
      relay_end,
      Arc::clone(&ended),
    ));
    (Self { task, ended }, client_end)
  }

  /// True once the server's output has ended or the client stopped reading.
  pub fn has_ended(&self) -> bool {
    self.ended.load(Ordering::SeqCst)
  }

  pub fn abort(&self) {
    self.task.abort();
  }
}

impl Drop for StdoutRelay {
  fn drop(&mut self) {
    self.task.abort();
  }
}

async fn relay_lines<R, W>(server: String, source: R, mut sink: W, ended: Arc<AtomicBool>)
where
  R: AsyncRead + Unpin,
  W: AsyncWrite + Unpin,
{
  let mut source = BufReader::new(source);
  let mut buf = Vec::new();

  loop {
    buf.clear();
    match source.read_until(b'\n', &mut buf).await {
      Ok(0) => {
        debug!(server, "tool server closed its output stream");
        break;
      }
      Ok(_) => {}
      Err(err) => {
        warn!(server, "error reading from tool server: {err}");
        break;
      }
    }

    let line = String::from_utf8_lossy(&buf);
    let line = line.trim();
    if line.is_empty() {
      continue;
    }

    let forwarded = match classify(line) {
      LineVerdict::Forward => line.to_string(),
      LineVerdict::Skip(reason) => {
        warn!(server, "ignoring unreadable line from tool server ({reason}): {}", preview(line));
        continue;
      }
      LineVerdict::Reject { id, reason } => {
        warn!(server, %id, "malformed reply from tool server ({reason}): {}", preview(line));
        parse_error_reply(id, &reason)
      }
    };

    if let Err(err) = write_line(&mut sink, &forwarded).await {
      debug!(server, "protocol client stopped reading: {err}");
      break;
    }
  }

  // Set before the sink drops so a client seeing EOF also sees the flag.
  ended.store(true, Ordering::SeqCst);
  drop(sink);
}

fn parse_error_reply(id: Value, reason: &str) -> String {
  json!({
    "jsonrpc": "2.0",
    "id": id,
    "error": {
      "code": PARSE_ERROR,
      "message": format!("malformed reply from tool server: {reason}"),
    }
  })
  .to_string()
}

async fn write_line<W: AsyncWrite + Unpin>(sink: &mut W, line: &str) -> std::io::Result<()> {
  sink.write_all(line.as_bytes()).await?;
  sink.write_all(b"\n").await?;
  sink.flush().await
}

fn preview(line: &str) -> String {
  match line.char_indices().nth(PREVIEW_CHARS) {
    Some((cut, _)) => format!("{}...", &line[..cut]),
    None => line.to_string(),
  }
}
