// Fixture tool server used by the integration tests.
//
// Usage: test_stdio_server [normal|empty|silent|malformed|crash-on-call|duplicate|paged|noisy]

use std::io::{BufRead, Write};

use serde_json::{Value, json};

fn main() -> anyhow::Result<()> {
  let mode = std::env::args().nth(1).unwrap_or_else(|| "normal".to_string());
  eprintln!("test_stdio_server starting in {mode} mode");

  let stdin = std::io::stdin();
  let mut stdout = std::io::stdout();

  for line in stdin.lock().lines() {
    let line = line?;
    if line.trim().is_empty() {
      continue;
    }
    let message: Value = serde_json::from_str(&line)?;
    let Some(id) = message.get("id").cloned() else {
      // Notifications need no reply.
      continue;
    };
    let method = message["method"].as_str().unwrap_or_default();
    let params = message.get("params").cloned().unwrap_or(Value::Null);

    let result = match method {
      "initialize" => json!({
        "protocolVersion": "2024-11-05",
        "capabilities": { "tools": {} },
        "serverInfo": { "name": "test-stdio-server", "version": "0.0.1" }
      }),
      _ if mode == "silent" => continue,
      "tools/list" => list_tools(&mode, &params),
      "tools/call" => {
        if mode == "crash-on-call" {
          std::process::exit(3);
        }
        call_tool(&params)
      }
      other => {
        let reply = json!({
          "jsonrpc": "2.0",
          "id": id,
          "error": { "code": -32601, "message": format!("unknown method {other}") }
        });
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
        continue;
      }
    };

    if mode == "noisy" {
      // Log chatter and a line that is not even UTF-8 ahead of every reply.
      stdout.write_all(b"\xff\xfe binary noise\n")?;
      writeln!(stdout, "handling {method}")?;
    }
    writeln!(stdout, "{}", json!({ "jsonrpc": "2.0", "id": id, "result": result }))?;
    stdout.flush()?;
  }

  Ok(())
}

fn tool(name: &str, description: &str) -> Value {
  json!({
    "name": name,
    "description": description,
    "inputSchema": {
      "type": "object",
      "properties": { "message": { "type": "string" } }
    }
  })
}

fn list_tools(mode: &str, params: &Value) -> Value {
  match mode {
    "empty" => json!({ "tools": [] }),
    "malformed" => json!({ "tools": "not-a-list" }),
    "duplicate" => json!({ "tools": [tool("echo", "first"), tool("echo", "second")] }),
    "paged" => match params.get("cursor").and_then(Value::as_str) {
      None => json!({ "tools": [tool("echo", "Echo back the message")], "nextCursor": "page-2" }),
      Some(_) => json!({ "tools": [tool("cluster_name", "Get the name of the current cluster")] }),
    },
    _ => json!({
      "tools": [
        tool("echo", "Echo back the message"),
        tool("cluster_name", "Get the name of the current cluster")
      ]
    }),
  }
}

fn call_tool(params: &Value) -> Value {
  let name = params["name"].as_str().unwrap_or_default();
  match name {
    "echo" => {
      let message = params["arguments"]["message"].as_str().unwrap_or_default();
      json!({ "content": [{ "type": "text", "text": message }] })
    }
    "cluster_name" => json!({ "content": [{ "type": "text", "text": "kind-test" }] }),
    other => json!({
      "content": [{ "type": "text", "text": format!("tool {other} not found") }],
      "isError": true
    }),
  }
}
