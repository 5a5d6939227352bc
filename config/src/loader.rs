// Configuration Loader
// Layered configuration loading system

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use crate::layered::{ConfigLayer, ConfigLayerSource, LayeredConfig};
use crate::types::Config;

const CONFIG_DIR: &str = ".mcpilot";
const CONFIG_FILE: &str = "config.toml";

/// Configuration loader with layered support
pub struct ConfigLoader {
  /// Global config directory
  global_dir: PathBuf,
  /// Project config directory
  project_dir: Option<PathBuf>,
}

impl ConfigLoader {
  /// Create a new configuration loader
  pub fn new() -> Self {
    let global_dir = dirs::home_dir()
      .unwrap_or_else(|| PathBuf::from("."))
      .join(CONFIG_DIR);

    Self {
      global_dir,
      project_dir: None,
    }
  }

  /// Override the global config directory
  pub fn with_global_dir(mut self, dir: PathBuf) -> Self {
    self.global_dir = dir;
    self
  }

  /// Set project directory
  pub fn with_project_dir(mut self, dir: PathBuf) -> Self {
    self.project_dir = Some(dir);
    self
  }

  /// Load configuration with CLI overrides
  pub fn load_with_cli_overrides(&self, cli_overrides: Vec<(String, String)>) -> Result<Config> {
    // Layers in order:
    // 1. Built-in defaults
    // 2. Global config (~/.mcpilot/config.toml)
    // 3. Project config (<project>/.mcpilot/config.toml)
    // 4. CLI overrides
    let mut layered = LayeredConfig::new();
    layered.add_layer(ConfigLayer {
      source: ConfigLayerSource::Default,
      values: default_table()?,
    });

    if let Some(values) = read_table(&self.global_dir.join(CONFIG_FILE))? {
      layered.add_layer(ConfigLayer {
        source: ConfigLayerSource::GlobalConfig,
        values,
      });
    }

    if let Some(project_dir) = &self.project_dir {
      let path = project_dir.join(CONFIG_DIR).join(CONFIG_FILE);
      if let Some(values) = read_table(&path)? {
        layered.add_layer(ConfigLayer {
          source: ConfigLayerSource::ProjectConfig,
          values,
        });
      }
    }

    debug!(layers = ?layered.sources(), "merging configuration layers");
    let mut config: Config = toml::Value::Table(layered.merge())
      .try_into()
      .context("invalid configuration")?;

    for (key, value) in cli_overrides {
      apply_override(&mut config, &key, &value)?;
    }

    Ok(config)
  }
}

impl Default for ConfigLoader {
  fn default() -> Self {
    Self::new()
  }
}

/// Split a `KEY=VALUE` override.
pub fn parse_override(raw: &str) -> Result<(String, String)> {
  let (key, value) = raw
    .split_once('=')
    .with_context(|| format!("config override `{raw}` must look like KEY=VALUE"))?;
  let key = key.trim();
  if key.is_empty() {
    anyhow::bail!("config override `{raw}` has an empty key");
  }
  Ok((key.to_string(), value.trim().to_string()))
}

fn default_table() -> Result<toml::Table> {
  match toml::Value::try_from(Config::default()).context("serialize default config")? {
    toml::Value::Table(table) => Ok(table),
    other => anyhow::bail!("default config serialized to {}", other.type_str()),
  }
}

/// Read a config file; a missing file is not an error.
fn read_table(path: &Path) -> Result<Option<toml::Table>> {
  if !path.exists() {
    return Ok(None);
  }
  let content = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read {}", path.display()))?;
  let table: toml::Table =
    toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))?;
  debug!("loaded config layer from {}", path.display());
  Ok(Some(table))
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  value
    .parse()
    .map_err(|e| anyhow::anyhow!("invalid value `{value}` for {key}: {e}"))
}

/// Apply a single CLI override
fn apply_override(config: &mut Config, key: &str, value: &str) -> Result<()> {
  match key {
    "server.name" => config.server.name = value.to_string(),
    "server.command" => config.server.command = value.to_string(),
    "server.args" => {
      config.server.args = shlex::split(value)
        .with_context(|| format!("invalid quoting in server.args: {value}"))?;
    }
    "server.cwd" => config.server.cwd = Some(PathBuf::from(value)),
    "server.startup_timeout_sec" => config.server.startup_timeout_sec = parse_value(key, value)?,
    "server.tool_timeout_sec" => config.server.tool_timeout_sec = parse_value(key, value)?,
    "models.provider" => config.models.provider = value.to_string(),
    "models.model" => config.models.model = value.to_string(),
    "models.base_url" => config.models.base_url = Some(value.to_string()),
    "models.temperature" => config.models.temperature = Some(parse_value(key, value)?),
    "models.max_tokens" => config.models.max_tokens = Some(parse_value(key, value)?),
    "models.timeout_sec" => config.models.timeout_sec = parse_value(key, value)?,
    "agent.name" => config.agent.name = value.to_string(),
    "agent.instructions" => config.agent.instructions = value.to_string(),
    "agent.max_turns" => config.agent.max_turns = parse_value(key, value)?,
    "agent.remember_history" => config.agent.remember_history = parse_value(key, value)?,
    "search.enabled" => config.search.enabled = parse_value(key, value)?,
    "search.endpoint" => config.search.endpoint = value.to_string(),
    "search.max_results" => config.search.max_results = parse_value(key, value)?,
    "search.timeout_sec" => config.search.timeout_sec = parse_value(key, value)?,
    _ => anyhow::bail!("Unknown config key: {key}"),
  }
  Ok(())
}
