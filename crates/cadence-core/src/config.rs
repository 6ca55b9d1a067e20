use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CadenceError, Result};

/// Top-level Cadence configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CadenceConfig {
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub impact: ImpactConfig,
    #[serde(default)]
    pub log: LogConfig,
    /// Path to the user preferences file. Default: ~/.cadence/preferences.toml
    #[serde(default)]
    pub preferences_path: Option<String>,
}

/// Agent data context settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Number of data-flow events retained (oldest evicted first).
    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,
    /// Broadcast channel capacity for context subscribers.
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            event_log_capacity: default_event_log_capacity(),
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

/// Downstream impact preview settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactConfig {
    /// How many downstream stages are rated high severity.
    #[serde(default = "default_high_severity_window")]
    pub high_severity_window: usize,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            high_severity_window: default_high_severity_window(),
        }
    }
}

/// Tracing filter used by the binary when `RUST_LOG` is unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_event_log_capacity() -> usize { 10 }
fn default_subscriber_buffer() -> usize { 64 }
fn default_high_severity_window() -> usize { 3 }
fn default_log_filter() -> String { "cadence=info,warn".to_string() }

impl CadenceConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| CadenceError::ConfigNotFound(path.display().to_string()))?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        let config: Self = toml::from_str(&expanded)
            .map_err(|e| CadenceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.context.event_log_capacity == 0 {
            return Err(CadenceError::Config(
                "context.event_log_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the preferences file path (expand ~).
    pub fn preferences_file(&self) -> PathBuf {
        match &self.preferences_path {
            Some(p) => expand_home(p),
            None => expand_home("~/.cadence/preferences.toml"),
        }
    }
}

/// Locally persisted user preferences.
///
/// This is the only state that outlives a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Default brand context attached to newly started workflows.
    #[serde(default)]
    pub brand_context: BTreeMap<String, String>,
    /// Template id started when a query matches nothing.
    #[serde(default)]
    pub preferred_workflow: Option<String>,
    /// Print step reasoning traces.
    #[serde(default = "default_show_reasoning")]
    pub show_reasoning: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            brand_context: BTreeMap::new(),
            preferred_workflow: None,
            show_reasoning: default_show_reasoning(),
        }
    }
}

fn default_show_reasoning() -> bool { true }

impl UserPreferences {
    /// Load preferences, falling back to defaults when the file is absent.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CadenceError::Config(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply a `key=value` assignment. Keys other than the known scalars are
    /// stored as brand context (`brand.<key>` or a bare key).
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "preferred_workflow" => {
                self.preferred_workflow = (!value.is_empty()).then(|| value.to_string());
            }
            "show_reasoning" => {
                self.show_reasoning = value.parse().map_err(|_| {
                    CadenceError::Config(format!("show_reasoning expects true/false, got '{}'", value))
                })?;
            }
            other => {
                let key = other.strip_prefix("brand.").unwrap_or(other);
                if key.is_empty() {
                    return Err(CadenceError::Config("empty preference key".to_string()));
                }
                if value.is_empty() {
                    self.brand_context.remove(key);
                } else {
                    self.brand_context.insert(key.to_string(), value.to_string());
                }
            }
        }
        Ok(())
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                // Keep original if env var not set
                Err(_) => result.push_str(&format!("${{{}}}", var_name)),
            }
        } else {
            result.push(c);
        }
    }
    result
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var("HOME").ok().map(PathBuf::from) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
