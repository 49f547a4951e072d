//! Configuration system (layered: defaults < config file < env < code).

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ParleyError, Result};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.1";
pub const DEFAULT_MAX_TOOL_CALLS: usize = 20;
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;
pub const DEFAULT_MAX_PIECE_CHARS: usize = 28;
pub const DEFAULT_STREAM_IDLE_TIMEOUT_MS: u64 = 120_000;
pub const DEFAULT_ERROR_TEMPLATE: &str = "Something went wrong: {error}";

const CONFIG_FILE_NAME: &str = "config.toml";

/// Layered configuration for parley.
///
/// Resolution order (later wins):
/// 1. Built-in defaults
/// 2. `config.toml` in the parley home directory (or an explicit path)
/// 3. Environment variables (`PARLEY_*`, `OLLAMA_BASE_URL`), `.env` honored
/// 4. Explicit `with_*` setters
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParleyConfig {
    /// Base URL of the chat endpoint.
    pub base_url: String,
    /// Model name sent with every request.
    pub model: String,
    /// Optional bearer credential for hosted endpoints.
    pub api_key: Option<String>,
    /// Use the streaming protocol; `false` selects the single-response fallback.
    pub stream: bool,
    /// Ask the model to emit reasoning separately.
    pub think: Option<bool>,
    /// Hard cap on tool calls executed within one turn.
    pub max_tool_calls: usize,
    /// Chunk queue batching cadence.
    pub frame_interval_ms: u64,
    /// Largest piece (in characters) the chunk queue commits at once.
    pub max_piece_chars: usize,
    /// A round fails if the stream is silent this long. `0` disables.
    pub stream_idle_timeout_ms: u64,
    /// User-visible failure text; `{error}` is replaced with the error.
    pub error_template: String,
    /// Where dialogs are stored. Defaults to `<home>/dialogs`.
    pub data_dir: Option<PathBuf>,
}

impl fmt::Debug for ParleyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParleyConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| ".."))
            .field("stream", &self.stream)
            .field("think", &self.think)
            .field("max_tool_calls", &self.max_tool_calls)
            .field("frame_interval_ms", &self.frame_interval_ms)
            .field("max_piece_chars", &self.max_piece_chars)
            .field("stream_idle_timeout_ms", &self.stream_idle_timeout_ms)
            .field("error_template", &self.error_template)
            .field("data_dir", &self.data_dir)
            .finish()
    }
}

impl Default for ParleyConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            stream: true,
            think: None,
            max_tool_calls: DEFAULT_MAX_TOOL_CALLS,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            max_piece_chars: DEFAULT_MAX_PIECE_CHARS,
            stream_idle_timeout_ms: DEFAULT_STREAM_IDLE_TIMEOUT_MS,
            error_template: DEFAULT_ERROR_TEMPLATE.to_string(),
            data_dir: None,
        }
    }
}

impl ParleyConfig {
    /// Defaults, then the home config file if present, then the environment.
    pub fn load() -> Result<Self> {
        let path = default_home_dir().join(CONFIG_FILE_NAME);
        let base = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        Ok(base.apply_env())
    }

    /// Defaults overridden by the environment only.
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Read a TOML config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay environment variables (loads `.env` if present).
    pub fn apply_env(mut self) -> Self {
        let _ = dotenvy::dotenv();

        if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
            self.base_url = url;
        }
        if let Ok(url) = std::env::var("PARLEY_BASE_URL") {
            self.base_url = url;
        }
        if let Ok(model) = std::env::var("PARLEY_MODEL") {
            self.model = model;
        }
        if let Ok(key) = std::env::var("PARLEY_API_KEY") {
            if !key.trim().is_empty() {
                self.api_key = Some(key);
            }
        }
        if let Some(value) = env_parse::<usize>("PARLEY_MAX_TOOL_CALLS") {
            self.max_tool_calls = value;
        }
        if let Some(value) = env_bool("PARLEY_STREAM") {
            self.stream = value;
        }
        if let Some(value) = env_bool("PARLEY_THINK") {
            self.think = Some(value);
        }
        if let Ok(dir) = std::env::var("PARLEY_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_max_tool_calls(mut self, max: usize) -> Self {
        self.max_tool_calls = max;
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(ParleyError::Configuration("base_url is empty".into()));
        }
        if self.model.trim().is_empty() {
            return Err(ParleyError::Configuration("model is empty".into()));
        }
        if self.max_piece_chars == 0 {
            return Err(ParleyError::Configuration(
                "max_piece_chars must be at least 1".into(),
            ));
        }
        if self.frame_interval_ms == 0 {
            return Err(ParleyError::Configuration(
                "frame_interval_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn stream_idle_timeout(&self) -> Option<Duration> {
        (self.stream_idle_timeout_ms > 0)
            .then(|| Duration::from_millis(self.stream_idle_timeout_ms))
    }

    /// Resolved dialog storage directory.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| default_home_dir().join("dialogs"))
    }

    /// The user-visible text shown in place of a failed answer.
    pub fn error_text(&self, error: &ParleyError) -> String {
        self.error_template.replace("{error}", &error.to_string())
    }
}

/// `~/.parley`, or `.parley` when no home directory is known.
pub fn default_home_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".parley"))
        .unwrap_or_else(|| PathBuf::from(".parley"))
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse().ok()
}

fn env_bool(key: &str) -> Option<bool> {
    match std::env::var(key).ok()?.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
