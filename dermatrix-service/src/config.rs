use anyhow::{Context as _, bail};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::imaging::DEFAULT_INPUT_SIZE;

/// Where the displayed confidence comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfidenceMode {
    /// Model probability of the predicted label, as a percentage
    #[default]
    Model,
    /// Random value in [88.00, 99.99], as the legacy UI showed
    Synthetic,
}

impl ConfidenceMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceMode::Model => "model",
            ConfidenceMode::Synthetic => "synthetic",
        }
    }
}

impl FromStr for ConfidenceMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "model" => Ok(ConfidenceMode::Model),
            "synthetic" => Ok(ConfidenceMode::Synthetic),
            other => bail!("unknown confidence mode '{}', expected 'model' or 'synthetic'", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub model_path: PathBuf,
    pub input_size: u32,
    pub confidence: ConfidenceMode,
    pub preload_model: bool,
    pub max_upload_bytes: usize,
    /// Sessions idle for longer than this are evicted
    pub session_ttl: Duration,
    /// Upper bound on a chat log, greeting included
    pub max_chat_messages: usize,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            model_path: PathBuf::from("skin.onnx"),
            input_size: DEFAULT_INPUT_SIZE,
            confidence: ConfidenceMode::Model,
            preload_model: false,
            max_upload_bytes: 10 * 1024 * 1024,
            session_ttl: Duration::from_secs(60 * 60),
            max_chat_messages: 201,
            log_format: LogFormat::Json,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment (after loading `.env`, if any)
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = parse_var(&lookup, "PORT")?.unwrap_or(defaults.port);
        let model_path = lookup("DERMATRIX_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.model_path);
        let input_size = parse_var(&lookup, "DERMATRIX_INPUT_SIZE")?.unwrap_or(defaults.input_size);
        if input_size == 0 {
            bail!("DERMATRIX_INPUT_SIZE must be positive");
        }
        let confidence =
            parse_var(&lookup, "DERMATRIX_CONFIDENCE")?.unwrap_or(defaults.confidence);
        let preload_model = match lookup("DERMATRIX_PRELOAD_MODEL") {
            Some(value) => parse_bool(&value).context("DERMATRIX_PRELOAD_MODEL")?,
            None => defaults.preload_model,
        };
        let max_upload_bytes =
            parse_var(&lookup, "DERMATRIX_MAX_UPLOAD_BYTES")?.unwrap_or(defaults.max_upload_bytes);
        let session_ttl = match parse_var::<u64, _>(&lookup, "DERMATRIX_SESSION_TTL_SECS")? {
            Some(0) => bail!("DERMATRIX_SESSION_TTL_SECS must be positive"),
            Some(secs) => Duration::from_secs(secs),
            None => defaults.session_ttl,
        };
        let max_chat_messages =
            parse_var(&lookup, "DERMATRIX_MAX_CHAT_MESSAGES")?.unwrap_or(defaults.max_chat_messages);
        if max_chat_messages < 3 {
            bail!("DERMATRIX_MAX_CHAT_MESSAGES must allow at least one exchange (3)");
        }
        let log_format = match lookup("LOG_FORMAT").as_deref() {
            Some("pretty") => LogFormat::Pretty,
            _ => LogFormat::Json,
        };

        Ok(Self {
            port,
            model_path,
            input_size,
            confidence,
            preload_model,
            max_upload_bytes,
            session_ttl,
            max_chat_messages,
            log_format,
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("invalid value '{}' for {}: {}", raw, key, e)),
        None => Ok(None),
    }
}

fn parse_bool(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("expected a boolean, got '{}'", other),
    }
}
