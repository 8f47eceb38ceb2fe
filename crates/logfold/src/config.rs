//! Configuration resolution.
//!
//! Priority: CLI flag > TOML config file (`--config` or the
//! `LOGFOLD_CONFIG` environment variable) > built-in default.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::cli::Args;
use crate::event::EventConfig;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid --ctx entry {0:?}: expected key=value")]
    InvalidContext(String),
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Fully resolved settings consumed by the merge controller and the
/// accumulator.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    pub max_len: usize,
    pub prefix: String,
    pub strip: bool,
    pub json: bool,
    pub json_key: String,
    pub allow_json: bool,
    pub add_timestamp: bool,
    pub context: BTreeMap<String, String>,
    pub output: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            max_len: 0,
            prefix: String::new(),
            strip: false,
            json: false,
            json_key: "message".to_string(),
            allow_json: false,
            add_timestamp: false,
            context: BTreeMap::new(),
            output: String::new(),
        }
    }
}

/// Optional defaults loaded from a TOML file; every field a CLI flag
/// can override.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    max_len: Option<usize>,
    prefix: Option<String>,
    strip: Option<bool>,
    json: Option<bool>,
    json_key: Option<String>,
    allow_json: Option<bool>,
    add_timestamp: Option<bool>,
    context: BTreeMap<String, String>,
    output: Option<String>,
}

impl FileConfig {
    fn load(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

impl MergeConfig {
    pub fn resolve(args: Args) -> Result<Self, SettingsError> {
        let file = match config_path(&args) {
            Some(path) => {
                tracing::info!("loading configuration from {}", path.display());
                FileConfig::load(&path)?
            }
            None => FileConfig::default(),
        };

        let defaults = MergeConfig::default();
        let mut context = file.context;
        for entry in &args.ctx {
            let (key, value) = entry
                .split_once('=')
                .ok_or_else(|| SettingsError::InvalidContext(entry.clone()))?;
            context.insert(key.to_string(), value.to_string());
        }

        Ok(Self {
            max_len: args.max_len.or(file.max_len).unwrap_or(defaults.max_len),
            prefix: args.prefix.or(file.prefix).unwrap_or(defaults.prefix),
            strip: args.strip || file.strip.unwrap_or(defaults.strip),
            json: args.json || file.json.unwrap_or(defaults.json),
            json_key: args.json_key.or(file.json_key).unwrap_or(defaults.json_key),
            allow_json: args.allow_json || file.allow_json.unwrap_or(defaults.allow_json),
            add_timestamp: args.add_timestamp
                || file.add_timestamp.unwrap_or(defaults.add_timestamp),
            context,
            output: args.output.or(file.output).unwrap_or(defaults.output),
        })
    }

    /// Derive the accumulator configuration. The timestamp request is
    /// passed through even without JSON output so the accumulator's
    /// construction-time validation rejects the combination explicitly.
    pub fn event_config(&self) -> EventConfig {
        EventConfig {
            max_len: self.max_len,
            message_key: self.json.then(|| self.json_key.clone()),
            allow_json: self.allow_json,
            context: self.context.clone(),
            timestamp_key: self.add_timestamp.then(|| "time".to_string()),
            ..Default::default()
        }
    }
}

fn config_path(args: &Args) -> Option<PathBuf> {
    if let Some(path) = &args.config {
        return Some(path.clone());
    }
    std::env::var("LOGFOLD_CONFIG").ok().map(PathBuf::from)
}
