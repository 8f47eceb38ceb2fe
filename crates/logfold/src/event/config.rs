//! Accumulator configuration and the precomputed output envelope.

use std::collections::BTreeMap;
use thiserror::Error;

/// Nominal byte width of an RFC 3339 timestamp, used when checking that
/// a configured cap leaves room for the envelope.
const RFC3339_WIDTH: usize = 25;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("timestamp output requires JSON output to be configured")]
    TimestampRequiresJson,
    #[error("max length {max} is below the fixed envelope overhead ({min})")]
    MaxLenBelowEnvelope { max: usize, min: usize },
    #[error("invalid context map: {0}")]
    Context(#[from] serde_json::Error),
}

/// Immutable accumulator configuration, validated once at construction.
#[derive(Debug, Clone)]
pub struct EventConfig {
    /// Maximum emitted record length in bytes; 0 means unlimited.
    pub max_len: usize,
    /// When set, wrap each event in a JSON object under this key.
    pub message_key: Option<String>,
    /// Pass input that already looks like a JSON object through unescaped.
    pub allow_json: bool,
    /// Flat context merged into JSON output. A `BTreeMap` keeps the
    /// serialized key order deterministic.
    pub context: BTreeMap<String, String>,
    /// When set, add an RFC 3339 timestamp under this key. Requires
    /// `message_key` to be configured as well.
    pub timestamp_key: Option<String>,
    /// Record terminator.
    pub terminator: Vec<u8>,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            max_len: 0,
            message_key: None,
            allow_json: false,
            context: BTreeMap::new(),
            timestamp_key: None,
            terminator: b"\n".to_vec(),
        }
    }
}

/// Fixed byte sequences wrapping an event's content, derived from
/// [`EventConfig`] so the hot path never re-serializes the context.
#[derive(Debug)]
pub(crate) struct Envelope {
    /// Bytes written before the buffered content in JSON output mode,
    /// e.g. `{"foo":"bar","message":"`. Empty in raw output mode.
    pub prefix: Vec<u8>,
    /// Bytes written after the content (and timestamp, if any),
    /// including the terminator.
    pub suffix: Vec<u8>,
    /// Replacement for the leading `{` of pass-through JSON input:
    /// the serialized context reopened with a trailing comma, or `{`.
    pub json_prefix: Vec<u8>,
    /// Terminator written when flushing a pass-through JSON event. The
    /// input line carries its own closing brace.
    pub json_suffix: Vec<u8>,
    /// Opens the timestamp field (closing the message string on the
    /// way), e.g. `","time":`. Empty when timestamps are off.
    pub time_prefix: Vec<u8>,
    pub allow_json: bool,
    pub max_len: usize,
}

impl Envelope {
    /// Envelope bytes counted against the cap while appending.
    pub fn overhead(&self) -> usize {
        self.prefix.len() + self.suffix.len()
    }
}

impl EventConfig {
    pub(crate) fn build(&self) -> Result<Envelope, ConfigError> {
        let ctx_json = if self.context.is_empty() {
            None
        } else {
            Some(serde_json::to_vec(&self.context)?)
        };

        let json_prefix = match &ctx_json {
            Some(ctx) => {
                let mut p = ctx.clone();
                p.pop();
                p.push(b',');
                p
            }
            None => vec![b'{'],
        };

        let mut prefix = Vec::new();
        let mut suffix;
        if let Some(key) = &self.message_key {
            prefix.push(b'{');
            if let Some(ctx) = &ctx_json {
                prefix.extend_from_slice(&ctx[1..ctx.len() - 1]);
                prefix.push(b',');
            }
            prefix.push(b'"');
            prefix.extend_from_slice(key.as_bytes());
            prefix.extend_from_slice(b"\":\"");
            suffix = b"\"}".to_vec();
        } else {
            suffix = Vec::new();
        }

        let mut time_prefix = Vec::new();
        if let Some(key) = &self.timestamp_key {
            if prefix.is_empty() {
                return Err(ConfigError::TimestampRequiresJson);
            }
            time_prefix.extend_from_slice(b"\",\"");
            time_prefix.extend_from_slice(key.as_bytes());
            time_prefix.extend_from_slice(b"\":");
            // The timestamp field closes the object itself.
            suffix = b"}".to_vec();
        }
        suffix.extend_from_slice(&self.terminator);

        if self.max_len > 0 {
            let mut min = prefix.len() + suffix.len();
            if !time_prefix.is_empty() {
                min += time_prefix.len() + RFC3339_WIDTH;
            }
            if self.max_len < min {
                return Err(ConfigError::MaxLenBelowEnvelope {
                    max: self.max_len,
                    min,
                });
            }
        }

        Ok(Envelope {
            prefix,
            suffix,
            json_prefix,
            json_suffix: self.terminator.clone(),
            time_prefix,
            allow_json: self.allow_json,
            max_len: self.max_len,
        })
    }
}
