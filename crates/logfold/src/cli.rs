//! Command-line interface.

use std::path::PathBuf;

use clap::Parser;

/// Merge multi-line log events (panics, stack traces, wrapped logger
/// output, JSON objects) from standard input into single records.
#[derive(Debug, Default, Parser)]
#[command(name = "logfold", version)]
pub struct Args {
    /// Truncate merged events so a record never exceeds this many bytes
    /// (0 = unlimited).
    #[arg(long, value_name = "BYTES")]
    pub max_len: Option<usize>,

    /// Logger line prefix the producing application sets before the
    /// timestamp, if any.
    #[arg(long)]
    pub prefix: Option<String>,

    /// Strip the matched prefix and timestamp from recognised log headers.
    #[arg(long)]
    pub strip: bool,

    /// Wrap each event in a JSON object, one per line.
    #[arg(long)]
    pub json: bool,

    /// Key used for the message in JSON mode.
    #[arg(long, value_name = "KEY")]
    pub json_key: Option<String>,

    /// Pass input lines that already look like JSON objects through
    /// unescaped, with the context merged in.
    #[arg(long)]
    pub allow_json: bool,

    /// Add an RFC 3339 "time" field to each JSON event.
    #[arg(long)]
    pub add_timestamp: bool,

    /// key=value pair merged into JSON output (repeatable).
    #[arg(long = "ctx", value_name = "KEY=VALUE")]
    pub ctx: Vec<String>,

    /// Destination: "-" for stdout, "unix:"/"unixgram:" plus a socket
    /// path, or a file path appended to (and reopened on every write).
    #[arg(long, value_name = "DEST")]
    pub output: Option<String>,

    /// TOML file providing defaults for the flags above.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
