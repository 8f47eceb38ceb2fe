//! Merge controller — classifies physical lines and drives the
//! accumulator's append/flush/auto-flush cycle.
//!
//! State machine over an unbounded line stream: a line either starts a
//! new logical event (panic header, logger header, standalone JSON
//! object) or continues the previous one. A single `continuation` flag
//! carries the reader's truncation signal between iterations so the
//! tail of a split line is never re-classified.

use std::io;
use std::time::Duration;

use tokio::io::AsyncBufRead;

use crate::config::MergeConfig;
use crate::event::Event;
use crate::pattern;
use crate::reader::LineReader;

/// Idle delay before an event with no terminating header is closed out.
pub const DEFAULT_AUTO_FLUSH_DELAY: Duration = Duration::from_millis(5);

pub struct Merger {
    event: Event,
    prefix: Vec<u8>,
    strip: bool,
    allow_json: bool,
    auto_flush_delay: Duration,
}

impl Merger {
    pub fn new(event: Event, config: &MergeConfig) -> Self {
        Self {
            event,
            prefix: config.prefix.as_bytes().to_vec(),
            strip: config.strip,
            allow_json: config.allow_json,
            auto_flush_delay: DEFAULT_AUTO_FLUSH_DELAY,
        }
    }

    /// Override the idle delay, mainly so tests stay deterministic.
    pub fn auto_flush_delay(mut self, delay: Duration) -> Self {
        self.auto_flush_delay = delay;
        self
    }

    /// Consume `input` line by line until end of stream.
    ///
    /// End of stream flushes the accumulator and returns `Ok`. Any other
    /// read failure also flushes first (best effort to not lose buffered
    /// data) and is returned to the caller, which treats it as fatal.
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, input: R) -> io::Result<()> {
        let mut reader = LineReader::new(input);
        let mut line = Vec::new();
        let mut continuation = false;
        loop {
            let truncated = match reader.read_line(&mut line).await {
                Ok(Some(truncated)) => truncated,
                Ok(None) => {
                    self.event.flush().await;
                    return Ok(());
                }
                Err(err) => {
                    self.event.flush().await;
                    return Err(err);
                }
            };
            // Cancel a stale timer so it cannot fire while this line is
            // being classified.
            self.event.stop().await;
            let mut start = 0;
            if !continuation {
                if pattern::is_panic_header(&line) {
                    tracing::trace!("panic header, starting new event");
                    self.event.flush().await;
                } else if let Some(index) = pattern::log_header_end(&line, &self.prefix) {
                    tracing::trace!(index, "log header, starting new event");
                    self.event.flush().await;
                    if self.strip {
                        start = index;
                    }
                } else if self.allow_json && pattern::is_json_object(&line) {
                    // JSON objects are never merged with their neighbours.
                    self.event.flush().await;
                    self.event.append(&line).await;
                    self.event.flush().await;
                    continue;
                } else if !self.event.is_empty().await {
                    // Continuation of the open event: join with an
                    // escaped newline.
                    self.event.append(b"\n").await;
                }
            }
            self.event.append(&line[start..]).await;
            self.event.auto_flush(self.auto_flush_delay).await;
            continuation = truncated;
        }
    }
}
