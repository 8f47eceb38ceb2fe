//! Single-task serialization of the accumulator.
//!
//! Two triggers can flush an event: the merge controller (synchronously,
//! after classifying a line) and the auto-flush timer (asynchronously,
//! after an idle delay). Both are funneled through one command-processing
//! task so a timer-driven flush can never interleave with an in-progress
//! append. Callers block on an ack, which gives them a plain sequential
//! contract.

use std::io::BufWriter;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};

use super::buffer::EventBuffer;
use super::clock::{Clock, SystemClock};
use super::config::{ConfigError, EventConfig};
use crate::sink::BoxSink;

enum Command {
    Append(Vec<u8>, oneshot::Sender<usize>),
    Flush(oneshot::Sender<()>),
    IsEmpty(oneshot::Sender<bool>),
    AutoFlush(Duration),
    Stop,
    Close,
}

/// Handle to the accumulator task. Cloning shares the same event buffer.
#[derive(Clone)]
pub struct Event {
    tx: mpsc::Sender<Command>,
}

impl Event {
    /// Validate `config` and spawn the accumulator task writing to `sink`.
    pub fn new(sink: BoxSink, config: EventConfig) -> Result<Self, ConfigError> {
        Self::with_clock(sink, config, SystemClock)
    }

    /// Like [`Event::new`] with an explicit time source for the
    /// timestamp field.
    pub fn with_clock<C: Clock>(
        sink: BoxSink,
        config: EventConfig,
        clock: C,
    ) -> Result<Self, ConfigError> {
        let buffer = EventBuffer::new(config.build()?);
        let (tx, rx) = mpsc::channel(1);
        let out = BufWriter::with_capacity(4096, sink);
        tokio::spawn(run_loop(rx, buffer, out, clock));
        Ok(Self { tx })
    }

    /// Append `bytes` to the in-progress event. Returns the number of
    /// bytes consumed (always the input length); sink failures are
    /// logged by the task, never surfaced here.
    pub async fn append(&self, bytes: &[u8]) -> usize {
        let (ack, done) = oneshot::channel();
        if self.tx.send(Command::Append(bytes.to_vec(), ack)).await.is_ok() {
            return done.await.unwrap_or(0);
        }
        0
    }

    /// Emit the buffered event and reset, superseding any pending
    /// auto-flush. Returns once the task has processed the flush.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(Command::Flush(ack)).await.is_ok() {
            let _ = done.await;
        }
    }

    /// True if nothing was appended since the last flush.
    pub async fn is_empty(&self) -> bool {
        let (ack, done) = oneshot::channel();
        if self.tx.send(Command::IsEmpty(ack)).await.is_ok() {
            return done.await.unwrap_or(true);
        }
        true
    }

    /// (Re)schedule a one-shot flush after `delay`, superseding any
    /// previously scheduled timer.
    pub async fn auto_flush(&self, delay: Duration) {
        let _ = self.tx.send(Command::AutoFlush(delay)).await;
    }

    /// Cancel a pending auto-flush without flushing.
    pub async fn stop(&self) {
        let _ = self.tx.send(Command::Stop).await;
    }

    /// Terminate the accumulator task. This is the last valid operation
    /// on the event: commands sent through any remaining clone are
    /// dropped unprocessed (appends report zero bytes consumed).
    pub async fn close(self) {
        let _ = self.tx.send(Command::Close).await;
    }
}

async fn run_loop<C: Clock>(
    mut rx: mpsc::Receiver<Command>,
    mut buffer: EventBuffer,
    mut out: BufWriter<BoxSink>,
    clock: C,
) {
    let mut deadline: Option<Instant> = None;
    loop {
        tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(Command::Append(bytes, ack)) => {
                    let n = buffer.append(&bytes, &mut out);
                    let _ = ack.send(n);
                }
                Some(Command::Flush(ack)) => {
                    buffer.flush(&mut out, &clock);
                    deadline = None;
                    let _ = ack.send(());
                }
                Some(Command::IsEmpty(ack)) => {
                    let _ = ack.send(buffer.is_empty());
                }
                Some(Command::AutoFlush(delay)) => {
                    deadline = Some(Instant::now() + delay);
                }
                Some(Command::Stop) => {
                    deadline = None;
                }
                Some(Command::Close) | None => return,
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                tracing::trace!("auto-flush timer fired");
                buffer.flush(&mut out, &clock);
                deadline = None;
            }
        }
    }
}
