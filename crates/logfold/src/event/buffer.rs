//! Event buffer state: escape-aware appends, cap accounting, and the
//! truncation-marker rendering used on flush.
//!
//! This is the synchronous half of the accumulator; [`super::actor`]
//! serializes access to it and owns the timer.

use std::io::Write;

use bytes::BytesMut;
use chrono::SecondsFormat;

use super::clock::Clock;
use super::config::Envelope;

/// Truncation marker skeleton: the byte count is spliced between the
/// brackets, the ellipsis closes it.
const MARKER: &[u8] = "[]…".as_bytes();

pub(super) struct EventBuffer {
    env: Envelope,
    buf: BytesMut,
    /// Raw (pre-escape) byte count of input dropped once the cap was hit.
    exceeded: usize,
    /// Set when the first append of the current event was pass-through
    /// JSON; content then bypasses the buffer entirely.
    raw_json: bool,
}

/// True if the bytes *seem* to open a JSON object. Cheaper than the
/// full line heuristic in [`crate::pattern::is_json_object`]; by the
/// time this runs the merge controller has already classified the line.
fn looks_like_json(p: &[u8]) -> bool {
    p.len() >= 2 && p[0] == b'{' && p[1] == b'"'
}

fn escape_byte(b: u8) -> Option<&'static [u8]> {
    match b {
        b'"' => Some(br#"\""#),
        b'\\' => Some(br"\\"),
        0x08 => Some(br"\b"),
        0x0c => Some(br"\f"),
        b'\n' => Some(br"\n"),
        b'\r' => Some(br"\r"),
        b'\t' => Some(br"\t"),
        _ => None,
    }
}

/// Count of decimal digits in `n`.
fn decimal_len(mut n: usize) -> usize {
    let mut len = 1;
    while n >= 10 {
        n /= 10;
        len += 1;
    }
    len
}

/// Sink failures never interrupt the stream; log and move on.
fn log_write(result: std::io::Result<()>) {
    if let Err(err) = result {
        tracing::error!("sink write failed: {}", err);
    }
}

impl EventBuffer {
    pub fn new(env: Envelope) -> Self {
        Self {
            env,
            buf: BytesMut::with_capacity(4096),
            exceeded: 0,
            raw_json: false,
        }
    }

    /// True until the first append after a flush (and not mid way
    /// through a pass-through JSON event).
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty() && !self.raw_json
    }

    /// Append `p` to the in-progress event. Returns the number of input
    /// bytes consumed, always `p.len()`; truncation is only observable
    /// through the flushed record.
    pub fn append(&mut self, p: &[u8], out: &mut dyn Write) -> usize {
        if self.env.allow_json && !self.raw_json && self.buf.is_empty() && looks_like_json(p) {
            // Pass-through: replace the leading `{` with the context
            // prefix and copy straight to the sink, unescaped, uncapped.
            self.raw_json = true;
            log_write(out.write_all(&self.env.json_prefix));
            log_write(out.write_all(&p[1..]));
            return p.len();
        }
        if self.raw_json {
            log_write(out.write_all(p));
            return p.len();
        }
        if self.exceeded > 0 {
            self.exceeded += p.len();
            return p.len();
        }

        let overhead = self.env.overhead();
        self.buf.reserve(p.len());
        for (i, &b) in p.iter().enumerate() {
            let plain = [b];
            let escaped: &[u8] = escape_byte(b).unwrap_or(&plain);
            if self.env.max_len > 0
                && self.buf.len() + overhead + escaped.len() > self.env.max_len
            {
                self.exceeded = p.len() - i;
                break;
            }
            self.buf.extend_from_slice(escaped);
        }
        p.len()
    }

    /// Emit the buffered event with its envelope and reset the state so
    /// the buffer can be reused. A flush with nothing buffered (and not
    /// in pass-through mode) writes nothing.
    pub fn flush(&mut self, out: &mut dyn Write, clock: &dyn Clock) {
        self.flush_inner(out, clock);
        log_write(out.flush());
    }

    fn flush_inner(&mut self, out: &mut dyn Write, clock: &dyn Clock) {
        if self.raw_json {
            self.raw_json = false;
            log_write(out.write_all(&self.env.json_suffix));
            return;
        }
        if self.buf.is_empty() {
            return;
        }
        if !self.env.prefix.is_empty() {
            log_write(out.write_all(&self.env.prefix));
        }
        if self.exceeded > 0 && self.buf.len() > MARKER.len() + 1 {
            let msg = self.render_truncated();
            log_write(out.write_all(&msg));
        } else {
            log_write(out.write_all(&self.buf));
        }
        if !self.env.time_prefix.is_empty() {
            log_write(out.write_all(&self.env.time_prefix));
            let ts = clock.now().to_rfc3339_opts(SecondsFormat::Secs, true);
            log_write(out.write_all(b"\""));
            log_write(out.write_all(ts.as_bytes()));
            log_write(out.write_all(b"\""));
        }
        if !self.env.suffix.is_empty() {
            log_write(out.write_all(&self.env.suffix));
        }
        self.buf.clear();
        self.exceeded = 0;
    }

    /// Splice the `[<n>]…` marker onto the buffered content so the
    /// emitted record stays within the cap. `n` is the count of original
    /// source bytes omitted: escaping inflates the buffer, so the
    /// truncated suffix is re-walked counting each escape pair as one
    /// source byte.
    fn render_truncated(&self) -> Vec<u8> {
        let msg = &self.buf[..];

        // Estimate the marker width to find the cut point.
        let mut estimate = self.exceeded + MARKER.len();
        estimate += decimal_len(estimate);
        let reclaimed = estimate - self.exceeded;
        if msg.len() <= reclaimed {
            return msg.to_vec();
        }
        let mut pos = msg.len() - reclaimed;

        // Never bisect a two-byte escape: walk back over the run of
        // consecutive backslashes ending at the cut point and shift by
        // one if the run length is odd.
        let mut escapes = 0;
        while pos - escapes > 0 && msg[pos - escapes] == b'\\' {
            escapes += 1;
        }
        if escapes > 0 {
            pos -= (escapes + 1) % 2;
        }

        // Exact omitted-byte count over the truncated suffix.
        let mut omitted = self.exceeded;
        let mut i = pos;
        while i < msg.len() {
            if msg[i] == b'\\' {
                i += 1;
            }
            i += 1;
            omitted += 1;
        }

        let digits = omitted.to_string();
        let mut rendered = Vec::with_capacity(pos + MARKER.len() + digits.len());
        rendered.extend_from_slice(&msg[..pos]);
        rendered.push(MARKER[0]);
        rendered.extend_from_slice(digits.as_bytes());
        rendered.extend_from_slice(&MARKER[1..]);
        rendered
    }

    #[cfg(test)]
    fn contents(&self) -> &[u8] {
        &self.buf
    }
}
