//! Newline-scanning reader with a line length cap.
//!
//! Returns one physical line per call and reports when a returned line
//! was cut short because it exceeded the internal cap; the merge
//! controller then treats the next read as a forced continuation.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Cap on a single returned line.
pub(crate) const MAX_LINE: usize = 4096;

pub struct LineReader<R> {
    inner: R,
    max_line: usize,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            max_line: MAX_LINE,
        }
    }

    #[cfg(test)]
    fn with_max_line(inner: R, max_line: usize) -> Self {
        Self { inner, max_line }
    }

    /// Read the next line into `line` (cleared first), without the
    /// trailing `\n` or `\r\n`.
    ///
    /// Returns `Ok(None)` at end of stream, otherwise `Ok(Some(truncated))`
    /// where `truncated` reports that the line hit the cap and the rest
    /// of it will arrive on the next call.
    pub async fn read_line(&mut self, line: &mut Vec<u8>) -> io::Result<Option<bool>> {
        line.clear();
        loop {
            let available = self.inner.fill_buf().await?;
            if available.is_empty() {
                // A final unterminated line is still a line.
                return Ok(if line.is_empty() { None } else { Some(false) });
            }
            let room = self.max_line - line.len();
            if let Some(pos) = available.iter().position(|&b| b == b'\n') {
                if pos <= room {
                    line.extend_from_slice(&available[..pos]);
                    self.inner.consume(pos + 1);
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                    return Ok(Some(false));
                }
                line.extend_from_slice(&available[..room]);
                self.inner.consume(room);
                return Ok(Some(true));
            }
            let take = available.len().min(room);
            line.extend_from_slice(&available[..take]);
            self.inner.consume(take);
            if line.len() == self.max_line {
                return Ok(Some(true));
            }
        }
    }
}
