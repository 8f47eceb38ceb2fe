//! Output sinks — stdout, rotation-friendly file append, and UNIX
//! domain sockets, selected by a destination string.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::net::{UnixDatagram, UnixStream};
use std::path::PathBuf;

/// The accumulator only needs an opaque byte sink.
pub type BoxSink = Box<dyn Write + Send>;

/// Resolve a destination string:
/// - `""` or `"-"`: standard output
/// - `unix:<path>`: connected stream socket
/// - `unixgram:<path>`: datagram socket, one datagram per event
/// - anything else: append-mode file
pub fn open(dest: &str) -> io::Result<BoxSink> {
    match dest {
        "" | "-" => Ok(Box::new(io::stdout())),
        d if d.starts_with("unix:") => {
            let stream = UnixStream::connect(&d["unix:".len()..])?;
            Ok(Box::new(stream))
        }
        d if d.starts_with("unixgram:") => {
            let socket = UnixDatagram::unbound()?;
            Ok(Box::new(DatagramSink {
                socket,
                path: PathBuf::from(&d["unixgram:".len()..]),
            }))
        }
        path => Ok(Box::new(FileSink {
            path: PathBuf::from(path),
        })),
    }
}

/// Appends each write to a file, reopening it every time so an external
/// rotation of the path is picked up on the next event.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .mode(0o600)
            .open(&self.path)?;
        file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Connectionless socket sink; each write becomes one datagram.
struct DatagramSink {
    socket: UnixDatagram,
    path: PathBuf,
}

impl Write for DatagramSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.socket.send_to(buf, &self.path)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
