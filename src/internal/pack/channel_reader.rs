//! Adapter that lets the synchronous pack decoder read from an async byte-chunk channel, for
//! decoding a pack as it streams in off the wire instead of buffering the whole thing first.

use std::io::{self, Read};

use tokio::sync::mpsc::Receiver;

/// Wraps a `tokio::sync::mpsc::Receiver<Vec<u8>>` as a blocking `Read`. Must be driven from a
/// blocking context (e.g. `tokio::task::spawn_blocking`), since it calls `blocking_recv`.
pub struct ChannelReader {
    rx: Receiver<Vec<u8>>,
    buf: Vec<u8>,
    pos: usize,
}

impl ChannelReader {
    pub fn new(rx: Receiver<Vec<u8>>) -> Self {
        Self {
            rx,
            buf: Vec::new(),
            pos: 0,
        }
    }
}

impl Read for ChannelReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.buf.len() {
            match self.rx.blocking_recv() {
                Some(chunk) => {
                    self.buf = chunk;
                    self.pos = 0;
                }
                None => return Ok(0),
            }
        }
        let n = std::cmp::min(out.len(), self.buf.len() - self.pos);
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
