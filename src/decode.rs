//! Incremental gzip line decoding

use crate::error::StreamError;
use flate2::read::MultiGzDecoder;
use std::io::{BufRead, BufReader, Read};

/// Read buffer between the decompressor and the line splitter
const LINE_BUFFER_SIZE: usize = 64 * 1024;

/// Lazily decompresses a gzip stream and yields its lines.
///
/// Only the current chunk and the partial line at its boundary are held in
/// memory. Trailing `\n` (and `\r\n`) are stripped. Concatenated gzip members
/// are read as one stream. After an error the iterator is fused.
pub struct LineDecoder<R: Read> {
    reader: BufReader<MultiGzDecoder<R>>,
    buf: Vec<u8>,
    lines_read: u64,
    done: bool,
}

impl<R: Read> LineDecoder<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::with_capacity(LINE_BUFFER_SIZE, MultiGzDecoder::new(inner)),
            buf: Vec::with_capacity(256),
            lines_read: 0,
            done: false,
        }
    }

    /// Lines yielded so far
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// The compressed source
    pub fn get_ref(&self) -> &R {
        self.reader.get_ref().get_ref()
    }

    fn read_line(&mut self) -> Result<Option<String>, StreamError> {
        self.buf.clear();
        let n = self
            .reader
            .read_until(b'\n', &mut self.buf)
            .map_err(StreamError::from_read)?;
        if n == 0 {
            return Ok(None);
        }

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }

        let line = match std::str::from_utf8(&self.buf) {
            Ok(s) => s.to_string(),
            Err(_) => String::from_utf8_lossy(&self.buf).into_owned(),
        };
        Ok(Some(line))
    }
}

impl<R: Read> Iterator for LineDecoder<R> {
    type Item = Result<String, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.read_line() {
            Ok(Some(line)) => {
                self.lines_read += 1;
                Some(Ok(line))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
