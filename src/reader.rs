//! Peekable byte streams.
//!
//! Detecting a header requires looking at the first bytes of a stream without consuming them,
//! so that a stream without a header can be handed to the application untouched.

use std::io::{self, BufRead, Read};

/// The number of bytes read from the inner reader at a time.
const CHUNK_SIZE: usize = 512;

/// A buffered stream that can look ahead without consuming.
pub trait PeekRead: BufRead {
    /// Returns the next `length` bytes of the stream without consuming them.
    /// Blocks until `length` bytes are available; fewer bytes are only returned at the end of the stream.
    fn peek(&mut self, length: usize) -> io::Result<&[u8]>;
}

impl PeekRead for &[u8] {
    fn peek(&mut self, length: usize) -> io::Result<&[u8]> {
        let end = length.min(self.len());

        Ok(&self[..end])
    }
}

/// Wraps a reader with a growable buffer that satisfies any peek length.
///
/// ## Examples
/// ```rust
/// use std::io::Read;
/// use proxyproto::{PeekRead, PeekReader};
///
/// let mut reader = PeekReader::new(&b"Hello, World!"[..]);
///
/// assert_eq!(reader.peek(5).unwrap(), b"Hello");
///
/// let mut text = String::new();
/// reader.read_to_string(&mut text).unwrap();
///
/// assert_eq!(text, "Hello, World!");
/// ```
#[derive(Debug)]
pub struct PeekReader<R> {
    inner: R,
    buffer: Vec<u8>,
    position: usize,
}

impl<R: Read> PeekReader<R> {
    /// Creates a new `PeekReader` with an empty buffer.
    pub fn new(inner: R) -> Self {
        PeekReader {
            inner,
            buffer: Vec::new(),
            position: 0,
        }
    }

    /// A reference to the wrapped reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// The bytes read from the inner reader but not yet consumed.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer[self.position..]
    }

    /// Unwraps this `PeekReader`, returning the inner reader and any buffered bytes not yet consumed.
    /// The buffered bytes precede whatever remains in the inner reader.
    pub fn into_parts(mut self) -> (R, Vec<u8>) {
        self.buffer.drain(..self.position);

        (self.inner, self.buffer)
    }

    /// The number of buffered bytes not yet consumed.
    fn available(&self) -> usize {
        self.buffer.len() - self.position
    }

    /// Reads one chunk from the inner reader into the buffer.
    /// Returns the number of bytes read; zero means the inner reader has ended.
    fn fill_chunk(&mut self) -> io::Result<usize> {
        if self.position == self.buffer.len() {
            self.buffer.clear();
            self.position = 0;
        }

        let start = self.buffer.len();
        self.buffer.resize(start + CHUNK_SIZE, 0);

        loop {
            match self.inner.read(&mut self.buffer[start..]) {
                Ok(read) => {
                    self.buffer.truncate(start + read);
                    return Ok(read);
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => {
                    self.buffer.truncate(start);
                    return Err(error);
                }
            }
        }
    }
}

impl<R: Read> PeekRead for PeekReader<R> {
    fn peek(&mut self, length: usize) -> io::Result<&[u8]> {
        while self.available() < length {
            if self.fill_chunk()? == 0 {
                break;
            }
        }

        let end = self.position + length.min(self.available());

        Ok(&self.buffer[self.position..end])
    }
}

impl<R: Read> Read for PeekReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.available() == 0 && buf.len() >= CHUNK_SIZE {
            return self.inner.read(buf);
        }

        let read = {
            let mut available = self.fill_buf()?;
            available.read(buf)?
        };
        self.consume(read);

        Ok(read)
    }
}

impl<R: Read> BufRead for PeekReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.available() == 0 {
            self.fill_chunk()?;
        }

        Ok(&self.buffer[self.position..])
    }

    fn consume(&mut self, amount: usize) {
        self.position = (self.position + amount).min(self.buffer.len());
    }
}
