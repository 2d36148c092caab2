//! Input sources: how document bytes reach the tokenizer.
//!
//! Streams are pulled through [`ReadSource`] in bounded chunks; in-memory
//! documents are served directly from their buffer. Both paths end up
//! behind a [`BufRead`] that counts the lines the tokenizer has consumed,
//! which is where diagnostic line numbers come from.

use std::io::{self, BufRead, Read};

/// Bytes requested from a stream per chunk.
pub(crate) const TOKENIZER_BUFFER_SIZE: usize = 0x1000;

/// Largest slice served from an in-memory document per refill.
pub(crate) const TEXT_CHUNK_SIZE: usize = 1 << 20;

/// A pull source of document bytes.
///
/// Implemented for every [`io::Read`]; exists as its own trait so that
/// chunked, non-`io` producers can feed the parser too. Returning more
/// bytes than the buffer holds is a contract violation and fails the
/// parse.
pub trait ReadSource {
    /// Fill `buf` with up to `buf.len()` bytes. Returns the number of
    /// bytes produced; `0` means end of input.
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl<R: Read> ReadSource for R {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read(buf)
    }
}

/// Inner payload of the I/O error raised when a [`ReadSource`] overruns
/// its buffer. Recovered by downcasting when the error resurfaces from
/// the tokenizer.
#[derive(Debug, thiserror::Error)]
#[error("read() returned too much data: {requested} bytes requested, {returned} returned")]
pub(crate) struct OverlongChunk {
    pub requested: usize,
    pub returned: usize,
}

/// Adapts a [`ReadSource`] to [`BufRead`], requesting
/// [`TOKENIZER_BUFFER_SIZE`] bytes at a time.
pub(crate) struct StreamReader<S> {
    source: S,
    buf: Vec<u8>,
    pos: usize,
}

impl<S: ReadSource> StreamReader<S> {
    pub(crate) fn new(source: S) -> Self {
        StreamReader {
            source,
            buf: Vec::with_capacity(TOKENIZER_BUFFER_SIZE),
            pos: 0,
        }
    }
}

impl<S: ReadSource> Read for StreamReader<S> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<S: ReadSource> BufRead for StreamReader<S> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos >= self.buf.len() {
            self.buf.resize(TOKENIZER_BUFFER_SIZE, 0);
            self.pos = 0;
            let n = self.source.read_chunk(&mut self.buf)?;
            if n > TOKENIZER_BUFFER_SIZE {
                self.buf.clear();
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    OverlongChunk {
                        requested: TOKENIZER_BUFFER_SIZE,
                        returned: n,
                    },
                ));
            }
            self.buf.truncate(n);
        }
        Ok(&self.buf[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.buf.len());
    }
}

/// Serves an in-memory document, at most [`TEXT_CHUNK_SIZE`] bytes per
/// refill so the tokenizer's working set stays bounded on huge inputs.
pub(crate) struct TextSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> TextSource<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        TextSource { data, pos: 0 }
    }
}

impl Read for TextSource<'_> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl BufRead for TextSource<'_> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        let end = (self.pos + TEXT_CHUNK_SIZE).min(self.data.len());
        Ok(&self.data[self.pos..end])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.data.len());
    }
}

/// Counts newlines as the tokenizer consumes bytes; `line()` is therefore
/// the 1-based line of the most recently consumed input.
pub(crate) struct LineCountingReader<B> {
    inner: B,
    line: u64,
}

impl<B: BufRead> LineCountingReader<B> {
    pub(crate) fn new(inner: B) -> Self {
        LineCountingReader { inner, line: 1 }
    }

    pub(crate) fn line(&self) -> u64 {
        self.line
    }
}

impl<B: BufRead> Read for LineCountingReader<B> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let available = self.inner.fill_buf()?;
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<B: BufRead> BufRead for LineCountingReader<B> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        // Only consumed bytes count; fill_buf may expose data the
        // tokenizer never takes.
        if let Ok(buf) = self.inner.fill_buf() {
            let seen = amt.min(buf.len());
            self.line += buf[..seen].iter().filter(|&&b| b == b'\n').count() as u64;
        }
        self.inner.consume(amt);
    }
}
