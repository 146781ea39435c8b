//! Lazy, single-pass record bodies.

use std::io::{self, Read};

use bytes::Bytes;

/// Default size of body chunks.
pub const CHUNK_SIZE: usize = 8192;

/// A forward-only body: an optional header chunk, then the reader's bytes
/// in chunks of at most `chunk_size`.
///
/// The stream owns its reader; closing drops it, which releases the file
/// handle or connection behind it. Close happens on exhaustion, on the
/// first read error, on an explicit [`close`](Self::close), or on drop,
/// whichever comes first. Closing twice is a no-op and never fails.
pub struct BodyStream {
    header: Option<Bytes>,
    reader: Option<Box<dyn Read + Send>>,
    chunk_size: usize,
}

impl BodyStream {
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self {
            header: None,
            reader: Some(Box::new(reader)),
            chunk_size: CHUNK_SIZE,
        }
    }

    /// A stream with no bytes at all.
    pub fn empty() -> Self {
        Self {
            header: None,
            reader: None,
            chunk_size: CHUNK_SIZE,
        }
    }

    /// Yield `header` before any body bytes. An empty header is skipped.
    pub fn with_header(mut self, header: impl Into<Bytes>) -> Self {
        let header = header.into();
        self.header = (!header.is_empty()).then_some(header);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_none() && self.header.is_none()
    }

    /// Release the underlying reader. Idempotent.
    pub fn close(&mut self) {
        self.header = None;
        if self.reader.take().is_some() {
            tracing::trace!("body stream closed");
        }
    }

    /// Drain the remaining chunks into one buffer and close.
    pub fn read_all(&mut self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        for chunk in self.by_ref() {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }
}

impl Iterator for BodyStream {
    type Item = io::Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(header) = self.header.take() {
            return Some(Ok(header));
        }

        let reader = self.reader.as_mut()?;
        let mut buf = vec![0u8; self.chunk_size];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => {
                    self.close();
                    return None;
                }
                Ok(n) => {
                    buf.truncate(n);
                    return Some(Ok(Bytes::from(buf)));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.close();
                    return Some(Err(e));
                }
            }
        }
    }
}

impl Drop for BodyStream {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for BodyStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyStream")
            .field("header", &self.header.as_ref().map(Bytes::len))
            .field("open", &self.reader.is_some())
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}
