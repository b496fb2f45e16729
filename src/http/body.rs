use std::io::{self, Read};

use bytes::{Bytes, BytesMut};

use crate::http::lines::fill;

/// Reads a request body of known length off the connection.
///
/// Starts from the spill buffer the parser read past the blank line, and only
/// touches the stream once that runs dry. Never hands out more than the
/// declared length in total; anything read beyond it stays in the spill
/// buffer and goes back to the connection through [`finish`](Self::finish).
///
/// A read error is treated like EOF: the caller gets a short read and has to
/// compare what it got against what was declared.
pub struct BodyReader<'s, S> {
    stream: &'s mut S,
    spill: BytesMut,
    remaining: usize,
    chunk_size: usize,
    exhausted: bool,
}

impl<'s, S: Read> BodyReader<'s, S> {
    pub fn new(stream: &'s mut S, spill: BytesMut, declared: usize, chunk_size: usize) -> Self {
        Self {
            stream,
            spill,
            remaining: declared,
            chunk_size: chunk_size.max(1),
            exhausted: false,
        }
    }

    /// Reads up to `n` body bytes, blocking only until that many are
    /// available or the stream ends.
    pub fn read(&mut self, n: usize) -> Bytes {
        let want = n.min(self.remaining);

        while self.spill.len() < want && !self.exhausted {
            match fill(&mut *self.stream, &mut self.spill, self.chunk_size) {
                Ok(0) => self.exhausted = true,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        missing = want - self.spill.len(),
                        "body read failed, returning short read"
                    );
                    self.exhausted = true;
                }
            }
        }

        let take = want.min(self.spill.len());
        self.remaining -= take;
        self.spill.split_to(take).freeze()
    }

    /// Declared body bytes not yet returned.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Whether the stream ended or failed while reading the body.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// The underlying stream, for writing interim responses.
    pub fn get_mut(&mut self) -> &mut S {
        &mut *self.stream
    }

    /// Releases the stream and returns spilled bytes past the body.
    pub fn finish(self) -> BytesMut {
        self.spill
    }
}
