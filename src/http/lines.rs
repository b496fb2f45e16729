//! CRLF line tokenizer over a blocking byte stream.
//!
//! [`LineReader`] pulls bytes from the stream on demand and hands out one line
//! at a time. Bytes read past the last line it handed out stay in its buffer
//! and can be taken back with [`LineReader::into_remainder`], which is how the
//! request parser passes the start of the body to the body reader.

use std::io::{self, Read};

use bytes::{Buf, Bytes, BytesMut};

use crate::http::error::is_timeout;

/// Default number of bytes requested from the stream per read.
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

const CRLF: &[u8] = b"\r\n";

/// One step of the line sequence.
#[derive(Debug, PartialEq, Eq)]
pub enum Token {
    /// A complete line with its CRLF stripped.
    Line(Bytes),
    /// An empty line: CRLF at the start of the buffer.
    Blank,
    /// The sequence is over. Later calls keep returning the same ending.
    End(Ending),
}

/// Why a line sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    /// The peer closed its side of the stream.
    Eof,
    /// The read timeout expired with no new bytes.
    TimedOut,
    /// More than `max_line` bytes arrived without a CRLF.
    LineTooLong,
    /// The stream failed.
    Failed(io::ErrorKind),
}

/// Pull-based line tokenizer.
pub struct LineReader<'s, S> {
    stream: &'s mut S,
    buffer: BytesMut,
    chunk_size: usize,
    max_line: usize,
    ended: Option<Ending>,
}

impl<'s, S: Read> LineReader<'s, S> {
    /// Creates a tokenizer that starts from `buffer`, bytes already read off
    /// the stream by an earlier request cycle.
    pub fn new(stream: &'s mut S, buffer: BytesMut, chunk_size: usize, max_line: usize) -> Self {
        Self {
            stream,
            buffer,
            chunk_size: chunk_size.max(1),
            max_line,
            ended: None,
        }
    }

    /// Returns the next line, blank line, or end of the sequence.
    ///
    /// A line longer than `max_line` ends the sequence with `LineTooLong`
    /// however its bytes were split across reads.
    ///
    /// On EOF, unterminated buffered bytes come back as a final `Line`
    /// before `End(Eof)`. On a timeout or stream failure they are left in the
    /// buffer for [`into_remainder`](Self::into_remainder).
    pub fn next_line(&mut self) -> Token {
        loop {
            if let Some(pos) = find_crlf(&self.buffer) {
                if pos > self.max_line {
                    self.ended = Some(Ending::LineTooLong);
                    return Token::End(Ending::LineTooLong);
                }
                let line = self.buffer.split_to(pos).freeze();
                self.buffer.advance(CRLF.len());
                return if line.is_empty() {
                    Token::Blank
                } else {
                    Token::Line(line)
                };
            }

            if let Some(ending) = self.ended {
                if ending == Ending::Eof && !self.buffer.is_empty() {
                    return Token::Line(self.buffer.split().freeze());
                }
                return Token::End(ending);
            }

            // a trailing CR may be the first half of the terminator
            let pending = self.buffer.len() - usize::from(self.buffer.ends_with(b"\r"));
            if pending > self.max_line {
                self.ended = Some(Ending::LineTooLong);
                continue;
            }

            match fill(&mut *self.stream, &mut self.buffer, self.chunk_size) {
                Ok(0) => self.ended = Some(Ending::Eof),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if is_timeout(&e) => self.ended = Some(Ending::TimedOut),
                Err(e) => {
                    tracing::debug!(error = %e, "read failed while tokenizing lines");
                    self.ended = Some(Ending::Failed(e.kind()));
                }
            }
        }
    }

    /// Bytes buffered past the last token handed out.
    pub fn remainder(&self) -> &[u8] {
        &self.buffer
    }

    /// Gives back the buffer, positioned just after the last token.
    pub fn into_remainder(self) -> BytesMut {
        self.buffer
    }

    /// Like [`into_remainder`](Self::into_remainder), also releasing the
    /// stream borrow so the next reader can pick it up.
    pub fn into_parts(self) -> (&'s mut S, BytesMut) {
        (self.stream, self.buffer)
    }
}

/// Appends at most `chunk` freshly read bytes to `buf`.
pub(crate) fn fill<S: Read>(stream: &mut S, buf: &mut BytesMut, chunk: usize) -> io::Result<usize> {
    let start = buf.len();
    buf.resize(start + chunk, 0);
    match stream.read(&mut buf[start..]) {
        Ok(n) => {
            buf.truncate(start + n);
            Ok(n)
        }
        Err(e) => {
            buf.truncate(start);
            Err(e)
        }
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(CRLF.len()).position(|w| w == CRLF)
}
