//! Shared test doubles: a scripted in-memory stream and an in-memory file service.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::{self, Cursor, Read, Write};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use wicket::http::connection::Transport;
use wicket::http::service::{FileService, NotFound, ServedFile};

pub fn peer() -> SocketAddr {
    "127.0.0.1:40000".parse().unwrap()
}

/// What the next `read` call does.
#[derive(Debug, Clone)]
pub enum Step {
    Data(Vec<u8>),
    Timeout,
    Fail(io::ErrorKind),
}

/// Everything the code under test did to the stream, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Read(Vec<u8>),
    Wrote(Vec<u8>),
}

/// Replays a fixed script of reads, then reports EOF forever.
///
/// A `Data` step larger than the caller's buffer is split across reads.
#[derive(Debug, Default)]
pub struct ScriptedStream {
    steps: VecDeque<Step>,
    pub written: Vec<u8>,
    pub events: Vec<Event>,
    pub idle_timeout: Option<Option<Duration>>,
    pub reads: usize,
}

impl ScriptedStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(mut self, bytes: impl AsRef<[u8]>) -> Self {
        self.steps.push_back(Step::Data(bytes.as_ref().to_vec()));
        self
    }

    pub fn timeout(mut self) -> Self {
        self.steps.push_back(Step::Timeout);
        self
    }

    pub fn fail(mut self, kind: io::ErrorKind) -> Self {
        self.steps.push_back(Step::Fail(kind));
        self
    }

    pub fn written_str(&self) -> String {
        String::from_utf8_lossy(&self.written).into_owned()
    }

    /// Unconsumed scripted bytes.
    pub fn pending(&self) -> usize {
        self.steps
            .iter()
            .map(|s| match s {
                Step::Data(d) => d.len(),
                _ => 0,
            })
            .sum()
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads += 1;
        match self.steps.pop_front() {
            None => Ok(0),
            Some(Step::Data(mut data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    let rest = data.split_off(n);
                    self.steps.push_front(Step::Data(rest));
                }
                data.truncate(n);
                self.events.push(Event::Read(data));
                Ok(n)
            }
            Some(Step::Timeout) => Err(io::ErrorKind::WouldBlock.into()),
            Some(Step::Fail(kind)) => Err(kind.into()),
        }
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.extend_from_slice(buf);
        self.events.push(Event::Wrote(buf.to_vec()));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for ScriptedStream {
    fn set_idle_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.idle_timeout = Some(timeout);
        Ok(())
    }
}

/// Serves fixed in-memory content and counts lookups.
#[derive(Default)]
pub struct MemoryFiles {
    files: HashMap<String, (Vec<u8>, String)>,
    pub lookups: Arc<AtomicUsize>,
}

impl MemoryFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, content: &[u8], content_type: &str) -> Self {
        self.files
            .insert(path.to_string(), (content.to_vec(), content_type.to_string()));
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl FileService for MemoryFiles {
    fn serve(&self, path: &str) -> Result<ServedFile, NotFound> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let (content, content_type) = self.files.get(path).ok_or(NotFound)?;
        Ok(ServedFile {
            body: Box::new(Cursor::new(content.clone())),
            content_type: content_type.clone(),
            size: content.len() as u64,
        })
    }
}

/// Splits raw response bytes into `(status line, headers, body)` triples.
///
/// Relies on every response carrying Content-Length.
pub fn split_responses(raw: &[u8]) -> Vec<(String, Vec<(String, String)>, Vec<u8>)> {
    let mut out = Vec::new();
    let mut rest = raw;

    while !rest.is_empty() {
        let end = rest
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("response head terminator");
        let head = std::str::from_utf8(&rest[..end]).expect("ascii head");
        let mut lines = head.split("\r\n");
        let status = lines.next().unwrap().to_string();
        let headers: Vec<(String, String)> = lines
            .map(|l| {
                let (k, v) = l.split_once(": ").expect("header separator");
                (k.to_string(), v.to_string())
            })
            .collect();

        let len = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
            .map(|(_, v)| v.parse::<usize>().unwrap())
            .unwrap_or(0);

        let body_start = end + 4;
        out.push((status, headers, rest[body_start..body_start + len].to_vec()));
        rest = &rest[body_start + len..];
    }

    out
}

pub fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
