use std::io;

use bytes::{Bytes, BytesMut};
use wicket::http::lines::{Ending, LineReader, Token};

mod common;
use common::ScriptedStream;

fn line(s: &str) -> Token {
    Token::Line(Bytes::copy_from_slice(s.as_bytes()))
}

#[test]
fn test_yields_lines_without_crlf() {
    let mut stream = ScriptedStream::new().data("GET / HTTP/1.1\r\nHost: x\r\n");
    let mut lines = LineReader::new(&mut stream, BytesMut::new(), 1024, 1024);

    assert_eq!(lines.next_line(), line("GET / HTTP/1.1"));
    assert_eq!(lines.next_line(), line("Host: x"));
    assert_eq!(lines.next_line(), Token::End(Ending::Eof));
}

#[test]
fn test_reassembles_lines_split_across_reads() {
    let mut stream = ScriptedStream::new()
        .data("GE")
        .data("T / HT")
        .data("TP/1.1\r")
        .data("\nHost: x\r\n");
    let mut lines = LineReader::new(&mut stream, BytesMut::new(), 1024, 1024);

    assert_eq!(lines.next_line(), line("GET / HTTP/1.1"));
    assert_eq!(lines.next_line(), line("Host: x"));
}

#[test]
fn test_blank_line_leaves_exact_remainder() {
    let mut stream = ScriptedStream::new().data("A: 1\r\n\r\nhello\r\nworld");
    let mut lines = LineReader::new(&mut stream, BytesMut::new(), 1024, 1024);

    assert_eq!(lines.next_line(), line("A: 1"));
    assert_eq!(lines.next_line(), Token::Blank);
    assert_eq!(&lines.into_remainder()[..], b"hello\r\nworld");
}

#[test]
fn test_blank_line_does_not_read_further() {
    let mut stream = ScriptedStream::new().data("A: 1\r\n\r\n").data("body");
    let mut lines = LineReader::new(&mut stream, BytesMut::new(), 1024, 1024);

    assert_eq!(lines.next_line(), line("A: 1"));
    assert_eq!(lines.next_line(), Token::Blank);
    drop(lines);

    assert_eq!(stream.pending(), 4);
}

#[test]
fn test_eof_flushes_unterminated_tail_as_final_line() {
    let mut stream = ScriptedStream::new().data("one\r\ntwo");
    let mut lines = LineReader::new(&mut stream, BytesMut::new(), 1024, 1024);

    assert_eq!(lines.next_line(), line("one"));
    assert_eq!(lines.next_line(), line("two"));
    assert_eq!(lines.next_line(), Token::End(Ending::Eof));
    assert_eq!(lines.next_line(), Token::End(Ending::Eof));
}

#[test]
fn test_timeout_keeps_partial_line_as_remainder() {
    let mut stream = ScriptedStream::new().data("one\r\npart").timeout();
    let mut lines = LineReader::new(&mut stream, BytesMut::new(), 1024, 1024);

    assert_eq!(lines.next_line(), line("one"));
    assert_eq!(lines.next_line(), Token::End(Ending::TimedOut));
    assert_eq!(lines.remainder(), b"part");
}

#[test]
fn test_stream_failure_ends_sequence() {
    let mut stream = ScriptedStream::new().fail(io::ErrorKind::ConnectionReset);
    let mut lines = LineReader::new(&mut stream, BytesMut::new(), 1024, 1024);

    assert_eq!(
        lines.next_line(),
        Token::End(Ending::Failed(io::ErrorKind::ConnectionReset))
    );
}

#[test]
fn test_interrupted_read_is_retried() {
    let mut stream = ScriptedStream::new()
        .fail(io::ErrorKind::Interrupted)
        .data("ok\r\n");
    let mut lines = LineReader::new(&mut stream, BytesMut::new(), 1024, 1024);

    assert_eq!(lines.next_line(), line("ok"));
}

#[test]
fn test_starts_from_carried_buffer() {
    let mut stream = ScriptedStream::new().data("tail\r\n");
    let carried = BytesMut::from(&b"head\r\nta"[..]);
    let mut lines = LineReader::new(&mut stream, carried, 1024, 1024);

    assert_eq!(lines.next_line(), line("head"));
    assert_eq!(lines.next_line(), line("tatail"));
}

#[test]
fn test_overlong_line_ends_sequence() {
    let mut stream = ScriptedStream::new().data("x".repeat(64));
    let mut lines = LineReader::new(&mut stream, BytesMut::new(), 16, 32);

    assert_eq!(lines.next_line(), Token::End(Ending::LineTooLong));
}

#[test]
fn test_line_limit_ignores_read_boundaries() {
    let overlong = format!("{}\r\n", "x".repeat(30));

    let mut whole = ScriptedStream::new().data(&overlong);
    let mut lines = LineReader::new(&mut whole, BytesMut::new(), 64, 16);
    assert_eq!(lines.next_line(), Token::End(Ending::LineTooLong));

    let mut split = ScriptedStream::new().data(&overlong[..20]).data(&overlong[20..]);
    let mut lines = LineReader::new(&mut split, BytesMut::new(), 64, 16);
    assert_eq!(lines.next_line(), Token::End(Ending::LineTooLong));
}

#[test]
fn test_line_at_exact_limit_is_accepted() {
    let exact = "y".repeat(16);

    // the CR arrives alone at the end of the first read
    let mut stream = ScriptedStream::new()
        .data(format!("{exact}\r"))
        .data("\nnext\r\n");
    let mut lines = LineReader::new(&mut stream, BytesMut::new(), 64, 16);

    assert_eq!(lines.next_line(), line(&exact));
    assert_eq!(lines.next_line(), line("next"));
}

#[test]
fn test_small_chunk_size_reads_incrementally() {
    let mut stream = ScriptedStream::new().data("abcdef\r\n");
    let mut lines = LineReader::new(&mut stream, BytesMut::new(), 2, 1024);

    assert_eq!(lines.next_line(), line("abcdef"));
    drop(lines);
    assert_eq!(stream.reads, 4);
}
