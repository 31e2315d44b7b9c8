//! RESP2 encoder and reply parser.
//!
//! RESP2 frames:
//! - Simple Strings (+)
//! - Errors (-)
//! - Integers (:)
//! - Bulk Strings ($), null as $-1
//! - Arrays (*), null as *-1
//!
//! Requests are always arrays of bulk strings.

use super::{RespError, RespValue};
use bytes::{Bytes, BytesMut};

/// Maximum nesting depth for arrays.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Maximum bulk string size (512MB).
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array elements accepted by [`Resp2Parser::parse`].
pub const MAX_ELEMENTS: usize = 1_000_000;

/// Bounds applied while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserLimits {
    pub max_depth: usize,
    pub max_bulk_size: usize,
    pub max_elements: usize,
}

impl Default for ParserLimits {
    fn default() -> Self {
        Self {
            max_depth: MAX_NESTING_DEPTH,
            max_bulk_size: MAX_BULK_SIZE,
            max_elements: MAX_ELEMENTS,
        }
    }
}

impl ParserLimits {
    /// Limits for server replies. Array length is unbounded: HGETALL on a
    /// large hash is a valid reply.
    pub fn replies() -> Self {
        Self {
            max_elements: usize::MAX,
            ..Self::default()
        }
    }
}

/// Parse result.
#[derive(Debug, PartialEq, Eq)]
pub enum ParseResult {
    /// A complete value and the number of bytes it occupied.
    Ok { value: RespValue, consumed: usize },
    /// Need more data.
    Incomplete,
    /// Malformed frame; the stream cannot be resynchronised.
    Error(String),
}

/// RESP2 reply parser.
#[derive(Debug, Default)]
pub struct Resp2Parser;

impl Resp2Parser {
    /// Parse one value from the front of `data` with the default limits.
    pub fn parse(data: &[u8]) -> ParseResult {
        parse_value(data, 0, &ParserLimits::default())
    }

    /// Parse one value from the front of `data`.
    pub fn parse_with(data: &[u8], limits: &ParserLimits) -> ParseResult {
        parse_value(data, 0, limits)
    }
}

/// Streaming reply decoder.
///
/// Frame headers are walked as bytes arrive and the position is kept between
/// calls, so a reply split over many reads is scanned once. The value is
/// built only when the whole frame is buffered.
#[derive(Debug)]
pub struct Resp2Decoder {
    limits: ParserLimits,
    /// Bytes of the current frame already walked.
    scanned: usize,
    /// Elements still expected by each open array, innermost last.
    open: Vec<usize>,
}

impl Default for Resp2Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Resp2Decoder {
    /// Decoder using [`ParserLimits::replies`].
    pub fn new() -> Self {
        Self::with_limits(ParserLimits::replies())
    }

    pub fn with_limits(limits: ParserLimits) -> Self {
        Self {
            limits,
            scanned: 0,
            open: Vec::new(),
        }
    }

    pub fn limits(&self) -> &ParserLimits {
        &self.limits
    }

    /// Take one complete value off the front of `buffer`.
    ///
    /// On `Incomplete` nothing is consumed; call again once more bytes have
    /// been appended to the same buffer.
    pub fn decode(&mut self, buffer: &mut BytesMut) -> ParseResult {
        loop {
            match scan_item(&buffer[self.scanned..], self.open.len(), &self.limits) {
                Scan::Incomplete => return ParseResult::Incomplete,
                Scan::Error(message) => {
                    self.reset();
                    return ParseResult::Error(message);
                }
                Scan::Item(len) => {
                    self.scanned += len;
                    self.close_item();
                }
                Scan::Open {
                    header_len,
                    elements,
                } => {
                    self.scanned += header_len;
                    self.open.push(elements);
                }
            }
            if self.open.is_empty() {
                break;
            }
        }

        let frame = buffer.split_to(self.scanned);
        self.reset();
        parse_value(&frame, 0, &self.limits)
    }

    /// Forget any partially walked frame.
    pub fn reset(&mut self) {
        self.scanned = 0;
        self.open.clear();
    }

    /// Count one finished element against the innermost open array, closing
    /// arrays that are now full.
    fn close_item(&mut self) {
        while let Some(remaining) = self.open.last_mut() {
            *remaining -= 1;
            if *remaining > 0 {
                return;
            }
            self.open.pop();
        }
    }
}

enum Scan {
    Incomplete,
    Error(String),
    /// A complete scalar, bulk string, null or empty array of this length.
    Item(usize),
    /// An array header; its elements follow.
    Open { header_len: usize, elements: usize },
}

fn scan_item(data: &[u8], depth: usize, limits: &ParserLimits) -> Scan {
    if data.is_empty() {
        return Scan::Incomplete;
    }
    if depth > limits.max_depth {
        return Scan::Error("maximum nesting depth exceeded".to_string());
    }

    let Some(line_len) = find_crlf(&data[1..]) else {
        return Scan::Incomplete;
    };
    let line = &data[1..1 + line_len];
    let header_len = line_len + 3;

    match data[0] {
        b'+' | b'-' => Scan::Item(header_len),
        b':' => match parse_int(line) {
            Some(_) => Scan::Item(header_len),
            None => Scan::Error("invalid integer".to_string()),
        },
        b'$' => match length_field(line, "bulk string", limits.max_bulk_size) {
            Err(message) => Scan::Error(message),
            Ok(None) => Scan::Item(header_len),
            Ok(Some(len)) => {
                let end = header_len + len + 2;
                if data.len() < end {
                    Scan::Incomplete
                } else if &data[end - 2..end] != b"\r\n" {
                    Scan::Error("missing CRLF after bulk string".to_string())
                } else {
                    Scan::Item(end)
                }
            }
        },
        b'*' => match length_field(line, "array", limits.max_elements) {
            Err(message) => Scan::Error(message),
            Ok(None) | Ok(Some(0)) => Scan::Item(header_len),
            Ok(Some(elements)) => Scan::Open {
                header_len,
                elements,
            },
        },
        other => Scan::Error(format!("unexpected type byte 0x{:02x}", other)),
    }
}

fn parse_value(data: &[u8], depth: usize, limits: &ParserLimits) -> ParseResult {
    if data.is_empty() {
        return ParseResult::Incomplete;
    }
    if depth > limits.max_depth {
        return ParseResult::Error("maximum nesting depth exceeded".to_string());
    }

    let Some(line_len) = find_crlf(&data[1..]) else {
        return ParseResult::Incomplete;
    };
    let line = &data[1..1 + line_len];
    // type byte + line + CRLF
    let header_len = line_len + 3;

    match data[0] {
        b'+' => ParseResult::Ok {
            value: RespValue::SimpleString(String::from_utf8_lossy(line).into_owned()),
            consumed: header_len,
        },
        b'-' => {
            let (kind, message) = parse_error_line(&String::from_utf8_lossy(line));
            ParseResult::Ok {
                value: RespValue::Error(RespError { kind, message }),
                consumed: header_len,
            }
        }
        b':' => match parse_int(line) {
            Some(n) => ParseResult::Ok {
                value: RespValue::Integer(n),
                consumed: header_len,
            },
            None => ParseResult::Error("invalid integer".to_string()),
        },
        b'$' => parse_bulk(data, line, header_len, limits),
        b'*' => parse_array(data, line, header_len, depth, limits),
        other => ParseResult::Error(format!("unexpected type byte 0x{:02x}", other)),
    }
}

fn parse_bulk(data: &[u8], line: &[u8], header_len: usize, limits: &ParserLimits) -> ParseResult {
    let len = match length_field(line, "bulk string", limits.max_bulk_size) {
        Ok(Some(len)) => len,
        Ok(None) => {
            return ParseResult::Ok {
                value: RespValue::Null,
                consumed: header_len,
            }
        }
        Err(message) => return ParseResult::Error(message),
    };

    let data_end = header_len + len;
    if data.len() < data_end + 2 {
        return ParseResult::Incomplete;
    }
    if &data[data_end..data_end + 2] != b"\r\n" {
        return ParseResult::Error("missing CRLF after bulk string".to_string());
    }

    ParseResult::Ok {
        value: RespValue::BulkString(Bytes::copy_from_slice(&data[header_len..data_end])),
        consumed: data_end + 2,
    }
}

fn parse_array(
    data: &[u8],
    line: &[u8],
    header_len: usize,
    depth: usize,
    limits: &ParserLimits,
) -> ParseResult {
    let len = match length_field(line, "array", limits.max_elements) {
        Ok(Some(len)) => len,
        Ok(None) => {
            return ParseResult::Ok {
                value: RespValue::Null,
                consumed: header_len,
            }
        }
        Err(message) => return ParseResult::Error(message),
    };

    let mut elements = Vec::with_capacity(len.min(1024));
    let mut offset = header_len;
    for _ in 0..len {
        match parse_value(&data[offset..], depth + 1, limits) {
            ParseResult::Ok { value, consumed } => {
                elements.push(value);
                offset += consumed;
            }
            other => return other,
        }
    }

    ParseResult::Ok {
        value: RespValue::Array(elements),
        consumed: offset,
    }
}

/// Length from a `$` or `*` header line; `None` for the `-1` null form.
fn length_field(line: &[u8], kind: &str, max: usize) -> Result<Option<usize>, String> {
    match parse_int(line) {
        Some(-1) => Ok(None),
        Some(len) if len >= 0 => {
            let len = len as usize;
            if len > max {
                Err(format!("{} too large: {} > {}", kind, len, max))
            } else {
                Ok(Some(len))
            }
        }
        _ => Err(format!("invalid {} length", kind)),
    }
}

/// RESP2 encoder.
#[derive(Debug, Default)]
pub struct Resp2Encoder;

impl Resp2Encoder {
    /// Encode a command as an array of bulk strings.
    pub fn encode_command(parts: &[Bytes]) -> Vec<u8> {
        let size: usize = parts.iter().map(|p| p.len() + 16).sum();
        let mut buf = Vec::with_capacity(size + 16);
        write_header(&mut buf, b'*', parts.len());
        for part in parts {
            write_bulk(&mut buf, part);
        }
        buf
    }

    /// Encode a value to bytes.
    pub fn encode(value: &RespValue) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        Self::encode_into(value, &mut buf);
        buf
    }

    /// Encode a value into a buffer.
    pub fn encode_into(value: &RespValue, buf: &mut Vec<u8>) {
        match value {
            RespValue::SimpleString(s) => {
                buf.push(b'+');
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            RespValue::Error(e) => {
                buf.push(b'-');
                buf.extend_from_slice(e.kind.as_bytes());
                if !e.message.is_empty() {
                    buf.push(b' ');
                    buf.extend_from_slice(e.message.as_bytes());
                }
                buf.extend_from_slice(b"\r\n");
            }
            RespValue::Integer(n) => {
                buf.push(b':');
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            RespValue::BulkString(data) => write_bulk(buf, data),
            RespValue::Array(elements) => {
                write_header(buf, b'*', elements.len());
                for elem in elements {
                    Self::encode_into(elem, buf);
                }
            }
            RespValue::Null => buf.extend_from_slice(b"$-1\r\n"),
        }
    }
}

fn write_header(buf: &mut Vec<u8>, prefix: u8, len: usize) {
    buf.push(prefix);
    buf.extend_from_slice(len.to_string().as_bytes());
    buf.extend_from_slice(b"\r\n");
}

fn write_bulk(buf: &mut Vec<u8>, data: &[u8]) {
    write_header(buf, b'$', data.len());
    buf.extend_from_slice(data);
    buf.extend_from_slice(b"\r\n");
}

/// Find CRLF in data, returning position of first \r.
fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == b"\r\n")
}

fn parse_int(line: &[u8]) -> Option<i64> {
    std::str::from_utf8(line).ok()?.parse().ok()
}

/// Split an error line into kind and message.
fn parse_error_line(s: &str) -> (String, String) {
    match s.split_once(' ') {
        Some((kind, message)) => (kind.to_string(), message.to_string()),
        None => (s.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(data: &[u8]) -> (RespValue, usize) {
        match Resp2Parser::parse(data) {
            ParseResult::Ok { value, consumed } => (value, consumed),
            other => panic!("expected value, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_scalars() {
        assert_eq!(parsed(b"+OK\r\n"), (RespValue::ok(), 5));
        assert_eq!(parsed(b":-42\r\n"), (RespValue::Integer(-42), 6));
        assert_eq!(parsed(b"$-1\r\n"), (RespValue::Null, 5));
        assert_eq!(parsed(b"*-1\r\n"), (RespValue::Null, 5));
        assert_eq!(parsed(b"$0\r\n\r\n"), (RespValue::bulk(""), 6));
    }

    #[test]
    fn test_parse_error_reply() {
        let (value, _) = parsed(b"-WRONGTYPE Operation against a key\r\n");
        assert_eq!(
            value,
            RespValue::error("WRONGTYPE", "Operation against a key")
        );
    }

    #[test]
    fn test_bulk_may_contain_crlf() {
        let (value, consumed) = parsed(b"$4\r\na\r\nb\r\n+OK\r\n");
        assert_eq!(value, RespValue::bulk(&b"a\r\nb"[..]));
        assert_eq!(consumed, 10);
    }

    #[test]
    fn test_parse_scan_reply_reports_consumed() {
        let frame = b"*2\r\n$2\r\n17\r\n*2\r\n$1\r\nf\r\n$1\r\nv\r\n:1\r\n";
        let (value, consumed) = parsed(frame);
        assert_eq!(consumed, frame.len() - 4);
        assert_eq!(
            value,
            RespValue::array(vec![
                RespValue::bulk("17"),
                RespValue::array(vec![RespValue::bulk("f"), RespValue::bulk("v")]),
            ])
        );
    }

    #[test]
    fn test_parse_incomplete() {
        assert_eq!(Resp2Parser::parse(b""), ParseResult::Incomplete);
        assert_eq!(Resp2Parser::parse(b"+OK"), ParseResult::Incomplete);
        assert_eq!(Resp2Parser::parse(b"$6\r\nfoo"), ParseResult::Incomplete);
        assert_eq!(Resp2Parser::parse(b"*2\r\n$3\r\nfoo\r\n"), ParseResult::Incomplete);
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(Resp2Parser::parse(b":abc\r\n"), ParseResult::Error(_)));
        assert!(matches!(Resp2Parser::parse(b"$3\r\nfooXX"), ParseResult::Error(_)));
        assert!(matches!(Resp2Parser::parse(b"?\r\n"), ParseResult::Error(_)));
    }

    #[test]
    fn test_nesting_limit() {
        let mut frame = Vec::new();
        for _ in 0..(MAX_NESTING_DEPTH + 2) {
            frame.extend_from_slice(b"*1\r\n");
        }
        frame.extend_from_slice(b":1\r\n");
        assert!(matches!(Resp2Parser::parse(&frame), ParseResult::Error(_)));
    }

    #[test]
    fn test_decoder_resumes_across_reads() {
        let frame = b"*2\r\n$2\r\n17\r\n*2\r\n$1\r\nf\r\n$5\r\nvalue\r\n";
        let mut decoder = Resp2Decoder::new();
        let mut buffer = BytesMut::new();

        for (i, byte) in frame.iter().enumerate() {
            buffer.extend_from_slice(&[*byte]);
            let result = decoder.decode(&mut buffer);
            if i + 1 < frame.len() {
                assert_eq!(result, ParseResult::Incomplete, "byte {}", i);
            } else {
                assert_eq!(
                    result,
                    ParseResult::Ok {
                        value: RespValue::array(vec![
                            RespValue::bulk("17"),
                            RespValue::array(vec![RespValue::bulk("f"), RespValue::bulk("value")]),
                        ]),
                        consumed: frame.len(),
                    }
                );
            }
        }
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_decoder_leaves_next_reply_buffered() {
        let mut decoder = Resp2Decoder::new();
        let mut buffer = BytesMut::from(&b"*2\r\n:1\r\n*0\r\n+PO"[..]);

        let (value, consumed) = match decoder.decode(&mut buffer) {
            ParseResult::Ok { value, consumed } => (value, consumed),
            other => panic!("expected value, got {:?}", other),
        };
        assert_eq!(
            value,
            RespValue::array(vec![RespValue::Integer(1), RespValue::array(vec![])])
        );
        assert_eq!(consumed, 12);
        assert_eq!(&buffer[..], b"+PO");

        assert_eq!(decoder.decode(&mut buffer), ParseResult::Incomplete);
        buffer.extend_from_slice(b"NG\r\n");
        assert!(matches!(
            decoder.decode(&mut buffer),
            ParseResult::Ok { value: RespValue::SimpleString(ref s), .. } if s == "PONG"
        ));
    }

    #[test]
    fn test_decoder_accepts_arrays_beyond_request_limit() {
        let len = MAX_ELEMENTS + 2;
        let mut frame = format!("*{}\r\n", len).into_bytes();
        for _ in 0..len {
            frame.extend_from_slice(b":1\r\n");
        }
        assert!(matches!(Resp2Parser::parse(&frame), ParseResult::Error(_)));

        let mut decoder = Resp2Decoder::new();
        let mut buffer = BytesMut::new();
        let mut result = ParseResult::Incomplete;
        for chunk in frame.chunks(16 * 1024) {
            buffer.extend_from_slice(chunk);
            result = decoder.decode(&mut buffer);
        }
        match result {
            ParseResult::Ok {
                value: RespValue::Array(elements),
                consumed,
            } => {
                assert_eq!(elements.len(), len);
                assert_eq!(consumed, frame.len());
            }
            other => panic!("expected array, got {:?}", other),
        }
    }

    #[test]
    fn test_decoder_limits_apply() {
        let limits = ParserLimits {
            max_elements: 2,
            ..ParserLimits::default()
        };
        let mut decoder = Resp2Decoder::with_limits(limits);
        let mut buffer = BytesMut::from(&b"*3\r\n:1\r\n:2\r\n:3\r\n"[..]);
        assert!(matches!(decoder.decode(&mut buffer), ParseResult::Error(_)));

        let mut frame = Vec::new();
        for _ in 0..(MAX_NESTING_DEPTH + 2) {
            frame.extend_from_slice(b"*1\r\n");
        }
        frame.extend_from_slice(b":1\r\n");
        let mut decoder = Resp2Decoder::new();
        assert!(matches!(
            decoder.decode(&mut BytesMut::from(&frame[..])),
            ParseResult::Error(_)
        ));

        // State is dropped after an error.
        let mut buffer = BytesMut::from(&b":7\r\n"[..]);
        assert_eq!(
            decoder.decode(&mut buffer),
            ParseResult::Ok {
                value: RespValue::Integer(7),
                consumed: 4
            }
        );
    }

    #[test]
    fn test_encode_command() {
        let encoded = Resp2Encoder::encode_command(&[
            Bytes::from_static(b"HGET"),
            Bytes::from_static(b"Dictionary+users"),
            Bytes::from_static(b"\"k1\""),
        ]);
        assert_eq!(
            encoded,
            b"*3\r\n$4\r\nHGET\r\n$16\r\nDictionary+users\r\n$4\r\n\"k1\"\r\n"
        );
    }

    #[test]
    fn test_encoded_replies_parse_back() {
        let replies = vec![
            RespValue::ok(),
            RespValue::Integer(0),
            RespValue::bulk("hello"),
            RespValue::Null,
            RespValue::error("ERR", "unknown command"),
            RespValue::array(vec![RespValue::bulk("a"), RespValue::Integer(2)]),
        ];

        for original in replies {
            let encoded = Resp2Encoder::encode(&original);
            let (value, consumed) = parsed(&encoded);
            assert_eq!(value, original);
            assert_eq!(consumed, encoded.len());
        }
    }
}
