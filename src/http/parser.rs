use std::collections::HashMap;
use std::fmt;
use std::io;
use std::time::Duration;

use percent_encoding::percent_decode_str;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use tokio::time::{Instant, timeout_at};

use crate::http::request::{Method, Request, wants_keep_alive};

/// Upper bound on the bytes read for a single request head.
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Why a request head was rejected. Each variant carries the offending line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    InvalidRequestLine(String),
    InvalidMethod(String),
    InvalidTarget(String),
    InvalidHeader(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidRequestLine(line) => write!(f, "invalid request line '{}'", line),
            ParseError::InvalidMethod(line) => write!(f, "invalid HTTP method '{}'", line),
            ParseError::InvalidTarget(line) => write!(f, "invalid request target '{}'", line),
            ParseError::InvalidHeader(line) => write!(f, "invalid header '{}'", line),
        }
    }
}

impl std::error::Error for ParseError {}

/// A request head that could not be turned into a [`Request`].
///
/// The headers that did parse are kept so the connection can still honour a
/// `Connection: keep-alive` sent alongside a bad request line.
#[derive(Debug, Clone)]
pub struct MalformedRequest {
    pub error: ParseError,
    pub headers: HashMap<String, String>,
    pub lines: Vec<String>,
}

impl MalformedRequest {
    pub fn keep_alive(&self) -> bool {
        wants_keep_alive(&self.headers)
    }

    pub fn request_line(&self) -> &str {
        self.lines.first().map(|l| l.as_str()).unwrap_or("")
    }
}

/// Result of reading one request head off a connection.
#[derive(Debug)]
pub enum ParseOutcome {
    Parsed(Request),
    Malformed(MalformedRequest),
    /// Nothing arrived before end-of-stream or the idle timeout.
    NoRequest,
}

/// Reads one request head from `reader` and parses it.
///
/// Lines are read until a blank line or end-of-stream. If `idle_timeout`
/// elapses before the first line arrives the outcome is
/// [`ParseOutcome::NoRequest`]; if it elapses part way through a head an
/// [`io::ErrorKind::TimedOut`] error is returned.
pub async fn read_request<R>(reader: &mut R, idle_timeout: Duration) -> io::Result<ParseOutcome>
where
    R: AsyncBufRead + Unpin,
{
    let deadline = Instant::now() + idle_timeout;
    let mut lines = Vec::new();
    let mut budget = MAX_HEAD_SIZE;

    loop {
        let mut raw = Vec::new();
        let mut limited = (&mut *reader).take(budget as u64);

        let read = timeout_at(deadline, limited.read_until(b'\n', &mut raw)).await;

        let n = match read {
            Ok(res) => res?,
            Err(_) if lines.is_empty() && raw.is_empty() => return Ok(ParseOutcome::NoRequest),
            Err(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "idle timeout while reading request head",
                ));
            }
        };

        if n == 0 {
            break;
        }

        budget -= n;
        if budget == 0 && raw.last() != Some(&b'\n') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "request head too large",
            ));
        }

        let line = decode_line(&raw);
        if line.trim().is_empty() {
            break;
        }
        lines.push(line);
    }

    Ok(parse_request_head(lines))
}

/// Parses a complete in-memory head, stopping at the first blank line.
///
/// Convenience wrapper over [`parse_request_head`] for buffers that already
/// hold the whole head.
pub fn parse_http_request(buf: &[u8]) -> ParseOutcome {
    let lines = buf
        .split(|b| *b == b'\n')
        .map(decode_line)
        .take_while(|line| !line.trim().is_empty())
        .collect();

    parse_request_head(lines)
}

/// Parses the lines of a request head (without the terminating blank line).
///
/// Every line is examined even after an error so that the headers of a
/// malformed request are still available. The first error wins.
pub fn parse_request_head(lines: Vec<String>) -> ParseOutcome {
    let Some(first) = lines.first() else {
        return ParseOutcome::NoRequest;
    };

    let start = parse_request_line(first);

    let mut headers = HashMap::new();
    let mut header_error = None;
    for line in &lines[1..] {
        match parse_header_line(line) {
            Ok((name, value)) => {
                headers.insert(name, value);
            }
            Err(e) => {
                header_error.get_or_insert(e);
            }
        }
    }

    match (start, header_error) {
        (Ok(start), None) => ParseOutcome::Parsed(Request {
            method: start.method,
            path: start.path,
            params: start.params,
            version: start.version,
            headers,
            lines,
        }),
        (Err(error), _) | (Ok(_), Some(error)) => ParseOutcome::Malformed(MalformedRequest {
            error,
            headers,
            lines,
        }),
    }
}

struct RequestLine {
    method: Method,
    path: String,
    params: HashMap<String, String>,
    version: String,
}

/// `METHOD SP target SP version`; the target may itself contain spaces.
fn parse_request_line(line: &str) -> Result<RequestLine, ParseError> {
    let invalid = || ParseError::InvalidRequestLine(line.to_string());

    let (method_str, rest) = line.split_once(' ').ok_or_else(invalid)?;
    let (target, version) = rest.rsplit_once(' ').ok_or_else(invalid)?;

    if method_str.is_empty() || target.is_empty() || version.is_empty() {
        return Err(invalid());
    }

    let method = Method::from_str(method_str)
        .ok_or_else(|| ParseError::InvalidMethod(line.to_string()))?;

    let (raw_path, query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    };

    let path = decode_component(raw_path)
        .ok_or_else(|| ParseError::InvalidTarget(line.to_string()))?;

    Ok(RequestLine {
        method,
        path,
        params: query.map(parse_query).unwrap_or_default(),
        version: version.to_string(),
    })
}

/// Splits a query string into decoded parameters.
///
/// Pairs without `=` and pairs that do not decode are dropped; later keys
/// overwrite earlier ones.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    for pair in query.split('&') {
        let Some((field, value)) = pair.split_once('=') else {
            continue;
        };
        if let (Some(field), Some(value)) = (decode_component(field), decode_component(value)) {
            params.insert(field, value);
        }
    }

    params
}

fn parse_header_line(line: &str) -> Result<(String, String), ParseError> {
    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| ParseError::InvalidHeader(line.to_string()))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(ParseError::InvalidHeader(line.to_string()));
    }

    Ok((name.to_ascii_lowercase(), value.trim().to_string()))
}

/// Form-style decoding: `+` is a space, every `%` must start a two-digit hex
/// escape, and the decoded bytes must be UTF-8.
pub fn decode_component(s: &str) -> Option<String> {
    if !escapes_well_formed(s.as_bytes()) {
        return None;
    }
    let plus_decoded = s.replace('+', " ");
    percent_decode_str(&plus_decoded)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

fn escapes_well_formed(bytes: &[u8]) -> bool {
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            match bytes.get(i + 1..i + 3) {
                Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => i += 3,
                _ => return false,
            }
        } else {
            i += 1;
        }
    }
    true
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
