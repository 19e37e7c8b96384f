use std::io;
use std::path::PathBuf;
use std::time::SystemTime;

use anyhow::Context;
use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::mime::{MimeRegistry, OCTET_STREAM};
use crate::http::response::{Body, Response, StatusCode};

const HTTP_VERSION: &str = "HTTP/1.1";

/// Charset announced for text media types.
pub const CHARSET: &str = "UTF-8";

/// Chunk size used when streaming file bodies.
const FILE_CHUNK_SIZE: usize = 8 * 1024;

/// Everything about a response that is fixed before the first byte is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub content_length: u64,
    /// Full `Content-Type` value including any charset; `None` without a body
    pub content_type: Option<String>,
}

impl ResponseHead {
    /// Resolves status, length and content type for `resp`.
    ///
    /// `content_length` is the size of the body as measured by the caller
    /// (bytes in memory, or the file's size on disk).
    pub fn resolve(resp: &Response, content_length: u64, mimes: &MimeRegistry) -> Self {
        let status = if content_length == 0 {
            StatusCode::NoContent
        } else {
            resp.status().unwrap_or(StatusCode::Ok)
        };

        let content_type = match resp.body() {
            Body::Empty => None,
            body => {
                let mime = match (resp.content_type(), body) {
                    (Some(explicit), _) => explicit,
                    (None, Body::File(path)) => mimes.mime_for_path(path),
                    (None, _) => OCTET_STREAM,
                };
                if mimes.is_text(mime) {
                    Some(format!("{}; charset={}", mime, CHARSET))
                } else {
                    Some(mime.to_string())
                }
            }
        };

        Self {
            status,
            content_length,
            content_type,
        }
    }
}

/// Serializes the status line and headers, including the terminating blank
/// line.
pub fn serialize_head(head: &ResponseHead, resp: &Response, date: SystemTime) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        head.status.as_u16(),
        head.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    push_header(&mut buf, "Date", &httpdate::fmt_http_date(date));
    push_header(&mut buf, "Content-Length", &head.content_length.to_string());
    if let Some(content_type) = &head.content_type {
        push_header(&mut buf, "Content-Type", content_type);
    }

    for (k, v) in resp.headers() {
        push_header(&mut buf, k, v);
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf
}

fn push_header(buf: &mut Vec<u8>, name: &str, value: &str) {
    buf.extend_from_slice(name.as_bytes());
    buf.extend_from_slice(b": ");
    buf.extend_from_slice(value.as_bytes());
    buf.extend_from_slice(b"\r\n");
}

enum PendingBody {
    None,
    Bytes(Bytes),
    File { path: PathBuf, len: u64 },
}

/// Writes one response to a stream.
///
/// [`prepare`](Self::prepare) measures the body and renders the head;
/// [`write_to_stream`](Self::write_to_stream) sends head and body. Once the
/// head has gone out a failure can only abort the connection.
pub struct ResponseWriter {
    head: ResponseHead,
    buffer: Vec<u8>,
    body: PendingBody,
}

impl ResponseWriter {
    /// Measures the body and renders the head of `response`.
    ///
    /// Fails if a file body cannot be inspected; nothing has been sent yet
    /// at that point.
    pub async fn prepare(response: &Response, mimes: &MimeRegistry) -> io::Result<Self> {
        let (content_length, body) = match response.body() {
            Body::Empty => (0, PendingBody::None),
            Body::Bytes(bytes) => (bytes.len() as u64, PendingBody::Bytes(bytes.clone())),
            Body::File(path) => {
                let len = tokio::fs::metadata(path).await?.len();
                (len, PendingBody::File { path: path.clone(), len })
            }
        };

        Ok(Self::assemble(response, content_length, body, mimes))
    }

    /// Like [`prepare`](Self::prepare) for responses held in memory. A file
    /// body is not inspected and is sent as empty.
    pub fn from_memory(response: &Response, mimes: &MimeRegistry) -> Self {
        match response.body() {
            Body::Bytes(bytes) => Self::assemble(
                response,
                bytes.len() as u64,
                PendingBody::Bytes(bytes.clone()),
                mimes,
            ),
            _ => Self::assemble(response, 0, PendingBody::None, mimes),
        }
    }

    fn assemble(
        response: &Response,
        content_length: u64,
        body: PendingBody,
        mimes: &MimeRegistry,
    ) -> Self {
        let head = ResponseHead::resolve(response, content_length, mimes);
        let buffer = serialize_head(&head, response, SystemTime::now());

        Self { head, buffer, body }
    }

    pub fn head(&self) -> &ResponseHead {
        &self.head
    }

    pub fn status(&self) -> StatusCode {
        self.head.status
    }

    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        stream
            .write_all(&self.buffer)
            .await
            .context("failed to write response head")?;

        match &self.body {
            PendingBody::None => {}
            PendingBody::Bytes(bytes) => {
                stream
                    .write_all(bytes)
                    .await
                    .context("failed to write response body")?;
            }
            PendingBody::File { path, len } => {
                let file = File::open(path)
                    .await
                    .with_context(|| format!("failed to open {}", path.display()))?;
                stream_file(file, *len, stream)
                    .await
                    .with_context(|| format!("failed to stream {}", path.display()))?;
            }
        }

        stream.flush().await?;
        Ok(())
    }
}

/// Copies exactly `len` bytes from `file` to `stream` in fixed-size chunks.
async fn stream_file<R, W>(file: R, len: u64, stream: &mut W) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut file = file.take(len);
    let mut chunk = vec![0u8; FILE_CHUNK_SIZE];
    let mut written = 0u64;

    loop {
        let n = file.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        stream.write_all(&chunk[..n]).await?;
        written += n as u64;
    }

    if written < len {
        anyhow::bail!("file shrank while streaming: sent {} of {} bytes", written, len);
    }

    Ok(())
}
