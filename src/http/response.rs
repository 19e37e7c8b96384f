use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;

/// HTTP status codes supported by the server.
///
/// - `Ok` (200): Request successful
/// - `NoContent` (204): Successful request with no content
/// - `BadRequest` (400): Malformed request
/// - `Forbidden` (403): Access refused
/// - `NotFound` (404): Resource not found
/// - `RequestTimeout` (408): Client took too long
/// - `InternalServerError` (500): Server error
/// - `NotImplemented` (501): No handler for the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 204 No Content
    NoContent,
    /// 400 Bad Request
    BadRequest,
    /// 403 Forbidden
    Forbidden,
    /// 404 Not Found
    NotFound,
    /// 408 Request Timeout
    RequestTimeout,
    /// 500 Internal Server Error
    InternalServerError,
    /// 501 Not Implemented
    NotImplemented,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use minihttp::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::NoContent => 204,
            StatusCode::BadRequest => 400,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::RequestTimeout => 408,
            StatusCode::InternalServerError => 500,
            StatusCode::NotImplemented => 501,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use minihttp::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::NoContent => "No Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::RequestTimeout => "Request Timeout",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}

/// Response payload. At most one source is set at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Body {
    #[default]
    Empty,
    /// In-memory bytes, written as-is
    Bytes(Bytes),
    /// A file streamed from disk when the response is written
    File(PathBuf),
}

/// An HTTP response under construction.
///
/// A fresh value is created for every request cycle, filled in by the
/// request handler, and consumed once by the
/// [`ResponseWriter`](crate::http::writer::ResponseWriter). Status, length and
/// content type defaults are resolved at write time.
#[derive(Debug, Clone, Default)]
pub struct Response {
    status: Option<StatusCode>,
    content_type: Option<String>,
    body: Body,
    headers: HashMap<String, String>,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = Some(status);
        self
    }

    /// Overrides the `Content-Type` header. Without an override the type is
    /// guessed from a file body's extension, or falls back to
    /// `application/octet-stream`.
    pub fn set_content_type(&mut self, content_type: impl Into<String>) -> &mut Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Sets an in-memory body, replacing any file body.
    pub fn set_body(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.body = Body::Bytes(body.into());
        self
    }

    /// Sets the body to a file on disk, replacing any in-memory body. The file
    /// is only opened once the response is written.
    pub fn set_body_file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.body = Body::File(path.into());
        self
    }

    /// Replaces the body with a generic HTML error page and sets the status.
    ///
    /// `message` is shown under the status line on the page; pass `None` to
    /// leave it out.
    pub fn set_error_status(&mut self, status: StatusCode, message: Option<&str>) -> &mut Self {
        self.body = Body::Bytes(error_page(&status.to_string(), message).into());
        self.content_type = Some("text/html".to_string());
        self.status = Some(status);
        self
    }

    /// Sets a header, overwriting any previous value under the same name.
    /// Names are case-sensitive.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Headers hold a single value, so this behaves like [`set_header`](Self::set_header).
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.set_header(name, value)
    }

    pub fn remove_header(&mut self, name: &str) -> &mut Self {
        self.headers.remove(name);
        self
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn body_file(&self) -> Option<&Path> {
        match &self.body {
            Body::File(path) => Some(path),
            _ => None,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|v| v.as_str())
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// A 500 response with a generic error page.
    pub fn internal_error() -> Self {
        let mut response = Self::new();
        response.set_error_status(StatusCode::InternalServerError, None);
        response
    }

    /// A 400 response with a generic error page.
    pub fn bad_request() -> Self {
        let mut response = Self::new();
        response.set_error_status(StatusCode::BadRequest, None);
        response
    }
}

/// Renders the standard error page.
///
/// `title` becomes the page title and heading; `subtitle` is HTML-escaped.
pub fn error_page(title: &str, subtitle: Option<&str>) -> String {
    let title = escape_html(title);
    let subtitle = subtitle.map(escape_html).unwrap_or_default();
    let date = httpdate::fmt_http_date(std::time::SystemTime::now());

    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body>\n\
         <h1>{title}</h1>\n\
         <p>{subtitle}</p>\n\
         <hr>\n\
         <small>{date}</small>\n\
         </body>\n\
         </html>\n"
    )
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
