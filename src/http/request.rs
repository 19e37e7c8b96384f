use std::collections::HashMap;
use std::fmt;

/// HTTP request methods.
///
/// Every method token accepted on the request line. Any other token makes the
/// request malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// CONNECT - Establish a tunnel
    CONNECT,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// TRACE - Message loop-back test
    TRACE,
    /// PATCH - Partial modification of a resource
    PATCH,
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// # Arguments
    ///
    /// * `s` - String representation of the method (case-sensitive, uppercase)
    ///
    /// # Returns
    ///
    /// `Some(Method)` if the string matches a known method, `None` otherwise.
    ///
    /// # Example
    ///
    /// ```
    /// # use minihttp::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("get"), None);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "HEAD" => Some(Method::HEAD),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "CONNECT" => Some(Method::CONNECT),
            "OPTIONS" => Some(Method::OPTIONS),
            "TRACE" => Some(Method::TRACE),
            "PATCH" => Some(Method::PATCH),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::CONNECT => "CONNECT",
            Method::OPTIONS => "OPTIONS",
            Method::TRACE => "TRACE",
            Method::PATCH => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a parsed HTTP request from a client.
///
/// Only the request line and headers are read off the wire; entity bodies are
/// never consumed. Once parsed the request is not modified.
#[derive(Debug, Clone)]
pub struct Request {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The percent-decoded request path, without the query string
    pub path: String,
    /// Decoded query parameters; the last duplicate key wins
    pub params: HashMap<String, String>,
    /// HTTP version as sent by the client (typically "HTTP/1.1")
    pub version: String,
    /// Request headers keyed by lowercase name, one value per name
    pub headers: HashMap<String, String>,
    /// Raw head lines as received, for diagnostics
    pub lines: Vec<String>,
}

/// Builder for constructing Request objects.
pub struct RequestBuilder {
    method: Option<Method>,
    path: Option<String>,
    version: Option<String>,
    params: HashMap<String, String>,
    headers: HashMap<String, String>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            path: None,
            version: None,
            params: HashMap::new(),
            headers: HashMap::new(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Header names are lowercased, as the parser does.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        let method = self.method.ok_or("method missing")?;
        let path = self.path.ok_or("path missing")?;
        let version = self.version.unwrap_or_else(|| "HTTP/1.1".to_string());

        let mut lines = vec![format!("{} {} {}", method, path, version)];
        lines.extend(self.headers.iter().map(|(k, v)| format!("{}: {}", k, v)));

        Ok(Request {
            method,
            path,
            params: self.params,
            version,
            headers: self.headers,
            lines,
        })
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Request {
    /// Retrieves a header value by name, case-insensitively.
    ///
    /// # Arguments
    ///
    /// * `key` - Header name to look up
    ///
    /// # Returns
    ///
    /// `Some(&str)` with the header value if present, `None` otherwise.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .get(&key.to_ascii_lowercase())
            .map(|v| v.as_str())
    }

    pub fn has_header(&self, key: &str) -> bool {
        self.header(key).is_some()
    }

    /// Retrieves a decoded query parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(|v| v.as_str())
    }

    pub fn has_param(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// The first line of the request as received.
    pub fn request_line(&self) -> &str {
        self.lines.first().map(|l| l.as_str()).unwrap_or("")
    }

    /// Determines whether the connection should remain open after the response.
    ///
    /// Only an explicit `Connection: keep-alive` (any case) keeps it open; a
    /// missing header means close.
    pub fn keep_alive(&self) -> bool {
        wants_keep_alive(&self.headers)
    }
}

pub(crate) fn wants_keep_alive(headers: &HashMap<String, String>) -> bool {
    headers
        .get("connection")
        .map(|v| v.eq_ignore_ascii_case("keep-alive"))
        .unwrap_or(false)
}
