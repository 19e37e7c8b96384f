//! HTTP/1.1 protocol implementation.
//!
//! This module implements a small HTTP/1.1 server core with support for
//! keep-alive connections. Only request heads are read; request bodies,
//! chunked encoding and pipelining are not supported.
//!
//! # Architecture
//!
//! - **`connection`**: The per-connection request/response state machine
//! - **`parser`**: Reads and parses request heads off the socket
//! - **`request`**: Parsed request representation
//! - **`response`**: Response under construction, status codes, error pages
//! - **`writer`**: Serializes and writes responses to the client
//! - **`mime`**: Media types by file extension
//! - **`handler`**: The application hook called once per request
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌──────────────────┐
//!        │ AwaitingRequest  │ ← Wait (bounded by the idle timeout) for a head
//!        └──────┬───────────┘
//!               │ parsed            │ malformed          │ nothing / timeout
//!               ▼                   ▼                    ▼
//!        ┌──────────────┐   ┌──────────────┐          Closed
//!        │ Dispatching  │   │  Rejecting   │ ← 400
//!        └──────┬───────┘   └──────┬───────┘
//!               │ handler (500 on failure)
//!               ▼                  │
//!        ┌──────────────────┐      │
//!        │    Writing       │ ◄────┘
//!        └──────┬───────────┘
//!               ├─ Connection: keep-alive and server running → AwaitingRequest
//!               └─ otherwise → Closed
//! ```
//!
//! # Example
//!
//! ```no_run
//! use minihttp::config::ServerConfig;
//! use minihttp::http::{Request, Response};
//! use minihttp::server::Server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = Server::bind(&ServerConfig::with_port(8080), |req: &Request, res: &mut Response| {
//!         res.set_content_type("text/plain")
//!             .set_body(format!("Hello from {}\n", req.path));
//!         Ok::<_, anyhow::Error>(())
//!     })
//!     .await?;
//!
//!     server.join().await
//! }
//! ```

pub mod connection;
pub mod handler;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;

pub use handler::RequestHandler;
pub use mime::MimeRegistry;
pub use parser::{ParseError, ParseOutcome};
pub use request::{Method, Request};
pub use response::{Body, Response, StatusCode};
