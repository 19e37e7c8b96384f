//! minihttp - a small embeddable HTTP/1.1 server
//!
//! Core library: request parsing, response writing, keep-alive connection
//! handling and a bounded listener. Applications plug in through
//! [`http::RequestHandler`].

pub mod config;
pub mod http;
pub mod server;
pub mod static_files;

pub use config::ServerConfig;
pub use server::Server;
