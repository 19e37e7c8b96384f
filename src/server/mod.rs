//! TCP listener and worker pool.

pub mod listener;

pub use listener::Server;
