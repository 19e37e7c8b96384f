//! The application hook invoked once per request.

use crate::http::request::Request;
use crate::http::response::{Response, StatusCode};

/// Produces a response for a parsed request by mutating `response` in place.
///
/// The connection calls `handle` once per request on tokio's blocking pool,
/// so blocking IO is allowed. Returning an
/// error (or panicking) turns the response into a generic 500; the error is
/// logged but never sent to the client.
pub trait RequestHandler: Send + Sync + 'static {
    fn handle(&self, request: &Request, response: &mut Response) -> anyhow::Result<()>;
}

impl<F> RequestHandler for F
where
    F: Fn(&Request, &mut Response) -> anyhow::Result<()> + Send + Sync + 'static,
{
    fn handle(&self, request: &Request, response: &mut Response) -> anyhow::Result<()> {
        self(request, response)
    }
}

/// Answers every request with 501 Not Implemented.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotImplemented;

impl RequestHandler for NotImplemented {
    fn handle(&self, _request: &Request, response: &mut Response) -> anyhow::Result<()> {
        response
            .set_status(StatusCode::NotImplemented)
            .set_content_type("text/html")
            .set_body("<p>Not Implemented</p>");
        Ok(())
    }
}
