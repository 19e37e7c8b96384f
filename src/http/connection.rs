use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, BufReader, ReadHalf, WriteHalf};
use tracing::{debug, error, info};

use crate::http::handler::RequestHandler;
use crate::http::mime::MimeRegistry;
use crate::http::parser::{MalformedRequest, ParseOutcome, read_request};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;

/// Everything a connection shares with the server that accepted it.
#[derive(Clone)]
pub struct ConnectionContext {
    pub handler: Arc<dyn RequestHandler>,
    pub mimes: Arc<MimeRegistry>,
    /// Idle-read timeout, restarted before every request
    pub keep_alive_timeout: Duration,
    /// Cleared when the server stops; checked before looping
    pub running: Arc<AtomicBool>,
}

impl ConnectionContext {
    pub fn new(handler: Arc<dyn RequestHandler>, keep_alive_timeout: Duration) -> Self {
        Self {
            handler,
            mimes: Arc::new(MimeRegistry::new()),
            keep_alive_timeout,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

pub struct Connection<S> {
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    ctx: ConnectionContext,
    state: ConnectionState,
}

pub enum ConnectionState {
    AwaitingRequest,
    Dispatching(Request),
    Rejecting(MalformedRequest),
    Writing(ResponseWriter, bool), // bool = keep_alive?
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite,
{
    pub fn new(stream: S, ctx: ConnectionContext) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            ctx,
            state: ConnectionState::AwaitingRequest,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Serves requests until the client stops asking for keep-alive, goes
    /// idle, or the server stops. Errors are transport failures; the
    /// connection is unusable afterwards.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closed);

            self.state = match state {
                ConnectionState::AwaitingRequest => self.await_request().await?,

                ConnectionState::Dispatching(req) => self.dispatch(req).await,

                ConnectionState::Rejecting(bad) => {
                    debug!(error = %bad.error, "Rejecting malformed request");
                    let keep_alive = bad.keep_alive();
                    let writer = self.prepare(Response::bad_request()).await;
                    ConnectionState::Writing(writer, keep_alive)
                }

                ConnectionState::Writing(mut writer, keep_alive) => {
                    writer.write_to_stream(&mut self.writer).await?;

                    if keep_alive && self.ctx.is_running() {
                        ConnectionState::AwaitingRequest // go back for next request
                    } else {
                        ConnectionState::Closed
                    }
                }

                ConnectionState::Closed => {
                    break;
                }
            };
        }

        Ok(())
    }

    async fn await_request(&mut self) -> anyhow::Result<ConnectionState> {
        match read_request(&mut self.reader, self.ctx.keep_alive_timeout).await {
            Ok(ParseOutcome::Parsed(req)) => Ok(ConnectionState::Dispatching(req)),
            Ok(ParseOutcome::Malformed(bad)) => Ok(ConnectionState::Rejecting(bad)),
            Ok(ParseOutcome::NoRequest) => {
                debug!("No request before idle timeout or EOF, closing");
                Ok(ConnectionState::Closed)
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                debug!("Timed out mid-request, closing");
                Ok(ConnectionState::Closed)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Runs the handler on the blocking pool; it may do file or other
    /// blocking IO. A returned error or a panic becomes a generic 500.
    async fn dispatch(&self, req: Request) -> ConnectionState {
        let mut response = Response::new();
        response
            .set_header("Connection", "keep-alive")
            .set_header(
                "Keep-Alive",
                format!("timeout={}", self.ctx.keep_alive_timeout.as_secs()),
            );

        let req = Arc::new(req);
        let handler = self.ctx.handler.clone();
        let shared = req.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let result = handler.handle(&shared, &mut response);
            (result, response)
        })
        .await;

        let response = match outcome {
            Ok((Ok(()), response)) => response,
            Ok((Err(e), _)) => {
                error!(request = %req.request_line(), error = ?e, "Exception handling request");
                Response::internal_error()
            }
            Err(e) => {
                error!(request = %req.request_line(), error = %e, "Request handler panicked");
                Response::internal_error()
            }
        };

        let writer = self.prepare(response).await;
        info!(
            method = %req.method,
            path = %req.path,
            status = writer.status().as_u16(),
            "Request handled"
        );

        ConnectionState::Writing(writer, req.keep_alive())
    }

    /// Renders `response`, falling back to a 500 if its file body cannot be
    /// inspected.
    async fn prepare(&self, response: Response) -> ResponseWriter {
        match ResponseWriter::prepare(&response, &self.ctx.mimes).await {
            Ok(writer) => writer,
            Err(e) => {
                error!(
                    file = ?response.body_file(),
                    error = %e,
                    "Failed to prepare response body"
                );
                // In-memory bodies cannot fail to prepare.
                ResponseWriter::from_memory(&Response::internal_error(), &self.ctx.mimes)
            }
        }
    }
}
