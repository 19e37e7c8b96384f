use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Notify, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{Instrument, debug, error, info, warn};

use crate::config::ServerConfig;
use crate::http::connection::{Connection, ConnectionContext};
use crate::http::handler::RequestHandler;
use crate::http::mime::MimeRegistry;

/// A running HTTP server.
///
/// Binding spawns the accept loop on the current tokio runtime. Each accepted
/// connection runs as its own task once a worker slot is free. Dropping the
/// server stops it.
pub struct Server {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    accept_task: Option<JoinHandle<()>>,
}

impl Server {
    /// Binds `cfg.listen_addr()` and starts serving with `handler`.
    pub async fn bind<H>(cfg: &ServerConfig, handler: H) -> anyhow::Result<Self>
    where
        H: RequestHandler,
    {
        Self::bind_with(cfg, Arc::new(handler), Arc::new(MimeRegistry::new())).await
    }

    /// Like [`bind`](Self::bind) with a shared handler and media type table.
    pub async fn bind_with(
        cfg: &ServerConfig,
        handler: Arc<dyn RequestHandler>,
        mimes: Arc<MimeRegistry>,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(cfg.listen_addr())
            .await
            .with_context(|| format!("failed to bind {}", cfg.listen_addr()))?;
        let local_addr = listener.local_addr()?;

        let running = Arc::new(AtomicBool::new(true));
        let shutdown = Arc::new(Notify::new());

        let ctx = ConnectionContext {
            handler,
            mimes,
            keep_alive_timeout: cfg.keep_alive_timeout(),
            running: running.clone(),
        };

        let pool_size = cfg.worker_pool_size();
        let pool = pool_size.map(|size| Arc::new(Semaphore::new(size)));

        info!(
            addr = %local_addr,
            workers = ?pool_size,
            "Listening on port {}",
            local_addr.port()
        );

        let accept_task = tokio::spawn(accept_loop(listener, ctx, pool, shutdown.clone()));

        Ok(Self {
            local_addr,
            running,
            shutdown,
            accept_task: Some(accept_task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The bound port; the OS-assigned one when the config asked for port 0.
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Closes the server to new connections and aborts in-flight ones.
    ///
    /// Returns immediately. Connections blocked in a read are torn down at
    /// their next suspension point.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            info!(addr = %self.local_addr, "Stopping server");
        }
        self.shutdown.notify_one();
    }

    /// Waits until the accept loop has exited, i.e. after [`stop`](Self::stop)
    /// the listening socket is closed once this returns.
    pub async fn join(mut self) -> anyhow::Result<()> {
        if let Some(task) = self.accept_task.take() {
            task.await.context("accept loop panicked")?;
        }
        Ok(())
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn accept_loop(
    listener: TcpListener,
    ctx: ConnectionContext,
    pool: Option<Arc<Semaphore>>,
    shutdown: Arc<Notify>,
) {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.notified() => break,

            accepted = listener.accept() => match accepted {
                Ok((socket, peer)) => {
                    info!("Accepted connection from {}", peer);
                    let span = tracing::info_span!("connection", %peer);
                    connections.spawn(
                        serve_connection(socket, peer, ctx.clone(), pool.clone()).instrument(span),
                    );
                }
                Err(e) => {
                    if !ctx.running.load(Ordering::Acquire) {
                        break;
                    }
                    warn!(error = %e, "Failed to accept connection");
                    // Back off so a persistent error (e.g. out of fds) does not spin.
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            },

            Some(joined) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        error!(error = %e, "Connection task panicked");
                    }
                }
            }
        }
    }

    drop(listener);
    debug!(in_flight = connections.len(), "Accept loop closed, aborting connections");
    connections.abort_all();
}

async fn serve_connection(
    socket: TcpStream,
    peer: SocketAddr,
    ctx: ConnectionContext,
    pool: Option<Arc<Semaphore>>,
) {
    // Hold a worker slot for the whole connection.
    let _permit = match pool {
        Some(pool) => match pool.acquire_owned().await {
            Ok(permit) => Some(permit),
            Err(_) => return,
        },
        None => None,
    };

    if let Err(e) = socket.set_nodelay(true) {
        debug!(error = %e, "Failed to set TCP_NODELAY");
    }

    let mut conn = Connection::new(socket, ctx);
    if let Err(e) = conn.run().await {
        error!("Connection error from {}: {:#}", peer, e);
    }
    debug!("Connection closed");
}
