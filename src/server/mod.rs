//! Server lifecycle: bind, accept, dispatch, stop.
//!
//! ```text
//!  Acceptor ──push──▶ DispatchQueue ──pop──▶ Worker ─▶ Connection::run
//!  (1 thread)        (workers × backlog)     (N threads, one connection each)
//! ```

pub mod listener;
pub mod pool;
pub mod queue;

use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

use anyhow::{Context, bail};
use tracing::info;

use crate::config::ServerConfig;
use crate::http::connection::Connection;
use crate::http::service::FileService;
use listener::{Acceptor, Job};
use pool::{ShutdownReport, WorkerPool};
use queue::DispatchQueue;

/// An HTTP server that does nothing until [`start`](Server::start) is called.
pub struct Server {
    config: ServerConfig,
    service: Arc<dyn FileService>,
    running: Option<Running>,
}

struct Running {
    queue: Arc<DispatchQueue<Job>>,
    acceptor: Acceptor,
    pool: WorkerPool<Job>,
}

impl Server {
    pub fn new(config: ServerConfig, service: Arc<dyn FileService>) -> Self {
        Self {
            config,
            service,
            running: None,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Binds the listener and starts the workers and the acceptor.
    ///
    /// Returns the bound address, which differs from the configured one when
    /// port 0 was requested.
    pub fn start(&mut self) -> anyhow::Result<SocketAddr> {
        if self.running.is_some() {
            bail!("server already started");
        }

        let addr = self.config.listen_addr();
        let listener = TcpListener::bind(&addr).with_context(|| format!("binding {addr}"))?;

        let queue = Arc::new(DispatchQueue::with_backlog(
            self.config.workers,
            self.config.backlog_factor,
        ));

        let settings = self.config.connection_settings();
        let service = Arc::clone(&self.service);
        let pool = WorkerPool::spawn(self.config.workers, Arc::clone(&queue), move |(stream, peer): Job| {
            let mut conn = Connection::new(stream, peer, &settings, Arc::clone(&service))
                .with_context(|| format!("setting up connection from {peer}"))?;
            conn.run()
        })
        .context("spawning worker pool")?;

        // On failure the pool is dropped, which closes the queue and lets the
        // workers exit.
        let acceptor = Acceptor::spawn(listener, Arc::clone(&queue)).context("spawning acceptor")?;
        let local_addr = acceptor.local_addr();

        info!(
            addr = %local_addr,
            workers = pool.size(),
            backlog = queue.capacity(),
            "Listening"
        );

        self.running = Some(Running {
            queue,
            acceptor,
            pool,
        });

        Ok(local_addr)
    }

    /// The bound address while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.acceptor.local_addr())
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Stops accepting, then gives workers up to the configured shutdown
    /// timeout to finish their current connection.
    pub fn stop(&mut self) -> ShutdownReport {
        let Some(mut running) = self.running.take() else {
            return ShutdownReport::default();
        };

        running.queue.close();
        running.acceptor.stop();
        let report = running.pool.shutdown(self.config.shutdown_timeout());

        info!(
            joined = report.joined,
            abandoned = report.abandoned,
            dropped = report.dropped,
            "Server stopped"
        );

        report
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.stop();
    }
}
