use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::info;

use crate::server::queue::{Closed, DispatchQueue};

/// An accepted connection waiting for a worker.
pub type Job = (TcpStream, SocketAddr);

/// Pause after a failed `accept` (e.g. out of file descriptors).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);
const WAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// Accepts connections on its own thread and feeds them to the dispatch
/// queue, blocking while the queue is full.
pub struct Acceptor {
    handle: Option<JoinHandle<()>>,
    stopping: Arc<AtomicBool>,
    local_addr: SocketAddr,
}

impl Acceptor {
    pub fn spawn(listener: TcpListener, queue: Arc<DispatchQueue<Job>>) -> io::Result<Self> {
        let local_addr = listener.local_addr()?;
        let stopping = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&stopping);
        let handle = thread::Builder::new()
            .name("wicket-acceptor".to_string())
            .spawn(move || run(listener, queue, flag))?;

        Ok(Self {
            handle: Some(handle),
            stopping,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting and waits for the accept thread to exit.
    ///
    /// The queue must already be closed if the acceptor may be blocked
    /// pushing onto it.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        self.stopping.store(true, Ordering::Release);

        // `accept` can't be interrupted; hand it a connection to return.
        if let Err(e) = TcpStream::connect_timeout(&wake_addr(self.local_addr), WAKE_TIMEOUT) {
            tracing::debug!(error = %e, "wake-up connect failed");
        }

        if handle.join().is_err() {
            tracing::error!("acceptor thread panicked");
        }
    }
}

impl Drop for Acceptor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(listener: TcpListener, queue: Arc<DispatchQueue<Job>>, stopping: Arc<AtomicBool>) {
    loop {
        match listener.accept() {
            Ok((stream, peer)) => {
                if stopping.load(Ordering::Acquire) {
                    break;
                }

                info!(%peer, "Accepted connection");
                if let Err(Closed((_, peer))) = queue.push((stream, peer)) {
                    tracing::debug!(%peer, "queue closed, dropping connection");
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                if stopping.load(Ordering::Acquire) {
                    break;
                }
                tracing::error!(error = %e, "accept failed");
                thread::sleep(ACCEPT_BACKOFF);
            }
        }
    }

    tracing::debug!("acceptor exiting");
}

/// A connectable form of a bound address.
fn wake_addr(addr: SocketAddr) -> SocketAddr {
    match addr {
        SocketAddr::V4(a) if a.ip().is_unspecified() => (Ipv4Addr::LOCALHOST, a.port()).into(),
        SocketAddr::V6(a) if a.ip().is_unspecified() => (Ipv6Addr::LOCALHOST, a.port()).into(),
        other => other,
    }
}
