use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, debug_span, info, warn};

use crate::clock::ClockCache;
use crate::config::{Config, ConnectionConfig};
use crate::error::ConnectionError;
use crate::http::connection::Connection;

/// Pause before accepting again after a listener-level failure.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accepts TCP connections and runs one [`Connection`] task per socket.
pub struct Listener {
    inner: TcpListener,
    connection: ConnectionConfig,
}

impl Listener {
    pub async fn bind(cfg: &Config) -> anyhow::Result<Self> {
        let inner = TcpListener::bind(cfg.listen_addr()).await?;
        Ok(Self {
            inner,
            connection: cfg.connection.clone(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Accepts until `shutdown` turns true, then waits for open
    /// connections to finish their current read or write.
    pub async fn serve(
        self,
        clock: Arc<ClockCache>,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        info!("Listening on {}", self.local_addr()?);

        let mut connections = JoinSet::new();

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                accepted = self.inner.accept() => {
                    let (socket, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!(error = %e, "Accept failed");
                            if let Some(delay) = accept_retry_delay(&e) {
                                tokio::time::sleep(delay).await;
                            }
                            continue;
                        }
                    };
                    if let Err(e) = socket.set_nodelay(true) {
                        debug!(%peer, error = %e, "Could not set TCP_NODELAY");
                    }
                    debug!(%peer, "Accepted connection");

                    let mut conn = Connection::new(
                        socket,
                        Arc::clone(&clock),
                        shutdown.clone(),
                        &self.connection,
                    );
                    connections.spawn(
                        async move {
                            match conn.run().await {
                                Ok(()) => {}
                                Err(ConnectionError::Parse(e)) => {
                                    debug!(error = %e, "Closed connection after bad request");
                                }
                                Err(e) => warn!(error = %e, "Connection error"),
                            }
                        }
                        .instrument(debug_span!("conn", %peer)),
                    );
                }

                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }

                // Reap finished tasks so the set does not grow without bound.
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        info!(open = connections.len(), "Stopped accepting; draining connections");
        while let Some(res) = connections.join_next().await {
            if let Err(e) = res {
                warn!(error = %e, "Connection task panicked");
            }
        }
        info!("All connections closed");

        Ok(())
    }
}

/// How long to wait before the next accept after `e`.
///
/// A peer that gave up during the handshake only affects that one socket.
/// Anything else (fd exhaustion, out of memory) persists, and retrying at
/// once would spin.
fn accept_retry_delay(e: &io::Error) -> Option<Duration> {
    match e.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::Interrupted => None,
        _ => Some(ACCEPT_BACKOFF),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_connection_accept_errors_retry_at_once() {
        for kind in [
            io::ErrorKind::ConnectionAborted,
            io::ErrorKind::ConnectionReset,
            io::ErrorKind::Interrupted,
        ] {
            assert_eq!(accept_retry_delay(&io::Error::from(kind)), None);
        }
    }

    #[test]
    fn resource_exhaustion_backs_off() {
        let emfile = io::Error::new(io::ErrorKind::Other, "Too many open files");
        assert_eq!(accept_retry_delay(&emfile), Some(ACCEPT_BACKOFF));
        assert_eq!(
            accept_retry_delay(&io::Error::from(io::ErrorKind::OutOfMemory)),
            Some(ACCEPT_BACKOFF)
        );
    }
}
