use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::common::{debug, error, info, warn, Result};
use crate::core::ServiceHandle;
use crate::protocol::codec::RequestResponseCodec;
use crate::protocol::connection::Connection;
use crate::server::shutdown::Shutdown;

/// `server` section of the configuration file.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    // Connections served at once, further clients wait in the backlog.
    max_tcp_connections: Option<u32>,
    // Read buffer of each connection.
    connection_tcp_buffer_bytes: Option<usize>,
    listen_host: Option<String>,
    listen_port: Option<String>,
}

impl Config {
    const DEFAULT_MAX_TCP_CONNECTIONS: u32 = 1024 * 10;
    const DEFAULT_CONNECTION_TCP_BUFFER_BYTES: usize = 1024 * 4;
    const DEFAULT_LISTEN_HOST: &'static str = "127.0.0.1";
    const DEFAULT_LISTEN_PORT: &'static str = crate::server::DEFAULT_PORT;

    pub fn set_max_tcp_connections(&mut self, val: Option<u32>) {
        if let Some(val) = val {
            self.max_tcp_connections = Some(val.max(1));
        }
    }
    pub fn set_connection_tcp_buffer_bytes(&mut self, val: Option<usize>) {
        if let Some(val) = val {
            self.connection_tcp_buffer_bytes = Some(val.max(1));
        }
    }
    pub fn set_listen_host(&mut self, val: &mut Option<String>) {
        if let Some(val) = val.take() {
            self.listen_host = Some(val)
        }
    }
    pub fn set_listen_port(&mut self, val: &mut Option<String>) {
        if let Some(val) = val.take() {
            self.listen_port = Some(val)
        }
    }
    pub(crate) fn override_merge(&mut self, other: &mut Config) {
        self.set_max_tcp_connections(other.max_tcp_connections);
        self.set_connection_tcp_buffer_bytes(other.connection_tcp_buffer_bytes);
        self.set_listen_host(&mut other.listen_host);
        self.set_listen_port(&mut other.listen_port);
    }

    fn max_tcp_connections(&self) -> usize {
        self.max_tcp_connections
            .unwrap_or(Config::DEFAULT_MAX_TCP_CONNECTIONS) as usize
    }

    fn connection_tcp_buffer_bytes(&self) -> usize {
        self.connection_tcp_buffer_bytes
            .unwrap_or(Config::DEFAULT_CONNECTION_TCP_BUFFER_BYTES)
    }

    pub(crate) fn listen_addr(&self) -> String {
        format!(
            "{}:{}",
            self.listen_host
                .as_deref()
                .unwrap_or(Config::DEFAULT_LISTEN_HOST),
            self.listen_port
                .as_deref()
                .unwrap_or(Config::DEFAULT_LISTEN_PORT),
        )
    }
}

// Delay before accepting again after the listener failed, doubled on each consecutive failure.
#[derive(Debug)]
struct AcceptBackoff {
    failures: u32,
}

impl AcceptBackoff {
    const MIN: Duration = Duration::from_millis(10);
    const MAX: Duration = Duration::from_secs(1);

    fn new() -> Self {
        Self { failures: 0 }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = Self::MIN
            .checked_mul(1 << self.failures.min(16))
            .map_or(Self::MAX, |delay| delay.min(Self::MAX));
        self.failures = self.failures.saturating_add(1);
        delay
    }

    fn reset(&mut self) {
        self.failures = 0;
    }
}

/// Serves `{metadata, data}` envelopes over framed tcp connections.
pub(crate) struct Server {
    config: Config,
}

impl Server {
    pub(crate) fn new(config: Config) -> Self {
        Self { config }
    }

    /// Accepts connections until `shutdown` fires. Open connections hold a
    /// clone of `shutdown` and finish their current request before closing.
    pub(crate) async fn run(
        self,
        service: ServiceHandle,
        listener: TcpListener,
        mut shutdown: Shutdown,
    ) -> Result<()> {
        info!(addr = ?listener.local_addr().ok(), "Tcp server running. {:?}", self.config);

        tokio::select! {
            _ = self.serve(listener, service, shutdown.clone()) => {}
            _ = shutdown.recv() => {
                info!("Tcp server stops accepting");
            }
        }

        Ok(())
    }

    async fn serve(&self, listener: TcpListener, service: ServiceHandle, shutdown: Shutdown) {
        let connections = Arc::new(Semaphore::new(self.config.max_tcp_connections()));
        let buffer_bytes = self.config.connection_tcp_buffer_bytes();
        let mut backoff = AcceptBackoff::new();

        loop {
            // The permit goes back when the handler finishes or accept fails.
            let permit = match connections.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    backoff.reset();
                    debug!(
                        addr = %peer_addr,
                        available = connections.available_permits(),
                        "Connection accepted"
                    );

                    let handler = Handler {
                        peer_addr,
                        service: service.clone(),
                        shutdown: shutdown.clone(),
                        _permit: permit,
                    };
                    tokio::spawn(handler.run(Connection::new(socket, Some(buffer_bytes))));
                }
                Err(err) => {
                    drop(permit);
                    let delay = backoff.next_delay();
                    warn!(cause = %err, retry_in = ?delay, "Failed to accept");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

struct Handler {
    peer_addr: SocketAddr,
    service: ServiceHandle,
    shutdown: Shutdown,
    _permit: OwnedSemaphorePermit,
}

impl Handler {
    async fn run<T>(mut self, conn: Connection<T>)
    where
        T: AsyncWrite + AsyncRead + Unpin,
    {
        if let Err(err) = self.handle(conn).await {
            error!(addr = %self.peer_addr, "{}", err);
        }
    }

    async fn handle<T>(&mut self, mut connection: Connection<T>) -> Result<()>
    where
        T: AsyncWrite + AsyncRead + Unpin,
    {
        // A request already read is answered even when shutdown fires meanwhile.
        while !self.shutdown.is_shutdown() {
            let frame = tokio::select! {
                frame = connection.read_frame() => frame?,
                _ = self.shutdown.recv() => return Ok(()),
            };

            let Some(frame) = frame else {
                debug!(addr = %self.peer_addr, "Connection closed by peer");
                return Ok(());
            };

            let envelope = self.service.exchange(&RequestResponseCodec, &frame).await;
            connection.write_envelope(&envelope).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_addr() {
        let mut config = Config::default();
        assert_eq!(config.listen_addr(), "127.0.0.1:7400");

        let mut other = Config::default();
        other.set_listen_port(&mut Some("17400".into()));
        other.set_max_tcp_connections(Some(0));
        config.override_merge(&mut other);

        assert_eq!(config.listen_addr(), "127.0.0.1:17400");
        assert_eq!(config.max_tcp_connections(), 1);
    }

    #[test]
    fn accept_backoff_doubles_up_to_a_second() {
        let mut backoff = AcceptBackoff::new();
        let delays: Vec<u64> = (0..9)
            .map(|_| backoff.next_delay().as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![10, 20, 40, 80, 160, 320, 640, 1000, 1000]);

        for _ in 0..100 {
            backoff.next_delay();
        }
        assert_eq!(backoff.next_delay(), AcceptBackoff::MAX);

        backoff.reset();
        assert_eq!(backoff.next_delay(), AcceptBackoff::MIN);
    }

    #[tokio::test]
    async fn connection_slot_is_released_when_handler_ends() {
        let connections = Arc::new(Semaphore::new(1));
        let permit = connections.clone().acquire_owned().await.unwrap();
        assert_eq!(connections.available_permits(), 0);

        let mut config = crate::core::Config::default();
        config.set_backend(Some(crate::core::Backend::Memory));
        let service = crate::core::Builder::from_config(config, crate::core::token::testing::config())
            .build()
            .await
            .unwrap();

        // The peer hangs up right away.
        let (client, server) = tokio::io::duplex(64);
        drop(client);
        let (_trigger, shutdown) = crate::server::shutdown::channel();
        let handler = Handler {
            peer_addr: "127.0.0.1:1".parse().unwrap(),
            service: service.handle(),
            shutdown,
            _permit: permit,
        };
        handler.run(Connection::new(server, Some(64))).await;

        assert_eq!(connections.available_permits(), 1);
    }
}
