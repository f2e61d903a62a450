use std::future::Future;
use std::path::Path;

use tokio::fs;
use tokio::net::TcpListener;

use crate::common::{info, Result};
use crate::config::{filepath, Config};
use crate::core::{self, Backend, ServiceHandle};
use crate::server::http;
use crate::server::tcp::Server;
use crate::ConfigdError;

/// Wires the configuration service to its transports.
#[derive(Debug)]
pub struct Initializer {
    pub config: Config,
    listener: Option<TcpListener>,
    http_listener: Option<TcpListener>,
}

impl Initializer {
    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            listener: None,
            http_listener: None,
        }
    }

    pub async fn load_config_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let f = fs::File::open(path).await?;
        let config = serde_yaml::from_reader::<_, Config>(f.into_std().await)
            .map_err(crate::common::Error::from)?;

        Ok(Initializer::from_config(config))
    }

    pub fn set_root_dir(&mut self, root_dir: impl AsRef<Path>) {
        self.config
            .configuration
            .set_root_dir(&mut Some(root_dir.as_ref().to_path_buf()));
    }

    /// Serve request/response connections on an already bound listener.
    pub fn set_listener(&mut self, listener: TcpListener) {
        self.listener = Some(listener);
    }

    /// Serve http and websocket connections on an already bound listener.
    pub fn set_http_listener(&mut self, listener: TcpListener) {
        self.http_listener = Some(listener);
    }

    pub async fn init_dir(&mut self) -> crate::Result<()> {
        if self.config.configuration.backend() == Backend::Memory {
            return Ok(());
        }
        if let Some(root_dir) = &self.config.configuration.root_dir {
            fs::create_dir_all(root_dir.join(filepath::ORGANIZATIONS)).await?;
        }
        Ok(())
    }

    /// Start the configuration service without any transport.
    pub async fn start_service(&self) -> crate::Result<ServiceHandle> {
        let service = core::Builder::from_config(
            self.config.configuration.clone(),
            self.config.token.clone(),
        )
        .build()
        .await?;
        let handle = service.handle();

        tokio::spawn(service.run());

        Ok(handle)
    }

    /// Run every transport until `shutdown` completes.
    pub async fn run_configd(self, shutdown: impl Future) -> crate::Result<()> {
        let handle = self.start_service().await?;
        self.serve(handle, shutdown).await.map_err(ConfigdError::from)
    }

    async fn serve(self, handle: ServiceHandle, shutdown: impl Future) -> Result<()> {
        let Initializer {
            config,
            listener,
            http_listener,
        } = self;

        let listener = match listener {
            Some(listener) => listener,
            None => TcpListener::bind(config.server.listen_addr()).await?,
        };
        let http_listener = match http_listener {
            Some(listener) => listener,
            None => TcpListener::bind(config.http.listen_addr()).await?,
        };
        info!(
            tcp = ?listener.local_addr().ok(),
            http = ?http_listener.local_addr().ok(),
            "Listening"
        );

        let (trigger, shutdown_rx) = crate::server::shutdown::channel();
        let http_server = tokio::spawn(http::serve(
            http_listener,
            handle.clone(),
            shutdown_rx.clone().signaled(),
        ));
        let tcp_server = tokio::spawn(Server::new(config.server).run(handle, listener, shutdown_rx));

        shutdown.await;
        info!("Shutdown signal received");

        // Waits for open tcp connections to finish their current request.
        trigger.shutdown().await;
        http_server.await??;
        tcp_server.await??;

        info!("Shutdown completed");
        Ok(())
    }
}
