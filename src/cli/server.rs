use std::path::PathBuf;

use clap::Args;

use crate::common::debug;
use crate::config::Initializer;
use crate::core::{Backend, Config as CoreConfig};
use crate::server::http::Config as HttpConfig;
use crate::server::tcp::Config as ServerConfig;
use crate::Result;

/// Running configd server
#[derive(Args, Debug)]
pub struct ServerCommand {
    /// Max tcp connections
    #[arg(long, env = "CONFIGD_SERVER_MAX_CONNECTIONS")]
    max_connections: Option<u32>,
    /// Buffer bytes assigned to each tcp connection
    #[arg(long, env = "CONFIGD_SERVER_CONNECTION_TCP_BUFFER_BYTES")]
    connection_tcp_buffer_bytes: Option<usize>,
    /// Upper bound of a single request
    #[arg(long, env = "CONFIGD_REQUEST_TIMEOUT_MILLISECONDS")]
    request_timeout_milliseconds: Option<u64>,
    /// Configuration file path
    #[arg(
        long,
        short = 'C',
        default_value = "./files/config.yaml",
        env = "CONFIGD_SERVER_CONFIG_PATH"
    )]
    config: PathBuf,
    /// Tcp binding address host(e.g. 0.0.0.0, localhost)
    #[arg(long, env = "CONFIGD_SERVER_HOST")]
    bind_host: Option<String>,
    /// Tcp binding address port
    #[arg(long, env = "CONFIGD_SERVER_PORT")]
    bind_port: Option<String>,
    /// Http binding address host
    #[arg(long, env = "CONFIGD_HTTP_HOST")]
    http_host: Option<String>,
    /// Http binding address port
    #[arg(long, env = "CONFIGD_HTTP_PORT")]
    http_port: Option<String>,
    /// Storage backend
    #[arg(long, value_enum, env = "CONFIGD_BACKEND")]
    backend: Option<Backend>,
    /// Root directory where configd stores its data [default: .configd]
    #[arg(long, env = "CONFIGD_DIR")]
    configd_dir: Option<PathBuf>,
}

impl ServerCommand {
    pub async fn run(self) -> Result<()> {
        let ServerCommand {
            max_connections,
            connection_tcp_buffer_bytes,
            request_timeout_milliseconds,
            config,
            mut bind_host,
            mut bind_port,
            mut http_host,
            mut http_port,
            backend,
            mut configd_dir,
        } = self;

        let mut initializer = Initializer::load_config_file(config).await?;

        let mut server_config = {
            let mut config = ServerConfig::default();
            config.set_max_tcp_connections(max_connections);
            config.set_connection_tcp_buffer_bytes(connection_tcp_buffer_bytes);
            config.set_listen_host(&mut bind_host);
            config.set_listen_port(&mut bind_port);
            config
        };
        let mut http_config = {
            let mut config = HttpConfig::default();
            config.set_listen_host(&mut http_host);
            config.set_listen_port(&mut http_port);
            config
        };
        let mut core_config = {
            let mut config = CoreConfig::default();
            config.set_backend(backend);
            config.set_request_timeout_milliseconds(request_timeout_milliseconds);
            config.set_root_dir(&mut configd_dir);
            config
        };

        initializer.config.server.override_merge(&mut server_config);
        initializer.config.http.override_merge(&mut http_config);
        initializer
            .config
            .configuration
            .override_merge(&mut core_config);

        if initializer.config.configuration.backend() == Backend::File {
            let root_dir = initializer.config.configuration.root_dir_or_default();
            tokio::fs::create_dir_all(&root_dir).await?;
            initializer.set_root_dir(root_dir.canonicalize()?);
        }

        debug!("{:?}", initializer);

        initializer.init_dir().await?;

        initializer.run_configd(tokio::signal::ctrl_c()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        server: ServerCommand,
    }

    #[test]
    fn configd_dir_is_only_set_by_flag() {
        let cli = Cli::try_parse_from(["configd"]).unwrap();
        if std::env::var_os("CONFIGD_DIR").is_none() {
            assert_eq!(cli.server.configd_dir, None);
        }

        let cli = Cli::try_parse_from(["configd", "--configd-dir", "/tmp/configd"]).unwrap();
        assert_eq!(cli.server.configd_dir, Some(PathBuf::from("/tmp/configd")));
    }
}
