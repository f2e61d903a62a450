use std::path::PathBuf;

use serde::Deserialize;
use tokio::time::Duration;

/// Where repositories keep their entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// One append only log file per repository.
    #[default]
    File,
    /// Nothing survives the process.
    Memory,
}

// Configuration service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    // Storage backend.
    backend: Option<Backend>,
    // Directory under which repository files are created.
    pub(crate) root_dir: Option<PathBuf>,
    // Upper bound of a single request.
    request_timeout_milliseconds: Option<u64>,
    // Buffer of the channel feeding the middleware chain.
    request_channel_buffer: Option<usize>,
    // Buffer of the channel feeding each repository.
    table_channel_buffer: Option<usize>,
}

impl Config {
    const DEFAULT_REQUEST_TIMEOUT_MILLISECONDS: u64 = 5000;
    const DEFAULT_REQUEST_CHANNEL_BUFFER: usize = 1024;
    const DEFAULT_TABLE_CHANNEL_BUFFER: usize = 1024;
    const DEFAULT_ROOT_DIR: &'static str = ".configd";

    pub fn set_backend(&mut self, val: Option<Backend>) {
        if let Some(val) = val {
            self.backend = Some(val);
        }
    }
    pub fn set_root_dir(&mut self, val: &mut Option<PathBuf>) {
        if let Some(val) = val.take() {
            self.root_dir = Some(val);
        }
    }
    pub fn set_request_timeout_milliseconds(&mut self, val: Option<u64>) {
        if let Some(val) = val {
            self.request_timeout_milliseconds = Some(std::cmp::max(val, 1));
        }
    }
    pub fn set_request_channel_buffer(&mut self, val: Option<usize>) {
        if let Some(val) = val {
            self.request_channel_buffer = Some(std::cmp::max(val, 1));
        }
    }
    pub fn set_table_channel_buffer(&mut self, val: Option<usize>) {
        if let Some(val) = val {
            self.table_channel_buffer = Some(std::cmp::max(val, 1));
        }
    }
    pub(crate) fn override_merge(&mut self, other: &mut Config) {
        self.set_backend(other.backend);
        self.set_root_dir(&mut other.root_dir);
        self.set_request_timeout_milliseconds(other.request_timeout_milliseconds);
        self.set_request_channel_buffer(other.request_channel_buffer);
        self.set_table_channel_buffer(other.table_channel_buffer);
    }

    pub(crate) fn backend(&self) -> Backend {
        self.backend.unwrap_or_default()
    }

    /// Root directory from the file or the flag, `.configd` when neither sets one.
    pub(crate) fn root_dir_or_default(&self) -> PathBuf {
        self.root_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(Config::DEFAULT_ROOT_DIR))
    }

    pub(crate) fn request_timeout(&self) -> Duration {
        Duration::from_millis(
            self.request_timeout_milliseconds
                .unwrap_or(Config::DEFAULT_REQUEST_TIMEOUT_MILLISECONDS),
        )
    }

    pub(crate) fn request_channel_buffer(&self) -> usize {
        self.request_channel_buffer
            .unwrap_or(Config::DEFAULT_REQUEST_CHANNEL_BUFFER)
    }

    pub(crate) fn table_channel_buffer(&self) -> usize {
        self.table_channel_buffer
            .unwrap_or(Config::DEFAULT_TABLE_CHANNEL_BUFFER)
    }
}
