use serde::Deserialize;

use crate::core::{self, token};
use crate::server::{http, tcp};

/// Whole configd configuration, every section may be omitted.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct Config {
    pub server: tcp::Config,
    pub http: http::Config,
    pub configuration: core::Config,
    pub token: token::Config,
}
