mod initialize;
pub use initialize::Initializer;

mod config;
pub use config::Config;

pub(crate) mod filepath {
    pub const ORGANIZATIONS: &str = "organizations";
    pub const TABLE_EXTENSION: &str = "kvs";
}

pub mod env {
    pub const LOG_DIRECTIVE: &str = "CONFIGD_LOG";
}
