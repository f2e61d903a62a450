#![allow(clippy::module_inception)]

pub mod cli;
pub mod client;
pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod server;

pub use crate::error::ConfigdError;
pub type Result<T, E = crate::error::ConfigdError> = std::result::Result<T, E>;

pub use protocol::{Key, RepositoryName, Value};

pub(crate) mod common {
    pub(crate) type Result<T, E = crate::error::internal::Error> = std::result::Result<T, E>;

    pub(crate) type Error = crate::error::internal::Error;
    pub(crate) type ErrorKind = crate::error::internal::ErrorKind;

    pub use crate::error::ConfigdError;

    pub use tracing::{debug, error, info, trace, warn};
}
