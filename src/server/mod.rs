pub mod http;
pub(crate) mod shutdown;
pub mod tcp;

pub const DEFAULT_PORT: &str = "7400";
pub const DEFAULT_HTTP_PORT: &str = "7401";
