pub(crate) mod internal;

use std::fmt;
use std::io;

use crate::protocol::response::ErrorResponse;

#[derive(Debug)]
pub enum ConfigdError {
    // Repository names and keys are restricted to a url safe charset.
    InvalidName { field: &'static str, value: String },
    // The Key exceeds the maximum number of bytes specified in the protocol.
    MaxKeyBytes { key: String, max_bytes: usize },
    MaxValueBytes { max_bytes: usize },
    // The server answered with a canonical error.
    Remote { code: u16, message: String },
    Internal(internal::Error),
}

impl fmt::Display for ConfigdError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigdError::InvalidName { field, value } => write!(
                f,
                "Invalid {} '{}': only A-Z, a-z, 0-9, underscore, period, dash and percent are allowed",
                field, value
            ),
            ConfigdError::MaxKeyBytes { max_bytes, .. } => {
                write!(f, "key exceeds maximum bytes({})", max_bytes)
            }
            ConfigdError::MaxValueBytes { max_bytes } => {
                write!(f, "value exceeds maximum bytes({})", max_bytes)
            }
            ConfigdError::Remote { code, message } => write!(f, "{} ({})", message, code),
            ConfigdError::Internal(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for ConfigdError {}

impl ConfigdError {
    pub fn is_access_denied(&self) -> bool {
        match self {
            ConfigdError::Remote { message, .. } => {
                message == "Token verification failed"
                    || message.contains("has insufficient permissions")
            }
            _ => false,
        }
    }
}

impl From<ErrorResponse> for ConfigdError {
    fn from(response: ErrorResponse) -> Self {
        ConfigdError::Remote {
            code: response.error_code,
            message: response.error_message,
        }
    }
}

impl From<internal::Error> for ConfigdError {
    fn from(err: internal::Error) -> Self {
        ConfigdError::Internal(err)
    }
}

impl From<internal::ErrorKind> for ConfigdError {
    fn from(kind: internal::ErrorKind) -> Self {
        ConfigdError::Internal(kind.into())
    }
}

impl From<io::Error> for ConfigdError {
    fn from(err: io::Error) -> Self {
        ConfigdError::Internal(err.into())
    }
}

impl From<serde_json::Error> for ConfigdError {
    fn from(err: serde_json::Error) -> Self {
        ConfigdError::Internal(err.into())
    }
}

impl From<ConfigdError> for internal::Error {
    fn from(err: ConfigdError) -> Self {
        match err {
            ConfigdError::Internal(err) => err,
            ConfigdError::Remote { message, .. } => internal::ErrorKind::Internal(message).into(),
            validation => internal::ErrorKind::BadRequest(validation.to_string()).into(),
        }
    }
}
