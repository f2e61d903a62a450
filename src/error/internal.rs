use std::error;
use std::fmt;
use std::io;

use backtrace::Backtrace;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinError;
use tokio::time::error::Elapsed;

use crate::core::Role;
use crate::protocol::{Key, Operation, RepositoryName};

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    backtrace: Option<Backtrace>,
}

#[derive(Debug)]
pub(crate) enum ErrorKind {
    Io(io::Error),
    Json(serde_json::Error),
    Yaml(serde_yaml::Error),
    Config(String),
    // Malformed or incomplete request.
    BadRequest(String),
    // The cause is only logged, never sent back to the caller.
    InvalidToken { cause: String },
    InsufficientPermission { role: Role, operation: Operation },
    RepositoryNotFound { repository: RepositoryName },
    KeyNotFound { key: Key },
    // Raised by operations that name the repository in their message.
    EntryNotFound { repository: RepositoryName, key: Key },
    VersionNotFound { key: Key, version: usize },
    KeyAlreadyExists { repository: RepositoryName, key: Key },
    RepositoryAlreadyExists { repository: RepositoryName },
    EntryDecode { description: String },
    NetworkFraming(String),
    ConnectionResetByPeer,
    Timeout(Elapsed),
    ServiceUnavailable(String),
    Internal(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind() {
            ErrorKind::Io(err) => err.fmt(f),
            ErrorKind::Json(err) => err.fmt(f),
            ErrorKind::Yaml(err) => err.fmt(f),
            ErrorKind::Config(description) => write!(f, "invalid configuration. {}", description),
            ErrorKind::BadRequest(description) => write!(f, "{}", description),
            ErrorKind::InvalidToken { .. } => write!(f, "Token verification failed"),
            ErrorKind::InsufficientPermission { role, operation } => write!(
                f,
                "Role '{}' has insufficient permissions for the requested operation: {}",
                role, operation
            ),
            ErrorKind::RepositoryNotFound { repository } => {
                write!(f, "Repository '{}' not found", repository)
            }
            ErrorKind::KeyNotFound { key } => write!(f, "Key '{}' not found", key),
            ErrorKind::EntryNotFound { repository, key } => {
                write!(f, "Repository '{}' key '{}' not found", repository, key)
            }
            ErrorKind::VersionNotFound { key, version } => {
                write!(f, "Key '{}' version '{}' not found", key, version)
            }
            ErrorKind::KeyAlreadyExists { repository, key } => {
                write!(f, "Repository '{}' key '{}' already exists", repository, key)
            }
            ErrorKind::RepositoryAlreadyExists { repository } => {
                write!(f, "Repository with name: '{}' already exists", repository)
            }
            ErrorKind::EntryDecode { description } => {
                write!(f, "entry decode error. {}", description)
            }
            ErrorKind::NetworkFraming(description) => {
                write!(f, "network framing error. {}", description)
            }
            ErrorKind::ConnectionResetByPeer => write!(f, "connection reset by peer"),
            ErrorKind::Timeout(_) => write!(f, "Request timed out"),
            ErrorKind::ServiceUnavailable(description) => write!(f, "{}", description),
            ErrorKind::Internal(description) => write!(f, "internal error. {}", description),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::with_backtrace(kind)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::from(ErrorKind::Io(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::from(ErrorKind::Json(err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::from(ErrorKind::Yaml(err))
    }
}

impl From<Elapsed> for Error {
    fn from(elapsed: Elapsed) -> Self {
        Error::from(ErrorKind::Timeout(elapsed))
    }
}

impl From<oneshot::error::RecvError> for Error {
    fn from(_: oneshot::error::RecvError) -> Self {
        Error::from(ErrorKind::Internal("response channel closed".into()))
    }
}

impl<T> From<mpsc::error::SendError<T>> for Error {
    fn from(_: mpsc::error::SendError<T>) -> Self {
        Error::from(ErrorKind::ServiceUnavailable(
            "configuration service is not running".into(),
        ))
    }
}

impl From<JoinError> for Error {
    fn from(err: JoinError) -> Self {
        Error::from(ErrorKind::Internal(err.to_string()))
    }
}

impl Error {
    pub(crate) fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub(crate) fn is_eof(&self) -> bool {
        if let ErrorKind::Io(err) = self.kind() {
            err.kind().eq(&io::ErrorKind::UnexpectedEof)
        } else {
            false
        }
    }

    /// Code reported to clients in the `errorCode` field.
    pub fn error_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::BadRequest(_) => 400,
            ErrorKind::ServiceUnavailable(_) => 503,
            _ => 500,
        }
    }

    pub(crate) fn backtrace(&self) -> Option<&Backtrace> {
        self.backtrace.as_ref()
    }

    fn with_backtrace(kind: ErrorKind) -> Self {
        Self {
            kind,
            backtrace: Some(Backtrace::new()),
        }
    }
}

impl error::Error for Error {}
