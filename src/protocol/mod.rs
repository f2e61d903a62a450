pub mod codec;
pub(crate) mod connection;

mod operation;
pub use self::operation::Operation;

pub mod request;
pub use self::request::{Command, Request};

pub mod response;
pub use self::response::{Entry, ErrorResponse, Outcome, Response, Revision};

use std::fmt;
use std::ops::Deref;

use serde::Serialize;

use crate::common::ConfigdError;

/// Values are arbitrary json documents.
pub use serde_json::Value;

// Maximum number of bytes in Key.
// if it's not in ascii, Len  is misleading, so using Bytes explicitly.
pub const MAX_KEY_BYTES: usize = 1024;

// Maximum number of bytes in an encoded Value.
pub const MAX_VALUE_BYTES: usize = 1024 * 1024 * 10;

/// Returns true if every character is one of `A-Z a-z 0-9 _ . - %`.
pub fn is_valid_name(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-' | b'%'))
}

// Names of this shape end up as file system path segments.
pub(crate) fn is_path_segment(s: &str) -> bool {
    is_valid_name(s) && s.bytes().any(|b| b != b'.')
}

/// Name of a repository, unique within an organization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RepositoryName(String);

impl RepositoryName {
    pub fn new(s: impl Into<String>) -> Result<Self, ConfigdError> {
        let s = s.into();
        if is_path_segment(&s) {
            Ok(Self(s))
        } else {
            Err(ConfigdError::InvalidName {
                field: "repository",
                value: s,
            })
        }
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Deref for RepositoryName {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Key is a string accepted by the charset and size limits of the protocol.
// other components can handle Key without checking the length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    // Construct Key from given string.
    pub fn new(s: impl Into<String>) -> Result<Self, ConfigdError> {
        let s = s.into();
        if s.len() > MAX_KEY_BYTES {
            Err(ConfigdError::MaxKeyBytes {
                key: s,
                max_bytes: MAX_KEY_BYTES,
            })
        } else if !is_valid_name(&s) {
            Err(ConfigdError::InvalidName {
                field: "key",
                value: s,
            })
        } else {
            Ok(Self(s))
        }
    }

    pub(crate) fn new_unchecked(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Deref for Key {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
