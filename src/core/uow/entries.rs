use std::fmt;

use crate::protocol::RepositoryName;

pub(crate) struct Entries {
    pub(crate) repository: RepositoryName,
    pub(crate) version: Option<usize>,
}

impl fmt::Display for Entries {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.version {
            Some(version) => write!(f, "Entries {} version {}", self.repository, version),
            None => write!(f, "Entries {}", self.repository),
        }
    }
}
