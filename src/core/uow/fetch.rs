use std::fmt;

use crate::protocol::{Key, RepositoryName};

pub(crate) struct Fetch {
    pub(crate) repository: RepositoryName,
    pub(crate) key: Key,
    pub(crate) version: Option<usize>,
}

impl fmt::Display for Fetch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Fetch {} {}", self.repository, self.key)?;
        if let Some(version) = self.version {
            write!(f, " version {}", version)?;
        }
        Ok(())
    }
}
