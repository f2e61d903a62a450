use std::fmt;

use crate::protocol::{Key, RepositoryName};

pub(crate) struct History {
    pub(crate) repository: RepositoryName,
    pub(crate) key: Key,
}

impl fmt::Display for History {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "History {} {}", self.repository, self.key)
    }
}
