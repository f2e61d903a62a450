use std::fmt;

use crate::protocol::{Key, RepositoryName};

pub(crate) struct Delete {
    pub(crate) repository: RepositoryName,
    pub(crate) key: Key,
}

impl fmt::Display for Delete {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Delete {} {}", self.repository, self.key)
    }
}
