use std::fmt;

use crate::protocol::{Key, RepositoryName, Value};

pub(crate) struct Save {
    pub(crate) repository: RepositoryName,
    pub(crate) key: Key,
    pub(crate) value: Value,
}

impl fmt::Display for Save {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Save {repository} {key}",
            repository = &self.repository,
            key = &self.key,
        )
    }
}
