use std::fmt;

use crate::protocol::RepositoryName;

pub(crate) struct CreateRepository {
    pub(crate) repository: RepositoryName,
}

impl fmt::Display for CreateRepository {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CreateRepository {}", self.repository)
    }
}
