use std::fmt;

use crate::protocol::{Key, RepositoryName, Value};

/// Whether the key is expected to exist before the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Expect {
    Absent,
    Present,
}

/// Body of createEntry and updateEntry.
pub(crate) struct WriteEntry {
    pub(crate) repository: RepositoryName,
    pub(crate) key: Key,
    pub(crate) value: Value,
    pub(crate) expect: Expect,
}

impl fmt::Display for WriteEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self.expect {
            Expect::Absent => "CreateEntry",
            Expect::Present => "UpdateEntry",
        };
        write!(f, "{} {} {}", name, self.repository, self.key)
    }
}
