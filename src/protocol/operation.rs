use std::fmt;

/// Service every operation is registered under.
pub const SERVICE_NAME: &str = "configuration";

/// The canonical operation set exposed by every transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateRepository,
    Save,
    Fetch,
    Entries,
    Delete,
    CreateEntry,
    UpdateEntry,
    History,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::CreateRepository,
        Operation::Save,
        Operation::Fetch,
        Operation::Entries,
        Operation::Delete,
        Operation::CreateEntry,
        Operation::UpdateEntry,
        Operation::History,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::CreateRepository => "createRepository",
            Operation::Save => "save",
            Operation::Fetch => "fetch",
            Operation::Entries => "entries",
            Operation::Delete => "delete",
            Operation::CreateEntry => "createEntry",
            Operation::UpdateEntry => "updateEntry",
            Operation::History => "history",
        }
    }

    /// `/configuration/<name>`
    pub fn qualifier(&self) -> String {
        format!("/{}/{}", SERVICE_NAME, self.name())
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Operation::ALL.iter().copied().find(|op| op.name() == name)
    }

    /// Accepts a qualifier with or without the leading slash.
    pub fn from_qualifier(qualifier: &str) -> Option<Self> {
        let qualifier = qualifier.strip_prefix('/').unwrap_or(qualifier);
        let (service, name) = qualifier.split_once('/')?;
        if service != SERVICE_NAME {
            return None;
        }
        Operation::from_name(name)
    }

    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Operation::CreateRepository
                | Operation::Save
                | Operation::Delete
                | Operation::CreateEntry
                | Operation::UpdateEntry
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualifier() {
        for op in Operation::ALL.iter() {
            assert_eq!(Operation::from_qualifier(&op.qualifier()), Some(*op));
        }
        assert_eq!(
            Operation::from_qualifier("configuration/fetch"),
            Some(Operation::Fetch)
        );
        assert_eq!(Operation::from_qualifier("/configuration/get"), None);
        assert_eq!(Operation::from_qualifier("/greeting/fetch"), None);
        assert_eq!(Operation::from_qualifier("fetch"), None);
    }
}
