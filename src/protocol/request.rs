use serde_json::{Map, Value};

use crate::common::{ErrorKind, Result};
use crate::protocol::{Key, Operation, RepositoryName};

/// A transport independent request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub token: String,
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateRepository {
        repository: RepositoryName,
    },
    Save {
        repository: RepositoryName,
        key: Key,
        value: Value,
    },
    Fetch {
        repository: RepositoryName,
        key: Key,
        // Latest when absent.
        version: Option<usize>,
    },
    Entries {
        repository: RepositoryName,
        version: Option<usize>,
    },
    Delete {
        repository: RepositoryName,
        key: Key,
    },
    CreateEntry {
        repository: RepositoryName,
        key: Key,
        value: Value,
    },
    UpdateEntry {
        repository: RepositoryName,
        key: Key,
        value: Value,
    },
    History {
        repository: RepositoryName,
        key: Key,
    },
}

impl Command {
    pub fn operation(&self) -> Operation {
        match self {
            Command::CreateRepository { .. } => Operation::CreateRepository,
            Command::Save { .. } => Operation::Save,
            Command::Fetch { .. } => Operation::Fetch,
            Command::Entries { .. } => Operation::Entries,
            Command::Delete { .. } => Operation::Delete,
            Command::CreateEntry { .. } => Operation::CreateEntry,
            Command::UpdateEntry { .. } => Operation::UpdateEntry,
            Command::History { .. } => Operation::History,
        }
    }

    pub fn repository(&self) -> &RepositoryName {
        match self {
            Command::CreateRepository { repository }
            | Command::Save { repository, .. }
            | Command::Fetch { repository, .. }
            | Command::Entries { repository, .. }
            | Command::Delete { repository, .. }
            | Command::CreateEntry { repository, .. }
            | Command::UpdateEntry { repository, .. }
            | Command::History { repository, .. } => repository,
        }
    }
}

impl Request {
    pub fn new(token: impl Into<String>, command: Command) -> Self {
        Self {
            token: token.into(),
            command,
        }
    }

    pub fn operation(&self) -> Operation {
        self.command.operation()
    }

    /// Builds a request from the fields object of an envelope.
    /// Unknown fields are ignored. serde_json keeps the last occurrence of a duplicated key.
    pub(crate) fn decode(operation: Operation, data: Value) -> Result<Self> {
        let fields = match data {
            Value::Object(fields) => fields,
            Value::Null => Map::new(),
            _ => {
                return Err(
                    ErrorKind::BadRequest("Request data must be a json object".into()).into(),
                )
            }
        };
        let mut fields = Fields(fields);

        let token = match fields.string("token") {
            Some(token) => token,
            None => fields.required_string("apiKey", "token")?,
        };
        let repository = RepositoryName::new(fields.required_string("repository", "repository")?)?;

        let command = match operation {
            Operation::CreateRepository => Command::CreateRepository { repository },
            Operation::Entries => Command::Entries {
                repository,
                version: fields.version()?,
            },
            Operation::Fetch => Command::Fetch {
                repository,
                key: fields.key()?,
                version: fields.version()?,
            },
            Operation::Delete => Command::Delete {
                repository,
                key: fields.key()?,
            },
            Operation::History => Command::History {
                repository,
                key: fields.key()?,
            },
            Operation::Save => Command::Save {
                repository,
                key: fields.key()?,
                value: fields.value()?,
            },
            Operation::CreateEntry => Command::CreateEntry {
                repository,
                key: fields.key()?,
                value: fields.value()?,
            },
            Operation::UpdateEntry => Command::UpdateEntry {
                repository,
                key: fields.key()?,
                value: fields.value()?,
            },
        };

        Ok(Request { token, command })
    }

    /// Fields object as sent by clients.
    pub fn into_data(self) -> Value {
        let mut fields = Map::new();
        fields.insert("token".into(), Value::String(self.token));

        let (repository, key, value, version) = match self.command {
            Command::CreateRepository { repository } => (repository, None, None, None),
            Command::Entries {
                repository,
                version,
            } => (repository, None, None, version),
            Command::Fetch {
                repository,
                key,
                version,
            } => (repository, Some(key), None, version),
            Command::Delete { repository, key } | Command::History { repository, key } => {
                (repository, Some(key), None, None)
            }
            Command::Save {
                repository,
                key,
                value,
            }
            | Command::CreateEntry {
                repository,
                key,
                value,
            }
            | Command::UpdateEntry {
                repository,
                key,
                value,
            } => (repository, Some(key), Some(value), None),
        };

        fields.insert("repository".into(), Value::String(repository.into_string()));
        if let Some(key) = key {
            fields.insert("key".into(), Value::String(key.into_string()));
        }
        if let Some(value) = value {
            fields.insert("value".into(), value);
        }
        if let Some(version) = version {
            fields.insert("version".into(), version.into());
        }

        Value::Object(fields)
    }
}

struct Fields(Map<String, Value>);

impl Fields {
    fn string(&mut self, name: &str) -> Option<String> {
        match self.0.remove(name) {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    fn required_string(&mut self, name: &str, display: &str) -> Result<String> {
        self.string(name)
            .ok_or_else(|| please_specify(display).into())
    }

    fn key(&mut self) -> Result<Key> {
        Ok(Key::new(self.required_string("key", "key")?)?)
    }

    // null is a document of its own, only an absent value is rejected.
    fn value(&mut self) -> Result<Value> {
        self.0
            .remove("value")
            .ok_or_else(|| please_specify("value").into())
    }

    // A positive integer, given as a json number or as a numeric string.
    fn version(&mut self) -> Result<Option<usize>> {
        let version = match self.0.remove("version") {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
            Some(_) => None,
        };

        match version.and_then(|v| usize::try_from(v).ok()) {
            Some(version) if version > 0 => Ok(Some(version)),
            _ => Err(ErrorKind::BadRequest("Version must be a positive number".into()).into()),
        }
    }
}

fn please_specify(field: &str) -> ErrorKind {
    ErrorKind::BadRequest(format!("Please specify '{}'", field))
}
