use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::mpsc::{self, error::SendError, Sender};
use tokio::sync::RwLock;

use crate::common::{debug, info, warn, ErrorKind, Result};
use crate::config::filepath;
use crate::core::middleware::Middleware;
use crate::core::table::Table;
use crate::core::UnitOfWork;
use crate::protocol::{self, RepositoryName};

// Repositories are scoped to the organization of the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TableId {
    organization_id: String,
    repository: RepositoryName,
}

pub(crate) enum Storage {
    File { root_dir: PathBuf },
    Memory,
}

/// Routes units of work to the table of their repository.
pub(crate) struct Dispatcher {
    storage: Storage,
    table_channel_buffer: usize,
    // Only createRepository takes the write lock.
    tables: RwLock<HashMap<TableId, Sender<UnitOfWork>>>,
}

impl Dispatcher {
    pub(crate) fn new(storage: Storage, table_channel_buffer: usize) -> Self {
        Self {
            storage,
            table_channel_buffer,
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Open every repository found under the root directory.
    pub(crate) async fn load_tables(&self) -> Result<usize> {
        let root_dir = match &self.storage {
            Storage::File { root_dir } => root_dir.join(filepath::ORGANIZATIONS),
            Storage::Memory => return Ok(0),
        };
        if !fs::try_exists(&root_dir).await? {
            return Ok(0);
        }

        let mut tables = self.tables.write().await;
        let mut organizations = fs::read_dir(&root_dir).await?;
        while let Some(organization) = organizations.next_entry().await? {
            let organization_id = match organization.file_name().into_string() {
                Ok(name) if protocol::is_path_segment(&name) => name,
                _ => {
                    warn!(path = %organization.path().display(), "Skip unexpected directory");
                    continue;
                }
            };

            let mut files = fs::read_dir(organization.path()).await?;
            while let Some(file) = files.next_entry().await? {
                let repository = match repository_name(&file.path()) {
                    Some(repository) => repository,
                    None => {
                        warn!(path = %file.path().display(), "Skip unexpected file");
                        continue;
                    }
                };

                let id = TableId {
                    organization_id: organization_id.clone(),
                    repository,
                };
                let sender = self.open_table(&id).await?;
                tables.insert(id, sender);
            }
        }

        info!(tables = tables.len(), "Tables loaded");
        Ok(tables.len())
    }

    async fn create_table(&self, id: TableId) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.contains_key(&id) {
            return Err(ErrorKind::RepositoryAlreadyExists {
                repository: id.repository,
            }
            .into());
        }

        let sender = self.open_table(&id).await?;
        info!(organization = %id.organization_id, repository = %id.repository, "Repository created");
        tables.insert(id, sender);

        Ok(())
    }

    // Spawn the actor owning the table.
    async fn open_table(&self, id: &TableId) -> Result<Sender<UnitOfWork>> {
        let (tx, rx) = mpsc::channel(self.table_channel_buffer);

        match &self.storage {
            Storage::File { root_dir } => {
                let dir = root_dir
                    .join(filepath::ORGANIZATIONS)
                    .join(&id.organization_id);
                fs::create_dir_all(&dir).await?;

                let path = dir.join(format!("{}.{}", id.repository, filepath::TABLE_EXTENSION));
                debug!("Open table file {}", path.display());

                let table = Table::from_path(id.repository.clone(), rx, path).await?;
                tokio::spawn(table.run());
            }
            Storage::Memory => {
                let table = Table::in_memory(id.repository.clone(), rx).await?;
                tokio::spawn(table.run());
            }
        }

        Ok(tx)
    }

    async fn lookup(&self, id: &TableId) -> Option<Sender<UnitOfWork>> {
        self.tables.read().await.get(id).cloned()
    }
}

fn repository_name(path: &Path) -> Option<RepositoryName> {
    if path.extension()? != filepath::TABLE_EXTENSION {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    RepositoryName::new(stem).ok()
}

#[async_trait]
impl Middleware for Dispatcher {
    async fn apply(&self, uow: UnitOfWork) -> Result<()> {
        let id = match uow.principal() {
            Some(principal) => TableId {
                organization_id: principal.organization_id.clone(),
                repository: uow.repository().clone(),
            },
            None => {
                return uow.send_error(
                    ErrorKind::Internal("unauthenticated unit of work".into()).into(),
                )
            }
        };

        match uow {
            UnitOfWork::CreateRepository(mut create) => {
                if create.is_abandoned() {
                    warn!(repository = %id.repository, "Requester has gone away, repository not created");
                    return Ok(());
                }
                let result = self.create_table(id).await;
                create.send_response(result)
            }
            uow => match self.lookup(&id).await {
                Some(sender) => match sender.send(uow).await {
                    Ok(()) => Ok(()),
                    Err(SendError(uow)) => {
                        let qualifier = uow.operation().qualifier();
                        uow.send_error(
                            ErrorKind::ServiceUnavailable(format!(
                                "No reachable member with such service: {}",
                                qualifier
                            ))
                            .into(),
                        )
                    }
                },
                None => uow.send_error(
                    ErrorKind::RepositoryNotFound {
                        repository: id.repository,
                    }
                    .into(),
                ),
            },
        }
    }
}
