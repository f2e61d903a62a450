use async_trait::async_trait;

use crate::protocol::{Entry, Revision};
use crate::{Key, RepositoryName, Result, Value};

pub mod tcp;

/// Canonical configuration operations as seen by a client.
#[async_trait]
pub trait Api {
    async fn create_repository(&mut self, repository: RepositoryName) -> Result<()>;
    async fn save(&mut self, repository: RepositoryName, key: Key, value: Value) -> Result<()>;
    /// Latest value unless a version is given.
    async fn fetch(
        &mut self,
        repository: RepositoryName,
        key: Key,
        version: Option<usize>,
    ) -> Result<Value>;
    async fn entries(
        &mut self,
        repository: RepositoryName,
        version: Option<usize>,
    ) -> Result<Vec<Entry>>;
    async fn delete(&mut self, repository: RepositoryName, key: Key) -> Result<()>;
    /// Fails when the key exists. Returns the version written.
    async fn create_entry(&mut self, repository: RepositoryName, key: Key, value: Value)
        -> Result<usize>;
    /// Fails when the key does not exist. Returns the version written.
    async fn update_entry(&mut self, repository: RepositoryName, key: Key, value: Value)
        -> Result<usize>;
    async fn history(&mut self, repository: RepositoryName, key: Key) -> Result<Vec<Revision>>;
}
