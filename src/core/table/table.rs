use std::io::{self, Cursor};
use std::path::Path;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncSeek, AsyncSeekExt, AsyncWrite, AsyncWriteExt, BufReader, SeekFrom};
use tokio::sync::mpsc::Receiver;

use crate::common::{debug, info, warn, ErrorKind, Result};
use crate::core::table::compact::compact_log;
use crate::core::table::entry::Entry;
use crate::core::table::index::{Index, Record};
use crate::core::uow::{Expect, WriteEntry};
use crate::core::UnitOfWork;
use crate::protocol::{self, Key, RepositoryName, Revision};

// Garbage a log has to hold before it is compacted.
const COMPACTION_MIN_GARBAGE: usize = 1024 * 1024;

/// Storage of a table log.
#[async_trait]
pub(crate) trait LogFile: AsyncRead + AsyncWrite + AsyncSeek + Unpin + Send {
    /// Drops every byte past `len`.
    async fn truncate(&mut self, len: u64) -> io::Result<()>;

    /// Whether the log may be rewritten while the table is serving.
    fn compacts_in_place(&self) -> bool;
}

#[async_trait]
impl LogFile for fs::File {
    async fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len).await
    }

    // Files are compacted offline, a crash in the middle of a rewrite would lose the log.
    fn compacts_in_place(&self) -> bool {
        false
    }
}

#[async_trait]
impl LogFile for Cursor<Vec<u8>> {
    async fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.get_mut().truncate(len as usize);
        Ok(())
    }

    fn compacts_in_place(&self) -> bool {
        true
    }
}

/// Owns one repository. Units of work are applied one at a time in arrival order.
pub(crate) struct Table<File = fs::File> {
    repository: RepositoryName,
    file: File,
    index: Index,
    // Offset where the next entry is appended.
    end: u64,
    compaction_min_garbage: usize,
    receiver: Receiver<UnitOfWork>,
}

impl Table<fs::File> {
    pub(crate) async fn from_path(
        repository: RepositoryName,
        receiver: Receiver<UnitOfWork>,
        path: impl AsRef<Path>,
    ) -> Result<Self> {
        let f = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())
            .await?;

        Table::new(repository, receiver, f).await
    }
}

impl Table<Cursor<Vec<u8>>> {
    pub(crate) async fn in_memory(
        repository: RepositoryName,
        receiver: Receiver<UnitOfWork>,
    ) -> Result<Self> {
        Table::new(repository, receiver, Cursor::new(Vec::new())).await
    }
}

impl<File: LogFile> Table<File> {
    pub(crate) async fn new(
        repository: RepositoryName,
        receiver: Receiver<UnitOfWork>,
        mut file: File,
    ) -> Result<Self> {
        file.seek(SeekFrom::Start(0)).await?;
        let (index, end) = Index::from_reader(BufReader::new(&mut file)).await?;

        debug!(%repository, entries = index.len(), end, garbage = index.garbage(), "Table opened");

        Ok(Self {
            repository,
            file,
            index,
            end: end as u64,
            compaction_min_garbage: COMPACTION_MIN_GARBAGE,
            receiver,
        })
    }

    pub(crate) async fn run(mut self) {
        while let Some(uow) = self.receiver.recv().await {
            if let Err(err) = self.handle_uow(uow).await {
                warn!(repository = %self.repository, "Undeliverable response {}", err);
            }
        }
        info!(repository = %self.repository, "Table closed");
    }

    async fn handle_uow(&mut self, uow: UnitOfWork) -> Result<()> {
        // A requester that timed out was told the mutation failed.
        if uow.operation().is_mutation() && uow.is_abandoned() {
            warn!(
                repository = %self.repository,
                operation = %uow.operation(),
                "Requester has gone away, unit of work dropped"
            );
            return Ok(());
        }

        match uow {
            UnitOfWork::Save(mut save) => {
                let request = &save.request;
                let result = self
                    .save(request.key.clone(), &request.value)
                    .await
                    .map(|_| ());
                save.send_response(result)
            }
            UnitOfWork::WriteEntry(mut write) => {
                let result = self.write_entry(&write.request).await;
                write.send_response(result)
            }
            UnitOfWork::Fetch(mut fetch) => {
                let result = self.fetch(&fetch.request.key, fetch.request.version).await;
                fetch.send_response(result)
            }
            UnitOfWork::Entries(mut entries) => {
                let result = self.entries(entries.request.version).await;
                entries.send_response(result)
            }
            UnitOfWork::History(mut history) => {
                let result = self.history(&history.request.key).await;
                history.send_response(result)
            }
            UnitOfWork::Delete(mut delete) => {
                let result = self.delete(&delete.request.key).await;
                delete.send_response(result)
            }
            UnitOfWork::CreateRepository(mut create) => {
                // Repositories are created by the dispatcher before a table exists.
                create.send_response(Err(ErrorKind::RepositoryAlreadyExists {
                    repository: create.request.repository.clone(),
                }
                .into()))
            }
        }
    }

    /// Returns the version written.
    async fn save(&mut self, key: Key, value: &protocol::Value) -> Result<usize> {
        let entry = Entry::new(key, value)?;
        let record = self.append(&entry).await?;

        Ok(self.index.add(entry.take_key(), record))
    }

    async fn write_entry(&mut self, request: &WriteEntry) -> Result<usize> {
        let exists = self.index.contains(&request.key);
        match (request.expect, exists) {
            (Expect::Absent, true) => Err(ErrorKind::KeyAlreadyExists {
                repository: self.repository.clone(),
                key: request.key.clone(),
            }
            .into()),
            (Expect::Present, false) => Err(ErrorKind::EntryNotFound {
                repository: self.repository.clone(),
                key: request.key.clone(),
            }
            .into()),
            _ => self.save(request.key.clone(), &request.value).await,
        }
    }

    async fn fetch(&mut self, key: &Key, version: Option<usize>) -> Result<protocol::Entry> {
        let record = match version {
            None => self.index.latest(key),
            Some(version) if self.index.contains(key) => {
                let record = self.index.version(key, version).ok_or_else(|| {
                    ErrorKind::VersionNotFound {
                        key: key.clone(),
                        version,
                    }
                })?;
                Some(record)
            }
            Some(_) => None,
        }
        .ok_or_else(|| ErrorKind::KeyNotFound { key: key.clone() })?;

        let (key, value) = self.read_entry(record.offset).await?.take_key_value()?;
        Ok(protocol::Entry {
            key: key.into_string(),
            value,
        })
    }

    // Keys without the requested version are left out.
    async fn entries(&mut self, version: Option<usize>) -> Result<Vec<protocol::Entry>> {
        let records: Vec<Record> = match version {
            Some(version) => self.index.records_at(version).collect(),
            None => self.index.latest_records().collect(),
        };
        let mut entries = Vec::with_capacity(records.len());

        for record in records {
            let (key, value) = self.read_entry(record.offset).await?.take_key_value()?;
            entries.push(protocol::Entry {
                key: key.into_string(),
                value,
            });
        }

        Ok(entries)
    }

    async fn history(&mut self, key: &Key) -> Result<Vec<Revision>> {
        let records = self
            .index
            .history(key)
            .map(<[Record]>::to_vec)
            .ok_or_else(|| ErrorKind::EntryNotFound {
                repository: self.repository.clone(),
                key: key.clone(),
            })?;

        let mut history = Vec::with_capacity(records.len());
        for (i, record) in records.into_iter().enumerate() {
            let (_, value) = self.read_entry(record.offset).await?.take_key_value()?;
            history.push(Revision {
                version: i + 1,
                value,
            });
        }

        Ok(history)
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        let record = self
            .index
            .latest(key)
            .ok_or_else(|| ErrorKind::KeyNotFound { key: key.clone() })?;

        let mut entry = self.read_entry(record.offset).await?;
        entry.mark_deleted();
        let tombstone = self.append(&entry).await?;

        self.index.remove(key, tombstone.len);
        self.maybe_compact().await;
        Ok(())
    }

    // Write the entry at the end of the log.
    // A partial write is cut off so that the log stays decodable.
    async fn append(&mut self, entry: &Entry) -> Result<Record> {
        let mut buf = Vec::new();
        let len = entry.encode_to(&mut buf).await?;

        let offset = self.end;
        if let Err(err) = self.write_at(offset, &buf).await {
            if let Err(truncate_err) = self.file.truncate(offset).await {
                warn!(repository = %self.repository, offset, "Failed to cut off partial entry {}", truncate_err);
            }
            return Err(err);
        }

        self.end += len as u64;
        Ok(Record {
            offset: offset as usize,
            len,
        })
    }

    async fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset)).await?;
        self.file.write_all(buf).await?;
        self.file.flush().await?;
        Ok(())
    }

    async fn maybe_compact(&mut self) {
        let garbage = self.index.garbage();
        if !self.file.compacts_in_place()
            || garbage < self.compaction_min_garbage
            || garbage * 2 < self.end as usize
        {
            return;
        }

        let before = self.end;
        match self.compact().await {
            Ok(()) => debug!(repository = %self.repository, before, after = self.end, "Log compacted"),
            Err(err) => warn!(repository = %self.repository, "Compaction failed {}", err),
        }
    }

    async fn compact(&mut self) -> Result<()> {
        let log = compact_log(&mut self.file, &mut self.index).await?;

        self.file.truncate(0).await?;
        self.write_at(0, &log).await?;
        self.end = log.len() as u64;
        Ok(())
    }

    async fn read_entry(&mut self, offset: usize) -> Result<Entry> {
        self.file.seek(SeekFrom::Start(offset as u64)).await?;
        let (_, entry) = Entry::decode_from(&mut self.file).await?;
        Ok(entry)
    }
}
