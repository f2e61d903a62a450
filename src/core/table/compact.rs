use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, AsyncWriteExt, SeekFrom};

use crate::common::Result;
use crate::core::table::index::{Index, Record};

// Written next to the log, then renamed over it.
const COMPACTING_EXTENSION: &str = "compacting";

/// Outcome of an offline compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compaction {
    pub records: usize,
    pub before_bytes: usize,
    pub after_bytes: usize,
}

/// Copies every reachable record into a new log and points the index at the copies.
/// Tombstones and the records of deleted keys are left behind.
pub(super) async fn compact_log<R>(log: &mut R, index: &mut Index) -> Result<Vec<u8>>
where
    R: AsyncRead + AsyncSeek + Unpin,
{
    let records = index.reachable_records();
    let mut compacted = Vec::with_capacity(records.iter().map(|record| record.len).sum());
    let mut moved = HashMap::with_capacity(records.len());

    for record in records {
        log.seek(SeekFrom::Start(record.offset as u64)).await?;
        let offset = compacted.len();
        compacted.resize(offset + record.len, 0);
        log.read_exact(&mut compacted[offset..]).await?;
        moved.insert(
            record.offset,
            Record {
                offset,
                len: record.len,
            },
        );
    }

    index.relocate(|record| moved.get(&record.offset).copied().unwrap_or(record));
    Ok(compacted)
}

/// Rewrites a repository file without its garbage. The server must not be running.
pub async fn compact_file(path: impl AsRef<Path>) -> crate::Result<Compaction> {
    Ok(rewrite(path.as_ref()).await?)
}

async fn rewrite(path: &Path) -> Result<Compaction> {
    let mut log = Cursor::new(fs::read(path).await?);
    let before_bytes = log.get_ref().len();

    let (mut index, _) = Index::from_reader(&mut log).await?;
    let compacted = compact_log(&mut log, &mut index).await?;

    let tmp = path.with_extension(COMPACTING_EXTENSION);
    let mut file = fs::File::create(&tmp).await?;
    file.write_all(&compacted).await?;
    file.sync_all().await?;
    fs::rename(&tmp, path).await?;

    Ok(Compaction {
        records: index.reachable_records().len(),
        before_bytes,
        after_bytes: compacted.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::dump::dump;
    use crate::core::table::entry::Entry;
    use crate::protocol::Key;
    use serde_json::json;

    async fn append(buf: &mut Vec<u8>, key: &str, value: i32, deleted: bool) {
        let mut entry = Entry::new(Key::new(key).unwrap(), &json!(value)).unwrap();
        if deleted {
            entry.mark_deleted();
        }
        entry.encode_to(buf).await.unwrap();
    }

    #[test]
    fn compact_repository_file() {
        tokio_test::block_on(async move {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("FX.kvs");

            let mut buf = Vec::new();
            append(&mut buf, "Gold", 1, false).await;
            append(&mut buf, "Silver", 1, false).await;
            append(&mut buf, "Gold", 2, false).await;
            append(&mut buf, "Silver", 1, true).await;
            fs::write(&path, &buf).await.unwrap();

            let compaction = compact_file(&path).await.unwrap();
            assert_eq!(compaction.records, 2);
            assert_eq!(compaction.before_bytes, buf.len());
            assert!(compaction.after_bytes < compaction.before_bytes);
            assert!(!fs::try_exists(path.with_extension(COMPACTING_EXTENSION))
                .await
                .unwrap());

            // Both versions of Gold survive, Silver is gone.
            let mut records = Vec::new();
            let file = fs::File::open(&path).await.unwrap();
            dump(file, |entry| records.push((entry.key, entry.value)))
                .await
                .unwrap();
            assert_eq!(
                records,
                vec![
                    ("Gold".to_owned(), Some(json!(1))),
                    ("Gold".to_owned(), Some(json!(2))),
                ]
            );
        })
    }
}
