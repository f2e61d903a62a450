use std::collections::BTreeMap;

use tokio::io::AsyncReadExt;

use crate::common::Result;
use crate::core::table::entry::Entry;

/// Location of an encoded entry in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Record {
    pub(super) offset: usize,
    pub(super) len: usize,
}

// Ordered so that entries enumerate by ascending key.
#[derive(Debug, Default)]
pub(super) struct Index {
    // key to the record of every version since the key was last created, oldest first.
    versions: BTreeMap<String, Vec<Record>>,
    // Bytes no longer reachable: tombstones and the records of deleted keys.
    garbage: usize,
}

impl Index {
    /// Replays the log. Returns the index and the offset just past the last complete entry.
    pub(super) async fn from_reader<R: AsyncReadExt + Unpin>(mut reader: R) -> Result<(Self, usize)> {
        let mut index = Index::default();
        let mut pos: usize = 0;
        loop {
            match Entry::decode_from(&mut reader).await {
                Ok((n, entry)) => {
                    let record = Record { offset: pos, len: n };
                    if entry.is_active() {
                        index.add(entry.take_key(), record);
                    } else {
                        index.remove(entry.key(), n);
                    }
                    pos += n;
                }
                Err(err) if err.is_eof() => {
                    return Ok((index, pos));
                }
                Err(err) => {
                    return Err(err);
                }
            }
        }
    }

    /// Returns the version of the added record, starting at 1.
    pub(super) fn add(&mut self, key: String, record: Record) -> usize {
        let versions = self.versions.entry(key).or_default();
        versions.push(record);
        versions.len()
    }

    /// Drops every version of the key, `tombstone_len` is the size of the deletion record.
    pub(super) fn remove(&mut self, key: &str, tombstone_len: usize) -> bool {
        self.garbage += tombstone_len;
        match self.versions.remove(key) {
            Some(versions) => {
                self.garbage += versions.iter().map(|record| record.len).sum::<usize>();
                true
            }
            None => false,
        }
    }

    pub(super) fn latest(&self, key: &str) -> Option<Record> {
        self.versions.get(key)?.last().copied()
    }

    pub(super) fn version(&self, key: &str, version: usize) -> Option<Record> {
        self.versions.get(key)?.get(version.checked_sub(1)?).copied()
    }

    pub(super) fn history(&self, key: &str) -> Option<&[Record]> {
        self.versions.get(key).map(Vec::as_slice)
    }

    pub(super) fn contains(&self, key: &str) -> bool {
        self.versions.contains_key(key)
    }

    /// Latest record of every key, by ascending key.
    pub(super) fn latest_records(&self) -> impl Iterator<Item = Record> + '_ {
        self.versions.values().filter_map(|versions| versions.last().copied())
    }

    /// Record of the given version of every key that has one, by ascending key.
    pub(super) fn records_at(&self, version: usize) -> impl Iterator<Item = Record> + '_ {
        self.versions
            .values()
            .filter_map(move |versions| versions.get(version.checked_sub(1)?).copied())
    }

    /// Moves every reachable record to the offset `relocate` returns for it.
    pub(super) fn relocate(&mut self, mut relocate: impl FnMut(Record) -> Record) {
        for versions in self.versions.values_mut() {
            for record in versions.iter_mut() {
                *record = relocate(*record);
            }
        }
        self.garbage = 0;
    }

    /// Every reachable record in log order.
    pub(super) fn reachable_records(&self) -> Vec<Record> {
        let mut records: Vec<Record> = self.versions.values().flatten().copied().collect();
        records.sort_by_key(|record| record.offset);
        records
    }

    pub(super) fn garbage(&self) -> usize {
        self.garbage
    }

    pub(super) fn len(&self) -> usize {
        self.versions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Key;
    use serde_json::json;
    use std::io::Cursor;

    fn entry(key: &str, value: i32) -> Entry {
        Entry::new(Key::new(key).unwrap(), &json!(value)).unwrap()
    }

    #[test]
    fn construct_index() {
        tokio_test::block_on(async move {
            let entry1 = entry("key1", 1);
            let entry2 = entry("key2", 2);
            let mut tombstone = entry("key1", 1);
            tombstone.mark_deleted();
            let entry3 = entry("key3", 3);

            let mut buf = Cursor::new(Vec::new());
            let entry1_len = entry1.encode_to(&mut buf).await.unwrap();
            let entry2_offset = buf.position() as usize;
            entry2.encode_to(&mut buf).await.unwrap();
            let tombstone_len = tombstone.encode_to(&mut buf).await.unwrap();
            entry3.encode_to(&mut buf).await.unwrap();
            let end = buf.position() as usize;

            buf.set_position(0);

            let (index, pos) = Index::from_reader(&mut buf).await.unwrap();
            assert_eq!(pos, end);
            assert_eq!(index.len(), 2);
            assert_eq!(
                index.latest("key2").map(|record| record.offset),
                Some(entry2_offset)
            );
            assert_eq!(None, index.latest("key1"));
            assert_eq!(index.garbage(), entry1_len + tombstone_len);

            buf.set_position(entry2_offset as u64);
            let (_, decoded) = Entry::decode_from(&mut buf).await.unwrap();
            assert_eq!(entry2, decoded);
        })
    }

    #[test]
    fn versions_restart_after_remove() {
        let mut index = Index::default();
        let record = |offset| Record { offset, len: 10 };

        assert_eq!(index.add("k".into(), record(0)), 1);
        assert_eq!(index.add("k".into(), record(10)), 2);
        assert_eq!(index.add("other".into(), record(20)), 1);
        assert_eq!(index.version("k", 1), Some(record(0)));
        assert_eq!(index.version("k", 2), Some(record(10)));
        assert_eq!(index.version("k", 3), None);
        assert_eq!(index.version("k", 0), None);
        assert_eq!(index.records_at(2).collect::<Vec<_>>(), vec![record(10)]);

        assert!(index.remove("k", 5));
        assert_eq!(index.garbage(), 25);
        assert!(!index.contains("k"));
        assert_eq!(index.add("k".into(), record(35)), 1);

        assert_eq!(
            index.reachable_records(),
            vec![record(20), record(35)]
        );
    }

    #[test]
    fn ignore_partial_tail() {
        tokio_test::block_on(async move {
            let mut buf = Vec::new();
            entry("key1", 1).encode_to(&mut buf).await.unwrap();
            let end = buf.len();
            entry("key2", 2).encode_to(&mut buf).await.unwrap();
            buf.truncate(end + 10);

            let (index, pos) = Index::from_reader(Cursor::new(buf)).await.unwrap();
            assert_eq!(pos, end);
            assert_eq!(index.len(), 1);
        })
    }
}
