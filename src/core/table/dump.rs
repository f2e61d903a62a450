use std::path::Path;

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tokio::fs;
use tokio::io::{AsyncRead, BufReader};

use crate::common::Result;
use crate::core::table::entry::Entry;

/// A record of the log as written, tombstones included.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryDump {
    pub timestamp_ms: i64,
    pub is_deleted: bool,
    pub key: String,
    pub value: Option<Value>,
}

impl EntryDump {
    pub fn to_json(&self) -> Value {
        let time = Utc
            .timestamp_millis_opt(self.timestamp_ms)
            .single()
            .map(|time| time.to_rfc3339());

        json!({
            "time": time,
            "is_deleted": self.is_deleted,
            "key": self.key,
            "value": self.value,
        })
    }
}

/// Calls `f` with every record in log order. Returns the number of records.
pub(crate) async fn dump<R, F>(reader: R, mut f: F) -> Result<usize>
where
    R: AsyncRead + Unpin,
    F: FnMut(EntryDump),
{
    let mut reader = BufReader::new(reader);
    let mut n = 0;
    loop {
        match Entry::decode_from(&mut reader).await {
            Ok((_, entry)) => {
                f(entry.into_dump());
                n += 1;
            }
            Err(err) if err.is_eof() => return Ok(n),
            Err(err) => return Err(err),
        }
    }
}

pub async fn dump_file<F>(path: impl AsRef<Path>, f: F) -> crate::Result<usize>
where
    F: FnMut(EntryDump),
{
    let file = fs::File::open(path.as_ref()).await?;
    Ok(dump(file, f).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Key;
    use std::io::Cursor;

    #[test]
    fn dump_records() {
        tokio_test::block_on(async move {
            let mut buf = Vec::new();
            let entry = Entry::new(Key::new("k1").unwrap(), &json!({"a": 1})).unwrap();
            entry.encode_to(&mut buf).await.unwrap();
            let mut tombstone = Entry::new(Key::new("k1").unwrap(), &json!({"a": 1})).unwrap();
            tombstone.mark_deleted();
            tombstone.encode_to(&mut buf).await.unwrap();

            let mut dumps = Vec::new();
            let n = dump(Cursor::new(buf), |entry| dumps.push(entry)).await.unwrap();

            assert_eq!(n, 2);
            assert!(!dumps[0].is_deleted);
            assert_eq!(dumps[0].value, Some(json!({"a": 1})));
            assert!(dumps[1].is_deleted);
            assert_eq!(dumps[1].value, None);

            let v = dumps[1].to_json();
            assert_eq!(v["key"], "k1");
            assert_eq!(v["is_deleted"], true);
            assert!(v["time"].is_string());
        })
    }
}
