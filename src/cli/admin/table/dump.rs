use std::io::Write;
use std::path::PathBuf;

use clap::Args;

use crate::core::{dump_file, EntryDump};
use crate::Result;

/// Dump table
#[derive(Args, Debug)]
pub struct DumpCommand {
    /// Path to repository file
    #[arg()]
    path: PathBuf,

    /// Only print the records that are still live
    #[arg(long)]
    live: bool,
}

impl DumpCommand {
    pub async fn run(self) -> Result<()> {
        let DumpCommand { path, live } = self;

        tracing::debug!("Dump {}", path.display());

        let mut records: Vec<EntryDump> = Vec::new();
        dump_file(&path, |entry| records.push(entry)).await?;

        if live {
            records = live_records(records);
        }

        let entries: Vec<serde_json::Value> = records.iter().map(EntryDump::to_json).collect();
        let mut stdout = std::io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, &serde_json::json!({ "entries": entries }))?;
        writeln!(stdout)?;

        Ok(())
    }
}

// Keep the last record of every key unless it is a tombstone.
fn live_records(records: Vec<EntryDump>) -> Vec<EntryDump> {
    let mut latest = std::collections::BTreeMap::new();
    for record in records {
        latest.insert(record.key.clone(), record);
    }
    latest
        .into_values()
        .filter(|record| !record.is_deleted)
        .collect()
}
