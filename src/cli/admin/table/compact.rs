use std::path::PathBuf;

use clap::Args;

use crate::core::compact_file;
use crate::Result;

/// Compact table
#[derive(Args, Debug)]
pub struct CompactCommand {
    /// Path to repository file, the server must be stopped
    #[arg()]
    path: PathBuf,
}

impl CompactCommand {
    pub async fn run(self) -> Result<()> {
        tracing::debug!("Compact {}", self.path.display());

        let compaction = compact_file(&self.path).await?;
        tracing::info!(
            records = compaction.records,
            before = compaction.before_bytes,
            after = compaction.after_bytes,
            "Compacted {}",
            self.path.display()
        );
        println!(
            "{} records, {} -> {} bytes",
            compaction.records, compaction.before_bytes, compaction.after_bytes
        );

        Ok(())
    }
}
