mod compact;
mod dump;

use crate::Result;
use clap::{Args, Subcommand};

#[derive(Args, Debug)]
pub struct TableCommand {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print every record of a repository file, tombstones included
    Dump(dump::DumpCommand),
    /// Rewrite a repository file without its deleted records
    Compact(compact::CompactCommand),
}

impl TableCommand {
    pub async fn run(self) -> Result<()> {
        let TableCommand { command } = self;

        match command {
            Command::Dump(dump) => dump.run().await,
            Command::Compact(compact) => compact.run().await,
        }
    }
}
