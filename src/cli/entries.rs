use clap::Args;

use crate::cli::ClientOptions;
use crate::{RepositoryName, Result};

/// List entries
#[derive(Args, Debug)]
pub struct EntriesCommand {
    /// Repository name
    #[arg(value_name = "REPOSITORY")]
    repository: String,
    /// List the given version of every key that has one
    #[arg(id = "revision", long = "revision", value_name = "VERSION")]
    version: Option<usize>,
}

impl EntriesCommand {
    pub async fn run(self, options: ClientOptions) -> Result<()> {
        let repository = RepositoryName::new(self.repository)?;

        let mut client = crate::cli::connect(options).await?;
        for entry in client.entries(repository, self.version).await? {
            println!("{}\t{}", entry.key, entry.value);
        }

        Ok(())
    }
}
