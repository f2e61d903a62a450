use clap::Args;

use crate::cli::ClientOptions;
use crate::{Key, RepositoryName, Result};

/// Version history of a key
#[derive(Args, Debug)]
pub struct HistoryCommand {
    /// Repository name
    #[arg(value_name = "REPOSITORY")]
    repository: String,
    /// Key
    #[arg(value_name = "KEY")]
    key: String,
}

impl HistoryCommand {
    pub async fn run(self, options: ClientOptions) -> Result<()> {
        let repository = RepositoryName::new(self.repository)?;
        let key = Key::new(self.key)?;

        let mut client = crate::cli::connect(options).await?;
        for revision in client.history(repository, key).await? {
            println!("{}\t{}", revision.version, revision.value);
        }

        Ok(())
    }
}
