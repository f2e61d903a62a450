use clap::Args;

use crate::cli::ClientOptions;
use crate::{Key, RepositoryName, Result};

/// Fetch value
#[derive(Args, Debug)]
pub struct FetchCommand {
    /// Repository name
    #[arg(value_name = "REPOSITORY")]
    repository: String,
    /// Key
    #[arg(value_name = "KEY")]
    key: String,
    /// Saved version to read, the latest when omitted
    #[arg(id = "revision", long = "revision", value_name = "VERSION")]
    version: Option<usize>,
}

impl FetchCommand {
    pub async fn run(self, options: ClientOptions) -> Result<()> {
        let repository = RepositoryName::new(self.repository)?;
        let key = Key::new(self.key)?;

        let mut client = crate::cli::connect(options).await?;
        let value = client.fetch(repository, key, self.version).await?;
        println!("{}", serde_json::to_string_pretty(&value)?);

        Ok(())
    }
}
