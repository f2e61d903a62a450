use clap::Args;

use crate::cli::ClientOptions;
use crate::{Key, RepositoryName, Result};

/// Delete key
#[derive(Args, Debug)]
pub struct DeleteCommand {
    /// Repository name
    #[arg(value_name = "REPOSITORY")]
    repository: String,
    /// Key
    #[arg(value_name = "KEY")]
    key: String,
}

impl DeleteCommand {
    pub async fn run(self, options: ClientOptions) -> Result<()> {
        let repository = RepositoryName::new(self.repository)?;
        let key = Key::new(self.key)?;

        let mut client = crate::cli::connect(options).await?;
        client.delete(repository, key).await?;
        println!("OK");

        Ok(())
    }
}
