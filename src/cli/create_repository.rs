use clap::Args;

use crate::cli::ClientOptions;
use crate::{RepositoryName, Result};

/// Create repository
#[derive(Args, Debug)]
pub struct CreateRepositoryCommand {
    /// Repository name
    #[arg(value_name = "REPOSITORY")]
    repository: String,
}

impl CreateRepositoryCommand {
    pub async fn run(self, options: ClientOptions) -> Result<()> {
        let repository = RepositoryName::new(self.repository)?;

        let mut client = crate::cli::connect(options).await?;
        client.create_repository(repository).await?;
        println!("OK");

        Ok(())
    }
}
