use clap::Args;

use crate::cli::save::parse_value;
use crate::cli::ClientOptions;
use crate::{Key, RepositoryName, Result};

/// Create or update an entry
#[derive(Args, Debug)]
pub struct WriteEntryCommand {
    /// Repository name
    #[arg(value_name = "REPOSITORY")]
    repository: String,
    /// Key
    #[arg(value_name = "KEY")]
    key: String,
    /// Value, written as a json string when it is not valid json
    #[arg(value_name = "VALUE")]
    value: String,
}

impl WriteEntryCommand {
    /// Fails if the key already exists.
    pub async fn create(self, options: ClientOptions) -> Result<()> {
        let (repository, key, value) = self.parse()?;

        let mut client = crate::cli::connect(options).await?;
        let version = client.create_entry(repository, key, value).await?;
        println!("version {}", version);

        Ok(())
    }

    /// Fails unless the key exists.
    pub async fn update(self, options: ClientOptions) -> Result<()> {
        let (repository, key, value) = self.parse()?;

        let mut client = crate::cli::connect(options).await?;
        let version = client.update_entry(repository, key, value).await?;
        println!("version {}", version);

        Ok(())
    }

    fn parse(self) -> Result<(RepositoryName, Key, serde_json::Value)> {
        Ok((
            RepositoryName::new(self.repository)?,
            Key::new(self.key)?,
            parse_value(self.value),
        ))
    }
}
