use clap::{Args, Parser, Subcommand};

use crate::cli::{create_repository, delete, entries, fetch, history, save, server, write_entry};
use crate::client::tcp::Client;
use crate::client::Api;
use crate::server::DEFAULT_PORT;

/// Configd command
#[derive(Parser, Debug)]
#[command(version, propagate_version = true, subcommand_required = true)]
pub struct ConfigdCommand {
    /// Client options
    #[command(flatten)]
    pub client: ClientOptions,
    /// Subcommand
    #[command(subcommand)]
    pub command: Command,
}

/// Client options
#[derive(Args, Debug)]
pub struct ClientOptions {
    /// Remote configd server host
    #[arg(long, env = "CONFIGD_HOST", default_value = "127.0.0.1", global = true)]
    pub host: String,
    /// Server listening port
    #[arg(long, env = "CONFIGD_PORT", default_value = DEFAULT_PORT, global = true)]
    pub port: u16,
    /// Bearer token identifying the organization and the role
    #[arg(long, env = "CONFIGD_TOKEN", hide_env_values = true, default_value = "", global = true)]
    pub token: String,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a repository in the organization of the token
    CreateRepository(create_repository::CreateRepositoryCommand),
    /// Save a value under a key
    Save(save::SaveCommand),
    /// Fetch the value of a key
    Fetch(fetch::FetchCommand),
    /// List every entry of a repository
    Entries(entries::EntriesCommand),
    /// Delete a key
    Delete(delete::DeleteCommand),
    /// Create a key that does not exist yet
    CreateEntry(write_entry::WriteEntryCommand),
    /// Write a new version of an existing key
    UpdateEntry(write_entry::WriteEntryCommand),
    /// List every saved version of a key
    History(history::HistoryCommand),
    /// Server
    Server(server::ServerCommand),
}

/// Parse command line args
pub fn parse() -> ConfigdCommand {
    ConfigdCommand::parse()
}

/// Connect to the request/response transport
pub async fn connect(options: ClientOptions) -> crate::Result<Box<dyn Api + Send>> {
    let ClientOptions { host, port, token } = options;

    let client = Client::from_addr((host.as_str(), port), token).await?;
    Ok(Box::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_save() {
        let command = ConfigdCommand::try_parse_from([
            "configd",
            "save",
            "FX",
            "Gold",
            r#"{"instrument":"XAU"}"#,
            "--port",
            "17400",
            "--token",
            "t",
        ])
        .unwrap();

        assert_eq!(command.client.port, 17400);
        assert_eq!(command.client.token, "t");
        assert!(matches!(command.command, Command::Save(_)));
    }

    #[test]
    fn parse_fetch_version() {
        let command =
            ConfigdCommand::try_parse_from(["configd", "fetch", "FX", "Gold", "--revision", "2"])
                .unwrap();
        assert!(matches!(command.command, Command::Fetch(_)));

        let err =
            ConfigdCommand::try_parse_from(["configd", "fetch", "FX", "Gold", "--revision", "two"])
                .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn verify_command() {
        use clap::CommandFactory;
        ConfigdCommand::command().debug_assert();
    }
}
