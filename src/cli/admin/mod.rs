use clap::{Parser, Subcommand};

pub mod table;

/// Configd administration command
#[derive(Parser, Debug)]
#[command(version, propagate_version = true, subcommand_required = true)]
pub struct ConfigadminCommand {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect repository files
    Table(table::TableCommand),
}

/// Parse command line args
pub fn parse() -> ConfigadminCommand {
    ConfigadminCommand::parse()
}
