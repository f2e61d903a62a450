pub mod admin;
pub mod create_repository;
pub mod delete;
pub mod entries;
pub mod fetch;
pub mod history;
mod root;
pub mod save;
pub mod server;
pub mod write_entry;

pub use root::{connect, parse, ClientOptions, Command, ConfigdCommand};
