mod config;
pub use self::config::{Backend, Config};

mod service;
pub(crate) use self::service::Builder;
pub use self::service::ServiceHandle;

pub mod token;

mod table;
pub use self::table::{compact_file, dump_file, Compaction, EntryDump};

mod principal;
pub(crate) use self::principal::Principal;
pub use self::principal::Role;

mod policy;

mod uow;
pub(crate) use self::uow::UnitOfWork;

mod middleware;
