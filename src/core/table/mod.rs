mod compact;
pub use self::compact::{compact_file, Compaction};

mod dump;
pub use self::dump::{dump_file, EntryDump};

mod entry;

mod index;

mod table;
pub(crate) use self::table::Table;
