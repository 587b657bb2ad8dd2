pub mod catalog;
pub mod command;
pub mod config;
pub mod database;
pub mod file;
pub mod record;

pub use catalog::{CatalogError, CatalogResult, DatabaseInfo};
pub use command::{Command, CommandError, CommandParser, CommandResult};
pub use config::{ConfigError, ConfigResult, DbConfig};
pub use database::{DatabaseError, DatabaseManager, DatabaseResult, QueryResult};
pub use file::{
    BUFFER_POOL_SIZE, BufferManager, DiskManager, FileError, FileResult, PAGE_SIZE, PageGuard,
    PageId,
};
pub use record::{
    ColInfo, ColType, DataPage, DirectoryEntry, FileManager, HeaderPage, Record, RecordError,
    RecordId, RecordResult, TableInfo, TableScan, Value,
};
