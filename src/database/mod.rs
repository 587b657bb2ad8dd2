use log::info;
use thiserror::Error;

use crate::catalog::{CatalogError, DatabaseInfo};
use crate::command::{Command, CommandError};
use crate::config::{ConfigError, DbConfig};
use crate::file::{BufferManager, DiskManager};
use crate::record::{
    ColInfo, FileManager, MAX_RECORD_SIZE, Record, RecordError, RecordId, TableInfo, Value,
};

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Table {0} already exists")]
    TableExists(String),

    #[error("Invalid table definition: {0}")]
    InvalidTable(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    CatalogError(#[from] CatalogError),

    #[error("Command error: {0}")]
    CommandError(#[from] CommandError),

    #[error("Record error: {0}")]
    RecordError(#[from] RecordError),

    #[error("File error: {0}")]
    FileError(#[from] crate::file::FileError),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Engine lifecycle: owns the storage stack and the table catalog.
///
/// The catalog snapshot is written by `finish`, which also runs on drop.
pub struct DatabaseManager {
    config: DbConfig,
    catalog: DatabaseInfo,
    file_manager: FileManager,
}

impl DatabaseManager {
    /// Open the database described by `config`, restoring the catalog and the
    /// page reuse list from the last snapshot if there is one
    pub fn open(config: DbConfig) -> DatabaseResult<Self> {
        config.validate()?;

        let mut disk_manager =
            DiskManager::open(&config.db_path, config.file_count, config.max_file_size)?;
        let mut catalog = DatabaseInfo::init(&config.db_path)?;
        disk_manager.restore_free_pages(std::mem::take(&mut catalog.free_pages));

        let buffer_manager = BufferManager::with_capacity(disk_manager, config.frame_count);
        info!(
            "opened database at {} ({} tables, {} files, {} frames)",
            config.db_path.display(),
            catalog.table_count(),
            config.file_count,
            config.frame_count
        );

        Ok(Self {
            config,
            catalog,
            file_manager: FileManager::new(buffer_manager),
        })
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn catalog(&self) -> &DatabaseInfo {
        &self.catalog
    }

    pub fn file_manager(&self) -> &FileManager {
        &self.file_manager
    }

    pub fn file_manager_mut(&mut self) -> &mut FileManager {
        &mut self.file_manager
    }

    pub fn table(&self, name: &str) -> DatabaseResult<&TableInfo> {
        Ok(self.catalog.get_table(name)?)
    }

    // Table operations
    pub fn create_table(&mut self, name: &str, columns: Vec<ColInfo>) -> DatabaseResult<TableInfo> {
        if self.catalog.contains(name) {
            return Err(DatabaseError::TableExists(name.to_string()));
        }
        if columns.is_empty() {
            return Err(DatabaseError::InvalidTable(format!(
                "table {} has no columns",
                name
            )));
        }

        // Validate the schema before a header page is spent on it
        let fixed_size: usize = columns
            .iter()
            .filter(|c| c.col_type.is_fixed())
            .map(|c| c.col_type.width())
            .sum();
        if fixed_size > MAX_RECORD_SIZE {
            return Err(DatabaseError::InvalidTable(format!(
                "fixed columns of {} take {} bytes, a page holds at most {}",
                name, fixed_size, MAX_RECORD_SIZE
            )));
        }

        let header_page_id = self.file_manager.create_header_page()?;
        let table = TableInfo::new(name, columns, header_page_id);
        self.catalog.add_table(table.clone())?;

        info!("created table '{}' with header page {}", name, header_page_id);
        Ok(table)
    }

    /// Insert a row given as literals, typed against the table schema
    pub fn insert(&mut self, table: &str, literals: &[String]) -> DatabaseResult<RecordId> {
        let table = self.catalog.get_table(table)?;
        if literals.len() != table.column_count() {
            return Err(RecordError::SchemaMismatch(format!(
                "Expected {} columns, got {}",
                table.column_count(),
                literals.len()
            ))
            .into());
        }

        let values = literals
            .iter()
            .zip(table.columns())
            .map(|(literal, col)| Value::parse(literal, &col.col_type))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(self
            .file_manager
            .insert_record(table, &Record::new(values))?)
    }

    pub fn insert_record(&mut self, table: &str, record: &Record) -> DatabaseResult<RecordId> {
        let table = self.catalog.get_table(table)?;
        Ok(self.file_manager.insert_record(table, record)?)
    }

    pub fn select_all(&mut self, table: &str) -> DatabaseResult<Vec<(RecordId, Record)>> {
        let table = self.catalog.get_table(table)?;
        let rows = self
            .file_manager
            .scan_table(table)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn get(&mut self, table: &str, rid: RecordId) -> DatabaseResult<Record> {
        let table = self.catalog.get_table(table)?;
        Ok(self.file_manager.get_record(table, rid)?)
    }

    pub fn delete(&mut self, table: &str, rid: RecordId) -> DatabaseResult<()> {
        let table = self.catalog.get_table(table)?;
        Ok(self.file_manager.delete_record(table, rid)?)
    }

    /// Drop every table and truncate the backing files
    pub fn reset(&mut self) -> DatabaseResult<()> {
        self.file_manager.buffer_manager_mut().reset()?;
        self.catalog.clear();
        self.catalog.save(&self.config.db_path)?;
        info!("database at {} reset", self.config.db_path.display());
        Ok(())
    }

    /// Flush every dirty page and write the catalog snapshot
    pub fn finish(&mut self) -> DatabaseResult<()> {
        let buffer_manager = self.file_manager.buffer_manager_mut();
        buffer_manager.flush_all()?;
        self.catalog.free_pages = buffer_manager.disk_manager().free_pages().to_vec();
        self.catalog.finish(&self.config.db_path)?;
        info!(
            "saved catalog with {} tables to {}",
            self.catalog.table_count(),
            self.config.db_path.display()
        );
        Ok(())
    }

    /// Run one parsed command. `Exit` only reports itself; the caller decides
    /// when to `finish`.
    pub fn execute(&mut self, command: Command) -> DatabaseResult<QueryResult> {
        match command {
            Command::CreateTable { name, columns } => {
                let table = self.create_table(&name, columns)?;
                Ok(QueryResult::TableCreated(table))
            }
            Command::Insert { table, values } => {
                let rid = self.insert(&table, &values)?;
                Ok(QueryResult::RecordInserted(rid))
            }
            Command::SelectAll { table } => {
                let columns = self
                    .table(&table)?
                    .columns()
                    .iter()
                    .map(|c| c.name.clone())
                    .collect();
                let rows = self.select_all(&table)?;
                Ok(QueryResult::ResultSet(columns, rows))
            }
            Command::Get { table, rid } => {
                let columns = self
                    .table(&table)?
                    .columns()
                    .iter()
                    .map(|c| c.name.clone())
                    .collect();
                let record = self.get(&table, rid)?;
                Ok(QueryResult::ResultSet(columns, vec![(rid, record)]))
            }
            Command::Delete { table, rid } => {
                self.delete(&table, rid)?;
                Ok(QueryResult::RowsAffected(1))
            }
            Command::ResetDb => {
                self.reset()?;
                Ok(QueryResult::Empty)
            }
            Command::Exit => Ok(QueryResult::Exit),
        }
    }
}

impl Drop for DatabaseManager {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

#[derive(Debug)]
pub enum QueryResult {
    Empty,
    TableCreated(TableInfo),
    RecordInserted(RecordId),
    RowsAffected(usize),
    /// Column names and the matching rows with their record ids
    ResultSet(Vec<String>, Vec<(RecordId, Record)>),
    Exit,
}

#[cfg(test)]
mod tests;
