use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::file::PageId;
use crate::record::TableInfo;

/// Name of the catalog snapshot inside the database directory
pub const CATALOG_FILE_NAME: &str = "DBInfo.json";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Table {0} already exists")]
    TableExists(String),

    #[error("Table {0} not found")]
    TableNotFound(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Table catalog plus the disk manager's reuse list, persisted between runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    /// Tables in creation order
    pub tables: Vec<TableInfo>,
    /// Deallocated pages waiting for reuse
    #[serde(default)]
    pub free_pages: Vec<PageId>,
}

impl DatabaseInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot_path(db_path: &Path) -> PathBuf {
        db_path.join(CATALOG_FILE_NAME)
    }

    /// Load the snapshot from `db_path`, or start empty if there is none
    pub fn init(db_path: &Path) -> CatalogResult<Self> {
        let path = Self::snapshot_path(db_path);
        if !path.exists() {
            warn!("no catalog snapshot at {}, starting empty", path.display());
            return Ok(Self::new());
        }
        Self::load(db_path)
    }

    pub fn load(db_path: &Path) -> CatalogResult<Self> {
        let content = fs::read_to_string(Self::snapshot_path(db_path))?;
        let info: Self = serde_json::from_str(&content)?;
        info!("loaded catalog with {} tables", info.tables.len());
        Ok(info)
    }

    pub fn save(&self, db_path: &Path) -> CatalogResult<()> {
        fs::create_dir_all(db_path)?;
        let content = serde_json::to_string_pretty(&self)?;
        fs::write(Self::snapshot_path(db_path), content)?;
        Ok(())
    }

    /// Write the snapshot. Alias of `save` used at shutdown.
    pub fn finish(&self, db_path: &Path) -> CatalogResult<()> {
        self.save(db_path)
    }

    pub fn add_table(&mut self, table: TableInfo) -> CatalogResult<()> {
        if self.contains(table.name()) {
            return Err(CatalogError::TableExists(table.name().to_string()));
        }
        self.tables.push(table);
        Ok(())
    }

    pub fn get_table(&self, name: &str) -> CatalogResult<&TableInfo> {
        self.tables
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| CatalogError::TableNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.iter().any(|t| t.name() == name)
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn clear(&mut self) {
        self.tables.clear();
        self.free_pages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ColInfo, ColType};

    fn table(name: &str, header: u32) -> TableInfo {
        TableInfo::new(
            name,
            vec![
                ColInfo::new("id", ColType::Int),
                ColInfo::new("label", ColType::VarString(12)),
            ],
            PageId::new(0, header),
        )
    }

    #[test]
    fn test_add_and_get_table() {
        let mut info = DatabaseInfo::new();
        info.add_table(table("a", 0)).unwrap();
        info.add_table(table("b", 1)).unwrap();

        assert_eq!(info.table_count(), 2);
        assert!(info.contains("a"));
        assert_eq!(info.get_table("b").unwrap().header_page_id(), PageId::new(0, 1));
        assert_eq!(info.table_names(), vec!["a".to_string(), "b".to_string()]);
        assert!(matches!(
            info.get_table("c"),
            Err(CatalogError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let mut info = DatabaseInfo::new();
        info.add_table(table("a", 0)).unwrap();
        assert!(matches!(
            info.add_table(table("a", 3)),
            Err(CatalogError::TableExists(_))
        ));
        assert_eq!(info.table_count(), 1);
    }

    #[test]
    fn test_init_without_snapshot_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let info = DatabaseInfo::init(temp_dir.path()).unwrap();
        assert_eq!(info, DatabaseInfo::new());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut info = DatabaseInfo::new();
        info.add_table(table("people", 0)).unwrap();
        info.free_pages = vec![PageId::new(1, 2), PageId::new(0, 5)];
        info.finish(temp_dir.path()).unwrap();

        assert!(temp_dir.path().join(CATALOG_FILE_NAME).exists());
        let loaded = DatabaseInfo::init(temp_dir.path()).unwrap();
        assert_eq!(loaded, info);
    }

    #[test]
    fn test_corrupt_snapshot() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join(CATALOG_FILE_NAME), "{ not json").unwrap();
        assert!(matches!(
            DatabaseInfo::init(temp_dir.path()),
            Err(CatalogError::JsonError(_))
        ));
    }

    #[test]
    fn test_clear() {
        let mut info = DatabaseInfo::new();
        info.add_table(table("a", 0)).unwrap();
        info.free_pages.push(PageId::new(0, 1));
        info.clear();
        assert_eq!(info.table_count(), 0);
        assert!(info.free_pages.is_empty());
    }
}
