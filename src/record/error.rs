use crate::file::{FileError, PageId};
use thiserror::Error;

use super::record::RecordId;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("File error: {0}")]
    File(#[from] FileError),

    #[error("Header page {0} has no room for another data page")]
    HeaderFull(PageId),

    #[error("Slot is empty: {0}")]
    SlotEmpty(RecordId),

    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    #[error("Corrupt page {0}: {1}")]
    CorruptPage(PageId, String),

    #[error("Record of {size} bytes can never fit a page (max {max})")]
    RecordTooLarge { size: usize, max: usize },

    #[error("Page {0} has no room for the record")]
    PageFull(PageId),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Value of {len} bytes exceeds column width {max}")]
    ValueTooLong { len: usize, max: usize },

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

pub type RecordResult<T> = Result<T, RecordError>;
