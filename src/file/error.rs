use std::io;
use thiserror::Error;

use super::PageId;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Page not found: {0}")]
    PageNotFound(PageId),

    #[error("All backing files have reached their maximum size")]
    CapacityExceeded,

    #[error("Buffer pool exhausted: every frame is pinned")]
    PoolExhausted,

    #[error("Invalid page size: expected {expected}, got {actual}")]
    InvalidPageSize { expected: usize, actual: usize },

    #[error("Page {0} is not pinned")]
    NotPinned(PageId),

    #[error("Page {0} is pinned")]
    PagePinned(PageId),
}

pub type FileResult<T> = Result<T, FileError>;
