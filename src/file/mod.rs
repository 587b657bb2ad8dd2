mod buffer_manager;
mod disk_manager;
mod error;
mod page_id;

pub use buffer_manager::{BufferManager, PageGuard};
pub use disk_manager::DiskManager;
pub use error::{FileError, FileResult};
pub use page_id::PageId;

/// Page size in bytes (4KB)
pub const PAGE_SIZE: usize = 4096;

/// Default number of frames in the buffer pool
pub const BUFFER_POOL_SIZE: usize = 16;
