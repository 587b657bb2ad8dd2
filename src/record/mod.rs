//! Record layer: value codec, table schemas and the slotted-page record store.

mod error;
mod file_manager;
mod page;
mod record;
mod schema;
mod value;

pub use error::{RecordError, RecordResult};
pub use file_manager::{FileManager, TableScan};
pub use page::{
    DATA_PAGE_HEADER_SIZE, DataPage, DirectoryEntry, HEADER_PAGE_CAPACITY, HeaderPage,
    MAX_RECORD_SIZE, SLOT_SIZE,
};
pub use record::{Record, RecordId, SlotId};
pub use schema::{ColInfo, TableInfo};
pub use value::{ColType, LENGTH_PREFIX_SIZE, Value};
