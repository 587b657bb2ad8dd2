use log::{debug, info, warn};
use std::collections::VecDeque;

use super::error::{RecordError, RecordResult};
use super::page::{DataPage, DirectoryEntry, HeaderPage, MAX_RECORD_SIZE};
use super::record::{Record, RecordId};
use super::schema::TableInfo;
use crate::file::{BufferManager, PageId};

/// Slotted-page record store on top of the buffer manager.
///
/// Each table owns one header page holding a directory of its data pages and
/// the free space cached for each. Every page touched is pinned through a
/// `PageGuard` and released before the operation returns, dirty only if its
/// bytes changed.
pub struct FileManager {
    buffer_manager: BufferManager,
}

impl FileManager {
    pub fn new(buffer_manager: BufferManager) -> Self {
        Self { buffer_manager }
    }

    /// Get a reference to the buffer manager
    pub fn buffer_manager(&self) -> &BufferManager {
        &self.buffer_manager
    }

    /// Get a mutable reference to the buffer manager
    pub fn buffer_manager_mut(&mut self) -> &mut BufferManager {
        &mut self.buffer_manager
    }

    /// Allocate and format a table's header page with an empty directory
    pub fn create_header_page(&mut self) -> RecordResult<PageId> {
        let page_id = self.buffer_manager.allocate_page()?;

        let result = self.buffer_manager.fetch_page(page_id).map_err(RecordError::from).and_then(
            |mut guard| {
                HeaderPage::init(&mut guard[..], page_id)?;
                guard.mark_dirty();
                Ok(())
            },
        );
        if let Err(err) = result {
            self.release_page(page_id);
            return Err(err);
        }

        debug!("created header page {}", page_id);
        Ok(page_id)
    }

    /// Allocate an empty data page and register it in the table's directory
    pub fn add_data_page(&mut self, table: &TableInfo) -> RecordResult<PageId> {
        let header_id = table.header_page_id();

        // Check for room first so a full directory doesn't leak a page
        {
            let guard = self.buffer_manager.fetch_page(header_id)?;
            if HeaderPage::from_buffer(&guard[..], header_id)?.is_full() {
                return Err(RecordError::HeaderFull(header_id));
            }
        }

        let page_id = self.buffer_manager.allocate_page()?;
        if let Err(err) = self.register_data_page(header_id, page_id) {
            self.release_page(page_id);
            return Err(err);
        }

        info!("added data page {} to table '{}'", page_id, table.name());
        Ok(page_id)
    }

    /// Hand back a page allocated by a failed operation
    fn release_page(&mut self, page_id: PageId) {
        if let Err(err) = self.buffer_manager.deallocate_page(page_id) {
            warn!("failed to release page {} after error: {}", page_id, err);
        }
    }

    fn register_data_page(&mut self, header_id: PageId, page_id: PageId) -> RecordResult<()> {
        let free_space = {
            let mut guard = self.buffer_manager.fetch_page(page_id)?;
            let free_space = DataPage::init(&mut guard[..], page_id)?.usable_space();
            guard.mark_dirty();
            free_space
        };

        let mut guard = self.buffer_manager.fetch_page(header_id)?;
        HeaderPage::from_buffer(&mut guard[..], header_id)?.push(DirectoryEntry {
            page_id,
            free_space,
        })?;
        guard.mark_dirty();
        Ok(())
    }

    /// First data page, in directory order, whose recorded free space fits `record_size`
    pub fn find_page_with_free_space(
        &mut self,
        table: &TableInfo,
        record_size: usize,
    ) -> RecordResult<Option<PageId>> {
        Ok(self
            .data_pages(table)?
            .into_iter()
            .find(|entry| entry.free_space >= record_size)
            .map(|entry| entry.page_id))
    }

    /// The table's directory entries in order
    pub fn data_pages(&mut self, table: &TableInfo) -> RecordResult<Vec<DirectoryEntry>> {
        let header_id = table.header_page_id();
        let guard = self.buffer_manager.fetch_page(header_id)?;
        Ok(HeaderPage::from_buffer(&guard[..], header_id)?.entries())
    }

    /// Insert a record into the table
    pub fn insert_record(&mut self, table: &TableInfo, record: &Record) -> RecordResult<RecordId> {
        let record_bytes = record.serialize(table)?;
        if record_bytes.len() > MAX_RECORD_SIZE {
            return Err(RecordError::RecordTooLarge {
                size: record_bytes.len(),
                max: MAX_RECORD_SIZE,
            });
        }

        let page_id = match self.find_page_with_free_space(table, record_bytes.len())? {
            Some(page_id) => page_id,
            None => self.add_data_page(table)?,
        };

        // Stage the insert on a copy, the page is released clean
        let (image, slot_id, free_space) = {
            let guard = self.buffer_manager.fetch_page(page_id)?;
            let mut image = guard.to_vec();
            let mut page = DataPage::from_buffer(&mut image[..], page_id)?;
            let slot_id = page.insert(&record_bytes)?;
            let free_space = page.usable_space();
            (image, slot_id, free_space)
        };

        // Lower the directory first. A failure after this leaves it low, never high.
        self.update_directory(table, page_id, free_space)?;

        let mut guard = self.buffer_manager.fetch_page(page_id)?;
        guard.copy_from_slice(&image);
        guard.mark_dirty();
        Ok(RecordId::new(page_id, slot_id))
    }

    /// Get a record from the table
    pub fn get_record(&mut self, table: &TableInfo, rid: RecordId) -> RecordResult<Record> {
        self.directory_index(table, rid.page_id)?
            .ok_or(RecordError::SlotEmpty(rid))?;

        let guard = self.buffer_manager.fetch_page(rid.page_id)?;
        let page = DataPage::from_buffer(&guard[..], rid.page_id)?;
        let record_bytes = page.record(rid.slot_id).ok_or(RecordError::SlotEmpty(rid))?;
        Record::deserialize(record_bytes, table)
    }

    /// Delete a record, returning its bytes to the page. The heap is not compacted.
    pub fn delete_record(&mut self, table: &TableInfo, rid: RecordId) -> RecordResult<()> {
        self.directory_index(table, rid.page_id)?
            .ok_or(RecordError::SlotEmpty(rid))?;

        let free_space = {
            let mut guard = self.buffer_manager.fetch_page(rid.page_id)?;
            let mut page = DataPage::from_buffer(&mut guard[..], rid.page_id)?;
            page.remove(rid.slot_id).ok_or(RecordError::SlotEmpty(rid))?;
            let free_space = page.usable_space();
            guard.mark_dirty();
            free_space
        };

        // Page first: a failed directory update leaves the entry low
        self.update_directory(table, rid.page_id, free_space)
    }

    /// Lazily scan all records of a table, page by page in directory order.
    /// Each call starts a fresh scan.
    pub fn scan_table<'a>(&'a mut self, table: &'a TableInfo) -> RecordResult<TableScan<'a>> {
        let pages: Vec<PageId> = self
            .data_pages(table)?
            .into_iter()
            .map(|entry| entry.page_id)
            .collect();

        Ok(TableScan {
            buffer_manager: &mut self.buffer_manager,
            table,
            pages: pages.into(),
            buffered: VecDeque::new(),
            done: false,
        })
    }

    /// Records stored in one data page of the table, in slot order
    pub fn records_in_data_page(
        &mut self,
        table: &TableInfo,
        page_id: PageId,
    ) -> RecordResult<Vec<(RecordId, Record)>> {
        read_page_records(&mut self.buffer_manager, table, page_id)
    }

    /// The free-space counter stored in a data page
    pub fn page_free_space(&mut self, page_id: PageId) -> RecordResult<usize> {
        let guard = self.buffer_manager.fetch_page(page_id)?;
        Ok(DataPage::from_buffer(&guard[..], page_id)?.free_space())
    }

    fn directory_index(&mut self, table: &TableInfo, page_id: PageId) -> RecordResult<Option<usize>> {
        let header_id = table.header_page_id();
        let guard = self.buffer_manager.fetch_page(header_id)?;
        Ok(HeaderPage::from_buffer(&guard[..], header_id)?.position(page_id))
    }

    fn update_directory(
        &mut self,
        table: &TableInfo,
        page_id: PageId,
        free_space: usize,
    ) -> RecordResult<()> {
        let header_id = table.header_page_id();
        let mut guard = self.buffer_manager.fetch_page(header_id)?;
        let mut header = HeaderPage::from_buffer(&mut guard[..], header_id)?;

        let idx = header.position(page_id).ok_or_else(|| {
            RecordError::CorruptPage(header_id, format!("no directory entry for page {}", page_id))
        })?;
        header.set_free_space(idx, free_space);
        guard.mark_dirty();
        Ok(())
    }
}

fn read_page_records(
    buffer_manager: &mut BufferManager,
    table: &TableInfo,
    page_id: PageId,
) -> RecordResult<Vec<(RecordId, Record)>> {
    let guard = buffer_manager.fetch_page(page_id)?;
    let page = DataPage::from_buffer(&guard[..], page_id)?;

    let mut records = Vec::with_capacity(page.slot_count());
    for slot_id in page.occupied_slots() {
        let rid = RecordId::new(page_id, slot_id);
        let record_bytes = page.record(slot_id).ok_or(RecordError::SlotEmpty(rid))?;
        records.push((rid, Record::deserialize(record_bytes, table)?));
    }
    Ok(records)
}

/// Streaming table scan (decodes one data page at a time).
/// Stops after the first error.
pub struct TableScan<'a> {
    buffer_manager: &'a mut BufferManager,
    table: &'a TableInfo,
    pages: VecDeque<PageId>,
    buffered: VecDeque<(RecordId, Record)>,
    done: bool,
}

impl Iterator for TableScan<'_> {
    type Item = RecordResult<(RecordId, Record)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Some(Ok(item));
            }

            let Some(page_id) = self.pages.pop_front() else {
                self.done = true;
                return None;
            };

            match read_page_records(self.buffer_manager, self.table, page_id) {
                Ok(records) => self.buffered.extend(records),
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
