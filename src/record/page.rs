use super::error::{RecordError, RecordResult};
use super::record::SlotId;
use crate::file::{PAGE_SIZE, PageId};

// Data page layout:
//   [0..4)   slot count
//   [4..8)   free space (authoritative)
//   [8..12)  heap start: lowest byte used by record data
//   [12..)   slot directory, 8 bytes per slot: record offset, record length
// Record bytes are packed downward from the end of the page.
// A slot with offset 0 and length 0 is free.
const SLOT_COUNT_OFFSET: usize = 0;
const FREE_SPACE_OFFSET: usize = 4;
const HEAP_START_OFFSET: usize = 8;

/// Size of the fixed data page header
pub const DATA_PAGE_HEADER_SIZE: usize = 12;
/// Size of one slot directory entry
pub const SLOT_SIZE: usize = 8;
/// Largest record that fits an empty data page
pub const MAX_RECORD_SIZE: usize = PAGE_SIZE - DATA_PAGE_HEADER_SIZE - SLOT_SIZE;

// Header page layout:
//   [0..4)  entry count
//   [4..)   entries, 12 bytes each: file index, page index, free space
const ENTRY_COUNT_OFFSET: usize = 0;
const HEADER_PAGE_PREFIX_SIZE: usize = 4;
/// Size of one header directory entry
pub const DIRECTORY_ENTRY_SIZE: usize = 12;
/// Number of data pages one header page can reference
pub const HEADER_PAGE_CAPACITY: usize =
    (PAGE_SIZE - HEADER_PAGE_PREFIX_SIZE) / DIRECTORY_ENTRY_SIZE;

fn read_u32(buffer: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buffer[offset],
        buffer[offset + 1],
        buffer[offset + 2],
        buffer[offset + 3],
    ])
}

fn write_u32(buffer: &mut [u8], offset: usize, value: u32) {
    buffer[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn check_page_size(buffer: &[u8], page_id: PageId) -> RecordResult<()> {
    if buffer.len() != PAGE_SIZE {
        return Err(RecordError::CorruptPage(
            page_id,
            format!("buffer must be {} bytes, got {}", PAGE_SIZE, buffer.len()),
        ));
    }
    Ok(())
}

/// Zero-copy slotted page view over buffer pool memory
pub struct DataPage<B> {
    buffer: B,
    page_id: PageId,
}

impl<B: AsRef<[u8]>> DataPage<B> {
    /// Wrap an existing data page buffer, checking its header for consistency
    pub fn from_buffer(buffer: B, page_id: PageId) -> RecordResult<Self> {
        check_page_size(buffer.as_ref(), page_id)?;
        let page = Self { buffer, page_id };

        let dir_end = DATA_PAGE_HEADER_SIZE + page.slot_count() * SLOT_SIZE;
        let heap_start = page.heap_start();
        if heap_start > PAGE_SIZE || dir_end > heap_start {
            return Err(RecordError::CorruptPage(
                page_id,
                format!(
                    "slot directory ends at {} but heap starts at {}",
                    dir_end, heap_start
                ),
            ));
        }
        if page.free_space() > PAGE_SIZE - dir_end {
            return Err(RecordError::CorruptPage(
                page_id,
                format!("free space {} exceeds page capacity", page.free_space()),
            ));
        }

        Ok(page)
    }

    fn bytes(&self) -> &[u8] {
        self.buffer.as_ref()
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Number of slot directory entries (free or occupied)
    pub fn slot_count(&self) -> usize {
        read_u32(self.bytes(), SLOT_COUNT_OFFSET) as usize
    }

    /// Bytes not used by the header, the slot directory or live records
    pub fn free_space(&self) -> usize {
        read_u32(self.bytes(), FREE_SPACE_OFFSET) as usize
    }

    fn heap_start(&self) -> usize {
        read_u32(self.bytes(), HEAP_START_OFFSET) as usize
    }

    /// Largest record an insert into this page is guaranteed to fit.
    /// Accounts for the slot entry an insert may have to append.
    pub fn usable_space(&self) -> usize {
        if self.find_free_slot().is_some() {
            self.free_space()
        } else {
            self.free_space().saturating_sub(SLOT_SIZE)
        }
    }

    /// Offset and length stored in a slot
    pub fn slot(&self, slot_id: SlotId) -> Option<(usize, usize)> {
        if slot_id >= self.slot_count() {
            return None;
        }
        let pos = DATA_PAGE_HEADER_SIZE + slot_id * SLOT_SIZE;
        Some((
            read_u32(self.bytes(), pos) as usize,
            read_u32(self.bytes(), pos + 4) as usize,
        ))
    }

    /// Check if a slot holds a record
    pub fn is_slot_used(&self, slot_id: SlotId) -> bool {
        matches!(self.slot(slot_id), Some((offset, _)) if offset != 0)
    }

    /// First free slot in directory order
    pub fn find_free_slot(&self) -> Option<SlotId> {
        (0..self.slot_count()).find(|&slot_id| self.slot(slot_id) == Some((0, 0)))
    }

    /// Occupied slots in slot order
    pub fn occupied_slots(&self) -> impl Iterator<Item = SlotId> + '_ {
        (0..self.slot_count()).filter(|&slot_id| self.is_slot_used(slot_id))
    }

    /// Get record data from a slot; `None` if the slot is free or out of range
    pub fn record(&self, slot_id: SlotId) -> Option<&[u8]> {
        match self.slot(slot_id) {
            Some((offset, len)) if offset != 0 => self.bytes().get(offset..offset + len),
            _ => None,
        }
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> DataPage<B> {
    /// Format `buffer` as an empty data page
    pub fn init(mut buffer: B, page_id: PageId) -> RecordResult<Self> {
        check_page_size(buffer.as_ref(), page_id)?;
        let bytes = buffer.as_mut();
        bytes.fill(0);
        write_u32(
            bytes,
            FREE_SPACE_OFFSET,
            (PAGE_SIZE - DATA_PAGE_HEADER_SIZE) as u32,
        );
        write_u32(bytes, HEAP_START_OFFSET, PAGE_SIZE as u32);
        Ok(Self { buffer, page_id })
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self.buffer.as_mut()
    }

    fn set_slot(&mut self, slot_id: SlotId, offset: usize, len: usize) {
        let pos = DATA_PAGE_HEADER_SIZE + slot_id * SLOT_SIZE;
        write_u32(self.bytes_mut(), pos, offset as u32);
        write_u32(self.bytes_mut(), pos + 4, len as u32);
    }

    fn set_free_space(&mut self, free_space: usize) {
        write_u32(self.bytes_mut(), FREE_SPACE_OFFSET, free_space as u32);
    }

    fn set_heap_start(&mut self, heap_start: usize) {
        write_u32(self.bytes_mut(), HEAP_START_OFFSET, heap_start as u32);
    }

    /// Store a record in the first free slot, appending a slot entry if none is free
    pub fn insert(&mut self, record: &[u8]) -> RecordResult<SlotId> {
        let len = record.len();
        let slot_count = self.slot_count();
        let (slot_id, needed) = match self.find_free_slot() {
            Some(slot_id) => (slot_id, len),
            None => (slot_count, len + SLOT_SIZE),
        };

        if needed > self.free_space() {
            return Err(RecordError::PageFull(self.page_id));
        }

        // Deleted records leave holes in the heap; pack it when they block the insert
        let dir_end = DATA_PAGE_HEADER_SIZE + slot_count.max(slot_id + 1) * SLOT_SIZE;
        if self.heap_start() < dir_end + len {
            self.compact();
        }

        let offset = self.heap_start() - len;
        self.bytes_mut()[offset..offset + len].copy_from_slice(record);

        if slot_id == slot_count {
            write_u32(self.bytes_mut(), SLOT_COUNT_OFFSET, (slot_count + 1) as u32);
        }
        self.set_slot(slot_id, offset, len);
        self.set_heap_start(offset);
        let free_space = self.free_space() - needed;
        self.set_free_space(free_space);

        Ok(slot_id)
    }

    /// Free a slot, returning the number of bytes given back to the page.
    /// The heap is not compacted.
    pub fn remove(&mut self, slot_id: SlotId) -> Option<usize> {
        let (offset, len) = self.slot(slot_id)?;
        if offset == 0 {
            return None;
        }

        self.set_slot(slot_id, 0, 0);
        let free_space = self.free_space() + len;
        self.set_free_space(free_space);
        Some(len)
    }

    /// Repack live records against the end of the page. Slot numbers are kept.
    fn compact(&mut self) {
        let live: Vec<(SlotId, Vec<u8>)> = self
            .occupied_slots()
            .filter_map(|slot_id| Some((slot_id, self.record(slot_id)?.to_vec())))
            .collect();

        let mut heap_start = PAGE_SIZE;
        for (slot_id, bytes) in live {
            heap_start -= bytes.len();
            self.bytes_mut()[heap_start..heap_start + bytes.len()].copy_from_slice(&bytes);
            self.set_slot(slot_id, heap_start, bytes.len());
        }
        self.set_heap_start(heap_start);
    }
}

/// One data page reference in a table's header directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub page_id: PageId,
    /// Free space recorded for the page, never more than it can actually take
    pub free_space: usize,
}

/// Zero-copy view of a table's header page (its free-space directory)
pub struct HeaderPage<B> {
    buffer: B,
    page_id: PageId,
}

impl<B: AsRef<[u8]>> HeaderPage<B> {
    /// Wrap an existing header page buffer
    pub fn from_buffer(buffer: B, page_id: PageId) -> RecordResult<Self> {
        check_page_size(buffer.as_ref(), page_id)?;
        let page = Self { buffer, page_id };
        if page.len() > HEADER_PAGE_CAPACITY {
            return Err(RecordError::CorruptPage(
                page_id,
                format!("directory holds {} entries", page.len()),
            ));
        }
        Ok(page)
    }

    /// Number of directory entries
    pub fn len(&self) -> usize {
        read_u32(self.buffer.as_ref(), ENTRY_COUNT_OFFSET) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if the directory has no room for another entry
    pub fn is_full(&self) -> bool {
        self.len() >= HEADER_PAGE_CAPACITY
    }

    /// Get a directory entry
    pub fn entry(&self, idx: usize) -> Option<DirectoryEntry> {
        if idx >= self.len() {
            return None;
        }
        let bytes = self.buffer.as_ref();
        let pos = HEADER_PAGE_PREFIX_SIZE + idx * DIRECTORY_ENTRY_SIZE;
        Some(DirectoryEntry {
            page_id: PageId::new(read_u32(bytes, pos), read_u32(bytes, pos + 4)),
            free_space: read_u32(bytes, pos + 8) as usize,
        })
    }

    /// All directory entries in order
    pub fn entries(&self) -> Vec<DirectoryEntry> {
        (0..self.len()).filter_map(|idx| self.entry(idx)).collect()
    }

    /// Index of the entry for a data page
    pub fn position(&self, page_id: PageId) -> Option<usize> {
        (0..self.len()).find(|&idx| self.entry(idx).is_some_and(|e| e.page_id == page_id))
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> HeaderPage<B> {
    /// Format `buffer` as an empty header page
    pub fn init(mut buffer: B, page_id: PageId) -> RecordResult<Self> {
        check_page_size(buffer.as_ref(), page_id)?;
        buffer.as_mut().fill(0);
        Ok(Self { buffer, page_id })
    }

    fn write_entry(&mut self, idx: usize, entry: DirectoryEntry) {
        let bytes = self.buffer.as_mut();
        let pos = HEADER_PAGE_PREFIX_SIZE + idx * DIRECTORY_ENTRY_SIZE;
        write_u32(bytes, pos, entry.page_id.file_idx);
        write_u32(bytes, pos + 4, entry.page_id.page_idx);
        write_u32(bytes, pos + 8, entry.free_space as u32);
    }

    /// Append an entry to the directory
    pub fn push(&mut self, entry: DirectoryEntry) -> RecordResult<()> {
        if self.is_full() {
            return Err(RecordError::HeaderFull(self.page_id));
        }
        let len = self.len();
        self.write_entry(len, entry);
        write_u32(self.buffer.as_mut(), ENTRY_COUNT_OFFSET, (len + 1) as u32);
        Ok(())
    }

    /// Update the cached free space of an entry
    pub fn set_free_space(&mut self, idx: usize, free_space: usize) -> bool {
        match self.entry(idx) {
            Some(entry) => {
                self.write_entry(idx, DirectoryEntry { free_space, ..entry });
                true
            }
            None => false,
        }
    }
}
