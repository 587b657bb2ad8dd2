use log::debug;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::ops::{Deref, DerefMut};

use super::disk_manager::DiskManager;
use super::error::{FileError, FileResult};
use super::{BUFFER_POOL_SIZE, PAGE_SIZE, PageId};

/// Frame in the buffer pool
struct Frame {
    /// The actual page data
    data: Vec<u8>,
    /// Number of outstanding users of this frame
    pin_count: usize,
    /// Whether this page has been modified since it was last written
    dirty: bool,
}

/// Manages a bounded buffer pool in front of the disk manager.
///
/// Frames are evicted least-recently-used first, but only once their pin
/// count has dropped to zero.
pub struct BufferManager {
    /// Underlying disk manager
    disk_manager: DiskManager,
    /// Combined frame table and recency tracker
    buffer_pool: LruCache<PageId, Frame>,
    /// Maximum number of frames
    capacity: usize,
    /// Reusable buffer for loading pages (avoids allocation on every load)
    load_buffer: Vec<u8>,
}

impl BufferManager {
    /// Create a new buffer manager
    pub fn new(disk_manager: DiskManager) -> Self {
        Self::with_capacity(disk_manager, BUFFER_POOL_SIZE)
    }

    /// Create a new buffer manager with specified capacity (at least one frame)
    pub fn with_capacity(disk_manager: DiskManager, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            disk_manager,
            buffer_pool: LruCache::new(capacity),
            capacity: capacity.get(),
            load_buffer: vec![0u8; PAGE_SIZE],
        }
    }

    /// Get a reference to the disk manager
    pub fn disk_manager(&self) -> &DiskManager {
        &self.disk_manager
    }

    /// Get a mutable reference to the disk manager
    pub fn disk_manager_mut(&mut self) -> &mut DiskManager {
        &mut self.disk_manager
    }

    /// Allocate a fresh page on disk. The page is not loaded.
    pub fn allocate_page(&mut self) -> FileResult<PageId> {
        self.disk_manager.allocate_page()
    }

    /// Drop a page from the pool without flushing it and return it to the disk manager
    pub fn deallocate_page(&mut self, page_id: PageId) -> FileResult<()> {
        if let Some(frame) = self.buffer_pool.peek(&page_id) {
            if frame.pin_count > 0 {
                return Err(FileError::PagePinned(page_id));
            }
            self.buffer_pool.pop(&page_id);
        }
        self.disk_manager.deallocate_page(page_id)
    }

    /// Pin a page and return its buffer, loading it from disk if necessary.
    /// Every call must be matched by a `free_page`.
    pub fn get_page(&mut self, page_id: PageId) -> FileResult<&mut [u8]> {
        let frame = self.pin_frame(page_id)?;
        Ok(&mut frame.data)
    }

    /// Pin a page and wrap it in a guard that unpins it on drop
    pub fn fetch_page(&mut self, page_id: PageId) -> FileResult<PageGuard<'_>> {
        let frame = self.pin_frame(page_id)?;
        let data = std::mem::take(&mut frame.data);
        Ok(PageGuard {
            buffer_manager: self,
            page_id,
            data,
            dirty: false,
        })
    }

    fn pin_frame(&mut self, page_id: PageId) -> FileResult<&mut Frame> {
        if self.buffer_pool.peek(&page_id).is_none() {
            self.load_page(page_id)?;
        }

        // This updates LRU order
        let frame = self
            .buffer_pool
            .get_mut(&page_id)
            .ok_or(FileError::PageNotFound(page_id))?;
        frame.pin_count += 1;
        Ok(frame)
    }

    /// Release one pin on a page. A dirty release marks the frame dirty until it is flushed.
    pub fn free_page(&mut self, page_id: PageId, dirty: bool) -> FileResult<()> {
        let frame = self
            .buffer_pool
            .peek_mut(&page_id)
            .ok_or(FileError::NotPinned(page_id))?;

        if frame.pin_count == 0 {
            return Err(FileError::NotPinned(page_id));
        }

        frame.pin_count -= 1;
        if dirty {
            frame.dirty = true;
        }
        Ok(())
    }

    /// Flush a specific page to disk if it's dirty
    pub fn flush_page(&mut self, page_id: PageId) -> FileResult<()> {
        // Peek so flushing doesn't count as a use
        if let Some(frame) = self.buffer_pool.peek_mut(&page_id) {
            if frame.dirty {
                self.disk_manager.write_page(page_id, &frame.data)?;
                frame.dirty = false;
            }
        }

        Ok(())
    }

    /// Flush all dirty pages to disk
    pub fn flush_all(&mut self) -> FileResult<()> {
        let dirty_pages: Vec<PageId> = self
            .buffer_pool
            .iter()
            .filter(|(_, frame)| frame.dirty)
            .map(|(page_id, _)| *page_id)
            .collect();

        for page_id in dirty_pages {
            self.flush_page(page_id)?;
        }

        self.disk_manager.sync_all()?;
        Ok(())
    }

    /// Discard every frame and reset the disk manager
    pub fn reset(&mut self) -> FileResult<()> {
        self.buffer_pool.clear();
        self.disk_manager.reset()
    }

    /// Load a page from disk into the buffer pool
    fn load_page(&mut self, page_id: PageId) -> FileResult<()> {
        let mut data = std::mem::take(&mut self.load_buffer);
        data.resize(PAGE_SIZE, 0);

        if let Err(err) = self.disk_manager.read_page(page_id, &mut data) {
            self.load_buffer = data;
            return Err(err);
        }

        while self.buffer_pool.len() >= self.capacity {
            self.evict_lru_page()?;
        }

        self.buffer_pool.put(
            page_id,
            Frame {
                data,
                pin_count: 0,
                dirty: false,
            },
        );

        Ok(())
    }

    /// Evict the least recently used unpinned page from the buffer pool
    fn evict_lru_page(&mut self) -> FileResult<()> {
        let victim = self
            .buffer_pool
            .iter()
            .rev()
            .find(|(_, frame)| frame.pin_count == 0)
            .map(|(page_id, _)| *page_id)
            .ok_or(FileError::PoolExhausted)?;

        // Flush before removal so a failed write leaves the frame in place
        self.flush_page(victim)?;

        if let Some(frame) = self.buffer_pool.pop(&victim) {
            // Recycle the evicted buffer for future page loads
            self.load_buffer = frame.data;
        }
        debug!("evicted page {}", victim);

        Ok(())
    }

    /// Get the number of pages currently in the buffer pool
    pub fn buffer_pool_size(&self) -> usize {
        self.buffer_pool.len()
    }

    /// Check if a page is in the buffer pool
    pub fn is_page_cached(&self, page_id: PageId) -> bool {
        self.buffer_pool.contains(&page_id)
    }

    /// Pin count of a resident page
    pub fn pin_count(&self, page_id: PageId) -> Option<usize> {
        self.buffer_pool.peek(&page_id).map(|frame| frame.pin_count)
    }

    /// Get the number of dirty pages in the buffer pool
    pub fn dirty_page_count(&self) -> usize {
        self.buffer_pool.iter().filter(|(_, f)| f.dirty).count()
    }
}

impl Drop for BufferManager {
    fn drop(&mut self) {
        // Flush all dirty pages when the buffer manager is dropped
        let _ = self.flush_all();
    }
}

/// A pinned page. Derefs to the page bytes and releases the pin when dropped,
/// dirty iff `mark_dirty` was called.
pub struct PageGuard<'a> {
    buffer_manager: &'a mut BufferManager,
    page_id: PageId,
    data: Vec<u8>,
    dirty: bool,
}

impl PageGuard<'_> {
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Release this page as dirty
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

impl Deref for PageGuard<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for PageGuard<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Drop for PageGuard<'_> {
    fn drop(&mut self) {
        // The frame is pinned, so it is still resident
        if let Some(frame) = self.buffer_manager.buffer_pool.peek_mut(&self.page_id) {
            frame.data = std::mem::take(&mut self.data);
            frame.pin_count = frame.pin_count.saturating_sub(1);
            frame.dirty |= self.dirty;
        }
    }
}
