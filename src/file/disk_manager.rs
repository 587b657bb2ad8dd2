use ahash::AHashSet;
use log::{debug, warn};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::error::{FileError, FileResult};
use super::{PAGE_SIZE, PageId};

struct FileEntry {
    file: File,
    /// Number of pages the file currently holds
    page_count: u32,
}

/// Owns the fixed ensemble of backing files and hands out page slots in them.
///
/// Deallocated pages go onto a LIFO reuse stack and are handed out again
/// before any file grows.
pub struct DiskManager {
    files: Vec<FileEntry>,
    /// Maximum number of pages a single backing file may hold
    max_pages_per_file: u32,
    /// Reuse stack of deallocated pages
    free_pages: Vec<PageId>,
    /// Membership index over `free_pages`
    free_set: AHashSet<PageId>,
}

impl DiskManager {
    /// Open (creating if needed) `file_count` backing files in `dir`.
    /// Existing files keep their content and size.
    pub fn open<P: AsRef<Path>>(
        dir: P,
        file_count: usize,
        max_file_size: u64,
    ) -> FileResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let mut files = Vec::with_capacity(file_count);
        for idx in 0..file_count {
            let path = Self::file_path(&dir, idx);
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&path)?;
            let len = file.metadata()?.len();
            let page_count = (len / PAGE_SIZE as u64) as u32;
            let page_aligned = page_count as u64 * PAGE_SIZE as u64;
            if len != page_aligned {
                // A torn trailing page was never handed out
                warn!(
                    "{} ends in a partial page, truncating {} bytes to {}",
                    path.display(),
                    len,
                    page_aligned
                );
                file.set_len(page_aligned)?;
            }
            files.push(FileEntry { file, page_count });
        }

        let max_pages_per_file = (max_file_size / PAGE_SIZE as u64).min(u32::MAX as u64) as u32;

        Ok(Self {
            files,
            max_pages_per_file,
            free_pages: Vec::new(),
            free_set: AHashSet::new(),
        })
    }

    /// Path of the backing file with the given index
    pub fn file_path(dir: &Path, idx: usize) -> PathBuf {
        dir.join(format!("f{}.data", idx))
    }

    /// Allocate a page, reusing the most recently deallocated one if any
    pub fn allocate_page(&mut self) -> FileResult<PageId> {
        if let Some(page_id) = self.free_pages.pop() {
            self.free_set.remove(&page_id);
            debug!("reusing deallocated page {}", page_id);
            return Ok(page_id);
        }

        // Smallest file first, ties broken by lowest index
        let max_pages = self.max_pages_per_file;
        let (file_idx, entry) = self
            .files
            .iter_mut()
            .enumerate()
            .filter(|(_, entry)| entry.page_count < max_pages)
            .min_by_key(|(idx, entry)| (entry.page_count, *idx))
            .ok_or(FileError::CapacityExceeded)?;

        let page_idx = entry.page_count;
        entry
            .file
            .set_len((page_idx as u64 + 1) * PAGE_SIZE as u64)?;
        entry.page_count += 1;

        let page_id = PageId::new(file_idx as u32, page_idx);
        debug!("allocated page {}", page_id);
        Ok(page_id)
    }

    /// Return a page to the reuse stack, zeroing its content on disk
    pub fn deallocate_page(&mut self, page_id: PageId) -> FileResult<()> {
        self.write_page(page_id, &[0u8; PAGE_SIZE])?;
        self.free_pages.push(page_id);
        self.free_set.insert(page_id);
        debug!("deallocated page {}", page_id);
        Ok(())
    }

    /// Check whether a page is currently allocated
    pub fn is_allocated(&self, page_id: PageId) -> bool {
        self.files
            .get(page_id.file_idx as usize)
            .is_some_and(|entry| page_id.page_idx < entry.page_count)
            && !self.free_set.contains(&page_id)
    }

    /// Read a whole page into `buffer`
    pub fn read_page(&mut self, page_id: PageId, buffer: &mut [u8]) -> FileResult<()> {
        if buffer.len() != PAGE_SIZE {
            return Err(FileError::InvalidPageSize {
                expected: PAGE_SIZE,
                actual: buffer.len(),
            });
        }

        let entry = self.allocated_entry(page_id)?;
        entry.file.seek(SeekFrom::Start(page_id.offset()))?;
        entry.file.read_exact(buffer)?;
        Ok(())
    }

    /// Overwrite a whole page with `buffer`
    pub fn write_page(&mut self, page_id: PageId, buffer: &[u8]) -> FileResult<()> {
        if buffer.len() != PAGE_SIZE {
            return Err(FileError::InvalidPageSize {
                expected: PAGE_SIZE,
                actual: buffer.len(),
            });
        }

        let entry = self.allocated_entry(page_id)?;
        entry.file.seek(SeekFrom::Start(page_id.offset()))?;
        entry.file.write_all(buffer)?;
        Ok(())
    }

    fn allocated_entry(&mut self, page_id: PageId) -> FileResult<&mut FileEntry> {
        if !self.is_allocated(page_id) {
            return Err(FileError::PageNotFound(page_id));
        }
        self.files
            .get_mut(page_id.file_idx as usize)
            .ok_or(FileError::PageNotFound(page_id))
    }

    /// Truncate every backing file and forget all allocation state
    pub fn reset(&mut self) -> FileResult<()> {
        for entry in &mut self.files {
            entry.file.set_len(0)?;
            entry.page_count = 0;
        }
        self.free_pages.clear();
        self.free_set.clear();
        debug!("disk manager reset");
        Ok(())
    }

    /// Deallocated pages awaiting reuse, oldest first
    pub fn free_pages(&self) -> &[PageId] {
        &self.free_pages
    }

    /// Reinstall a reuse stack saved by an earlier session.
    /// Ids that do not name a page inside the backing files are dropped.
    pub fn restore_free_pages(&mut self, pages: Vec<PageId>) {
        self.free_pages.clear();
        self.free_set.clear();
        for page_id in pages {
            if self.is_allocated(page_id) {
                self.free_pages.push(page_id);
                self.free_set.insert(page_id);
            }
        }
    }

    /// Sync all backing files to disk
    pub fn sync_all(&mut self) -> FileResult<()> {
        for entry in &mut self.files {
            entry.file.sync_data()?;
        }
        Ok(())
    }

    /// Number of backing files
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Number of pages a backing file currently holds
    pub fn page_count(&self, file_idx: usize) -> Option<u32> {
        self.files.get(file_idx).map(|entry| entry.page_count)
    }

    /// Number of pages that are allocated and not on the reuse stack
    pub fn allocated_page_count(&self) -> usize {
        let total: usize = self.files.iter().map(|e| e.page_count as usize).sum();
        total - self.free_pages.len()
    }
}
