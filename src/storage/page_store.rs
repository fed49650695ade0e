//! Page Store - file I/O and page bookkeeping for a database file.
//!
//! The [`PageStore`] handles all direct file operations:
//! - Opening or creating the database file
//! - Reading and writing fixed-size pages
//! - Allocating page IDs and recycling released ones
//! - Persisting the [`Metadata`] record in page 0

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use crate::common::config::{validate_page_size, Options, METADATA_HEADER_SIZE};
use crate::common::{Error, PageId, Result};
use crate::storage::metadata::Metadata;
use crate::storage::page::Page;

/// Manages disk I/O for a single database file.
///
/// # File Layout
/// The database is stored as a single file with pages laid out sequentially:
/// ```text
/// ┌──────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0   │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ metadata │ node    │ node    │         │ node    │
/// └──────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0    page_size  2×page_size ...  N×page_size
/// ```
///
/// # Thread Safety
/// `PageStore` is **single-threaded**. Callers that share one across
/// threads must serialize access (the [`Database`](crate::Database) facade
/// holds it behind a mutex).
///
/// # Durability
/// Page writes are not synced individually. Metadata is written to page 0
/// and the file is synced on [`flush`](PageStore::flush) and
/// [`close`](PageStore::close). A crash in between can leave the file with
/// stale metadata.
pub struct PageStore {
    file: Option<File>,
    path: PathBuf,
    page_size: usize,
    metadata: Metadata,
}

impl PageStore {
    /// Open an existing database file, or create it if it doesn't exist.
    ///
    /// An existing file's metadata is loaded from page 0. If it was written
    /// with a page size other than `options.page_size`, the stored size is
    /// used and a warning is logged. With `options.adopt_stored_page_size`
    /// turned off this fails with [`Error::PageSizeMismatch`] instead.
    pub fn open<P: AsRef<Path>>(path: P, options: &Options) -> Result<Self> {
        options.validate()?;
        let path = path.as_ref();

        if path.exists() {
            Self::open_existing(path, options)
        } else {
            Self::create(path, options.page_size)
        }
    }

    fn create(path: &Path, page_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        debug!(path = %path.display(), page_size, "created database file");
        Ok(Self {
            file: Some(file),
            path: path.to_path_buf(),
            page_size,
            metadata: Metadata::new(page_size as u32),
        })
    }

    fn open_existing(path: &Path, options: &Options) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;

        // A file that was created but never closed has no metadata page yet.
        if file.metadata()?.len() == 0 {
            debug!(path = %path.display(), "empty database file, starting fresh");
            return Ok(Self {
                file: Some(file),
                path: path.to_path_buf(),
                page_size: options.page_size,
                metadata: Metadata::new(options.page_size as u32),
            });
        }

        let mut header = [0u8; METADATA_HEADER_SIZE];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut header)
            .map_err(|source| Error::ReadPage {
                page_id: PageId::NULL,
                source,
            })?;

        let stored = Metadata::peek_page_size(&header)? as usize;
        let page_size = if stored == options.page_size {
            stored
        } else if options.adopt_stored_page_size {
            warn!(
                path = %path.display(),
                stored,
                requested = options.page_size,
                "page size mismatch, using the size stored in the file"
            );
            stored
        } else {
            return Err(Error::PageSizeMismatch {
                stored,
                requested: options.page_size,
            });
        };
        validate_page_size(page_size)?;

        let mut store = Self {
            file: Some(file),
            path: path.to_path_buf(),
            page_size,
            metadata: Metadata::new(page_size as u32),
        };
        let page = store.read_page(PageId::NULL)?;
        store.metadata = Metadata::read_from_buffer(page.as_slice())?;

        debug!(
            path = %path.display(),
            page_size,
            max_page_id = store.metadata.max_page_id.0,
            released = store.metadata.released_pages.len(),
            "opened database file"
        );
        Ok(store)
    }

    /// Create a zeroed, page-sized buffer for `id`.
    pub fn new_page(&self, id: PageId) -> Page {
        Page::new(id, self.page_size)
    }

    /// Read a page from disk.
    ///
    /// # Errors
    /// - [`Error::InvalidPageId`] if the page was never allocated.
    /// - [`Error::ReadPage`] on a short read or I/O failure.
    pub fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        self.check_page_id(page_id)?;
        let offset = page_id.offset(self.page_size);
        let mut page = self.new_page(page_id);

        let file = self.file.as_mut().ok_or(Error::FileClosed)?;
        file.seek(SeekFrom::Start(offset))
            .and_then(|_| file.read_exact(page.as_mut_slice()))
            .map_err(|source| Error::ReadPage { page_id, source })?;

        trace!(page_id = page_id.0, "read page");
        Ok(page)
    }

    /// Write a page to disk at `page.id() × page_size`.
    ///
    /// # Errors
    /// - [`Error::InvalidPageId`] if the page was never allocated.
    /// - [`Error::WritePage`] on I/O failure or a buffer of the wrong size.
    pub fn write_page(&mut self, page: &Page) -> Result<()> {
        let page_id = page.id();
        self.check_page_id(page_id)?;
        if page.size() != self.page_size {
            return Err(Error::WritePage {
                page_id,
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("buffer is {} bytes, pages are {}", page.size(), self.page_size),
                ),
            });
        }
        let offset = page_id.offset(self.page_size);

        let file = self.file.as_mut().ok_or(Error::FileClosed)?;
        file.seek(SeekFrom::Start(offset))
            .and_then(|_| file.write_all(page.as_slice()))
            .map_err(|source| Error::WritePage { page_id, source })?;

        trace!(page_id = page_id.0, "wrote page");
        Ok(())
    }

    /// Hand out a page ID for a new page.
    ///
    /// Released IDs are reused most-recent first; otherwise `max_page_id`
    /// grows by one. `max_page_id` never decreases.
    pub fn allocate_page_id(&mut self) -> PageId {
        if let Some(id) = self.metadata.released_pages.pop() {
            trace!(page_id = id.0, "reused released page");
            return id;
        }
        self.metadata.max_page_id = PageId::new(self.metadata.max_page_id.0 + 1);
        trace!(page_id = self.metadata.max_page_id.0, "allocated new page");
        self.metadata.max_page_id
    }

    /// Return a page ID for reuse.
    ///
    /// IDs that were never allocated, the metadata page, and IDs already
    /// released are ignored.
    pub fn release_page_id(&mut self, page_id: PageId) {
        if page_id.is_null()
            || page_id > self.metadata.max_page_id
            || self.metadata.released_pages.contains(&page_id)
        {
            debug!(page_id = page_id.0, "ignoring release of unallocated page");
            return;
        }
        self.metadata.released_pages.push(page_id);
        trace!(page_id = page_id.0, "released page");
    }

    /// Persist metadata to page 0 and sync the file, keeping it open.
    pub fn flush(&mut self) -> Result<()> {
        self.write_metadata()?;
        let file = self.file.as_mut().ok_or(Error::FileClosed)?;
        file.sync_all()?;
        debug!(path = %self.path.display(), "flushed database file");
        Ok(())
    }

    /// Persist metadata to page 0, sync, and close the file.
    ///
    /// Closing an already closed store is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.file.is_none() {
            return Ok(());
        }
        let result = self.flush();
        self.file = None;
        debug!(path = %self.path.display(), "closed database file");
        result
    }

    fn write_metadata(&mut self) -> Result<()> {
        let mut page = self.new_page(PageId::NULL);
        self.metadata.write_to_buffer(page.as_mut_slice())?;
        self.write_page(&page)
    }

    fn check_page_id(&self, page_id: PageId) -> Result<()> {
        if page_id > self.metadata.max_page_id {
            return Err(Error::InvalidPageId(page_id));
        }
        Ok(())
    }

    /// Size of every page in the file.
    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Highest page ID allocated so far.
    #[inline]
    pub fn max_page_id(&self) -> PageId {
        self.metadata.max_page_id
    }

    /// Page IDs waiting to be reused.
    #[inline]
    pub fn released_pages(&self) -> &[PageId] {
        &self.metadata.released_pages
    }

    /// Current in-memory metadata.
    #[inline]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PageStore {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            tracing::error!(path = %self.path.display(), error = %err, "failed to close database file");
        }
    }
}
