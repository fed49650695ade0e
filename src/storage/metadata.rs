//! Metadata record stored in page 0.
//!
//! # Layout
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       4     page_size (u32)
//! 4       8     max_page_id (u64)
//! 12      4     released_count (u32)
//! 16      8×N   released page IDs (u64 each)
//! ```
//! All fields are little-endian. Bytes past the last released ID are
//! don't-care.

use crate::common::config::{METADATA_HEADER_SIZE, PAGE_ID_SIZE};
use crate::common::{Error, PageId, Result};
use crate::storage::cursor::{ReadCursor, WriteCursor};

/// Page allocation state persisted across opens.
///
/// Invariant: every ID in `released_pages` is `<= max_page_id` and is not
/// referenced by any live node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Page size every page of the file was written with.
    pub page_size: u32,
    /// Highest page ID handed out so far.
    pub max_page_id: PageId,
    /// Page IDs available for reuse, reused last-in first-out.
    pub released_pages: Vec<PageId>,
}

impl Metadata {
    /// Fresh metadata for a new file: nothing allocated yet.
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size,
            max_page_id: PageId::NULL,
            released_pages: Vec::new(),
        }
    }

    /// Bytes needed to encode this record.
    pub fn serialized_size(&self) -> usize {
        METADATA_HEADER_SIZE + self.released_pages.len() * PAGE_ID_SIZE
    }

    /// Number of released IDs that fit in a page of `page_size` bytes.
    pub fn released_capacity(page_size: usize) -> usize {
        page_size.saturating_sub(METADATA_HEADER_SIZE) / PAGE_ID_SIZE
    }

    /// Encode into the start of `buf`.
    ///
    /// Fails with [`Error::MetadataOverflow`] if the released list does not fit.
    pub fn write_to_buffer(&self, buf: &mut [u8]) -> Result<()> {
        if self.serialized_size() > buf.len() {
            return Err(Error::MetadataOverflow {
                released: self.released_pages.len(),
                capacity: Self::released_capacity(buf.len()),
            });
        }

        let mut cursor = WriteCursor::new(buf);
        cursor.put_u32(self.page_size)?;
        cursor.put_u64(self.max_page_id.0)?;
        cursor.put_u32(self.released_pages.len() as u32)?;
        for id in &self.released_pages {
            cursor.put_u64(id.0)?;
        }
        Ok(())
    }

    /// Decode from the start of `buf`.
    pub fn read_from_buffer(buf: &[u8]) -> Result<Self> {
        let mut cursor = ReadCursor::new(buf);
        let page_size = cursor.read_u32()?;
        let max_page_id = PageId::new(cursor.read_u64()?);
        let released_count = cursor.read_u32()? as usize;

        if released_count > Self::released_capacity(buf.len()) {
            return Err(Error::OutOfBounds {
                offset: METADATA_HEADER_SIZE,
                len: released_count * PAGE_ID_SIZE,
                size: buf.len(),
            });
        }

        let mut released_pages = Vec::with_capacity(released_count);
        for _ in 0..released_count {
            released_pages.push(PageId::new(cursor.read_u64()?));
        }

        Ok(Self {
            page_size,
            max_page_id,
            released_pages,
        })
    }

    /// Read only the page size field, so a file can be checked before its
    /// metadata page is read in full.
    pub fn peek_page_size(buf: &[u8]) -> Result<u32> {
        ReadCursor::new(buf).read_u32()
    }
}
