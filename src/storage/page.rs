//! Page - the fixed-size unit of storage.
//!
//! A [`Page`] is a raw, page-sized byte buffer tagged with the [`PageId`]
//! it is read from or written to. It is the unit of I/O between the
//! [`PageStore`](crate::storage::PageStore) and the node/metadata codecs.

use crate::common::PageId;

/// A page of data.
///
/// # Memory Layout
/// The buffer length is always exactly the store's configured page size.
/// Page `N` occupies bytes `[N × page_size, (N + 1) × page_size)` of the
/// file; there is no page header beyond what the node or metadata codec
/// writes itself.
///
/// # Example
/// ```
/// use slotkv::{Page, PageId};
///
/// let mut page = Page::new(PageId::new(1), 4096);
/// page.as_mut_slice()[0] = 0xFF;
/// assert_eq!(page.as_slice()[0], 0xFF);
/// ```
pub struct Page {
    id: PageId,
    data: Box<[u8]>,
}

impl Page {
    /// Create a new zeroed page.
    pub fn new(id: PageId, page_size: usize) -> Self {
        Self {
            id,
            data: vec![0u8; page_size].into_boxed_slice(),
        }
    }

    /// The page this buffer belongs to.
    #[inline]
    pub fn id(&self) -> PageId {
        self.id
    }

    /// Get immutable slice of page data.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get mutable slice of page data.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Get the size of the page.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.id)
            .field("size", &self.data.len())
            .finish()
    }
}
