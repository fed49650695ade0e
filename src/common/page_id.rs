//! Page identifier type.

use std::fmt;

/// Identifies a page in the database file.
///
/// Page `N` lives at byte offset `N × page_size`. Page 0 always holds the
/// metadata record, so it doubles as the "no page" sentinel: an empty tree
/// has a root of [`PageId::NULL`] and no node is ever stored there.
///
/// # Example
/// ```
/// use slotkv::PageId;
///
/// let page_id = PageId::new(42);
/// assert!(!page_id.is_null());
/// assert_eq!(page_id.0, 42);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u64);

impl PageId {
    /// Sentinel page ID (the metadata page).
    ///
    /// Used to represent "no root" or "no page allocated yet".
    pub const NULL: PageId = PageId(0);

    /// Create a new PageId.
    #[inline]
    pub fn new(id: u64) -> Self {
        PageId(id)
    }

    /// Check if this is the sentinel page ID.
    #[inline]
    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    /// Byte offset of this page for the given page size.
    #[inline]
    pub fn offset(&self, page_size: usize) -> u64 {
        self.0 * page_size as u64
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Page(NULL)")
        } else {
            write!(f, "Page({})", self.0)
        }
    }
}
