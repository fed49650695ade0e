//! Configuration constants and open-time options.

use crate::common::{Error, Result};

/// Default size of a page in bytes (4KB).
///
/// Matches the OS page size on most systems. Every node and the metadata
/// record must fit inside one page.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Smallest page size accepted by [`Options::validate`].
pub const MIN_PAGE_SIZE: usize = 64;

/// Largest page size accepted by [`Options::validate`].
///
/// Slot offsets inside a node page are stored as `u16`, so every byte of a
/// page must be addressable with 16 bits.
pub const MAX_PAGE_SIZE: usize = 1 << 16;

/// Size of an encoded [`PageId`](crate::PageId) in bytes.
pub const PAGE_ID_SIZE: usize = 8;

/// Size of an encoded slot offset in bytes.
pub const SLOT_OFFSET_SIZE: usize = 2;

/// Maximum key length. Keys are prefixed with a one-byte length.
pub const MAX_KEY_SIZE: usize = u8::MAX as usize;

/// Maximum value length. Values are prefixed with a one-byte length.
pub const MAX_VALUE_SIZE: usize = u8::MAX as usize;

/// Fraction of the page a split point is chosen against.
pub const DEFAULT_MIN_FILL_PERCENT: f64 = 0.4;

/// Fraction of the page above which a node is split.
pub const DEFAULT_MAX_FILL_PERCENT: f64 = 0.75;

/// Fixed part of the metadata record: page size, max page id, released count.
pub const METADATA_HEADER_SIZE: usize = 4 + PAGE_ID_SIZE + 4;

/// Split thresholds for B-tree nodes, as fractions of the max node size.
///
/// A node is split once its serialized size exceeds `max`. The split point
/// is the first item at which the running size of the left half exceeds
/// `min`, so the left node ends up near minimum fill and the right node
/// takes the remainder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillFactor {
    pub min: f64,
    pub max: f64,
}

impl FillFactor {
    /// Create a fill factor. See [`FillFactor::validate`] for the accepted range.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Check `0 < min < max <= 1`.
    pub fn validate(&self) -> Result<()> {
        if !(self.min > 0.0 && self.min < self.max && self.max <= 1.0) {
            return Err(Error::InvalidOptions(format!(
                "fill factor must satisfy 0 < min < max <= 1, got min={} max={}",
                self.min, self.max
            )));
        }
        Ok(())
    }

    /// Largest serialized size a node may have without being split.
    #[inline]
    pub fn max_bytes(&self, max_node_size: usize) -> usize {
        (max_node_size as f64 * self.max) as usize
    }

    /// Running size past which the split point is taken.
    #[inline]
    pub fn min_bytes(&self, max_node_size: usize) -> usize {
        (max_node_size as f64 * self.min) as usize
    }
}

impl Default for FillFactor {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_FILL_PERCENT, DEFAULT_MAX_FILL_PERCENT)
    }
}

/// Options resolved once when a database file is opened.
///
/// # Example
/// ```
/// use slotkv::Options;
///
/// let options = Options::default().page_size(8192);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Options {
    /// Size of every page in the file.
    pub page_size: usize,
    /// Node split thresholds.
    pub fill: FillFactor,
    /// When an existing file was written with a different page size, use
    /// the persisted one and log a warning. On by default; when off, the
    /// open fails with `PageSizeMismatch`.
    pub adopt_stored_page_size: bool,
}

impl Options {
    /// Set the page size.
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the node split thresholds.
    pub fn fill(mut self, fill: FillFactor) -> Self {
        self.fill = fill;
        self
    }

    /// Whether to open files written with a different page size.
    pub fn adopt_stored_page_size(mut self, adopt: bool) -> Self {
        self.adopt_stored_page_size = adopt;
        self
    }

    /// Check that the options describe a usable configuration.
    pub fn validate(&self) -> Result<()> {
        validate_page_size(self.page_size)?;
        self.fill.validate()
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            fill: FillFactor::default(),
            adopt_stored_page_size: true,
        }
    }
}

/// Check that a page size lies within [`MIN_PAGE_SIZE`, `MAX_PAGE_SIZE`].
pub fn validate_page_size(page_size: usize) -> Result<()> {
    if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(Error::InvalidOptions(format!(
            "page size must be between {} and {} bytes, got {}",
            MIN_PAGE_SIZE, MAX_PAGE_SIZE, page_size
        )));
    }
    Ok(())
}
