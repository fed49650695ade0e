//! Error types for slotkv.

use thiserror::Error;

use crate::common::PageId;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in slotkv.
///
/// Storage errors are propagated unchanged through the node codec and the
/// B-tree; nothing in the engine retries.
#[derive(Debug, Error)]
pub enum Error {
    /// Key exceeds [`MAX_KEY_SIZE`](crate::common::config::MAX_KEY_SIZE).
    #[error("key exceeds maximum allowed length: {len} bytes (max: {max})")]
    KeyTooLong { len: usize, max: usize },

    /// Value exceeds [`MAX_VALUE_SIZE`](crate::common::config::MAX_VALUE_SIZE).
    #[error("value exceeds maximum allowed length: {len} bytes (max: {max})")]
    ValueTooLong { len: usize, max: usize },

    /// Exact-match lookup found nothing.
    #[error("key not found")]
    NotFound,

    /// `pop` was called on a node with no items.
    ///
    /// This indicates a bug in the caller.
    #[error("node is empty")]
    EmptyNode,

    /// A page could not be read in full.
    #[error("unable to read {page_id}: {source}")]
    ReadPage {
        page_id: PageId,
        #[source]
        source: std::io::Error,
    },

    /// A page could not be written.
    #[error("unable to write {page_id}: {source}")]
    WritePage {
        page_id: PageId,
        #[source]
        source: std::io::Error,
    },

    /// The page ID was never allocated, or names the metadata page.
    #[error("invalid page ID: {0}")]
    InvalidPageId(PageId),

    /// The page store was used after `close`.
    #[error("database file is closed")]
    FileClosed,

    /// The file was written with a different page size than requested.
    #[error("page size mismatch: file uses {stored} bytes, requested {requested}")]
    PageSizeMismatch { stored: usize, requested: usize },

    /// A cursor access fell outside its buffer, usually a corrupt page.
    #[error("access of {len} bytes at offset {offset} exceeds buffer of {size} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },

    /// A node does not fit in a single page.
    #[error("node {page_id} needs {size} bytes but pages hold {max}")]
    NodeOverflow {
        page_id: PageId,
        size: usize,
        max: usize,
    },

    /// The released-page list no longer fits in the metadata page.
    #[error("{released} released pages do not fit in the metadata page (capacity: {capacity})")]
    MetadataOverflow { released: usize, capacity: usize },

    /// Options failed validation.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// I/O error from file operations other than page reads and writes.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
