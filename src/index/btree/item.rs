//! Key/value pair stored in B-tree nodes.

use crate::common::config::{MAX_KEY_SIZE, MAX_VALUE_SIZE};
use crate::common::{Error, Result};

/// An immutable key/value pair.
///
/// Both parts are length-checked at construction so they always fit their
/// one-byte length prefix on disk. Empty keys and values are allowed.
///
/// # Example
/// ```
/// use slotkv::Item;
///
/// let item = Item::new(b"key".to_vec(), b"value".to_vec()).unwrap();
/// assert_eq!(item.serialized_size(), 2 + 3 + 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Item {
    key: Vec<u8>,
    value: Vec<u8>,
}

impl Item {
    /// Create an item.
    ///
    /// # Errors
    /// - [`Error::KeyTooLong`] if `key` exceeds [`MAX_KEY_SIZE`].
    /// - [`Error::ValueTooLong`] if `value` exceeds [`MAX_VALUE_SIZE`].
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Result<Self> {
        let key = key.into();
        let value = value.into();
        if key.len() > MAX_KEY_SIZE {
            return Err(Error::KeyTooLong {
                len: key.len(),
                max: MAX_KEY_SIZE,
            });
        }
        if value.len() > MAX_VALUE_SIZE {
            return Err(Error::ValueTooLong {
                len: value.len(),
                max: MAX_VALUE_SIZE,
            });
        }
        Ok(Self { key, value })
    }

    /// Build an item from bytes already known to fit, e.g. decoded from a
    /// one-byte length prefix.
    pub(crate) fn from_parts(key: &[u8], value: &[u8]) -> Self {
        debug_assert!(key.len() <= MAX_KEY_SIZE && value.len() <= MAX_VALUE_SIZE);
        Self {
            key: key.to_vec(),
            value: value.to_vec(),
        }
    }

    #[inline]
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    #[inline]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Take ownership of the value.
    pub fn into_value(self) -> Vec<u8> {
        self.value
    }

    /// Bytes this item occupies in a node's payload region.
    #[inline]
    pub fn serialized_size(&self) -> usize {
        2 + self.key.len() + self.value.len()
    }
}
