//! Bounds-checked byte cursors over page buffers.
//!
//! The node and metadata codecs never index a page buffer directly; they go
//! through a [`ReadCursor`] or a [`WriteCursor`], which turn every overrun
//! into [`Error::OutOfBounds`] instead of a panic. All integers are
//! little-endian.
//!
//! [`WriteCursor`] tracks two positions so it can fill a slotted page from
//! both ends:
//! ```text
//! ┌──────────────────────┬──────────────┬──────────────────────┐
//! │ directory ──▶        │  free space  │        ◀── payload   │
//! └──────────────────────┴──────────────┴──────────────────────┘
//! 0                    head            tail               buf.len()
//! ```

use crate::common::{Error, Result};

/// Sequential reader over a byte buffer.
#[derive(Debug, Clone)]
pub struct ReadCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ReadCursor<'a> {
    /// Start reading at offset 0.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Start reading at `pos`.
    pub fn at(buf: &'a [u8], pos: usize) -> Result<Self> {
        let mut cursor = Self::new(buf);
        cursor.seek(pos)?;
        Ok(cursor)
    }

    /// Current offset into the buffer.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move to an absolute offset. Seeking to `buf.len()` is allowed.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.buf.len() {
            return Err(self.out_of_bounds(pos, 0));
        }
        self.pos = pos;
        Ok(())
    }

    /// Borrow the next `len` bytes without copying.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| self.out_of_bounds(self.pos, len))?;
        let buf = self.buf;
        let bytes = &buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    fn out_of_bounds(&self, offset: usize, len: usize) -> Error {
        Error::OutOfBounds {
            offset,
            len,
            size: self.buf.len(),
        }
    }
}

/// Two-ended writer over a byte buffer.
///
/// `put_*` calls append at the head (growing right from offset 0);
/// `prepend*` calls write just below the tail (growing left from the end).
/// Either fails once the two regions would overlap.
#[derive(Debug)]
pub struct WriteCursor<'a> {
    buf: &'a mut [u8],
    head: usize,
    tail: usize,
}

impl<'a> WriteCursor<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        let tail = buf.len();
        Self { buf, head: 0, tail }
    }

    /// Offset of the next head write.
    #[inline]
    pub fn head(&self) -> usize {
        self.head
    }

    /// Offset of the most recent tail write.
    #[inline]
    pub fn tail(&self) -> usize {
        self.tail
    }

    /// Bytes still free between head and tail.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.tail - self.head
    }

    /// Append bytes at the head.
    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.remaining() {
            return Err(self.out_of_bounds(self.head, bytes.len()));
        }
        let end = self.head + bytes.len();
        self.buf[self.head..end].copy_from_slice(bytes);
        self.head = end;
        Ok(())
    }

    pub fn put_u8(&mut self, value: u8) -> Result<()> {
        self.put_bytes(&[value])
    }

    pub fn put_u16(&mut self, value: u16) -> Result<()> {
        self.put_bytes(&value.to_le_bytes())
    }

    pub fn put_u32(&mut self, value: u32) -> Result<()> {
        self.put_bytes(&value.to_le_bytes())
    }

    pub fn put_u64(&mut self, value: u64) -> Result<()> {
        self.put_bytes(&value.to_le_bytes())
    }

    /// Write bytes immediately below the tail. Returns the new tail offset,
    /// which is where `bytes` now starts.
    pub fn prepend(&mut self, bytes: &[u8]) -> Result<usize> {
        if bytes.len() > self.remaining() {
            return Err(self.out_of_bounds(self.tail.saturating_sub(bytes.len()), bytes.len()));
        }
        let start = self.tail - bytes.len();
        self.buf[start..self.tail].copy_from_slice(bytes);
        self.tail = start;
        Ok(start)
    }

    pub fn prepend_u8(&mut self, value: u8) -> Result<usize> {
        self.prepend(&[value])
    }

    fn out_of_bounds(&self, offset: usize, len: usize) -> Error {
        Error::OutOfBounds {
            offset,
            len,
            size: self.buf.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_integers_little_endian() {
        let buf = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09];
        let mut cursor = ReadCursor::new(&buf);

        assert_eq!(cursor.read_u8().unwrap(), 0x01);
        assert_eq!(cursor.read_u16().unwrap(), 0x0302);
        assert_eq!(cursor.read_u32().unwrap(), 0x07060504);
        assert_eq!(cursor.position(), 7);
        assert!(matches!(
            cursor.read_u64(),
            Err(Error::OutOfBounds {
                offset: 7,
                len: 8,
                size: 9
            })
        ));
    }

    #[test]
    fn test_read_at_and_seek() {
        let buf = [0u8, 0, 3, b'a', b'b', b'c'];
        let mut cursor = ReadCursor::at(&buf, 2).unwrap();
        let len = cursor.read_u8().unwrap() as usize;
        assert_eq!(cursor.read_bytes(len).unwrap(), b"abc");

        assert!(cursor.seek(6).is_ok());
        assert!(cursor.seek(7).is_err());
        assert!(ReadCursor::at(&buf, 10).is_err());
    }

    #[test]
    fn test_write_head_and_tail() {
        let mut buf = [0u8; 8];
        {
            let mut cursor = WriteCursor::new(&mut buf);
            cursor.put_u16(0xBEEF).unwrap();
            assert_eq!(cursor.prepend(b"xyz").unwrap(), 5);
            assert_eq!(cursor.prepend_u8(3).unwrap(), 4);
            assert_eq!(cursor.head(), 2);
            assert_eq!(cursor.tail(), 4);
            assert_eq!(cursor.remaining(), 2);
        }
        assert_eq!(buf, [0xEF, 0xBE, 0, 0, 3, b'x', b'y', b'z']);
    }

    #[test]
    fn test_write_regions_cannot_cross() {
        let mut buf = [0u8; 4];
        let mut cursor = WriteCursor::new(&mut buf);
        cursor.put_u16(1).unwrap();
        cursor.prepend_u8(9).unwrap();

        assert!(matches!(cursor.put_u16(2), Err(Error::OutOfBounds { .. })));
        assert!(matches!(cursor.prepend(b"ab"), Err(Error::OutOfBounds { .. })));

        cursor.put_u8(7).unwrap();
        assert_eq!(cursor.remaining(), 0);
    }
}
