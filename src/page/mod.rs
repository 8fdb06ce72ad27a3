//! Page layer: raw page buffers and the b-tree page format.
//!
//! A b-tree page is laid out as:
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │     (page 1 only) 100-byte database file header     │
//! ├────────────────────────────────────────────────────┤
//! │                 B-tree page header                  │
//! ├────────────────────────────────────────────────────┤
//! │                 Cell pointer array                  │
//! ├────────────────────────────────────────────────────┤
//! │              Unallocated space (gap)                │
//! ├────────────────────────────────────────────────────┤
//! │        Cell content area (cells + free blocks)      │
//! ├────────────────────────────────────────────────────┤
//! │                  Reserved bytes                     │
//! └────────────────────────────────────────────────────┘
//! ```

mod cell;
mod header;

pub use cell::{max_local, min_local, split_payload, PayloadSplit};
pub use header::{BtreePageHeader, INTERIOR_HEADER_SIZE, LEAF_HEADER_SIZE, RIGHT_CHILD_OFFSET};

use crate::error::{Result, ScrubError};

/// A raw page buffer sized to the database page size
#[derive(Clone, PartialEq, Eq)]
pub struct PageBuf {
    data: Vec<u8>,
}

impl PageBuf {
    /// Allocate a zeroed page buffer.
    ///
    /// Allocation failure is reported as [`ScrubError::OutOfMemory`]
    /// instead of aborting the process.
    pub fn zeroed(page_size: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(page_size)
            .map_err(|_| ScrubError::OutOfMemory)?;
        data.resize(page_size, 0);
        Ok(Self { data })
    }

    /// Read a big-endian u16. Callers check bounds first.
    pub fn read_u16(&self, offset: usize) -> u16 {
        u16::from_be_bytes([self.data[offset], self.data[offset + 1]])
    }

    /// Read a big-endian u32. Callers check bounds first.
    pub fn read_u32(&self, offset: usize) -> u32 {
        u32::from_be_bytes([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ])
    }

    /// Write a big-endian u32. Callers check bounds first.
    pub fn write_u32(&mut self, offset: usize, value: u32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
    }
}

impl std::fmt::Debug for PageBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageBuf").field("len", &self.data.len()).finish()
    }
}

impl std::ops::Deref for PageBuf {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl std::ops::DerefMut for PageBuf {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_page() -> Result<()> {
        let page = PageBuf::zeroed(512)?;
        assert_eq!(page.len(), 512);
        assert!(page.iter().all(|&b| b == 0));
        Ok(())
    }

    #[test]
    fn test_integer_accessors() -> Result<()> {
        let mut page = PageBuf::zeroed(512)?;
        page.write_u32(8, 0x0102_0304);
        assert_eq!(&page[8..12], &[1, 2, 3, 4]);
        assert_eq!(page.read_u32(8), 0x0102_0304);
        assert_eq!(page.read_u16(10), 0x0304);
        Ok(())
    }
}
