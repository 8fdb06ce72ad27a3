//! B-tree page header.
//!
//! The page header occupies the first bytes of each b-tree page (after the
//! 100-byte file header on page 1) and describes the page contents.

use crate::types::PageKind;

/// Size of the page header for leaf pages (no right child pointer)
pub const LEAF_HEADER_SIZE: usize = 8;

/// Size of the page header for interior pages (includes right child pointer)
pub const INTERIOR_HEADER_SIZE: usize = 12;

/// Offset of the right-most child pointer within an interior page header
pub const RIGHT_CHILD_OFFSET: usize = 8;

/// B-tree page header
///
/// Layout (for leaf pages, 8 bytes):
/// ```text
/// Offset  Size  Description
/// 0       1     Page kind flag
/// 1       2     Offset to first freeblock (0 if none)
/// 3       2     Number of cells on this page
/// 5       2     Offset to start of cell content area (0 means 65536)
/// 7       1     Number of fragmented free bytes
/// ```
///
/// For interior pages, add 4 bytes at offset 8:
/// ```text
/// 8       4     Right-most child page pointer
/// ```
#[derive(Debug, Clone, Copy)]
pub struct BtreePageHeader {
    /// Kind of this page
    pub kind: PageKind,
    /// Offset to the first freeblock, or 0 if there are no freeblocks
    pub first_freeblock: u16,
    /// Number of cells on this page
    pub cell_count: u16,
    /// Offset to the start of the cell content area
    pub content_start: u32,
}

impl BtreePageHeader {
    /// Get the size of this header in bytes
    pub fn size(&self) -> usize {
        if self.kind.is_interior() {
            INTERIOR_HEADER_SIZE
        } else {
            LEAF_HEADER_SIZE
        }
    }

    /// Read a page header from the bytes starting at the header.
    ///
    /// Returns `None` for an unknown page kind or a truncated buffer. The
    /// right child pointer is left in place; callers rewrite it through
    /// [`RIGHT_CHILD_OFFSET`].
    pub fn read(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < LEAF_HEADER_SIZE {
            return None;
        }

        let kind = PageKind::from_byte(bytes[0])?;
        let first_freeblock = u16::from_be_bytes([bytes[1], bytes[2]]);
        let cell_count = u16::from_be_bytes([bytes[3], bytes[4]]);
        let content_start = match u16::from_be_bytes([bytes[5], bytes[6]]) {
            0 => 65536,
            n => u32::from(n),
        };
        if kind.is_interior() && bytes.len() < INTERIOR_HEADER_SIZE {
            return None;
        }

        Some(Self {
            kind,
            first_freeblock,
            cell_count,
            content_start,
        })
    }

    /// Offset of the cell pointer array, relative to the header start
    pub fn cell_pointer_offset(&self) -> usize {
        self.size()
    }

    /// End of the cell pointer array, relative to the header start
    pub fn cell_pointer_array_end(&self) -> usize {
        self.cell_pointer_offset() + self.cell_count as usize * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_header() {
        // kind, first freeblock 100, 5 cells, content at 3500, 10 fragmented bytes
        let bytes = [0x0D, 0x00, 0x64, 0x00, 0x05, 0x0D, 0xAC, 0x0A];
        let header = BtreePageHeader::read(&bytes).unwrap();
        assert_eq!(header.kind, PageKind::TableLeaf);
        assert_eq!(header.first_freeblock, 100);
        assert_eq!(header.cell_count, 5);
        assert_eq!(header.content_start, 3500);
        assert_eq!(header.size(), LEAF_HEADER_SIZE);
        assert_eq!(header.cell_pointer_array_end(), LEAF_HEADER_SIZE + 10);
    }

    #[test]
    fn test_interior_header() {
        let bytes = [0x02, 0, 0, 0, 0x01, 0x01, 0x90, 0, 0, 0, 0, 42];
        let header = BtreePageHeader::read(&bytes).unwrap();
        assert_eq!(header.kind, PageKind::IndexInterior);
        assert_eq!(header.content_start, 400);
        assert_eq!(header.size(), INTERIOR_HEADER_SIZE);
        assert_eq!(header.cell_pointer_offset(), RIGHT_CHILD_OFFSET + 4);
    }

    #[test]
    fn test_zero_content_start_means_64k() {
        let bytes = [0x0D, 0, 0, 0, 0, 0, 0, 0];
        let header = BtreePageHeader::read(&bytes).unwrap();
        assert_eq!(header.content_start, 65536);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(BtreePageHeader::read(&[0x07, 0, 0, 0, 0, 0, 0, 0]).is_none());
        assert!(BtreePageHeader::read(&[0x05, 0, 0, 0, 0, 0, 0, 0]).is_none());
        assert!(BtreePageHeader::read(&[0x0D, 0, 0]).is_none());
    }
}
