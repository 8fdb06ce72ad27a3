//! Common types used throughout the engine.

mod page_number;
mod varint;

pub use page_number::PageNumber;
pub use varint::{decode_varint, varint_len, MAX_VARINT_LEN};
#[cfg(test)]
pub use varint::encode_varint;

/// Size of the database file header that precedes the b-tree content of page 1
pub const FILE_HEADER_SIZE: usize = 100;

/// Smallest page size the file format allows
pub const MIN_PAGE_SIZE: u32 = 512;

/// Largest page size the file format allows
pub const MAX_PAGE_SIZE: u32 = 65536;

/// Smallest usable area (page size minus reserved bytes) the format allows
pub const MIN_USABLE_SIZE: u32 = 480;

/// First byte after the first GiB of the file. The page holding it is
/// reserved for file locking and never stores content.
pub const PENDING_BYTE: u64 = 0x4000_0000;

/// Deepest b-tree the walker will descend into
pub const MAX_BTREE_DEPTH: u32 = 50;

/// Number of the reserved lock page for a given page size.
pub fn lock_page_number(page_size: u32) -> PageNumber {
    PageNumber::new((PENDING_BYTE / u64::from(page_size)) as u32 + 1)
}

/// B-tree page kinds
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Interior page of an index b-tree (child pointer + key per cell)
    IndexInterior = 0x02,
    /// Interior page of a table b-tree (child pointer + rowid per cell)
    TableInterior = 0x05,
    /// Leaf page of an index b-tree
    IndexLeaf = 0x0A,
    /// Leaf page of a table b-tree (rowid + record per cell)
    TableLeaf = 0x0D,
}

impl PageKind {
    /// Check if this is an interior page kind
    pub fn is_interior(self) -> bool {
        matches!(self, Self::TableInterior | Self::IndexInterior)
    }

    /// Convert from byte value
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x02 => Some(Self::IndexInterior),
            0x05 => Some(Self::TableInterior),
            0x0A => Some(Self::IndexLeaf),
            0x0D => Some(Self::TableLeaf),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_kind_conversions() {
        assert!(PageKind::IndexInterior.is_interior());
        assert!(PageKind::TableInterior.is_interior());
        assert!(!PageKind::TableLeaf.is_interior());
        assert!(!PageKind::IndexLeaf.is_interior());

        assert_eq!(PageKind::from_byte(0x0D), Some(PageKind::TableLeaf));
        assert_eq!(PageKind::from_byte(0x02), Some(PageKind::IndexInterior));
        assert_eq!(PageKind::from_byte(0x00), None);
        assert_eq!(PageKind::from_byte(0xFF), None);
    }

    #[test]
    fn test_lock_page_number() {
        assert_eq!(lock_page_number(512), PageNumber::new(2_097_153));
        assert_eq!(lock_page_number(4096), PageNumber::new(262_145));
        assert_eq!(lock_page_number(65536), PageNumber::new(16_385));
    }
}
