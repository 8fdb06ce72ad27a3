//! Database file header.
//!
//! The first 100 bytes of page 1 describe the database file.

use crate::error::{Result, ScrubError};
use crate::types::{PageNumber, FILE_HEADER_SIZE, MAX_PAGE_SIZE, MIN_PAGE_SIZE, MIN_USABLE_SIZE};

/// Magic bytes that open every database file
pub const MAGIC: &[u8; 16] = b"SQLite format 3\0";

const OFFSET_PAGE_SIZE: usize = 16;
const OFFSET_RESERVED_BYTES: usize = 20;
const OFFSET_PAGE_COUNT: usize = 28;
const OFFSET_FREELIST_TRUNK: usize = 32;
const OFFSET_FREELIST_COUNT: usize = 36;
const OFFSET_AUTO_VACUUM: usize = 52;
const OFFSET_INCREMENTAL_VACUUM: usize = 64;

/// Fields of the database file header that the scrub engine uses
///
/// Layout (all big-endian):
/// ```text
/// Offset  Size  Description
/// 0       16    Magic string "SQLite format 3\0"
/// 16      2     Page size (1 means 65536)
/// 20      1     Reserved bytes at the end of each page
/// 28      4     Database size in pages
/// 32      4     First free-list trunk page (0 if none)
/// 36      4     Total free-list pages
/// 52      4     Largest root page when auto-vacuum is on, else 0
/// 64      4     Incremental-vacuum flag
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseHeader {
    /// Page size in bytes
    pub page_size: u32,
    /// Bytes reserved at the end of every page
    pub reserved_bytes: u8,
    /// Database size in pages
    pub page_count: u32,
    /// First free-list trunk page
    pub freelist_trunk: PageNumber,
    /// Total number of free-list pages
    pub freelist_count: u32,
    /// Largest root page when auto-vacuum is on
    pub auto_vacuum_root: u32,
    /// Incremental-vacuum flag
    pub incremental_vacuum: u32,
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn write_u32(bytes: &mut [u8], offset: usize, value: u32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

impl DatabaseHeader {
    /// Read and validate a file header from the start of page 1
    pub fn read(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < FILE_HEADER_SIZE {
            return Err(ScrubError::invalid_db("header too short"));
        }

        if &bytes[0..16] != MAGIC {
            return Err(ScrubError::invalid_db("invalid magic bytes"));
        }

        let page_size = match u16::from_be_bytes([bytes[OFFSET_PAGE_SIZE], bytes[OFFSET_PAGE_SIZE + 1]]) {
            1 => MAX_PAGE_SIZE,
            n => u32::from(n),
        };
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) || !page_size.is_power_of_two() {
            return Err(ScrubError::invalid_db(format!(
                "unsupported page size: {}",
                page_size
            )));
        }

        let reserved_bytes = bytes[OFFSET_RESERVED_BYTES];
        let usable = page_size - u32::from(reserved_bytes);
        if usable < MIN_USABLE_SIZE {
            return Err(ScrubError::invalid_db(format!(
                "usable page size {} is below the minimum of {}",
                usable, MIN_USABLE_SIZE
            )));
        }

        Ok(Self {
            page_size,
            reserved_bytes,
            page_count: read_u32(bytes, OFFSET_PAGE_COUNT),
            freelist_trunk: PageNumber::new(read_u32(bytes, OFFSET_FREELIST_TRUNK)),
            freelist_count: read_u32(bytes, OFFSET_FREELIST_COUNT),
            auto_vacuum_root: read_u32(bytes, OFFSET_AUTO_VACUUM),
            incremental_vacuum: read_u32(bytes, OFFSET_INCREMENTAL_VACUUM),
        })
    }

    /// Page size minus the reserved bytes
    pub fn usable_size(&self) -> u32 {
        self.page_size - u32::from(self.reserved_bytes)
    }

    /// Whether the file is auto-vacuum managed (and so carries pointer-map pages)
    pub fn is_auto_vacuum(&self) -> bool {
        self.auto_vacuum_root != 0
    }
}

/// Rewrite the header on the in-memory copy of page 1 for the destination.
///
/// Sets the page count, empties the free list and turns auto-vacuum off.
pub fn prepare_destination_header(page1: &mut [u8], dest_page_count: u32) {
    write_u32(page1, OFFSET_PAGE_COUNT, dest_page_count);
    write_u32(page1, OFFSET_FREELIST_TRUNK, 0);
    write_u32(page1, OFFSET_FREELIST_COUNT, 0);
    write_u32(page1, OFFSET_AUTO_VACUUM, 0);
    write_u32(page1, OFFSET_INCREMENTAL_VACUUM, 0);
}
