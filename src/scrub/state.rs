//! Run-wide scrub state: page geometry, destination numbering and counters.

use crate::error::{Result, ScrubError};
use crate::scrub::allocator::PageAllocator;
use crate::storage::{DatabaseHeader, PageSink};
use crate::types::{lock_page_number, PageNumber};
use serde::Serialize;
use tracing::{debug, trace};

/// Sizes measured on the source before the copy starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceGeometry {
    /// Page size in bytes
    pub page_size: u32,
    /// Total pages in the source
    pub page_count: u32,
    /// Pages on the source free list
    pub free_page_count: u32,
}

impl SourceGeometry {
    /// Take the geometry straight from a file header
    pub fn from_header(header: &DatabaseHeader) -> Self {
        Self {
            page_size: header.page_size,
            page_count: header.page_count,
            free_page_count: header.freelist_count,
        }
    }
}

/// Counters collected while copying
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrubStats {
    /// Pages written to the destination
    pub pages_written: u32,
    /// Overflow pages among them
    pub overflow_pages: u32,
    /// Bytes of dead space overwritten with zeros
    pub bytes_zeroed: u64,
}

/// Source pages already read during this run
#[derive(Debug)]
struct VisitedPages {
    bits: Vec<u64>,
}

impl VisitedPages {
    fn new(page_count: u32) -> Result<Self> {
        let words = page_count as usize / 64 + 1;
        let mut bits = Vec::new();
        bits.try_reserve_exact(words)
            .map_err(|_| ScrubError::OutOfMemory)?;
        bits.resize(words, 0);
        Ok(Self { bits })
    }

    /// Mark a page; returns false if it was already marked
    fn insert(&mut self, page: PageNumber) -> bool {
        let n = page.value() as usize;
        let mask = 1u64 << (n % 64);
        let word = &mut self.bits[n / 64];
        let fresh = *word & mask == 0;
        *word |= mask;
        fresh
    }
}

/// Number of pointer-map pages in an auto-vacuum database of `page_count` pages.
///
/// Pointer-map pages start at page 2 and repeat every `usable/5 + 1` pages;
/// one that would land on the lock page moves to the page after it.
pub fn pointer_map_page_count(usable_size: u32, page_count: u32, lock_page: PageNumber) -> u32 {
    let stride = u64::from(usable_size / 5 + 1);
    let last = u64::from(page_count);
    let lock = u64::from(lock_page.value());

    let mut count = 0;
    let mut base = 2u64;
    while base <= last {
        let page = if base == lock { base + 1 } else { base };
        if page <= last {
            count += 1;
        }
        base += stride;
    }
    count
}

/// Destination size after dropping free-list and pointer-map pages.
///
/// When the source reaches past the lock page but the destination does not
/// need to, the lock page no longer occupies a slot and one more page goes.
pub fn destination_page_count(
    source_pages: u32,
    free_pages: u32,
    pointer_map_pages: u32,
    lock_page: PageNumber,
) -> Result<u32> {
    let dropped = u64::from(free_pages) + u64::from(pointer_map_pages);
    if dropped >= u64::from(source_pages) {
        return Err(ScrubError::corruption(format!(
            "free-list holds {} of {} pages in the source database",
            free_pages, source_pages
        )));
    }

    let mut dest = source_pages - dropped as u32;
    if source_pages >= lock_page.value() && dest <= lock_page.value() {
        dest -= 1;
    }
    Ok(dest)
}

/// Everything a single run threads through the walker
#[derive(Debug)]
pub struct ScrubState {
    page_size: u32,
    usable_size: u32,
    source_page_count: u32,
    free_page_count: u32,
    pointer_map_pages: u32,
    dest_page_count: u32,
    lock_page: PageNumber,
    allocator: PageAllocator,
    visited: VisitedPages,
    stats: ScrubStats,
}

impl ScrubState {
    /// Build the state from the measured geometry and the source file header
    pub fn new(geometry: SourceGeometry, header: &DatabaseHeader) -> Result<Self> {
        if geometry.page_size != header.page_size {
            return Err(ScrubError::invalid_db(format!(
                "page size {} does not match the file header ({})",
                geometry.page_size, header.page_size
            )));
        }

        let usable_size = header.usable_size();
        let lock_page = lock_page_number(geometry.page_size);
        let pointer_map_pages = if header.is_auto_vacuum() {
            pointer_map_page_count(usable_size, geometry.page_count, lock_page)
        } else {
            0
        };
        let dest_page_count = destination_page_count(
            geometry.page_count,
            geometry.free_page_count,
            pointer_map_pages,
            lock_page,
        )?;

        debug!(
            page_size = geometry.page_size,
            usable_size,
            source_pages = geometry.page_count,
            free_pages = geometry.free_page_count,
            pointer_map_pages,
            dest_pages = dest_page_count,
            lock_page = lock_page.value(),
            "computed scrub geometry"
        );

        Ok(Self {
            page_size: geometry.page_size,
            usable_size,
            source_page_count: geometry.page_count,
            free_page_count: geometry.free_page_count,
            pointer_map_pages,
            dest_page_count,
            lock_page,
            allocator: PageAllocator::new(lock_page),
            visited: VisitedPages::new(geometry.page_count)?,
            stats: ScrubStats::default(),
        })
    }

    /// Page size in bytes
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Usable bytes per page
    pub fn usable_size(&self) -> u32 {
        self.usable_size
    }

    /// Total pages in the source
    pub fn source_page_count(&self) -> u32 {
        self.source_page_count
    }

    /// Free-list pages in the source
    pub fn free_page_count(&self) -> u32 {
        self.free_page_count
    }

    /// Pointer-map pages in the source
    pub fn pointer_map_pages(&self) -> u32 {
        self.pointer_map_pages
    }

    /// Size of the destination in pages
    pub fn dest_page_count(&self) -> u32 {
        self.dest_page_count
    }

    /// The reserved lock page
    pub fn lock_page(&self) -> PageNumber {
        self.lock_page
    }

    /// Counters so far
    pub fn stats(&self) -> ScrubStats {
        self.stats
    }

    /// Destination number the next page to be written takes
    pub fn current_page_number(&self) -> PageNumber {
        self.allocator.current()
    }

    /// Allocate the next destination page number
    pub fn next_page_number(&mut self) -> PageNumber {
        self.allocator.next_page_number()
    }

    /// Record that a source page is about to be read.
    ///
    /// Rejects page 0, pages past the end of the source, the lock page and
    /// pages already read during this run.
    pub fn mark_visited(&mut self, page: PageNumber) -> Result<()> {
        if page.is_none() || page.value() > self.source_page_count {
            return Err(ScrubError::corruption(format!(
                "corrupt: reference to page {} outside the source database ({} pages)",
                page, self.source_page_count
            )));
        }
        if page == self.lock_page {
            return Err(ScrubError::corruption(format!(
                "corrupt: reference to the lock page {}",
                page
            )));
        }
        if !self.visited.insert(page) {
            return Err(ScrubError::corruption(format!(
                "corrupt: page {} is referenced more than once",
                page
            )));
        }
        Ok(())
    }

    /// Count bytes overwritten with zeros
    pub fn record_zeroed(&mut self, bytes: usize) {
        self.stats.bytes_zeroed += bytes as u64;
    }

    /// Count an overflow page copied
    pub fn record_overflow_page(&mut self) {
        self.stats.overflow_pages += 1;
    }

    /// Write one destination page after checking its number
    pub fn write_page(&mut self, sink: &dyn PageSink, page: PageNumber, data: &[u8]) -> Result<()> {
        if page.is_none() || page.value() > self.dest_page_count || page == self.lock_page {
            return Err(ScrubError::logic(format!(
                "internal logic error or database is corrupt: destination page {} is not \
                 allocatable (destination holds {} pages), please run 'pragma integrity_check' \
                 on the source database",
                page, self.dest_page_count
            )));
        }

        sink.write_page(page, data)?;
        self.stats.pages_written += 1;
        trace!(page = page.value(), "wrote destination page");
        Ok(())
    }

    /// Pages the walk must write: every destination slot except the lock page
    pub fn expected_page_writes(&self) -> u32 {
        if self.lock_page.value() <= self.dest_page_count {
            self.dest_page_count - 1
        } else {
            self.dest_page_count
        }
    }

    /// Check that the walk filled the destination exactly
    pub fn finish(&self) -> Result<ScrubStats> {
        let expected = self.expected_page_writes();
        if self.stats.pages_written != expected {
            return Err(ScrubError::logic(format!(
                "internal logic error or database is corrupt: wrote {} pages but the \
                 destination holds {}, please run 'pragma integrity_check' on the source database",
                self.stats.pages_written, expected
            )));
        }
        Ok(self.stats)
    }
}
