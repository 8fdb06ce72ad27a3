//! Destination page-number allocation.

use crate::types::PageNumber;

/// Hands out destination page numbers in increasing order, skipping the
/// reserved lock page.
#[derive(Debug, Clone)]
pub struct PageAllocator {
    cursor: u32,
    lock_page: u32,
}

impl PageAllocator {
    /// Create an allocator whose cursor starts at page 1
    pub fn new(lock_page: PageNumber) -> Self {
        Self {
            cursor: 1,
            lock_page: lock_page.value(),
        }
    }

    /// Current cursor value: the number the next page to be written takes
    pub fn current(&self) -> PageNumber {
        PageNumber::new(self.cursor)
    }

    /// Advance the cursor and return the new value
    pub fn next_page_number(&mut self) -> PageNumber {
        self.cursor += 1;
        if self.cursor == self.lock_page {
            self.cursor += 1;
        }
        PageNumber::new(self.cursor)
    }
}
