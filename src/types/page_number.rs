//! Page number type.

use serde::Serialize;
use std::fmt;

/// 1-based number of a page in a database file.
///
/// The value 0 never names a page; the file format uses it as the
/// "no page" marker (end of an overflow chain, empty free list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct PageNumber(pub u32);

impl PageNumber {
    /// The "no page" marker
    pub const NONE: PageNumber = PageNumber(0);

    /// Page 1, which carries the file header and the schema catalog root
    pub const FIRST: PageNumber = PageNumber(1);

    /// Create a new page number
    pub const fn new(n: u32) -> Self {
        Self(n)
    }

    /// Get the raw page number
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Check if this is the "no page" marker
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Byte offset of this page in the file
    pub const fn file_offset(self, page_size: usize) -> u64 {
        self.0.saturating_sub(1) as u64 * page_size as u64
    }
}

impl fmt::Display for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PageNumber {
    fn from(n: u32) -> Self {
        Self(n)
    }
}

impl From<PageNumber> for u32 {
    fn from(page: PageNumber) -> Self {
        page.0
    }
}
