//! Storage layer: page stores and the database file header.
//!
//! The scrub engine reads source pages and writes destination pages
//! through the [`PageSource`] and [`PageSink`] traits, so it can run
//! against real files or against in-memory images in tests.

mod file;
mod file_header;
mod memory;

pub use file::{FilePageSink, FilePageSource};
pub use file_header::{prepare_destination_header, DatabaseHeader, MAGIC};
pub use memory::MemPageStore;

use crate::error::Result;
use crate::types::PageNumber;

/// Random-access reads of fixed-size pages
pub trait PageSource: Send + Sync {
    /// Read page `page` into `buf`, which must be exactly one page long
    fn read_page(&self, page: PageNumber, buf: &mut [u8]) -> Result<()>;
}

/// Writes of fixed-size pages
pub trait PageSink: Send + Sync {
    /// Write one page of `data` at page `page`
    fn write_page(&self, page: PageNumber, data: &[u8]) -> Result<()>;
}
