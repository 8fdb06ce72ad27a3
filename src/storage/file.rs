//! File-backed page stores.

use crate::error::{Result, ScrubError};
use crate::storage::{PageSink, PageSource};
use crate::types::PageNumber;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

fn check_page(page: PageNumber, len: usize, page_size: usize) -> Result<()> {
    if page.is_none() {
        return Err(ScrubError::invalid_operation("page 0 does not exist"));
    }
    if len != page_size {
        return Err(ScrubError::invalid_operation(format!(
            "page data must be {} bytes, got {}",
            page_size, len
        )));
    }
    Ok(())
}

/// Read-only page access to a database file
pub struct FilePageSource {
    file: Mutex<File>,
    page_size: usize,
}

impl FilePageSource {
    /// Open a database file for page reads
    pub fn open(path: &Path, page_size: u32) -> Result<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        Ok(Self::from_file(file, page_size))
    }

    /// Wrap an already opened file
    pub fn from_file(file: File, page_size: u32) -> Self {
        Self {
            file: Mutex::new(file),
            page_size: page_size as usize,
        }
    }

    /// Page size this store reads with
    pub fn page_size(&self) -> usize {
        self.page_size
    }
}

impl PageSource for FilePageSource {
    fn read_page(&self, page: PageNumber, buf: &mut [u8]) -> Result<()> {
        check_page(page, buf.len(), self.page_size)?;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(page.file_offset(self.page_size)))?;
        file.read_exact(buf).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                ScrubError::Io(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!("read failed for page {}", page),
                ))
            } else {
                ScrubError::Io(e)
            }
        })?;

        Ok(())
    }
}

/// Write access to a destination database file
pub struct FilePageSink {
    file: Mutex<File>,
    page_size: usize,
}

impl FilePageSink {
    /// Open (creating if needed) a database file for page writes.
    ///
    /// Existing content is not truncated.
    pub fn open(path: &Path, page_size: u32) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Ok(Self::from_file(file, page_size))
    }

    /// Wrap an already opened file
    pub fn from_file(file: File, page_size: u32) -> Self {
        Self {
            file: Mutex::new(file),
            page_size: page_size as usize,
        }
    }

    /// Page size this store writes with
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Sync all written data to disk
    pub fn sync(&self) -> Result<()> {
        self.file.lock().sync_all()?;
        Ok(())
    }
}

impl PageSink for FilePageSink {
    fn write_page(&self, page: PageNumber, data: &[u8]) -> Result<()> {
        check_page(page, data.len(), self.page_size)?;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(page.file_offset(self.page_size)))?;
        file.write_all(data)?;

        Ok(())
    }
}
