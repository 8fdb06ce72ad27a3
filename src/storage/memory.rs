//! In-memory page store.

use crate::error::{Result, ScrubError};
use crate::storage::{PageSink, PageSource};
use crate::types::PageNumber;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::io::{Error, ErrorKind};

/// A database image held in memory, usable as both source and sink
#[derive(Debug)]
pub struct MemPageStore {
    page_size: usize,
    pages: RwLock<BTreeMap<u32, Vec<u8>>>,
}

impl MemPageStore {
    /// Create an empty store
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: page_size as usize,
            pages: RwLock::new(BTreeMap::new()),
        }
    }

    /// Build a store from a contiguous file image
    pub fn from_image(page_size: u32, image: &[u8]) -> Self {
        let store = Self::new(page_size);
        {
            let mut pages = store.pages.write();
            for (i, chunk) in image.chunks(page_size as usize).enumerate() {
                let mut page = chunk.to_vec();
                page.resize(page_size as usize, 0);
                pages.insert(i as u32 + 1, page);
            }
        }
        store
    }

    /// Insert or replace a page
    pub fn put_page(&self, page: PageNumber, data: &[u8]) {
        let mut bytes = data.to_vec();
        bytes.resize(self.page_size, 0);
        self.pages.write().insert(page.value(), bytes);
    }

    /// Copy of a stored page
    pub fn page(&self, page: PageNumber) -> Option<Vec<u8>> {
        self.pages.read().get(&page.value()).cloned()
    }

    /// Numbers of all stored pages, ascending
    pub fn page_numbers(&self) -> Vec<PageNumber> {
        self.pages.read().keys().copied().map(PageNumber::new).collect()
    }

    /// Number of the highest stored page (0 if empty)
    pub fn page_count(&self) -> u32 {
        self.pages.read().keys().next_back().copied().unwrap_or(0)
    }

    /// Contiguous file image; pages never stored read as zeros
    pub fn to_image(&self) -> Vec<u8> {
        let pages = self.pages.read();
        let count = pages.keys().next_back().copied().unwrap_or(0) as usize;
        let mut image = vec![0u8; count * self.page_size];
        for (&number, data) in pages.iter() {
            let offset = (number as usize - 1) * self.page_size;
            image[offset..offset + self.page_size].copy_from_slice(data);
        }
        image
    }
}

impl PageSource for MemPageStore {
    fn read_page(&self, page: PageNumber, buf: &mut [u8]) -> Result<()> {
        if buf.len() != self.page_size {
            return Err(ScrubError::invalid_operation(format!(
                "page data must be {} bytes, got {}",
                self.page_size,
                buf.len()
            )));
        }
        let pages = self.pages.read();
        let data = pages.get(&page.value()).ok_or_else(|| {
            ScrubError::Io(Error::new(
                ErrorKind::UnexpectedEof,
                format!("read failed for page {}", page),
            ))
        })?;
        buf.copy_from_slice(data);
        Ok(())
    }
}

impl PageSink for MemPageStore {
    fn write_page(&self, page: PageNumber, data: &[u8]) -> Result<()> {
        if page.is_none() {
            return Err(ScrubError::invalid_operation("page 0 does not exist"));
        }
        if data.len() != self.page_size {
            return Err(ScrubError::invalid_operation(format!(
                "page data must be {} bytes, got {}",
                self.page_size,
                data.len()
            )));
        }
        self.pages.write().insert(page.value(), data.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_read() -> Result<()> {
        let store = MemPageStore::new(512);
        store.put_page(PageNumber::new(2), b"abc");

        let mut buf = vec![0u8; 512];
        store.read_page(PageNumber::new(2), &mut buf)?;
        assert_eq!(&buf[0..3], b"abc");
        assert!(store.read_page(PageNumber::new(1), &mut buf).is_err());

        assert_eq!(store.page_count(), 2);
        assert_eq!(store.page_numbers(), vec![PageNumber::new(2)]);
        Ok(())
    }

    #[test]
    fn test_image_roundtrip() -> Result<()> {
        let store = MemPageStore::new(512);
        store.write_page(PageNumber::new(2), &[7u8; 512])?;

        let image = store.to_image();
        assert_eq!(image.len(), 1024);
        assert!(image[..512].iter().all(|&b| b == 0));

        let copy = MemPageStore::from_image(512, &image);
        assert_eq!(copy.page(PageNumber::new(2)), Some(vec![7u8; 512]));
        Ok(())
    }
}
