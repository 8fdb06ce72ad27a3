//! Overflow chain copying.

use crate::error::{Result, ScrubError};
use crate::page::PageBuf;
use crate::scrub::state::ScrubState;
use crate::scrub::PageIo;
use crate::types::PageNumber;
use tracing::trace;

/// Size of the "next page" pointer at the start of every overflow page
const NEXT_POINTER_SIZE: usize = 4;

/// Copies overflow chains page by page through one reusable buffer
pub struct OverflowCopier {
    buf: PageBuf,
}

impl OverflowCopier {
    /// Allocate the chain buffer
    pub fn new(page_size: u32) -> Result<Self> {
        Ok(Self {
            buf: PageBuf::zeroed(page_size as usize)?,
        })
    }

    /// Copy the chain that starts at source page `head` and carries
    /// `remaining` payload bytes.
    ///
    /// The destination number of `head` must already be allocated; it is the
    /// state's current page number. Every further link is renumbered as it
    /// is copied, and the unused tail of the last page is zeroed.
    pub fn copy(
        &mut self,
        state: &mut ScrubState,
        io: PageIo<'_>,
        head: PageNumber,
        mut remaining: u64,
    ) -> Result<()> {
        let usable = state.usable_size() as usize;
        let capacity = (usable - NEXT_POINTER_SIZE) as u64;
        let mut page = head;

        while remaining > 0 && !page.is_none() {
            state.mark_visited(page)?;
            io.source.read_page(page, &mut self.buf)?;

            if remaining >= capacity {
                remaining -= capacity;
            } else {
                let tail = NEXT_POINTER_SIZE + remaining as usize;
                self.buf[tail..usable].fill(0);
                state.record_zeroed(usable - tail);
                remaining = 0;
            }

            let next = PageNumber::new(self.buf.read_u32(0));
            let dest_page = state.current_page_number();
            if !next.is_none() {
                if remaining == 0 {
                    return Err(ScrubError::corruption(format!(
                        "corruption on page {} of source database (overflow chain continues past its payload)",
                        page
                    )));
                }
                let dest_next = state.next_page_number();
                self.buf.write_u32(0, dest_next.value());
            }

            state.write_page(io.sink, dest_page, &self.buf)?;
            state.record_overflow_page();
            trace!(source = page.value(), dest = dest_page.value(), "copied overflow page");
            page = next;
        }

        if remaining > 0 {
            return Err(ScrubError::corruption(format!(
                "corruption on page {} of source database (overflow chain is {} bytes short)",
                head, remaining
            )));
        }
        Ok(())
    }
}
