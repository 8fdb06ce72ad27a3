//! Recursive b-tree walker.
//!
//! Each call copies one source page to its destination slot. Before the page
//! is written its dead space (the gap above the cell pointer array and every
//! free block) is zeroed and every child and overflow pointer is rewritten to
//! the destination number handed out by the allocator.

use crate::error::{Result, ScrubError};
use crate::page::{split_payload, BtreePageHeader, PageBuf, RIGHT_CHILD_OFFSET};
use crate::scrub::overflow::OverflowCopier;
use crate::scrub::state::ScrubState;
use crate::scrub::PageIo;
use crate::types::{decode_varint, varint_len, PageKind, PageNumber, FILE_HEADER_SIZE, MAX_BTREE_DEPTH};
use tracing::trace;

/// Size of a child page pointer in an interior cell
const CHILD_POINTER_SIZE: usize = 4;

/// Size of the link/size header at the start of every free block
const FREE_BLOCK_HEADER_SIZE: usize = 4;

fn corrupt(page: PageNumber, check: &str) -> ScrubError {
    ScrubError::corruption(format!(
        "corruption on page {} of source database ({})",
        page, check
    ))
}

/// Zero the body of every free block on a page.
///
/// Returns the number of bytes zeroed, or the check that failed.
fn zero_free_blocks(
    page: &mut [u8],
    first: usize,
    content_start: usize,
    usable: usize,
) -> std::result::Result<usize, &'static str> {
    if first > 0 && first < content_start {
        return Err("free block before the cell content area");
    }

    let mut zeroed = 0;
    let mut offset = first;
    while offset != 0 {
        if offset > usable - FREE_BLOCK_HEADER_SIZE {
            return Err("free block offset past usable size");
        }
        let size = u16::from_be_bytes([page[offset + 2], page[offset + 3]]) as usize;
        if offset + size > usable {
            return Err("free block runs past usable size");
        }
        if size > FREE_BLOCK_HEADER_SIZE {
            page[offset + FREE_BLOCK_HEADER_SIZE..offset + size].fill(0);
            zeroed += size - FREE_BLOCK_HEADER_SIZE;
        }

        let next = u16::from_be_bytes([page[offset], page[offset + 1]]) as usize;
        if next > 0 && next < offset + FREE_BLOCK_HEADER_SIZE {
            return Err("free block list is not ascending");
        }
        offset = next;
    }
    Ok(zeroed)
}

/// Walks source b-trees depth-first and writes their pages to the destination
pub struct BtreeWalker<'a> {
    io: PageIo<'a>,
    /// Page 1 with its rewritten file header, consumed when page 1 is walked
    page1: Option<PageBuf>,
    overflow: OverflowCopier,
}

impl<'a> BtreeWalker<'a> {
    /// Create a walker; `page1` is the in-memory copy of page 1 whose file
    /// header has already been prepared for the destination.
    pub fn new(io: PageIo<'a>, page1: PageBuf, page_size: u32) -> Result<Self> {
        Ok(Self {
            io,
            page1: Some(page1),
            overflow: OverflowCopier::new(page_size)?,
        })
    }

    fn load(&mut self, state: &ScrubState, page: PageNumber) -> Result<(PageBuf, usize)> {
        if page == PageNumber::FIRST {
            let buf = self
                .page1
                .take()
                .ok_or_else(|| ScrubError::logic("page 1 was already copied"))?;
            return Ok((buf, FILE_HEADER_SIZE));
        }

        let mut buf = PageBuf::zeroed(state.page_size() as usize)?;
        self.io.source.read_page(page, &mut buf)?;
        Ok((buf, 0))
    }

    /// Allocate a destination number for the child pointer at `offset`,
    /// rewrite the pointer and copy the child's subtree.
    fn walk_child(
        &mut self,
        state: &mut ScrubState,
        buf: &mut PageBuf,
        offset: usize,
        depth: u32,
    ) -> Result<()> {
        let child = PageNumber::new(buf.read_u32(offset));
        let dest_child = state.next_page_number();
        buf.write_u32(offset, dest_child.value());
        self.walk(state, child, depth + 1, false)?;
        Ok(())
    }

    /// Copy the b-tree rooted at source page `page`.
    ///
    /// Returns the destination number the page was written to. A top-level
    /// root reserves one extra destination number once its subtree is done.
    pub fn walk(
        &mut self,
        state: &mut ScrubState,
        page: PageNumber,
        depth: u32,
        is_root: bool,
    ) -> Result<PageNumber> {
        if depth > MAX_BTREE_DEPTH {
            return Err(ScrubError::corruption(format!(
                "corrupt: b-tree too deep at page {}",
                page
            )));
        }
        state.mark_visited(page)?;

        let (mut buf, prefix) = self.load(state, page)?;
        let dest_page = state.current_page_number();
        let usable = state.usable_size() as usize;

        let header = BtreePageHeader::read(&buf[prefix..]).ok_or_else(|| corrupt(page, "unknown page kind"))?;
        let kind = header.kind;

        // Gap between the cell pointer array and the cell content area
        let content_start = header.content_start as usize;
        let pointers = prefix + header.cell_pointer_offset();
        let pointers_end = prefix + header.cell_pointer_array_end();
        if content_start > usable {
            return Err(corrupt(page, "cell content area starts past usable size"));
        }
        if pointers_end > content_start {
            return Err(corrupt(page, "cell pointer array overlaps cell content area"));
        }
        buf[pointers_end..content_start].fill(0);
        state.record_zeroed(content_start - pointers_end);

        let zeroed = zero_free_blocks(&mut buf, header.first_freeblock as usize, content_start, usable)
            .map_err(|check| corrupt(page, check))?;
        state.record_zeroed(zeroed);

        for i in 0..header.cell_count as usize {
            let mut pc = buf.read_u16(pointers + i * 2) as usize;
            if pc < pointers_end {
                return Err(corrupt(page, "cell pointer inside the page header"));
            }
            if pc + 3 > usable {
                return Err(corrupt(page, "cell pointer past usable size"));
            }

            if kind.is_interior() {
                if pc + CHILD_POINTER_SIZE > usable {
                    return Err(corrupt(page, "child pointer past usable size"));
                }
                self.walk_child(state, &mut buf, pc, depth)?;
                pc += CHILD_POINTER_SIZE;
                if kind == PageKind::TableInterior {
                    continue;
                }
            }

            let (payload_len, len) =
                decode_varint(&buf[pc..usable]).ok_or_else(|| corrupt(page, "truncated payload length"))?;
            pc += len;
            if pc >= usable {
                return Err(corrupt(page, "payload past usable size"));
            }

            let split = split_payload(kind, state.usable_size(), payload_len);
            if !split.has_overflow() {
                continue;
            }

            if kind == PageKind::TableLeaf {
                pc += varint_len(&buf[pc..usable]).ok_or_else(|| corrupt(page, "truncated rowid"))?;
                if pc > usable - 4 {
                    return Err(corrupt(page, "rowid past usable size"));
                }
            }

            let pointer = pc + split.local as usize;
            if pointer > usable - 4 {
                return Err(corrupt(page, "overflow pointer past usable size"));
            }
            let head = PageNumber::new(buf.read_u32(pointer));
            let dest_head = state.next_page_number();
            buf.write_u32(pointer, dest_head.value());
            self.overflow.copy(state, self.io, head, split.overflow)?;
        }

        if kind.is_interior() {
            self.walk_child(state, &mut buf, prefix + RIGHT_CHILD_OFFSET, depth)?;
        }
        if is_root {
            state.next_page_number();
        }

        state.write_page(self.io.sink, dest_page, &buf)?;
        trace!(
            source = page.value(),
            dest = dest_page.value(),
            kind = ?kind,
            cells = header.cell_count,
            depth,
            "copied b-tree page"
        );
        Ok(dest_page)
    }
}
