//! Builders for hand-made database images used by the engine tests.

use crate::error::Result;
use crate::page::{INTERIOR_HEADER_SIZE, LEAF_HEADER_SIZE, RIGHT_CHILD_OFFSET};
use crate::scrub::{ScrubReport, ScrubState, Scrubber, SchemaKind, SchemaRoot, SourceGeometry};
use crate::storage::{DatabaseHeader, MemPageStore, PageSource, MAGIC};
use crate::types::{encode_varint, PageKind, PageNumber, FILE_HEADER_SIZE};

pub const PAGE_SIZE: u32 = 512;

/// Filler for bytes that should not survive a scrub
pub const JUNK: u8 = 0xA5;

pub fn table_leaf_cell(rowid: u64, payload: &[u8]) -> Vec<u8> {
    let mut cell = encode_varint(payload.len() as u64);
    cell.extend(encode_varint(rowid));
    cell.extend_from_slice(payload);
    cell
}

/// Table leaf cell keeping `local` bytes on the page and the rest in a chain
pub fn table_leaf_overflow_cell(rowid: u64, payload: &[u8], local: usize, head: u32) -> Vec<u8> {
    let mut cell = encode_varint(payload.len() as u64);
    cell.extend(encode_varint(rowid));
    cell.extend_from_slice(&payload[..local]);
    cell.extend_from_slice(&head.to_be_bytes());
    cell
}

pub fn table_interior_cell(child: u32, rowid: u64) -> Vec<u8> {
    let mut cell = child.to_be_bytes().to_vec();
    cell.extend(encode_varint(rowid));
    cell
}

pub fn index_leaf_cell(payload: &[u8]) -> Vec<u8> {
    let mut cell = encode_varint(payload.len() as u64);
    cell.extend_from_slice(payload);
    cell
}

/// Index interior cell; with `head` set only `local` payload bytes are kept
pub fn index_interior_cell(child: u32, payload: &[u8], local: usize, head: Option<u32>) -> Vec<u8> {
    let mut cell = child.to_be_bytes().to_vec();
    cell.extend(encode_varint(payload.len() as u64));
    cell.extend_from_slice(&payload[..local]);
    if let Some(head) = head {
        cell.extend_from_slice(&head.to_be_bytes());
    }
    cell
}

/// Build a b-tree page with `cells` packed against the end of the page.
///
/// The gap between the cell pointer array and the cells is filled with
/// [`JUNK`]. On page 1 the first 100 bytes are left for the file header.
pub fn btree_page(page1: bool, kind: PageKind, cells: &[Vec<u8>], right_child: u32) -> Vec<u8> {
    let prefix = if page1 { FILE_HEADER_SIZE } else { 0 };
    let header_size = if kind.is_interior() {
        INTERIOR_HEADER_SIZE
    } else {
        LEAF_HEADER_SIZE
    };

    let mut page = vec![0u8; PAGE_SIZE as usize];
    let mut content = PAGE_SIZE as usize;
    for (i, cell) in cells.iter().enumerate() {
        content -= cell.len();
        page[content..content + cell.len()].copy_from_slice(cell);
        let pointer = prefix + header_size + i * 2;
        page[pointer..pointer + 2].copy_from_slice(&(content as u16).to_be_bytes());
    }
    let pointers_end = prefix + header_size + cells.len() * 2;
    page[pointers_end..content].fill(JUNK);

    let header = &mut page[prefix..prefix + header_size];
    header[0] = kind as u8;
    header[3..5].copy_from_slice(&(cells.len() as u16).to_be_bytes());
    header[5..7].copy_from_slice(&(content as u16).to_be_bytes());
    if kind.is_interior() {
        header[RIGHT_CHILD_OFFSET..RIGHT_CHILD_OFFSET + 4].copy_from_slice(&right_child.to_be_bytes());
    }
    page
}

/// Start of the cell content area of a page
pub fn content_start(page: &[u8], prefix: usize) -> usize {
    u16::from_be_bytes([page[prefix + 5], page[prefix + 6]]) as usize
}

/// Link ascending `(offset, size)` free blocks into the page's free list
/// and fill their bodies with [`JUNK`]. The content area grows down to the
/// first block.
pub fn add_free_blocks(page: &mut [u8], prefix: usize, blocks: &[(usize, usize)]) {
    for (i, &(offset, size)) in blocks.iter().enumerate() {
        let next = blocks.get(i + 1).map_or(0, |&(next, _)| next);
        page[offset..offset + 2].copy_from_slice(&(next as u16).to_be_bytes());
        page[offset + 2..offset + 4].copy_from_slice(&(size as u16).to_be_bytes());
        page[offset + 4..offset + size].fill(JUNK);
    }
    if let Some(&(first, _)) = blocks.first() {
        page[prefix + 1..prefix + 3].copy_from_slice(&(first as u16).to_be_bytes());
        if first < content_start(page, prefix) {
            page[prefix + 5..prefix + 7].copy_from_slice(&(first as u16).to_be_bytes());
        }
    }
}

/// Write a file header for a `PAGE_SIZE` database into the start of page 1
pub fn write_file_header(page1: &mut [u8], page_count: u32, freelist_trunk: u32, freelist_count: u32) {
    page1[..FILE_HEADER_SIZE].fill(0);
    page1[0..16].copy_from_slice(MAGIC);
    page1[16..18].copy_from_slice(&(PAGE_SIZE as u16).to_be_bytes());
    page1[18] = 1;
    page1[19] = 1;
    page1[21] = 64;
    page1[22] = 32;
    page1[23] = 32;
    page1[28..32].copy_from_slice(&page_count.to_be_bytes());
    page1[32..36].copy_from_slice(&freelist_trunk.to_be_bytes());
    page1[36..40].copy_from_slice(&freelist_count.to_be_bytes());
    page1[44..48].copy_from_slice(&4u32.to_be_bytes());
    page1[56..60].copy_from_slice(&1u32.to_be_bytes());
}

/// Assemble pages 1.. into a database image with a matching file header
pub fn database(mut pages: Vec<Vec<u8>>, freelist_trunk: u32, freelist_count: u32) -> MemPageStore {
    let page_count = pages.len() as u32;
    write_file_header(&mut pages[0], page_count, freelist_trunk, freelist_count);

    let store = MemPageStore::new(PAGE_SIZE);
    for (i, page) in pages.iter().enumerate() {
        store.put_page(PageNumber::new(i as u32 + 1), page);
    }
    store
}

fn geometry(source: &MemPageStore) -> Result<(DatabaseHeader, SourceGeometry)> {
    let mut page1 = vec![0u8; PAGE_SIZE as usize];
    source.read_page(PageNumber::FIRST, &mut page1)?;
    let header = DatabaseHeader::read(&page1)?;
    Ok((header, SourceGeometry::from_header(&header)))
}

/// Run-wide state for a source built with [`database`]
pub fn state_for(source: &MemPageStore) -> Result<ScrubState> {
    let (header, geometry) = geometry(source)?;
    ScrubState::new(geometry, &header)
}

/// Copy `source` into a fresh in-memory destination
pub fn scrub(source: &MemPageStore, roots: &[SchemaRoot]) -> Result<(MemPageStore, ScrubReport)> {
    let (_, geometry) = geometry(source)?;
    let sink = MemPageStore::new(PAGE_SIZE);
    let report = Scrubber::new(source, &sink, geometry)?.run(roots.to_vec())?;
    Ok((sink, report))
}

pub fn table_root(page: u32, name: &str) -> SchemaRoot {
    SchemaRoot::new(PageNumber::new(page), name, SchemaKind::Table)
}
