//! Page-level scrub-and-defrag engine.
//!
//! The engine copies a database page by page. It walks the schema catalog's
//! b-tree on page 1 and then every schema object's b-tree, zeroing dead space
//! and renumbering live pages contiguously in the destination. Free-list
//! pages are never visited, so they do not reach the destination.
//!
//! ```text
//! Scrubber::run
//!   └── BtreeWalker::walk (page 1, then each schema root)
//!         ├── zero gap + free blocks
//!         ├── walk children (depth-first, allocator hands out numbers)
//!         └── OverflowCopier::copy (per overflowing cell)
//! ```

mod allocator;
mod overflow;
mod state;
mod walker;

#[cfg(test)]
pub(crate) mod testing;

pub use allocator::PageAllocator;
pub use overflow::OverflowCopier;
pub use state::{
    destination_page_count, pointer_map_page_count, ScrubState, ScrubStats, SourceGeometry,
};
pub use walker::BtreeWalker;

use crate::error::Result;
use crate::page::PageBuf;
use crate::storage::{prepare_destination_header, DatabaseHeader, PageSink, PageSource};
use crate::types::PageNumber;
use serde::{Serialize, Serializer};
use tracing::{debug, info};

/// The two page stores a run reads from and writes to
#[derive(Clone, Copy)]
pub struct PageIo<'a> {
    pub source: &'a dyn PageSource,
    pub sink: &'a dyn PageSink,
}

/// Kind of a schema catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaKind {
    Index,
    Table,
    /// Any other catalog type that owns a b-tree
    Other(String),
}

impl SchemaKind {
    /// Parse the catalog's `type` column
    pub fn from_type(ty: &str) -> Self {
        match ty {
            "index" => Self::Index,
            "table" => Self::Table,
            other => Self::Other(other.to_string()),
        }
    }

    /// The catalog's `type` value
    pub fn as_str(&self) -> &str {
        match self {
            Self::Index => "index",
            Self::Table => "table",
            Self::Other(ty) => ty.as_str(),
        }
    }

    /// Position in the copy order: indexes, then tables, then the rest
    fn rank(&self) -> u8 {
        match self {
            Self::Index => 0,
            Self::Table => 1,
            Self::Other(_) => 2,
        }
    }
}

impl Serialize for SchemaKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A schema object that owns a b-tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRoot {
    /// Root page in the source
    pub root_page: PageNumber,
    /// Object name
    pub name: String,
    /// Object kind
    pub kind: SchemaKind,
}

impl SchemaRoot {
    pub fn new(root_page: PageNumber, name: impl Into<String>, kind: SchemaKind) -> Self {
        Self {
            root_page,
            name: name.into(),
            kind,
        }
    }
}

/// Where a schema object's root page moved to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootMapping {
    pub old_root: PageNumber,
    pub new_root: PageNumber,
    pub name: String,
    pub kind: SchemaKind,
}

/// Put schema roots in copy order.
///
/// Indexes come first, then tables, then every other kind, each group by
/// ascending source root page. Entries without a root page are dropped.
pub fn order_schema_roots(mut roots: Vec<SchemaRoot>) -> Vec<SchemaRoot> {
    roots.retain(|root| !root.root_page.is_none());
    roots.sort_by_key(|root| (root.kind.rank(), root.root_page));
    roots
}

/// Outcome of a completed copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrubReport {
    pub page_size: u32,
    pub usable_size: u32,
    pub source_page_count: u32,
    pub free_page_count: u32,
    pub pointer_map_pages: u32,
    pub dest_page_count: u32,
    #[serde(flatten)]
    pub stats: ScrubStats,
    /// Root page moves, in the order the b-trees were copied
    pub root_mappings: Vec<RootMapping>,
}

/// Drives one copy from a source page store to a destination page store
pub struct Scrubber<'a> {
    state: ScrubState,
    walker: BtreeWalker<'a>,
}

impl<'a> Scrubber<'a> {
    /// Read page 1, compute the destination geometry and prepare the
    /// destination file header.
    pub fn new(
        source: &'a dyn PageSource,
        sink: &'a dyn PageSink,
        geometry: SourceGeometry,
    ) -> Result<Self> {
        let mut page1 = PageBuf::zeroed(geometry.page_size as usize)?;
        source.read_page(PageNumber::FIRST, &mut page1)?;

        let header = DatabaseHeader::read(&page1)?;
        let state = ScrubState::new(geometry, &header)?;
        prepare_destination_header(&mut page1, state.dest_page_count());

        let walker = BtreeWalker::new(PageIo { source, sink }, page1, geometry.page_size)?;
        Ok(Self { state, walker })
    }

    /// Geometry and counters computed so far
    pub fn state(&self) -> &ScrubState {
        &self.state
    }

    /// Copy the schema catalog and every schema object's b-tree
    pub fn run(mut self, roots: Vec<SchemaRoot>) -> Result<ScrubReport> {
        info!(
            source_pages = self.state.source_page_count(),
            dest_pages = self.state.dest_page_count(),
            "copying b-trees"
        );
        self.walker.walk(&mut self.state, PageNumber::FIRST, 0, true)?;

        let roots = order_schema_roots(roots);
        let mut root_mappings = Vec::with_capacity(roots.len());
        for root in roots {
            let new_root = self.walker.walk(&mut self.state, root.root_page, 0, true)?;
            debug!(
                name = %root.name,
                kind = root.kind.as_str(),
                old_root = root.root_page.value(),
                new_root = new_root.value(),
                "copied b-tree"
            );
            root_mappings.push(RootMapping {
                old_root: root.root_page,
                new_root,
                name: root.name,
                kind: root.kind,
            });
        }

        let stats = self.state.finish()?;
        info!(
            pages_written = stats.pages_written,
            overflow_pages = stats.overflow_pages,
            bytes_zeroed = stats.bytes_zeroed,
            "copy complete"
        );

        Ok(ScrubReport {
            page_size: self.state.page_size(),
            usable_size: self.state.usable_size(),
            source_page_count: self.state.source_page_count(),
            free_page_count: self.state.free_page_count(),
            pointer_map_pages: self.state.pointer_map_pages(),
            dest_page_count: self.state.dest_page_count(),
            stats,
            root_mappings,
        })
    }
}
