//! # Btree Scrub
//!
//! Copies a database file while zeroing every byte of deleted content,
//! dropping free-list pages and renumbering the remaining pages
//! contiguously. The copy walks the on-disk b-trees directly instead of
//! rebuilding the database row by row.
//!
//! ## Architecture
//!
//! - **Page Layer** (`page`): b-tree page header and payload split rules
//! - **Storage Layer** (`storage`): page source/sink traits, file and memory stores, file header
//! - **Scrub Engine** (`scrub`): b-tree walker, overflow copier, page allocator
//! - **Connection Layer** (`connection`): source snapshot and destination catalog patch
//!
//! ## Usage
//!
//! ```rust,ignore
//! use btree_scrub::{scrub_and_defrag, ScrubConfig};
//!
//! let config = ScrubConfig::new("live.db", "clean.db").verify(true);
//! let report = scrub_and_defrag(&config)?;
//! println!("{} pages written", report.stats.pages_written);
//! ```

pub mod connection;
pub mod error;
pub mod page;
pub mod scrub;
pub mod storage;
pub mod types;

pub use error::{Result, ScrubError};
pub use scrub::{RootMapping, SchemaKind, SchemaRoot, ScrubReport, ScrubStats, Scrubber, SourceGeometry};
pub use types::PageNumber;

use connection::{DestinationDatabase, SourceDatabase};
use std::path::{Path, PathBuf};
use tracing::info;

/// Scrub run configuration
#[derive(Debug, Clone)]
pub struct ScrubConfig {
    /// Database to copy
    pub source: PathBuf,
    /// File to create; must not hold a database yet
    pub destination: PathBuf,
    /// Checkpoint the source write-ahead log before copying (default: true)
    pub checkpoint: bool,
    /// Run `PRAGMA quick_check` on the finished copy (default: false)
    pub verify: bool,
}

impl ScrubConfig {
    /// Create a new configuration with default settings
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(source: P, destination: Q) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            checkpoint: true,
            verify: false,
        }
    }

    /// Enable or disable the source checkpoint
    pub fn checkpoint(mut self, enabled: bool) -> Self {
        self.checkpoint = enabled;
        self
    }

    /// Enable or disable verification of the copy
    pub fn verify(mut self, enabled: bool) -> Self {
        self.verify = enabled;
        self
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Copy `config.source` to `config.destination`, zeroing deleted content
/// and dropping free pages.
///
/// On failure the destination is left incomplete and should be deleted by
/// the caller. The source read transaction is closed either way.
pub fn scrub_and_defrag(config: &ScrubConfig) -> Result<ScrubReport> {
    if same_file(&config.source, &config.destination) {
        return Err(ScrubError::invalid_operation(
            "source and destination are the same file",
        ));
    }

    let source = SourceDatabase::open(&config.source, config.checkpoint)?;
    let copied = copy_into(&source, config);
    let closed = source.finish();
    let report = copied?;
    closed?;

    info!(
        source = %config.source.display(),
        destination = %config.destination.display(),
        dest_pages = report.dest_page_count,
        "scrub complete"
    );
    Ok(report)
}

fn copy_into(source: &SourceDatabase, config: &ScrubConfig) -> Result<ScrubReport> {
    let geometry = source.geometry();
    let destination = DestinationDatabase::create(&config.destination, geometry.page_size)?;
    let roots = source.schema_roots()?;

    let report = Scrubber::new(source.pages(), destination.pages(), geometry)?.run(roots)?;
    destination.patch_schema(&report.root_mappings, config.verify)?;
    Ok(report)
}
