//! SQL connection layer around the page engine.
//!
//! The engine itself only moves pages. Everything that needs the database
//! engine proper goes through here: locking the source into a consistent
//! snapshot, measuring it, listing schema roots, preparing an empty
//! destination, and patching the destination's schema catalog once every
//! page is on disk.

mod destination;
mod source;

pub use destination::DestinationDatabase;
pub use source::SourceDatabase;

use crate::error::{Result, ScrubError};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

fn open_connection(path: &Path, flags: OpenFlags, role: &str) -> Result<Connection> {
    Connection::open_with_flags(path, flags | OpenFlags::SQLITE_OPEN_PRIVATE_CACHE).map_err(
        ScrubError::sqlite(format!(
            "cannot open {} database {}",
            role,
            path.display()
        )),
    )
}

/// Read a single integer pragma
fn pragma_u32(conn: &Connection, name: &str, what: &str) -> Result<u32> {
    conn.pragma_query_value(None, name, |row| row.get::<_, u32>(0))
        .map_err(ScrubError::sqlite(format!("unable to determine {}", what)))
}
