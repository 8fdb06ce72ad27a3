//! Source database: a read snapshot plus raw page reads.

use crate::connection::{open_connection, pragma_u32};
use crate::error::{Result, ScrubError};
use crate::scrub::{SchemaKind, SchemaRoot, SourceGeometry};
use crate::storage::FilePageSource;
use crate::types::PageNumber;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Source database held in a read transaction for the length of a copy.
///
/// Pages are read through a separate file descriptor. The connection is
/// closed before that descriptor so its locks are held until the end.
pub struct SourceDatabase {
    path: PathBuf,
    conn: Option<Connection>,
    pages: FilePageSource,
    geometry: SourceGeometry,
}

impl SourceDatabase {
    /// Open the source, optionally checkpoint its WAL, and start the read
    /// transaction the copy runs under.
    pub fn open(path: &Path, checkpoint: bool) -> Result<Self> {
        let conn = open_connection(path, OpenFlags::SQLITE_OPEN_READ_WRITE, "source")?;

        // Fails early on files that are not databases
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
            .map_err(ScrubError::sqlite("cannot read the source schema"))?;

        if checkpoint {
            let busy: i64 = conn
                .query_row("PRAGMA wal_checkpoint(FULL)", [], |row| row.get(0))
                .map_err(ScrubError::sqlite("cannot checkpoint the source database"))?;
            if busy != 0 {
                return Err(ScrubError::invalid_operation(
                    "cannot checkpoint the source database: it is busy",
                ));
            }
        }

        conn.execute_batch("BEGIN")
            .map_err(ScrubError::sqlite("cannot start a read transaction on the source database"))?;
        // The snapshot is taken by the first read inside the transaction
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
            .map_err(ScrubError::sqlite("cannot start a read transaction on the source database"))?;

        let geometry = SourceGeometry {
            page_size: pragma_u32(&conn, "page_size", "the page size")?,
            page_count: pragma_u32(&conn, "page_count", "the size of the source database")?,
            free_page_count: pragma_u32(
                &conn,
                "freelist_count",
                "the free-list size of the source database",
            )?,
        };
        debug!(
            path = %path.display(),
            page_size = geometry.page_size,
            pages = geometry.page_count,
            free_pages = geometry.free_page_count,
            "opened source database"
        );

        let pages = FilePageSource::open(path, geometry.page_size)?;
        Ok(Self {
            path: path.to_path_buf(),
            conn: Some(conn),
            pages,
            geometry,
        })
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| ScrubError::invalid_operation("source database is closed"))
    }

    /// Sizes measured when the snapshot was taken
    pub fn geometry(&self) -> SourceGeometry {
        self.geometry
    }

    /// Raw page access to the source file
    pub fn pages(&self) -> &FilePageSource {
        &self.pages
    }

    /// Every schema catalog entry that owns a b-tree
    pub fn schema_roots(&self) -> Result<Vec<SchemaRoot>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT rootpage, name, type FROM sqlite_master WHERE coalesce(rootpage, 0) > 0")
            .map_err(ScrubError::sqlite("cannot list the source schema"))?;
        let roots = stmt
            .query_map([], |row| {
                let ty: String = row.get(2)?;
                Ok(SchemaRoot::new(
                    PageNumber::new(row.get(0)?),
                    row.get::<_, String>(1)?,
                    SchemaKind::from_type(&ty),
                ))
            })
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(ScrubError::sqlite("cannot list the source schema"))?;
        Ok(roots)
    }

    /// End the read transaction and close the connection
    pub fn finish(mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.execute_batch("COMMIT")
                .map_err(ScrubError::sqlite("cannot end the read transaction on the source database"))?;
            conn.close()
                .map_err(|(_, e)| ScrubError::sqlite("cannot close the source database")(e))?;
        }
        Ok(())
    }
}

impl Drop for SourceDatabase {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = conn.execute_batch("COMMIT") {
                warn!(path = %self.path.display(), error = %e, "failed to end source read transaction");
            }
        }
    }
}
