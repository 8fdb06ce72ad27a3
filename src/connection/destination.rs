//! Destination database: an empty file written page by page.

use crate::connection::{open_connection, pragma_u32};
use crate::error::{Result, ScrubError};
use crate::scrub::RootMapping;
use crate::storage::FilePageSink;
use rusqlite::{params, Connection, OpenFlags, TransactionBehavior};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Destination database held under an exclusive lock while pages are written
pub struct DestinationDatabase {
    path: PathBuf,
    conn: Connection,
    pages: FilePageSink,
}

impl DestinationDatabase {
    /// Create the destination, match the source page size and lock it.
    ///
    /// Fails with [`ScrubError::DestinationNotEmpty`] if the file already
    /// holds more than one page.
    pub fn create(path: &Path, page_size: u32) -> Result<Self> {
        let conn = open_connection(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
            "destination",
        )?;

        conn.pragma_update(None, "page_size", page_size)
            .map_err(ScrubError::sqlite("cannot set the page size on the destination database"))?;
        // Pages bypass the pager, so a rollback journal has nothing to protect
        if let Err(e) = conn.pragma_update_and_check(None, "journal_mode", "OFF", |row| row.get::<_, String>(0)) {
            debug!(error = %e, "could not turn off the destination journal");
        }
        conn.execute_batch("BEGIN EXCLUSIVE")
            .map_err(ScrubError::sqlite("cannot start a write transaction on the destination database"))?;

        let pages = pragma_u32(&conn, "page_count", "the size of the destination")?;
        if pages > 1 {
            return Err(ScrubError::DestinationNotEmpty { pages });
        }

        let sink = FilePageSink::open(path, page_size)?;
        debug!(path = %path.display(), page_size, "created destination database");
        Ok(Self {
            path: path.to_path_buf(),
            conn,
            pages: sink,
        })
    }

    /// Raw page access to the destination file
    pub fn pages(&self) -> &FilePageSink {
        &self.pages
    }

    /// Point the destination's schema catalog at the new root pages.
    ///
    /// The pages are synced and the write connection closed first, so the
    /// catalog update reads exactly what was written. With `verify` set the
    /// result is checked with `PRAGMA quick_check`.
    pub fn patch_schema(self, mappings: &[RootMapping], verify: bool) -> Result<()> {
        let Self { path, conn, pages } = self;

        pages.sync()?;
        conn.close()
            .map_err(|(_, e)| ScrubError::sqlite("cannot close the destination database")(e))?;
        drop(pages);

        let mut conn = open_connection(&path, OpenFlags::SQLITE_OPEN_READ_WRITE, "destination")?;
        conn.pragma_update(None, "writable_schema", true)
            .map_err(ScrubError::sqlite("cannot make the destination schema writable"))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Exclusive)
            .map_err(ScrubError::sqlite("cannot start the schema update transaction"))?;
        let result = (|| {
            let mut stmt = tx.prepare(
                "UPDATE sqlite_master SET rootpage = ?1 WHERE rootpage = ?2 AND name = ?3 AND type = ?4",
            )?;
            for mapping in mappings {
                stmt.execute(params![
                    mapping.new_root.value(),
                    mapping.old_root.value(),
                    mapping.name,
                    mapping.kind.as_str(),
                ])?;
            }
            Ok::<_, rusqlite::Error>(())
        })();
        result.map_err(ScrubError::sqlite("error occurred while updating root pages"))?;
        tx.commit()
            .map_err(ScrubError::sqlite("cannot commit the schema update"))?;
        conn.pragma_update(None, "writable_schema", false)
            .map_err(ScrubError::sqlite("cannot reset writable_schema on the destination"))?;
        conn.close()
            .map_err(|(_, e)| ScrubError::sqlite("cannot close the destination database")(e))?;
        info!(roots = mappings.len(), "patched destination schema");

        if verify {
            // A fresh connection parses the patched catalog
            let conn = open_connection(&path, OpenFlags::SQLITE_OPEN_READ_WRITE, "destination")?;
            let result: String = conn
                .query_row("PRAGMA quick_check", [], |row| row.get(0))
                .map_err(ScrubError::sqlite("cannot verify the destination database"))?;
            if result != "ok" {
                return Err(ScrubError::corruption(format!(
                    "destination failed quick_check: {}",
                    result
                )));
            }
            debug!("destination passed quick_check");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_rejects_non_empty_destination() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dest.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch("CREATE TABLE t(a); CREATE TABLE u(b);").unwrap();
        }

        match DestinationDatabase::create(&path, 4096) {
            Err(ScrubError::DestinationNotEmpty { pages }) => assert_eq!(pages, 3),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("non-empty destination accepted"),
        }
    }

    #[test]
    fn test_creates_empty_destination() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dest.db");
        let dest = DestinationDatabase::create(&path, 1024)?;
        assert!(path.exists());
        assert_eq!(dest.pages().page_size(), 1024);
        Ok(())
    }
}
