//! Connection bootstrap.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`; tag links rely on it to
//!   cascade.
//! - Returned connections are at the latest schema version.
//! - Returned connections have `fold_case` registered.

use super::functions::register_functions;
use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

enum OpenTarget {
    File(PathBuf),
    Memory,
}

impl Display for OpenTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(_) => f.write_str("file"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

/// Opens (creating if needed) the blog store at `path`.
///
/// Missing parent directories are created. Every call runs the migration
/// check, so a per-request connection is always at the current schema.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_target(OpenTarget::File(path.as_ref().to_path_buf()))
}

/// Opens a private in-memory store. Used by tests and tooling.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_target(OpenTarget::Memory)
}

fn open_target(target: OpenTarget) -> DbResult<Connection> {
    let started_at = Instant::now();
    let result = connect(&target).and_then(|mut conn| {
        configure(&mut conn)?;
        Ok(conn)
    });

    let elapsed = started_at.elapsed().as_millis();
    match &result {
        Ok(_) => info!("event=db_open module=db status=ok mode={target} duration_ms={elapsed}"),
        Err(err) => error!(
            "event=db_open module=db status=error mode={target} duration_ms={elapsed} error={err}"
        ),
    }
    result
}

fn connect(target: &OpenTarget) -> DbResult<Connection> {
    match target {
        OpenTarget::Memory => Ok(Connection::open_in_memory()?),
        OpenTarget::File(path) => {
            if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|source| DbError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            Ok(Connection::open(path)?)
        }
    }
}

fn configure(conn: &mut Connection) -> DbResult<()> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    register_functions(conn)?;
    apply_migrations(conn)
}
