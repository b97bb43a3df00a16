//! SQL scalar functions registered on every store connection.
//!
//! # Invariants
//! - `fold_case(text)` lowercases with full Unicode rules; SQLite's own
//!   `LIKE` only folds ASCII. Substring filters compare `fold_case(column)`
//!   against a pattern folded the same way in Rust.

use super::DbResult;
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

pub(crate) fn register_functions(conn: &Connection) -> DbResult<()> {
    conn.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|value| value.to_lowercase()))
        },
    )?;
    Ok(())
}
