//! Echo repository contracts and SQLite implementation.

use crate::model::echo::{Echo, EchoDraft, EchoId};
use crate::repo::{
    bool_to_int, ensure_tables, int_to_bool, like_contains_pattern, RepoError, RepoResult,
    NOW_MS_SQL,
};
use rusqlite::{params, Connection, Row};

/// Filter options for listing echoes. Results are newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EchoListQuery {
    pub published_only: bool,
    /// Case-insensitive substring match on the quote text.
    pub content_contains: Option<String>,
}

pub trait EchoRepository {
    fn create_echo(&self, draft: &EchoDraft) -> RepoResult<EchoId>;
    /// Replaces all fields and resets `created_at` to now.
    fn update_echo(&self, id: EchoId, draft: &EchoDraft) -> RepoResult<()>;
    fn delete_echo(&self, id: EchoId) -> RepoResult<()>;
    fn set_published(&self, id: EchoId, published: bool) -> RepoResult<()>;
    fn get_echo(&self, id: EchoId) -> RepoResult<Option<Echo>>;
    fn list_echoes(&self, query: &EchoListQuery) -> RepoResult<Vec<Echo>>;
}

pub struct SqliteEchoRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEchoRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["echoes"])?;
        Ok(Self { conn })
    }
}

impl EchoRepository for SqliteEchoRepository<'_> {
    fn create_echo(&self, draft: &EchoDraft) -> RepoResult<EchoId> {
        self.conn.execute(
            "INSERT INTO echoes (content, reference, is_published) VALUES (?1, ?2, ?3);",
            params![
                draft.content.as_str(),
                draft.reference.as_str(),
                bool_to_int(draft.is_published),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_echo(&self, id: EchoId, draft: &EchoDraft) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE echoes
                 SET
                    content = ?2,
                    reference = ?3,
                    is_published = ?4,
                    created_at = {NOW_MS_SQL}
                 WHERE id = ?1;"
            ),
            params![
                id,
                draft.content.as_str(),
                draft.reference.as_str(),
                bool_to_int(draft.is_published),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "echo", id });
        }
        Ok(())
    }

    fn delete_echo(&self, id: EchoId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM echoes WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "echo", id });
        }
        Ok(())
    }

    fn set_published(&self, id: EchoId, published: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE echoes SET is_published = ?2 WHERE id = ?1;",
            params![id, bool_to_int(published)],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "echo", id });
        }
        Ok(())
    }

    fn get_echo(&self, id: EchoId) -> RepoResult<Option<Echo>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, content, reference, is_published, created_at
             FROM echoes
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_echo_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_echoes(&self, query: &EchoListQuery) -> RepoResult<Vec<Echo>> {
        let pattern = query.content_contains.as_deref().map(like_contains_pattern);
        let mut stmt = self.conn.prepare(
            "SELECT id, content, reference, is_published, created_at
             FROM echoes
             WHERE (?1 = 0 OR is_published = 1)
               AND (?2 IS NULL OR fold_case(content) LIKE ?2 ESCAPE '\\')
             ORDER BY created_at DESC, id DESC;",
        )?;
        let mut rows = stmt.query(params![bool_to_int(query.published_only), pattern])?;
        let mut echoes = Vec::new();
        while let Some(row) = rows.next()? {
            echoes.push(parse_echo_row(row)?);
        }
        Ok(echoes)
    }
}

fn parse_echo_row(row: &Row<'_>) -> RepoResult<Echo> {
    Ok(Echo {
        id: row.get("id")?,
        content: row.get("content")?,
        reference: row.get("reference")?,
        is_published: int_to_bool(row.get("is_published")?, "echoes.is_published")?,
        created_at: row.get("created_at")?,
    })
}
