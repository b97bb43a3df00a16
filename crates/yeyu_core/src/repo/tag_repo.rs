//! Per-kind tag repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Tag names are unique within one kind (enforced by the schema).
//! - Deleting a tag removes its links through `ON DELETE CASCADE`; items stay.

use crate::model::content::ContentKind;
use crate::model::tag::{Tag, TagId, TagWithCount};
use crate::repo::{
    ensure_tables, is_unique_violation, like_contains_pattern, RepoError, RepoResult,
};
use rusqlite::{params, Connection};

/// Repository interface for tag vocabulary operations.
pub trait TagRepository {
    fn create_tag(&self, kind: ContentKind, name: &str) -> RepoResult<Tag>;
    fn rename_tag(&self, kind: ContentKind, id: TagId, name: &str) -> RepoResult<Tag>;
    fn delete_tag(&self, kind: ContentKind, id: TagId) -> RepoResult<()>;
    fn get_tag(&self, kind: ContentKind, id: TagId) -> RepoResult<Option<Tag>>;
    fn find_tag_by_name(&self, kind: ContentKind, name: &str) -> RepoResult<Option<Tag>>;
    /// Returns all tags of one kind sorted by name.
    fn list_tags(&self, kind: ContentKind) -> RepoResult<Vec<Tag>>;
    /// Returns tags of one kind with link counts, optionally filtered by a
    /// case-insensitive substring of the name.
    fn list_tags_with_counts(
        &self,
        kind: ContentKind,
        name_contains: Option<&str>,
    ) -> RepoResult<Vec<TagWithCount>>;
}

/// SQLite-backed tag repository.
pub struct SqliteTagRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTagRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        for kind in ContentKind::ALL {
            ensure_tables(conn, &[kind.tag_table(), kind.link_table()])?;
        }
        Ok(Self { conn })
    }
}

impl TagRepository for SqliteTagRepository<'_> {
    fn create_tag(&self, kind: ContentKind, name: &str) -> RepoResult<Tag> {
        self.conn
            .execute(
                &format!("INSERT INTO {} (name) VALUES (?1);", kind.tag_table()),
                [name],
            )
            .map_err(|err| map_name_error(err, kind, name))?;

        Ok(Tag {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    fn rename_tag(&self, kind: ContentKind, id: TagId, name: &str) -> RepoResult<Tag> {
        let changed = self
            .conn
            .execute(
                &format!("UPDATE {} SET name = ?2 WHERE id = ?1;", kind.tag_table()),
                params![id, name],
            )
            .map_err(|err| map_name_error(err, kind, name))?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "tag", id });
        }

        Ok(Tag {
            id,
            name: name.to_string(),
        })
    }

    fn delete_tag(&self, kind: ContentKind, id: TagId) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1;", kind.tag_table()),
            [id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "tag", id });
        }
        Ok(())
    }

    fn get_tag(&self, kind: ContentKind, id: TagId) -> RepoResult<Option<Tag>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, name FROM {} WHERE id = ?1;",
            kind.tag_table()
        ))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
            })),
            None => Ok(None),
        }
    }

    fn find_tag_by_name(&self, kind: ContentKind, name: &str) -> RepoResult<Option<Tag>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, name FROM {} WHERE name = ?1;",
            kind.tag_table()
        ))?;
        let mut rows = stmt.query([name])?;
        match rows.next()? {
            Some(row) => Ok(Some(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
            })),
            None => Ok(None),
        }
    }

    fn list_tags(&self, kind: ContentKind) -> RepoResult<Vec<Tag>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, name FROM {} ORDER BY name ASC, id ASC;",
            kind.tag_table()
        ))?;
        let mut rows = stmt.query([])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
            });
        }
        Ok(tags)
    }

    fn list_tags_with_counts(
        &self,
        kind: ContentKind,
        name_contains: Option<&str>,
    ) -> RepoResult<Vec<TagWithCount>> {
        let pattern = name_contains.map(like_contains_pattern);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT
                t.id,
                t.name,
                (SELECT COUNT(*) FROM {links} l WHERE l.tag_id = t.id) AS link_count
             FROM {tags} t
             WHERE ?1 IS NULL OR fold_case(t.name) LIKE ?1 ESCAPE '\\'
             ORDER BY t.id ASC;",
            links = kind.link_table(),
            tags = kind.tag_table()
        ))?;
        let mut rows = stmt.query([pattern])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            let count: i64 = row.get("link_count")?;
            tags.push(TagWithCount {
                id: row.get("id")?,
                name: row.get("name")?,
                kind,
                count: u32::try_from(count).map_err(|_| {
                    RepoError::InvalidData(format!("invalid tag link count `{count}`"))
                })?,
            });
        }
        Ok(tags)
    }
}

fn map_name_error(err: rusqlite::Error, kind: ContentKind, name: &str) -> RepoError {
    if is_unique_violation(&err) {
        return RepoError::TagNameTaken {
            kind,
            name: name.to_string(),
        };
    }
    err.into()
}
