//! Content item repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist blogs, notes and reading notes through one kind-parameterised
//!   implementation.
//! - Apply field updates and tag-link changes in a single transaction.
//!
//! # Invariants
//! - Every query is scoped to the tables of exactly one `ContentKind`.
//! - Tag ids passed to write paths must belong to the same kind; ids that do
//!   not exist are ignored rather than linked.
//! - Item tags are returned sorted by name.

use crate::model::content::{ArticleDraft, ContentId, ContentItem, ContentKind};
use crate::model::tag::{Tag, TagDiff, TagId};
use crate::repo::{
    bool_to_int, ensure_tables, int_to_bool, is_unique_violation, like_contains_pattern,
    RepoError, RepoResult, NOW_MS_SQL,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};

/// Sort order for list queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentOrder {
    /// Newest `created_at` first (public listings).
    #[default]
    CreatedDesc,
    /// Most recently edited first (admin tables).
    UpdatedDesc,
}

/// Filter and pagination options for listing one kind of content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentListQuery {
    pub published_only: bool,
    /// Case-insensitive substring match on title.
    pub title_contains: Option<String>,
    /// Only items linked to this tag id.
    pub tag_id: Option<TagId>,
    /// Only items carrying every one of these tag names.
    pub all_tag_names: Vec<String>,
    pub order: ContentOrder,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for content item operations.
pub trait ContentRepository {
    /// Inserts one item and links it to `tag_ids` atomically.
    fn create_item(
        &mut self,
        kind: ContentKind,
        draft: &ArticleDraft,
        tag_ids: &[TagId],
    ) -> RepoResult<ContentId>;
    /// Replaces item fields, bumps `updated_at` and applies `diff` atomically.
    fn update_item(
        &mut self,
        kind: ContentKind,
        id: ContentId,
        draft: &ArticleDraft,
        diff: &TagDiff,
    ) -> RepoResult<()>;
    fn delete_item(&self, kind: ContentKind, id: ContentId) -> RepoResult<()>;
    fn set_published(&self, kind: ContentKind, id: ContentId, published: bool) -> RepoResult<()>;
    fn get_item(&self, kind: ContentKind, id: ContentId) -> RepoResult<Option<ContentItem>>;
    fn find_by_slug(
        &self,
        kind: ContentKind,
        slug: &str,
        published_only: bool,
    ) -> RepoResult<Option<ContentItem>>;
    /// Returns the id of the item that owns `slug`, if any.
    fn slug_owner(&self, kind: ContentKind, slug: &str) -> RepoResult<Option<ContentId>>;
    /// Resolves tag names of `kind` to ids. Unknown names are dropped.
    fn resolve_tag_ids(&self, kind: ContentKind, names: &[String]) -> RepoResult<Vec<TagId>>;
    fn list_items(&self, kind: ContentKind, query: &ContentListQuery)
        -> RepoResult<Vec<ContentItem>>;
    /// Counts items matching `query`, ignoring its order and pagination.
    fn count_items(&self, kind: ContentKind, query: &ContentListQuery) -> RepoResult<u64>;
}

/// SQLite-backed content repository.
pub struct SqliteContentRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteContentRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        for kind in ContentKind::ALL {
            ensure_tables(
                conn,
                &[kind.item_table(), kind.tag_table(), kind.link_table()],
            )?;
        }
        Ok(Self { conn })
    }
}

impl ContentRepository for SqliteContentRepository<'_> {
    fn create_item(
        &mut self,
        kind: ContentKind,
        draft: &ArticleDraft,
        tag_ids: &[TagId],
    ) -> RepoResult<ContentId> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            &format!(
                "INSERT INTO {items} (slug, title, content, is_published)
                 VALUES (?1, ?2, ?3, ?4);",
                items = kind.item_table()
            ),
            params![
                draft.slug.as_str(),
                draft.title.as_str(),
                draft.content.as_str(),
                bool_to_int(draft.is_published),
            ],
        )
        .map_err(|err| map_slug_error(err, kind, &draft.slug))?;

        let id = tx.last_insert_rowid();
        connect_tags(&tx, kind, id, tag_ids)?;
        tx.commit()?;
        Ok(id)
    }

    fn update_item(
        &mut self,
        kind: ContentKind,
        id: ContentId,
        draft: &ArticleDraft,
        diff: &TagDiff,
    ) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx
            .execute(
                &format!(
                    "UPDATE {items}
                     SET
                        title = ?2,
                        slug = ?3,
                        content = ?4,
                        is_published = ?5,
                        updated_at = {NOW_MS_SQL}
                     WHERE id = ?1;",
                    items = kind.item_table()
                ),
                params![
                    id,
                    draft.title.as_str(),
                    draft.slug.as_str(),
                    draft.content.as_str(),
                    bool_to_int(draft.is_published),
                ],
            )
            .map_err(|err| map_slug_error(err, kind, &draft.slug))?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: kind.as_str(),
                id,
            });
        }

        for tag_id in &diff.to_disconnect {
            tx.execute(
                &format!(
                    "DELETE FROM {links} WHERE item_id = ?1 AND tag_id = ?2;",
                    links = kind.link_table()
                ),
                params![id, tag_id],
            )?;
        }
        connect_tags(&tx, kind, id, &diff.to_connect)?;

        tx.commit()?;
        Ok(())
    }

    fn delete_item(&self, kind: ContentKind, id: ContentId) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1;", kind.item_table()),
            [id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: kind.as_str(),
                id,
            });
        }
        Ok(())
    }

    fn set_published(&self, kind: ContentKind, id: ContentId, published: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET is_published = ?2 WHERE id = ?1;",
                kind.item_table()
            ),
            params![id, bool_to_int(published)],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: kind.as_str(),
                id,
            });
        }
        Ok(())
    }

    fn get_item(&self, kind: ContentKind, id: ContentId) -> RepoResult<Option<ContentItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE id = ?1;",
            select_item_sql(kind)
        ))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(load_item(self.conn, kind, row)?)),
            None => Ok(None),
        }
    }

    fn find_by_slug(
        &self,
        kind: ContentKind,
        slug: &str,
        published_only: bool,
    ) -> RepoResult<Option<ContentItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE slug = ?1 AND (?2 = 0 OR is_published = 1);",
            select_item_sql(kind)
        ))?;
        let mut rows = stmt.query(params![slug, bool_to_int(published_only)])?;
        match rows.next()? {
            Some(row) => Ok(Some(load_item(self.conn, kind, row)?)),
            None => Ok(None),
        }
    }

    fn slug_owner(&self, kind: ContentKind, slug: &str) -> RepoResult<Option<ContentId>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id FROM {} WHERE slug = ?1;",
            kind.item_table()
        ))?;
        let mut rows = stmt.query([slug])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    fn resolve_tag_ids(&self, kind: ContentKind, names: &[String]) -> RepoResult<Vec<TagId>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; names.len()].join(", ");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id FROM {} WHERE name IN ({placeholders}) ORDER BY id ASC;",
            kind.tag_table()
        ))?;
        let mut rows = stmt.query(params_from_iter(names.iter()))?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }

    fn list_items(
        &self,
        kind: ContentKind,
        query: &ContentListQuery,
    ) -> RepoResult<Vec<ContentItem>> {
        let (where_sql, mut bind_values) = build_filter(kind, query);
        let mut sql = format!("{}{where_sql}", select_item_sql(kind));

        sql.push_str(match query.order {
            ContentOrder::CreatedDesc => " ORDER BY created_at DESC, id DESC",
            ContentOrder::UpdatedDesc => " ORDER BY updated_at DESC, id DESC",
        });

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(load_item(self.conn, kind, row)?);
        }
        Ok(items)
    }

    fn count_items(&self, kind: ContentKind, query: &ContentListQuery) -> RepoResult<u64> {
        let (where_sql, bind_values) = build_filter(kind, query);
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}{where_sql}", kind.item_table()),
            params_from_iter(bind_values),
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count `{count}`")))
    }
}

fn select_item_sql(kind: ContentKind) -> String {
    format!(
        "SELECT
            id,
            slug,
            title,
            content,
            is_published,
            created_at,
            updated_at
         FROM {}",
        kind.item_table()
    )
}

fn build_filter(kind: ContentKind, query: &ContentListQuery) -> (String, Vec<Value>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut bind_values: Vec<Value> = Vec::new();

    if query.published_only {
        clauses.push("is_published = 1".to_string());
    }

    if let Some(text) = query.title_contains.as_deref() {
        clauses.push("fold_case(title) LIKE ? ESCAPE '\\'".to_string());
        bind_values.push(Value::Text(like_contains_pattern(text)));
    }

    if let Some(tag_id) = query.tag_id {
        clauses.push(format!(
            "EXISTS (
                SELECT 1 FROM {links} l
                WHERE l.item_id = {items}.id AND l.tag_id = ?
            )",
            links = kind.link_table(),
            items = kind.item_table()
        ));
        bind_values.push(Value::Integer(tag_id));
    }

    if !query.all_tag_names.is_empty() {
        let placeholders = vec!["?"; query.all_tag_names.len()].join(", ");
        clauses.push(format!(
            "(
                SELECT COUNT(DISTINCT t.name)
                FROM {links} l
                INNER JOIN {tags} t ON t.id = l.tag_id
                WHERE l.item_id = {items}.id AND t.name IN ({placeholders})
            ) = ?",
            links = kind.link_table(),
            tags = kind.tag_table(),
            items = kind.item_table()
        ));
        for name in &query.all_tag_names {
            bind_values.push(Value::Text(name.clone()));
        }
        let distinct = query
            .all_tag_names
            .iter()
            .collect::<std::collections::BTreeSet<_>>()
            .len();
        bind_values.push(Value::Integer(distinct as i64));
    }

    if clauses.is_empty() {
        (String::new(), bind_values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), bind_values)
    }
}

fn connect_tags(
    tx: &Transaction<'_>,
    kind: ContentKind,
    item_id: ContentId,
    tag_ids: &[TagId],
) -> RepoResult<()> {
    for tag_id in tag_ids {
        tx.execute(
            &format!(
                "INSERT OR IGNORE INTO {links} (item_id, tag_id)
                 SELECT ?1, id FROM {tags} WHERE id = ?2;",
                links = kind.link_table(),
                tags = kind.tag_table()
            ),
            params![item_id, tag_id],
        )?;
    }
    Ok(())
}

fn load_item(conn: &Connection, kind: ContentKind, row: &Row<'_>) -> RepoResult<ContentItem> {
    let id: ContentId = row.get("id")?;
    let is_published = int_to_bool(row.get("is_published")?, "is_published")?;
    Ok(ContentItem {
        id,
        kind,
        slug: row.get("slug")?,
        title: row.get("title")?,
        content: row.get("content")?,
        is_published,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        tags: load_tags_for_item(conn, kind, id)?,
    })
}

pub(crate) fn load_tags_for_item(
    conn: &Connection,
    kind: ContentKind,
    item_id: ContentId,
) -> RepoResult<Vec<Tag>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT t.id, t.name
         FROM {links} l
         INNER JOIN {tags} t ON t.id = l.tag_id
         WHERE l.item_id = ?1
         ORDER BY t.name ASC;",
        links = kind.link_table(),
        tags = kind.tag_table()
    ))?;
    let mut rows = stmt.query([item_id])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        tags.push(Tag {
            id: row.get(0)?,
            name: row.get(1)?,
        });
    }
    Ok(tags)
}

fn map_slug_error(err: rusqlite::Error, kind: ContentKind, slug: &str) -> RepoError {
    if is_unique_violation(&err) {
        return RepoError::SlugTaken {
            kind,
            slug: slug.to_string(),
        };
    }
    err.into()
}
