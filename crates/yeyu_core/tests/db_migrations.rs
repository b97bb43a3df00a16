use rusqlite::Connection;
use yeyu_core::db::migrations::{self, latest_version};
use yeyu_core::db::{open_db, open_db_in_memory, DbError};

const CONTENT_TABLES: [&str; 10] = [
    "blogs",
    "notes",
    "reading_notes",
    "blog_tags",
    "note_tags",
    "reading_note_tags",
    "blog_tag_links",
    "note_tag_links",
    "reading_note_tag_links",
    "echoes",
];

#[test]
fn in_memory_database_gets_every_table() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in CONTENT_TABLES {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn reopening_a_file_database_keeps_schema_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("yeyu.sqlite3");

    let conn = open_db(&path).unwrap();
    conn.execute(
        "INSERT INTO echoes (content, reference, is_published) VALUES ('a', 'b', 1);",
        [],
    )
    .unwrap();
    drop(conn);

    let reopened = open_db(&path).unwrap();
    assert_eq!(schema_version(&reopened), latest_version());
    let count: i64 = reopened
        .query_row("SELECT COUNT(*) FROM echoes;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn missing_parent_directories_are_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("blog").join("yeyu.sqlite3");

    let conn = open_db(&path).unwrap();
    assert!(path.exists());
    assert_eq!(schema_version(&conn), latest_version());
}

#[test]
fn newer_schema_version_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 42;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 42);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn timestamps_default_to_epoch_milliseconds() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO blogs (slug, title, content, is_published) VALUES ('s', 't', '', 0);",
        [],
    )
    .unwrap();
    let created_at: i64 = conn
        .query_row("SELECT created_at FROM blogs;", [], |row| row.get(0))
        .unwrap();

    // 2020-01-01T00:00:00Z in milliseconds.
    assert!(created_at > 1_577_836_800_000);
}

#[test]
fn deleting_a_tag_keeps_linked_items() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO note_tags (id, name) VALUES (1, 'rust');
         INSERT INTO notes (id, slug, title, content, is_published) VALUES (7, 'n', 't', '', 1);
         INSERT INTO note_tag_links (item_id, tag_id) VALUES (7, 1);
         DELETE FROM note_tags WHERE id = 1;",
    )
    .unwrap();

    let links: i64 = conn
        .query_row("SELECT COUNT(*) FROM note_tag_links;", [], |row| row.get(0))
        .unwrap();
    let notes: i64 = conn
        .query_row("SELECT COUNT(*) FROM notes;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(links, 0);
    assert_eq!(notes, 1);
}

fn schema_version(conn: &Connection) -> u32 {
    migrations::schema_version(conn).unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "missing table `{table_name}`");
}
