use rusqlite::{params, Connection};
use yeyu_core::db::open_db_in_memory;
use yeyu_core::{search_content, ContentKind, SearchQuery, SearchScope, SqliteSearchSource};

fn insert(
    conn: &Connection,
    kind: ContentKind,
    slug: &str,
    title: &str,
    content: &str,
    published: bool,
    created_at: i64,
) -> i64 {
    let table = match kind {
        ContentKind::Blog => "blogs",
        ContentKind::Note => "notes",
        ContentKind::ReadingNote => "reading_notes",
    };
    conn.execute(
        &format!(
            "INSERT INTO {table} (slug, title, content, is_published, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5);"
        ),
        params![slug, title, content, i64::from(published), created_at],
    )
    .unwrap();
    conn.last_insert_rowid()
}

fn search(conn: &Connection, text: &str, scope: SearchScope) -> Vec<(ContentKind, String)> {
    search_content(&SqliteSearchSource::new(conn), &SearchQuery::new(text, scope))
        .into_iter()
        .map(|hit| (hit.kind, hit.slug))
        .collect()
}

#[test]
fn blank_query_returns_nothing() {
    let conn = open_db_in_memory().unwrap();
    insert(&conn, ContentKind::Blog, "a", "anything", "", true, 1);
    assert!(search(&conn, "", SearchScope::All).is_empty());
    assert!(search(&conn, "   ", SearchScope::All).is_empty());
}

#[test]
fn matches_title_or_body_case_insensitively_and_only_published() {
    let conn = open_db_in_memory().unwrap();
    insert(&conn, ContentKind::Blog, "title-hit", "Learning RUST", "", true, 10);
    insert(&conn, ContentKind::Note, "body-hit", "Notes", "some rust here", true, 20);
    insert(&conn, ContentKind::Blog, "draft", "rust draft", "", false, 30);
    insert(&conn, ContentKind::ReadingNote, "reading", "rust book", "", true, 40);
    insert(&conn, ContentKind::Note, "miss", "Go", "gophers", true, 50);

    assert_eq!(
        search(&conn, "Rust", SearchScope::All),
        vec![
            (ContentKind::Note, "body-hit".to_string()),
            (ContentKind::Blog, "title-hit".to_string()),
        ]
    );
    assert_eq!(
        search(&conn, "rust", SearchScope::Blog),
        vec![(ContentKind::Blog, "title-hit".to_string())]
    );
}

#[test]
fn case_folding_covers_non_ascii_letters() {
    let conn = open_db_in_memory().unwrap();
    insert(
        &conn,
        ContentKind::Blog,
        "zola",
        "Émile Zola ÜBER Straße",
        "ПРИВЕТ мир",
        true,
        1,
    );
    insert(&conn, ContentKind::Note, "other", "Plain", "nothing", true, 2);

    let expected = vec![(ContentKind::Blog, "zola".to_string())];
    for text in ["zola", "émile", "über", "привет", "МИР"] {
        assert_eq!(search(&conn, text, SearchScope::All), expected, "query {text}");
    }
}

#[test]
fn wildcards_in_the_query_are_literal() {
    let conn = open_db_in_memory().unwrap();
    insert(&conn, ContentKind::Blog, "percent", "100% done", "", true, 1);
    insert(&conn, ContentKind::Blog, "plain", "1000 done", "", true, 2);
    insert(&conn, ContentKind::Note, "underscore", "snake_case", "", true, 3);
    insert(&conn, ContentKind::Note, "no-underscore", "snakeXcase", "", true, 4);

    assert_eq!(
        search(&conn, "100%", SearchScope::All),
        vec![(ContentKind::Blog, "percent".to_string())]
    );
    assert_eq!(
        search(&conn, "e_c", SearchScope::All),
        vec![(ContentKind::Note, "underscore".to_string())]
    );
}

#[test]
fn merged_results_are_newest_first_and_capped() {
    let conn = open_db_in_memory().unwrap();
    for idx in 0..25 {
        insert(
            &conn,
            ContentKind::Blog,
            &format!("blog-{idx}"),
            "match",
            "",
            true,
            idx * 2,
        );
        insert(
            &conn,
            ContentKind::Note,
            &format!("note-{idx}"),
            "match",
            "",
            true,
            idx * 2 + 1,
        );
    }

    let hits = search_content(
        &SqliteSearchSource::new(&conn),
        &SearchQuery::new("match", SearchScope::All),
    );
    assert_eq!(hits.len(), 20);
    assert!(hits
        .windows(2)
        .all(|pair| pair[0].created_at >= pair[1].created_at));
    assert_eq!(hits[0].slug, "note-24");
    assert_eq!(hits[19].created_at, 30);
}

#[test]
fn hits_carry_tag_names() {
    let conn = open_db_in_memory().unwrap();
    let id = insert(&conn, ContentKind::Blog, "tagged", "match", "", true, 1);
    conn.execute_batch("INSERT INTO blog_tags (id, name) VALUES (1, 'zeta'), (2, 'alpha');")
        .unwrap();
    conn.execute(
        "INSERT INTO blog_tag_links (item_id, tag_id) VALUES (?1, 1), (?1, 2);",
        [id],
    )
    .unwrap();

    let hits = search_content(
        &SqliteSearchSource::new(&conn),
        &SearchQuery::new("match", SearchScope::Blog),
    );
    assert_eq!(hits[0].tags, vec!["alpha", "zeta"]);
}

#[test]
fn a_broken_kind_does_not_hide_the_others() {
    let conn = open_db_in_memory().unwrap();
    insert(&conn, ContentKind::Blog, "gone", "match", "", true, 1);
    insert(&conn, ContentKind::Note, "kept", "match", "", true, 2);
    conn.execute_batch("DROP TABLE blog_tag_links; DROP TABLE blogs;")
        .unwrap();

    assert_eq!(
        search(&conn, "match", SearchScope::All),
        vec![(ContentKind::Note, "kept".to_string())]
    );
    assert!(search(&conn, "match", SearchScope::Blog).is_empty());
}
