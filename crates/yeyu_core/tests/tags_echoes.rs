use yeyu_core::db::open_db_in_memory;
use yeyu_core::{
    ArticleDraft, ContentKind, ContentService, EchoDraft, EchoService, EchoValidationError,
    ErrorCategory, ServiceError, SqliteContentRepository, SqliteEchoRepository,
    SqliteTagRepository, TagService,
};

fn echo(content: &str, reference: &str, published: bool) -> EchoDraft {
    EchoDraft {
        content: content.to_string(),
        reference: reference.to_string(),
        is_published: published,
    }
}

#[test]
fn tag_names_are_unique_per_kind_only() {
    let conn = open_db_in_memory().unwrap();
    let service = TagService::new(SqliteTagRepository::try_new(&conn).unwrap());

    let blog = service.create(ContentKind::Blog, "  rust ").unwrap();
    assert_eq!(blog.name, "rust");
    service.create(ContentKind::Note, "rust").unwrap();

    let err = service.create(ContentKind::Blog, "rust").unwrap_err();
    assert!(matches!(err, ServiceError::TagNameTaken { .. }));
    assert_eq!(err.category(), ErrorCategory::Conflict);
}

#[test]
fn tag_names_are_validated() {
    let conn = open_db_in_memory().unwrap();
    let service = TagService::new(SqliteTagRepository::try_new(&conn).unwrap());

    let blank = service.create(ContentKind::Blog, "   ").unwrap_err();
    assert_eq!(blank.category(), ErrorCategory::Validation);
    let long = service
        .create(ContentKind::Blog, &"x".repeat(21))
        .unwrap_err();
    assert_eq!(long.category(), ErrorCategory::Validation);
    service.create(ContentKind::Blog, &"x".repeat(20)).unwrap();
}

#[test]
fn rename_checks_existence_and_conflicts() {
    let conn = open_db_in_memory().unwrap();
    let service = TagService::new(SqliteTagRepository::try_new(&conn).unwrap());
    let first = service.create(ContentKind::Note, "first").unwrap();
    service.create(ContentKind::Note, "second").unwrap();

    assert!(matches!(
        service.rename(ContentKind::Note, 999, "third"),
        Err(ServiceError::NotFound { id: 999, .. })
    ));
    assert!(matches!(
        service.rename(ContentKind::Note, first.id, "second"),
        Err(ServiceError::TagNameTaken { .. })
    ));

    let same = service.rename(ContentKind::Note, first.id, "first").unwrap();
    assert_eq!(same.name, "first");
    let renamed = service.rename(ContentKind::Note, first.id, "1st").unwrap();
    assert_eq!(renamed.name, "1st");

    let names: Vec<String> = service
        .list(ContentKind::Note)
        .unwrap()
        .into_iter()
        .map(|tag| tag.name)
        .collect();
    assert_eq!(names, vec!["1st", "second"]);
}

#[test]
fn delete_of_missing_tag_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = TagService::new(SqliteTagRepository::try_new(&conn).unwrap());
    let err = service.delete(ContentKind::Blog, 12).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);
}

#[test]
fn tag_counts_cover_every_kind_in_order() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let tags = TagService::new(SqliteTagRepository::try_new(&conn).unwrap());
        tags.create(ContentKind::Blog, "Rust").unwrap();
        tags.create(ContentKind::Blog, "life").unwrap();
        tags.create(ContentKind::Note, "rustacean").unwrap();
        tags.create(ContentKind::ReadingNote, "books").unwrap();
    }
    {
        let mut content =
            ContentService::new(SqliteContentRepository::try_new(&mut conn).unwrap());
        for slug in ["one", "two"] {
            content
                .create(
                    ContentKind::Blog,
                    &ArticleDraft {
                        title: slug.to_string(),
                        slug: slug.to_string(),
                        is_published: slug == "one",
                        content: String::new(),
                        tag_names: vec!["Rust".to_string()],
                    },
                )
                .unwrap();
        }
    }

    let tags = TagService::new(SqliteTagRepository::try_new(&conn).unwrap());
    let all = tags.list_all_with_counts().unwrap();
    let summary: Vec<(ContentKind, String, u32)> = all
        .into_iter()
        .map(|tag| (tag.kind, tag.name, tag.count))
        .collect();
    assert_eq!(
        summary,
        vec![
            (ContentKind::Blog, "Rust".to_string(), 2),
            (ContentKind::Blog, "life".to_string(), 0),
            (ContentKind::Note, "rustacean".to_string(), 0),
            (ContentKind::ReadingNote, "books".to_string(), 0),
        ]
    );

    let matched: Vec<String> = tags
        .query_with_counts("RUST")
        .unwrap()
        .into_iter()
        .map(|tag| tag.name)
        .collect();
    assert_eq!(matched, vec!["Rust", "rustacean"]);
}

#[test]
fn echo_lifecycle() {
    let conn = open_db_in_memory().unwrap();
    let service = EchoService::new(SqliteEchoRepository::try_new(&conn).unwrap());

    let older = service
        .create(&echo("Stay hungry", "Jobs", true))
        .unwrap();
    let newer = service
        .create(&echo("  Stay foolish  ", "Jobs", false))
        .unwrap();
    assert_eq!(newer.content, "Stay foolish");
    conn.execute("UPDATE echoes SET created_at = 1 WHERE id = ?1;", [older.id])
        .unwrap();
    conn.execute("UPDATE echoes SET created_at = 2 WHERE id = ?1;", [newer.id])
        .unwrap();

    let all: Vec<i64> = service.list_all().unwrap().iter().map(|e| e.id).collect();
    assert_eq!(all, vec![newer.id, older.id]);
    let published: Vec<i64> = service
        .list_published()
        .unwrap()
        .iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(published, vec![older.id]);

    // Updating moves the echo back to the top.
    let updated = service
        .update(older.id, &echo("Stay hungry!", "Steve Jobs", true))
        .unwrap();
    assert!(updated.created_at > 2);
    assert_eq!(service.list_all().unwrap()[0].id, older.id);

    let hits = service.query_by_content("FOOLISH").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, newer.id);

    service.set_published(newer.id, true).unwrap();
    assert_eq!(service.list_published().unwrap().len(), 2);

    service.delete(newer.id).unwrap();
    assert!(matches!(
        service.delete(newer.id),
        Err(ServiceError::NotFound { .. })
    ));
}

#[test]
fn echo_drafts_are_validated() {
    let conn = open_db_in_memory().unwrap();
    let service = EchoService::new(SqliteEchoRepository::try_new(&conn).unwrap());

    assert!(matches!(
        service.create(&echo("   ", "x", true)),
        Err(ServiceError::InvalidEcho(EchoValidationError::EmptyContent))
    ));
    assert!(matches!(
        service.create(&echo("fine", &"r".repeat(21), true)),
        Err(ServiceError::InvalidEcho(EchoValidationError::ReferenceTooLong { .. }))
    ));
    assert!(matches!(
        service.update(77, &echo("fine", "ok", true)),
        Err(ServiceError::NotFound { id: 77, .. })
    ));
}
