use leadline_db::{create_pool, run_migrations, DbRuntimeSettings};

#[test]
fn db_initialization_works() {
    let file = tempfile::NamedTempFile::new().expect("temp file");
    let pool = create_pool(
        file.path().to_str().expect("utf-8 path"),
        DbRuntimeSettings::default(),
    )
    .expect("failed to create pool");

    let conn = pool.get().expect("failed to get connection");
    let applied = run_migrations(&conn).expect("failed to run migrations");
    assert_eq!(applied, 3);

    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master
             WHERE type='table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )
        .expect("failed to prepare table query");
    let tables: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .expect("failed to execute table query")
        .map(|r| r.expect("failed to read table name"))
        .collect();

    assert_eq!(
        tables,
        vec![
            "_leadline_migrations",
            "failed_leads",
            "rejected_leads",
            "sessions",
            "succeeded_leads",
            "turns",
        ]
    );
}

#[test]
fn schema_is_visible_across_pooled_connections() {
    let file = tempfile::NamedTempFile::new().expect("temp file");
    let pool = create_pool(
        file.path().to_str().expect("utf-8 path"),
        DbRuntimeSettings::default(),
    )
    .expect("failed to create pool");

    {
        let conn = pool.get().expect("connection");
        run_migrations(&conn).expect("migrations");
    }

    let a = pool.get().expect("connection a");
    let b = pool.get().expect("connection b");
    a.execute(
        "INSERT INTO sessions (channel, session_key) VALUES ('sms', '+15555550100')",
        [],
    )
    .expect("insert");
    let count: i64 = b
        .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
        .expect("count");
    assert_eq!(count, 1);
}
