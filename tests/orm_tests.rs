use cobalto_blog::orm::{self, Db, Model};
use sqlx::FromRow;
use std::sync::Arc;

#[tokio::test]
async fn test_db_basic_crud() {
    #[derive(Debug, FromRow, PartialEq, Eq)]
    struct Person {
        name: String,
    }

    let db = Db::connect(":memory:").await.unwrap();
    db.execute("CREATE TABLE person (id INTEGER PRIMARY KEY, name TEXT)")
        .await
        .unwrap();
    db.execute("INSERT INTO person (name) VALUES ('Alice')")
        .await
        .unwrap();

    let people: Vec<Person> = db.fetch_all("SELECT name FROM person").await.unwrap();
    let names: Vec<String> = people.into_iter().map(|person| person.name).collect();
    assert_eq!(names, vec!["Alice"]);
}

#[tokio::test]
async fn test_auto_migrate_creates_tables_once() {
    let db = Arc::new(Db::connect("sqlite::memory:").await.unwrap());
    orm::auto_migrate(db.clone()).await.unwrap();
    // A second run finds matching hashes and changes nothing.
    orm::auto_migrate(db.clone()).await.unwrap();

    let tables: Vec<(String,)> = db
        .fetch_all("SELECT table_name FROM __cobalto_migrations ORDER BY table_name")
        .await
        .unwrap();
    let tables: Vec<String> = tables.into_iter().map(|(t,)| t).collect();
    assert_eq!(tables, vec!["authors", "posts"]);

    let columns: Vec<(String,)> = db
        .fetch_all("SELECT name FROM pragma_table_info('posts') ORDER BY cid")
        .await
        .unwrap();
    let columns: Vec<String> = columns.into_iter().map(|(c,)| c).collect();
    assert_eq!(
        columns,
        vec![
            "id",
            "title",
            "content",
            "summary",
            "category",
            "created_at",
            "updated_at",
            "author_id"
        ]
    );
}

struct NoteV1;
struct NoteV2;

#[async_trait::async_trait]
impl Model for NoteV1 {
    fn table_name() -> &'static str {
        "notes"
    }
    fn create_table_sql() -> String {
        "CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)".to_string()
    }
    fn columns() -> Vec<(String, String)> {
        vec![
            ("id".into(), "INTEGER".into()),
            ("body".into(), "TEXT".into()),
        ]
    }
}

#[async_trait::async_trait]
impl Model for NoteV2 {
    fn table_name() -> &'static str {
        "notes"
    }
    fn create_table_sql() -> String {
        "CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT, pinned INTEGER)".to_string()
    }
    fn columns() -> Vec<(String, String)> {
        vec![
            ("id".into(), "INTEGER".into()),
            ("body".into(), "TEXT".into()),
            ("pinned".into(), "INTEGER".into()),
        ]
    }
}

#[tokio::test]
async fn test_migrate_adds_missing_columns() {
    let db = Arc::new(Db::connect(":memory:").await.unwrap());
    NoteV1::migrate(db.clone()).await.unwrap();
    db.execute("INSERT INTO notes (body) VALUES ('kept')")
        .await
        .unwrap();

    NoteV2::migrate(db.clone()).await.unwrap();

    let rows: Vec<(String, Option<i64>)> = db
        .fetch_all("SELECT body, pinned FROM notes")
        .await
        .unwrap();
    assert_eq!(rows, vec![("kept".to_string(), None)]);

    let hashes: Vec<(String,)> = db
        .fetch_all("SELECT schema_sql FROM __cobalto_migrations WHERE table_name = 'notes'")
        .await
        .unwrap();
    assert_eq!(hashes[0].0, NoteV2::create_table_sql());
}
