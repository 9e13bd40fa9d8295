use std::sync::LazyLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use carafe_orm::{Database, Field, Model, Record, TableSchema, Value};

struct User;

impl Model for User {
    fn table_name() -> &'static str {
        "users"
    }

    fn declare() -> Vec<(&'static str, Field)> {
        vec![
            ("id", Field::integer().primary_key()),
            ("email", Field::string().ddl("varchar(50)")),
            ("name", Field::string().default_value("anonymous")),
            ("admin", Field::boolean()),
            ("score", Field::float()),
        ]
    }

    fn schema() -> &'static TableSchema {
        static SCHEMA: LazyLock<TableSchema> = LazyLock::new(TableSchema::register::<User>);
        &SCHEMA
    }
}

static PRODUCER_CALLS: AtomicUsize = AtomicUsize::new(0);

struct Session;

impl Model for Session {
    fn table_name() -> &'static str {
        "sessions"
    }

    fn declare() -> Vec<(&'static str, Field)> {
        vec![
            (
                "id",
                Field::string().ddl("varchar(50)").primary_key().default_fn(|| {
                    PRODUCER_CALLS.fetch_add(1, Ordering::SeqCst);
                    Value::from(uuid::Uuid::new_v4().simple().to_string())
                }),
            ),
            (
                "created_at",
                Field::float().default_fn(|| {
                    Value::from(chrono::Utc::now().timestamp_millis() as f64 / 1000.0)
                }),
            ),
        ]
    }

    fn schema() -> &'static TableSchema {
        static SCHEMA: LazyLock<TableSchema> = LazyLock::new(TableSchema::register::<Session>);
        &SCHEMA
    }
}

async fn setup() -> Result<Database, Box<dyn std::error::Error>> {
    let _ = env_logger::builder().is_test(true).try_init();
    let db = Database::builder()
        .max_size(1)
        .connect_url("sqlite::memory:")
        .await?;
    db.create_table::<User>().await?;
    Ok(db)
}

#[tokio::test]
async fn save_then_find_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut user = Record::<User>::new()
        .with("id", 1)?
        .with("email", "alice@example.com")?
        .with("name", "Alice")?
        .with("admin", true)?
        .with("score", 9.5)?;
    user.save(&db).await?;

    let found = User::find(&db, 1.into()).await?.expect("row should exist");
    assert_eq!(found.value("id"), Value::Int(1));
    assert_eq!(found.value("email"), Value::Text("alice@example.com".into()));
    assert_eq!(found.value("name"), Value::Text("Alice".into()));
    assert_eq!(found.value("admin"), Value::Bool(true));
    assert_eq!(found.value("score"), Value::Float(9.5));
    Ok(())
}

#[tokio::test]
async fn save_applies_declared_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut user = Record::<User>::new().with("id", 1)?;
    user.save(&db).await?;

    // resolved defaults are cached back onto the saved instance
    assert_eq!(user.value("name"), Value::Text("anonymous".into()));

    let found = User::find(&db, 1.into()).await?.expect("row should exist");
    assert_eq!(found.value("name"), Value::Text("anonymous".into()));
    assert_eq!(found.value("admin"), Value::Bool(false));
    assert_eq!(found.value("score"), Value::Float(0.0));
    assert!(found.value("email").is_null());
    Ok(())
}

#[tokio::test]
async fn update_reflects_new_values() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut user = Record::<User>::new()
        .with("id", 7)?
        .with("name", "before")?;
    user.save(&db).await?;

    let mut found = User::find(&db, 7.into()).await?.expect("row should exist");
    found.set("name", "after")?;
    found.update(&db).await?;

    let reread = User::find(&db, 7.into()).await?.expect("row should exist");
    assert_eq!(reread.value("name"), Value::Text("after".into()));
    Ok(())
}

#[tokio::test]
async fn remove_deletes_the_row() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut user = Record::<User>::new().with("id", 3)?;
    user.save(&db).await?;
    assert!(User::find(&db, 3.into()).await?.is_some());

    user.remove(&db).await?;
    assert!(User::find(&db, 3.into()).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn find_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut user = Record::<User>::new().with("id", 5)?.with("name", "Eve")?;
    user.save(&db).await?;

    let first = User::find(&db, 5.into()).await?.expect("row should exist");
    let second = User::find(&db, 5.into()).await?.expect("row should exist");
    assert_eq!(first, second);
    Ok(())
}

#[tokio::test]
async fn find_number_returns_scalar_or_none() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    for id in 1..=4 {
        Record::<User>::new().with("id", id)?.save(&db).await?;
    }

    let count = User::find_number(&db, "count(*)", None, &[]).await?;
    assert_eq!(count, Some(Value::Int(4)));

    let filtered =
        User::find_number(&db, "count(*)", Some("`id` > ?"), &[Value::Int(2)]).await?;
    assert_eq!(filtered, Some(Value::Int(2)));

    // grouping an empty match yields zero rows, the "no result" sentinel
    let none = User::find_number(&db, "count(*)", Some("1=0 group by `id`"), &[]).await?;
    assert_eq!(none, None);
    Ok(())
}

#[tokio::test]
async fn producer_defaults_resolve_lazily_and_cache() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;
    db.create_table::<Session>().await?;

    let mut session = Record::<Session>::new();
    session.save(&db).await?;

    assert_eq!(PRODUCER_CALLS.load(Ordering::SeqCst), 1);
    let id = session.value("id");
    assert!(matches!(id, Value::Text(_)));

    // cached on the instance: resolving again does not re-invoke the producer
    session.value_or_default("id")?;
    assert_eq!(PRODUCER_CALLS.load(Ordering::SeqCst), 1);

    let found = Session::find(&db, id.clone()).await?.expect("row should exist");
    assert_eq!(found.value("id"), id);
    assert!(matches!(found.value("created_at"), Value::Float(_)));
    Ok(())
}

#[tokio::test]
async fn unmapped_attribute_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut user = Record::<User>::new();
    let result = user.set("nickname", "Al");
    assert!(matches!(
        result,
        Err(carafe_orm::Error::UnknownAttribute { attr, .. }) if attr == "nickname"
    ));
    Ok(())
}

#[tokio::test]
async fn record_renders_to_json() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;

    let mut user = Record::<User>::new().with("id", 9)?;
    user.save(&db).await?;

    let json = user.to_json();
    assert_eq!(json["id"], serde_json::json!(9));
    assert_eq!(json["name"], serde_json::json!("anonymous"));
    Ok(())
}
