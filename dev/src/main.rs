use std::sync::LazyLock;

use carafe_orm::{Database, Field, FindOptions, Model, Record, TableSchema, Value};

struct User;

impl Model for User {
    fn table_name() -> &'static str {
        "users"
    }

    fn declare() -> Vec<(&'static str, Field)> {
        vec![
            (
                "id",
                Field::string()
                    .ddl("varchar(50)")
                    .primary_key()
                    .default_fn(|| Value::from(uuid::Uuid::new_v4().simple().to_string())),
            ),
            ("email", Field::string().ddl("varchar(50)")),
            ("passwd", Field::string().ddl("varchar(50)")),
            ("admin", Field::boolean()),
            ("name", Field::string().ddl("varchar(50)")),
            ("image", Field::string().ddl("varchar(500)")),
            (
                "created_at",
                Field::float().default_fn(|| {
                    Value::from(chrono::Utc::now().timestamp_millis() as f64 / 1000.0)
                }),
            ),
        ]
    }

    fn schema() -> &'static TableSchema {
        static SCHEMA: LazyLock<TableSchema> = LazyLock::new(TableSchema::register::<User>);
        &SCHEMA
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // in-memory sqlite keeps the demo self-contained; swap for
    // Database::builder().user(..).password(..).db(..).connect() against MySQL
    let db = Database::builder()
        .max_size(1)
        .connect_url("sqlite::memory:")
        .await?;
    db.create_table::<User>().await?;

    let mut user = Record::<User>::new()
        .with("email", "alice@example.com")?
        .with("passwd", "s3cret")?
        .with("name", "Alice")?
        .with("image", "about:blank")?;
    user.save(&db).await?;
    println!("saved user: {}", user.to_json());

    let users = User::find_all(&db, None, &[], FindOptions::new().order_by("`created_at`")).await?;
    println!("found {} user(s)", users.len());

    let count = User::find_number(&db, "count(*)", None, &[]).await?;
    println!("count: {count:?}");

    let id = user.value("id");
    if let Some(mut found) = User::find(&db, id.clone()).await? {
        found.set("name", "Alice Liddell")?;
        found.update(&db).await?;
        println!("updated user: {}", found.to_json());
    }

    user.remove(&db).await?;
    println!(
        "after remove, find returns: {:?}",
        User::find(&db, id).await?
    );

    db.close().await;
    Ok(())
}
