use std::sync::LazyLock;

use carafe_orm::{Field, Model, SchemaError, TableSchema};

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
        ]
    }

    fn schema() -> &'static TableSchema {
        static SCHEMA: LazyLock<TableSchema> = LazyLock::new(TableSchema::register::<User>);
        &SCHEMA
    }
}

struct Session;

impl Model for Session {
    fn declare() -> Vec<(&'static str, Field)> {
        vec![("id", Field::string().ddl("varchar(50)").primary_key())]
    }

    fn schema() -> &'static TableSchema {
        static SCHEMA: LazyLock<TableSchema> = LazyLock::new(TableSchema::register::<Session>);
        &SCHEMA
    }
}

#[test]
fn registration_produces_statement_templates() {
    let schema = User::schema();
    assert_eq!(schema.table(), "users");
    assert_eq!(schema.primary_key(), "id");
    assert_eq!(schema.fields(), vec!["email".to_string(), "name".to_string()]);
    assert_eq!(
        schema.select_stmt(),
        "select `id`, `email`, `name` from `users`"
    );
    assert_eq!(
        schema.insert_stmt(),
        "insert into `users` (`email`, `name`, `id`) values (?, ?, ?)"
    );
    assert_eq!(
        schema.update_stmt(),
        "update `users` set `email`=?, `name`=? where `id`=?"
    );
    assert_eq!(schema.delete_stmt(), "delete from `users` where `id`=?");
}

#[test]
fn table_name_defaults_to_type_name() {
    let schema = Session::schema();
    assert_eq!(schema.table(), "Session");
    assert_eq!(schema.select_stmt(), "select `id` from `Session`");
    assert_eq!(schema.insert_stmt(), "insert into `Session` (`id`) values (?)");
}

#[test]
fn missing_primary_key_fails() {
    let result = TableSchema::compile("tags", vec![("label", Field::string())]);
    assert!(matches!(
        result,
        Err(SchemaError::MissingPrimaryKey { .. })
    ));
}

#[test]
fn duplicate_primary_key_fails() {
    let result = TableSchema::compile(
        "tags",
        vec![
            ("id", Field::integer().primary_key()),
            ("slug", Field::string().primary_key()),
        ],
    );
    assert!(matches!(
        result,
        Err(SchemaError::DuplicatePrimaryKey { attr, .. }) if attr == "slug"
    ));
}

#[test]
fn boolean_and_text_primary_keys_are_rejected() {
    let result = TableSchema::compile("flags", vec![("on", Field::boolean().primary_key())]);
    assert!(matches!(
        result,
        Err(SchemaError::UnsupportedPrimaryKey { .. })
    ));

    let result = TableSchema::compile("notes", vec![("body", Field::text().primary_key())]);
    assert!(matches!(
        result,
        Err(SchemaError::UnsupportedPrimaryKey { .. })
    ));
}

#[test]
fn duplicate_field_declaration_fails() {
    let result = TableSchema::compile(
        "tags",
        vec![
            ("id", Field::integer().primary_key()),
            ("label", Field::string()),
            ("label", Field::text()),
        ],
    );
    assert!(matches!(
        result,
        Err(SchemaError::DuplicateField { attr, .. }) if attr == "label"
    ));
}

#[test]
fn column_name_override_is_used_in_every_template() {
    let schema = TableSchema::compile(
        "accounts",
        vec![
            ("id", Field::integer().primary_key()),
            ("email", Field::string().named("user_email")),
        ],
    )
    .unwrap();
    assert_eq!(
        schema.select_stmt(),
        "select `id`, `user_email` from `accounts`"
    );
    assert_eq!(
        schema.insert_stmt(),
        "insert into `accounts` (`user_email`, `id`) values (?, ?)"
    );
    assert_eq!(
        schema.update_stmt(),
        "update `accounts` set `user_email`=? where `id`=?"
    );
    assert_eq!(schema.column_for("email"), "user_email");
}

#[test]
fn field_display_shows_kind_type_and_name() {
    assert_eq!(
        format!("{}", Field::string().named("email")),
        "<StringField, varchar(100):email>"
    );
    assert_eq!(format!("{}", Field::integer()), "<IntegerField, bigint:_>");
    assert_eq!(format!("{}", Field::text()), "<TextField, text:_>");
}
