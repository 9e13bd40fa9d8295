//! # Carafe ORM
//!
//! A lightweight async ORM for Rust built on top of sqlx.
//!
//! Record types declare their columns as [`Field`] descriptors; the schema
//! registrar compiles those declarations once per type into table metadata
//! and parameterized SQL templates, and the [`Model`] trait exposes CRUD
//! operations backed by a pooled connection with transactional execute
//! semantics.
//!
//! ```rust,ignore
//! struct User;
//!
//! impl Model for User {
//!     fn table_name() -> &'static str {
//!         "users"
//!     }
//!
//!     fn declare() -> Vec<(&'static str, Field)> {
//!         vec![
//!             ("id", Field::integer().primary_key()),
//!             ("name", Field::string().default_value("anonymous")),
//!         ]
//!     }
//!
//!     fn schema() -> &'static TableSchema {
//!         static SCHEMA: LazyLock<TableSchema> =
//!             LazyLock::new(TableSchema::register::<User>);
//!         &SCHEMA
//!     }
//! }
//!
//! let db = Database::builder().user("www").password("www").db("app").connect().await?;
//! let mut user = Record::<User>::new().with("id", 1)?;
//! user.save(&db).await?;
//! let found = User::find(&db, 1.into()).await?;
//! ```

pub mod database;
pub mod error;
pub mod field;
pub mod record;
pub mod schema;

pub use database::{Database, DatabaseBuilder, Drivers, RowMap};
pub use error::{Error, SchemaError};
pub use field::{Field, FieldDefault, Value};
pub use record::{FindOptions, Limit, Model, Record};
pub use schema::TableSchema;
