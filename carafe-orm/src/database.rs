//! # Database Module
//!
//! This module provides the connection pool facade and the query executor for
//! Carafe ORM. It owns pool construction, driver detection, placeholder
//! translation and the row-decoding path shared by every CRUD operation.

// ============================================================================
// External Crate Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Once;

use futures::TryStreamExt;
use log::{info, warn};
use sqlx::any::{AnyArguments, AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Arguments, Column, Row, TypeInfo, ValueRef};

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::error::Error;
use crate::field::Value;
use crate::record::Model;

/// One result row, keyed by column name.
pub type RowMap = HashMap<String, Value>;

// ============================================================================
// Database Driver Enum
// ============================================================================

/// Supported database drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drivers {
    Postgres,
    MySQL,
    SQLite,
}

// ============================================================================
// Database Struct
// ============================================================================

/// The process-wide handle to a pooled set of database connections.
///
/// Created once at startup via [`Database::builder`] or
/// [`Database::connect`], then shared by every query executor call
/// (internally an `Arc`-backed sqlx pool, cheap to clone). Each logical
/// operation borrows one connection for its duration and releases it on every
/// exit path.
#[derive(Debug, Clone)]
pub struct Database {
    pool: AnyPool,
    driver: Drivers,
    autocommit: bool,
}

static INSTALL_DRIVERS: Once = Once::new();

impl Database {
    /// Creates a new [`DatabaseBuilder`] for configuring the connection.
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    /// Connects using an explicit connection string, with builder defaults.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        DatabaseBuilder::new().connect_url(url).await
    }

    pub fn driver(&self) -> Drivers {
        self.driver
    }

    pub fn autocommit(&self) -> bool {
        self.autocommit
    }

    /// Closes the pool. Issue no further operations afterwards.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Executes a SELECT and returns its rows as `{column -> value}` maps, in
    /// result order. With `limit` set, at most that many rows are fetched.
    /// Zero rows is a normal result, never an error.
    pub async fn select(
        &self,
        sql: &str,
        args: &[Value],
        limit: Option<usize>,
    ) -> Result<Vec<RowMap>, Error> {
        info!("SQL: {sql}");
        let native = self.native_sql(sql);
        let mut conn = self.pool.acquire().await?;
        let mut rows: Vec<RowMap> = Vec::new();
        {
            let mut stream = sqlx::query_with(&native, bind_args(args)).fetch(&mut *conn);
            while rows.len() < limit.unwrap_or(usize::MAX) {
                match stream.try_next().await? {
                    Some(row) => rows.push(decode_row(&row)?),
                    None => break,
                }
            }
        }
        info!("rows returned {}", rows.len());
        Ok(rows)
    }

    /// Executes a mutating statement and returns the affected-row count.
    ///
    /// When the pool is not in autocommit mode the statement runs inside an
    /// explicit transaction: commit on success, rollback on failure, with the
    /// underlying error propagated unchanged. Arguments are never logged.
    pub async fn execute(&self, sql: &str, args: &[Value]) -> Result<u64, Error> {
        info!("SQL: {sql}");
        let native = self.native_sql(sql);
        if self.autocommit {
            let mut conn = self.pool.acquire().await?;
            let result = sqlx::query_with(&native, bind_args(args))
                .execute(&mut *conn)
                .await?;
            Ok(result.rows_affected())
        } else {
            let mut tx = self.pool.begin().await?;
            match sqlx::query_with(&native, bind_args(args))
                .execute(&mut *tx)
                .await
            {
                Ok(result) => {
                    tx.commit().await?;
                    Ok(result.rows_affected())
                }
                Err(err) => {
                    if let Err(rollback_err) = tx.rollback().await {
                        warn!("rollback failed: {rollback_err}");
                    }
                    Err(err.into())
                }
            }
        }
    }

    /// Creates the model's table if it does not exist, using the schema's
    /// column types and primary key.
    pub async fn create_table<M: Model>(&self) -> Result<(), Error> {
        let schema = M::schema();
        let mut defs: Vec<String> = Vec::with_capacity(schema.fields().len() + 1);
        let pk = schema.primary_key();
        if let Some(field) = schema.field(pk) {
            defs.push(format!(
                "`{}` {} primary key",
                schema.column_for(pk),
                field.column_type()
            ));
        }
        for attr in schema.fields() {
            if let Some(field) = schema.field(attr) {
                defs.push(format!(
                    "`{}` {}",
                    schema.column_for(attr),
                    field.column_type()
                ));
            }
        }
        let ddl = format!(
            "create table if not exists `{}` ({})",
            schema.table(),
            defs.join(", ")
        );
        self.execute(&ddl, &[]).await?;
        Ok(())
    }

    /// Rewrites `?` placeholders into the driver's native form. MySQL and
    /// SQLite take `?` as-is; Postgres wants numbered `$n` markers.
    fn native_sql(&self, sql: &str) -> String {
        match self.driver {
            Drivers::Postgres => {
                let mut out = String::with_capacity(sql.len() + 4);
                let mut n = 0usize;
                for ch in sql.chars() {
                    if ch == '?' {
                        n += 1;
                        out.push('$');
                        out.push_str(&n.to_string());
                    } else {
                        out.push(ch);
                    }
                }
                out
            }
            Drivers::MySQL | Drivers::SQLite => sql.to_string(),
        }
    }
}

// ============================================================================
// Argument Binding and Row Decoding
// ============================================================================

fn bind_args<'q>(args: &'q [Value]) -> AnyArguments<'q> {
    let mut bound = AnyArguments::default();
    for value in args {
        let _ = match value {
            Value::Null => bound.add(Option::<String>::None),
            Value::Bool(b) => bound.add(*b),
            Value::Int(i) => bound.add(*i),
            Value::Float(f) => bound.add(*f),
            Value::Text(s) => bound.add(s.clone()),
        };
    }
    bound
}

fn decode_row(row: &AnyRow) -> Result<RowMap, Error> {
    let mut map = RowMap::with_capacity(row.columns().len());
    for (idx, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(idx)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let type_name = raw.type_info().name().to_ascii_uppercase();
            match type_name.as_str() {
                "BOOL" | "BOOLEAN" => Value::Bool(row.try_get(idx)?),
                "SMALLINT" | "INT" | "INTEGER" | "BIGINT" | "INT2" | "INT4" | "INT8" => {
                    Value::Int(row.try_get(idx)?)
                }
                "REAL" | "FLOAT" | "DOUBLE" | "FLOAT4" | "FLOAT8" => {
                    Value::Float(row.try_get(idx)?)
                }
                _ => Value::Text(row.try_get(idx)?),
            }
        };
        map.insert(column.name().to_string(), value);
    }
    Ok(map)
}

// ============================================================================
// DatabaseBuilder Struct
// ============================================================================

/// Connection pool configuration.
///
/// `user`, `password` and `db` are required for [`DatabaseBuilder::connect`];
/// everything else has the conventional default. [`connect_url`] bypasses the
/// MySQL URL synthesis for explicit connection strings (Postgres, SQLite, or
/// a fully hand-written MySQL URL).
///
/// [`connect_url`]: DatabaseBuilder::connect_url
pub struct DatabaseBuilder {
    host: String,
    port: u16,
    user: Option<String>,
    password: Option<String>,
    db: Option<String>,
    charset: String,
    autocommit: bool,
    min_size: u32,
    max_size: u32,
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            user: None,
            password: None,
            db: None,
            charset: "utf8".to_string(),
            autocommit: true,
            min_size: 1,
            max_size: 10,
        }
    }

    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn user(mut self, user: &str) -> Self {
        self.user = Some(user.to_string());
        self
    }

    pub fn password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub fn db(mut self, db: &str) -> Self {
        self.db = Some(db.to_string());
        self
    }

    pub fn charset(mut self, charset: &str) -> Self {
        self.charset = charset.to_string();
        self
    }

    /// Disabled autocommit wraps every mutating statement in an explicit
    /// begin/commit, with rollback on failure.
    pub fn autocommit(mut self, autocommit: bool) -> Self {
        self.autocommit = autocommit;
        self
    }

    pub fn min_size(mut self, min: u32) -> Self {
        self.min_size = min;
        self
    }

    pub fn max_size(mut self, max: u32) -> Self {
        self.max_size = max;
        self
    }

    /// Builds a MySQL connection URL from the configured options and opens
    /// the pool. Fails with [`Error::Config`] before any connection attempt
    /// if `user`, `password` or `db` is missing.
    pub async fn connect(self) -> Result<Database, Error> {
        let user = self.user.as_deref().ok_or(Error::Config("user"))?;
        let password = self.password.as_deref().ok_or(Error::Config("password"))?;
        let db = self.db.as_deref().ok_or(Error::Config("db"))?;
        let url = format!(
            "mysql://{user}:{password}@{}:{}/{db}?charset={}",
            self.host, self.port, self.charset
        );
        self.connect_url(&url).await
    }

    /// Opens the pool against an explicit connection string, detecting the
    /// driver from the URL scheme.
    pub async fn connect_url(self, url: &str) -> Result<Database, Error> {
        INSTALL_DRIVERS.call_once(sqlx::any::install_default_drivers);
        info!("create database connection pool...");
        let pool = AnyPoolOptions::new()
            .min_connections(self.min_size)
            .max_connections(self.max_size)
            .connect(url)
            .await?;
        let driver = if url.starts_with("postgres") {
            Drivers::Postgres
        } else if url.starts_with("mysql") {
            Drivers::MySQL
        } else {
            Drivers::SQLite
        };
        Ok(Database {
            pool,
            driver,
            autocommit: self.autocommit,
        })
    }
}

impl Default for DatabaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}
