//! # Records and CRUD
//!
//! The [`Model`] trait ties a declared record type to its compiled
//! [`TableSchema`] and carries the type-level query operations; [`Record`] is
//! the map-backed instance those operations produce and consume.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use async_trait::async_trait;
use log::{debug, warn};

use crate::database::{Database, RowMap};
use crate::error::Error;
use crate::field::{Field, FieldDefault, Value};
use crate::schema::TableSchema;

/// Row-limit shape accepted by [`Model::find_all`]: a plain count, or an
/// `(offset, count)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Count(i64),
    Page { offset: i64, count: i64 },
}

impl From<i64> for Limit {
    fn from(count: i64) -> Self {
        Limit::Count(count)
    }
}

impl From<(i64, i64)> for Limit {
    fn from((offset, count): (i64, i64)) -> Self {
        Limit::Page { offset, count }
    }
}

/// Parses front-end input of the form `"5"` or `"10,5"`. Anything else is an
/// [`Error::InvalidLimit`].
impl FromStr for Limit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        match parts.as_slice() {
            [count] => count
                .parse()
                .map(Limit::Count)
                .map_err(|_| Error::InvalidLimit(s.to_string())),
            [offset, count] => match (offset.parse(), count.parse()) {
                (Ok(offset), Ok(count)) => Ok(Limit::Page { offset, count }),
                _ => Err(Error::InvalidLimit(s.to_string())),
            },
            _ => Err(Error::InvalidLimit(s.to_string())),
        }
    }
}

/// Optional trailing clauses for [`Model::find_all`].
#[derive(Debug, Default, Clone)]
pub struct FindOptions {
    order_by: Option<String>,
    limit: Option<Limit>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order_by(mut self, expr: &str) -> Self {
        self.order_by = Some(expr.to_string());
        self
    }

    pub fn limit(mut self, limit: impl Into<Limit>) -> Self {
        self.limit = Some(limit.into());
        self
    }
}

/// A declared record type mapped to one table.
///
/// Implementations provide the field declarations and a per-type schema
/// static; the query operations come for free:
///
/// ```rust,ignore
/// struct User;
///
/// impl Model for User {
///     fn table_name() -> &'static str {
///         "users"
///     }
///
///     fn declare() -> Vec<(&'static str, Field)> {
///         vec![
///             ("id", Field::integer().primary_key()),
///             ("name", Field::string().default_value("anonymous")),
///         ]
///     }
///
///     fn schema() -> &'static TableSchema {
///         static SCHEMA: LazyLock<TableSchema> =
///             LazyLock::new(TableSchema::register::<User>);
///         &SCHEMA
///     }
/// }
/// ```
#[async_trait]
pub trait Model: Send + Sync + Sized + 'static {
    /// The table name. Defaults to the type's own name, verbatim.
    fn table_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// The declared `(attribute, descriptor)` list, in declaration order.
    fn declare() -> Vec<(&'static str, Field)>;

    /// The compiled schema, registered once per type.
    fn schema() -> &'static TableSchema;

    /// Finds records by an optional `where` fragment, with optional ordering
    /// and row limiting. Results come back in engine order unless `order_by`
    /// is given.
    async fn find_all(
        db: &Database,
        where_clause: Option<&str>,
        args: &[Value],
        options: FindOptions,
    ) -> Result<Vec<Record<Self>>, Error> {
        let schema = Self::schema();
        let mut sql = schema.select_stmt().to_string();
        let mut bound: Vec<Value> = args.to_vec();
        if let Some(clause) = where_clause {
            sql.push_str(" where ");
            sql.push_str(clause);
        }
        if let Some(order) = options.order_by.as_deref() {
            sql.push_str(" order by ");
            sql.push_str(order);
        }
        match options.limit {
            None => {}
            Some(Limit::Count(count)) => {
                if count < 0 {
                    return Err(Error::InvalidLimit(count.to_string()));
                }
                sql.push_str(" limit ?");
                bound.push(Value::Int(count));
            }
            Some(Limit::Page { offset, count }) => {
                if offset < 0 || count < 0 {
                    return Err(Error::InvalidLimit(format!("({offset}, {count})")));
                }
                sql.push_str(" limit ?, ?");
                bound.push(Value::Int(offset));
                bound.push(Value::Int(count));
            }
        }
        let rows = db.select(&sql, &bound, None).await?;
        Ok(rows.iter().map(Record::from_row).collect())
    }

    /// Runs an aggregate SELECT and returns its single scalar, or `None` if
    /// no row matched.
    async fn find_number(
        db: &Database,
        select_expr: &str,
        where_clause: Option<&str>,
        args: &[Value],
    ) -> Result<Option<Value>, Error> {
        let schema = Self::schema();
        let mut sql = format!("select {select_expr} as _num_ from `{}`", schema.table());
        if let Some(clause) = where_clause {
            sql.push_str(" where ");
            sql.push_str(clause);
        }
        let rows = db.select(&sql, args, Some(1)).await?;
        Ok(rows.into_iter().next().and_then(|mut row| row.remove("_num_")))
    }

    /// Finds one record by primary key, or `None` if it does not exist.
    async fn find(db: &Database, pk: Value) -> Result<Option<Record<Self>>, Error> {
        let schema = Self::schema();
        let sql = format!(
            "{} where `{}`=?",
            schema.select_stmt(),
            schema.column_for(schema.primary_key())
        );
        let rows = db.select(&sql, &[pk], Some(1)).await?;
        Ok(rows.first().map(Record::from_row))
    }
}

/// One mapped row: a mutable `{attribute -> value}` store scoped to its
/// model's schema. Every key must be a mapped attribute.
pub struct Record<M: Model> {
    values: HashMap<String, Value>,
    _model: PhantomData<M>,
}

impl<M: Model> Record<M> {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            _model: PhantomData,
        }
    }

    /// Chainable constructor form of [`Record::set`].
    pub fn with(mut self, attr: &str, value: impl Into<Value>) -> Result<Self, Error> {
        self.set(attr, value)?;
        Ok(self)
    }

    /// Sets an attribute. Fails with [`Error::UnknownAttribute`] for keys the
    /// schema does not map.
    pub fn set(&mut self, attr: &str, value: impl Into<Value>) -> Result<(), Error> {
        let schema = M::schema();
        if schema.field(attr).is_none() {
            return Err(Error::UnknownAttribute {
                table: schema.table().to_string(),
                attr: attr.to_string(),
            });
        }
        self.values.insert(attr.to_string(), value.into());
        Ok(())
    }

    pub fn get(&self, attr: &str) -> Option<&Value> {
        self.values.get(attr)
    }

    /// The attribute's current value, or [`Value::Null`] when unset.
    pub fn value(&self, attr: &str) -> Value {
        self.values.get(attr).cloned().unwrap_or(Value::Null)
    }

    /// The attribute's current value, falling back to the field's default.
    /// Producer defaults are invoked lazily and the resolved value is cached
    /// back onto the record.
    pub fn value_or_default(&mut self, attr: &str) -> Result<Value, Error> {
        if let Some(value) = self.values.get(attr) {
            if !value.is_null() {
                return Ok(value.clone());
            }
        }
        let schema = M::schema();
        let field = schema.field(attr).ok_or_else(|| Error::UnknownAttribute {
            table: schema.table().to_string(),
            attr: attr.to_string(),
        })?;
        let resolved = match field.default() {
            FieldDefault::None => Value::Null,
            FieldDefault::Value(value) => value.clone(),
            FieldDefault::Producer(producer) => producer(),
        };
        if !resolved.is_null() {
            debug!("using default value for {attr}: {resolved:?}");
            self.values.insert(attr.to_string(), resolved.clone());
        }
        Ok(resolved)
    }

    /// Builds a record from a decoded row, translating column names back to
    /// attribute names and folding driver values into each field's kind.
    pub(crate) fn from_row(row: &RowMap) -> Self {
        let schema = M::schema();
        let mut values = HashMap::new();
        let attrs = std::iter::once(schema.primary_key())
            .chain(schema.fields().iter().map(String::as_str));
        for attr in attrs {
            if let (Some(field), Some(value)) =
                (schema.field(attr), row.get(schema.column_for(attr)))
            {
                values.insert(attr.to_string(), field.coerce(value.clone()));
            }
        }
        Self {
            values,
            _model: PhantomData,
        }
    }

    /// Inserts the record. Field values resolve through the value-or-default
    /// policy, primary key last. An affected-row count other than one is
    /// logged, not raised.
    pub async fn save(&mut self, db: &Database) -> Result<(), Error> {
        let schema = M::schema();
        let mut args: Vec<Value> = Vec::with_capacity(schema.fields().len() + 1);
        for attr in schema.fields() {
            args.push(self.value_or_default(attr)?);
        }
        args.push(self.value_or_default(schema.primary_key())?);
        let rows = db.execute(schema.insert_stmt(), &args).await?;
        if rows != 1 {
            warn!(
                "failed to insert record into `{}`: affected rows: {rows}",
                schema.table()
            );
        }
        Ok(())
    }

    /// Updates the row keyed by the record's primary key, writing current
    /// values only (no default substitution).
    pub async fn update(&self, db: &Database) -> Result<(), Error> {
        let schema = M::schema();
        let mut args: Vec<Value> = Vec::with_capacity(schema.fields().len() + 1);
        for attr in schema.fields() {
            args.push(self.value(attr));
        }
        args.push(self.value(schema.primary_key()));
        let rows = db.execute(schema.update_stmt(), &args).await?;
        if rows != 1 {
            warn!("failed to update by primary key: affected rows: {rows}");
        }
        Ok(())
    }

    /// Deletes the row keyed by the record's primary key.
    pub async fn remove(&self, db: &Database) -> Result<(), Error> {
        let schema = M::schema();
        let args = [self.value(schema.primary_key())];
        let rows = db.execute(schema.delete_stmt(), &args).await?;
        if rows != 1 {
            warn!("failed to remove by primary key: affected rows: {rows}");
        }
        Ok(())
    }

    /// Renders the record for the network front-end.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values
                .iter()
                .map(|(attr, value)| {
                    (
                        attr.clone(),
                        serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
                    )
                })
                .collect(),
        )
    }
}

impl<M: Model> Default for Record<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Clone for Record<M> {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
            _model: PhantomData,
        }
    }
}

impl<M: Model> fmt::Debug for Record<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("table", &M::schema().table())
            .field("values", &self.values)
            .finish()
    }
}

impl<M: Model> PartialEq for Record<M> {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}
