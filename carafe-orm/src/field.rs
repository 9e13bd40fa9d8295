//! # Field Descriptors
//!
//! Column descriptors attached to a model declaration, plus the [`Value`]
//! type that carries row data between records and the database driver.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A single database value, as stored in a record or bound to a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

/// Default-value policy for a field: nothing, a fixed value, or a
/// zero-argument producer invoked lazily at save time.
#[derive(Clone)]
pub enum FieldDefault {
    None,
    Value(Value),
    Producer(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDefault::None => f.write_str("None"),
            FieldDefault::Value(v) => f.debug_tuple("Value").field(v).finish(),
            FieldDefault::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldKind {
    String,
    Boolean,
    Integer,
    Float,
    Text,
}

/// Describes one mapped column: its name, SQL type, primary-key flag and
/// default policy. Constructed through the variant constructors and the
/// builder methods, then handed to the schema registrar as metadata.
#[derive(Debug, Clone)]
pub struct Field {
    kind: FieldKind,
    name: Option<String>,
    column_type: String,
    primary_key: bool,
    default: FieldDefault,
}

impl Field {
    fn new(kind: FieldKind, column_type: &str) -> Self {
        Self {
            kind,
            name: None,
            column_type: column_type.to_string(),
            primary_key: false,
            default: FieldDefault::None,
        }
    }

    /// A `varchar(100)` column. Override the type with [`Field::ddl`].
    pub fn string() -> Self {
        Self::new(FieldKind::String, "varchar(100)")
    }

    /// A `boolean` column, defaulting to `false`. Never a primary key.
    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean, "boolean").default_value(false)
    }

    /// A `bigint` column, defaulting to `0`.
    pub fn integer() -> Self {
        Self::new(FieldKind::Integer, "bigint").default_value(0i64)
    }

    /// A `real` column, defaulting to `0.0`.
    pub fn float() -> Self {
        Self::new(FieldKind::Float, "real").default_value(0.0f64)
    }

    /// A `text` column. Never a primary key.
    pub fn text() -> Self {
        Self::new(FieldKind::Text, "text")
    }

    /// Overrides the column name; without it the declaring attribute's name
    /// is used.
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Overrides the SQL type literal, e.g. `varchar(50)`.
    pub fn ddl(mut self, column_type: &str) -> Self {
        self.column_type = column_type.to_string();
        self
    }

    /// Marks this field as the primary key. Only integer, string and float
    /// fields may carry the flag; the registrar rejects the rest.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = FieldDefault::Value(value.into());
        self
    }

    pub fn default_fn(mut self, producer: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default = FieldDefault::Producer(Arc::new(producer));
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn column_type(&self) -> &str {
        &self.column_type
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn default(&self) -> &FieldDefault {
        &self.default
    }

    pub(crate) fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Folds a driver value into the field's kind. SQLite reports booleans as
    /// integers and whole reals as integers; records normalize both.
    pub(crate) fn coerce(&self, value: Value) -> Value {
        match (self.kind, value) {
            (FieldKind::Boolean, Value::Int(i)) => Value::Bool(i != 0),
            (FieldKind::Float, Value::Int(i)) => Value::Float(i as f64),
            (_, value) => value,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            FieldKind::String => "StringField",
            FieldKind::Boolean => "BooleanField",
            FieldKind::Integer => "IntegerField",
            FieldKind::Float => "FloatField",
            FieldKind::Text => "TextField",
        };
        write!(
            f,
            "<{}, {}:{}>",
            kind,
            self.column_type,
            self.name.as_deref().unwrap_or("_")
        )
    }
}
