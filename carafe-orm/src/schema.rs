//! # Schema Registrar
//!
//! Compiles a model's declared field descriptors into immutable table
//! metadata: the primary key, the ordered column list and the four canonical
//! statement templates. Compilation happens exactly once per model type, at
//! first use, and the result is shared read-only by every instance.

use std::collections::HashMap;

use log::debug;

use crate::error::SchemaError;
use crate::field::{Field, FieldKind};
use crate::record::Model;

/// Per-type table metadata plus the precompiled SQL templates.
///
/// Templates use `?` placeholders; the query executor translates them to the
/// driver's native placeholder form immediately before submission.
pub struct TableSchema {
    table: String,
    mappings: HashMap<String, Field>,
    primary_key: String,
    fields: Vec<String>,
    select_stmt: String,
    insert_stmt: String,
    update_stmt: String,
    delete_stmt: String,
}

fn quote(ident: &str) -> String {
    format!("`{ident}`")
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

impl TableSchema {
    /// Compiles the declared `(attribute, descriptor)` list for `table`.
    ///
    /// Exactly one descriptor must carry the primary-key flag, and it must be
    /// an integer, string or float field. Declaration order of the remaining
    /// fields is preserved and determines column order in every template.
    pub fn compile(
        table: &str,
        declared: Vec<(&str, Field)>,
    ) -> Result<TableSchema, SchemaError> {
        debug!("found model: {table}");

        let mut mappings: HashMap<String, Field> = HashMap::new();
        let mut fields: Vec<String> = Vec::new();
        let mut primary_key: Option<String> = None;

        for (attr, field) in declared {
            debug!("found mapping: {attr} ==> {field}");
            if mappings.contains_key(attr) {
                return Err(SchemaError::DuplicateField {
                    table: table.to_string(),
                    attr: attr.to_string(),
                });
            }
            if field.is_primary_key() {
                if !matches!(
                    field.kind(),
                    FieldKind::Integer | FieldKind::String | FieldKind::Float
                ) {
                    return Err(SchemaError::UnsupportedPrimaryKey {
                        table: table.to_string(),
                        attr: attr.to_string(),
                    });
                }
                if primary_key.is_some() {
                    return Err(SchemaError::DuplicatePrimaryKey {
                        table: table.to_string(),
                        attr: attr.to_string(),
                    });
                }
                primary_key = Some(attr.to_string());
            } else {
                fields.push(attr.to_string());
            }
            mappings.insert(attr.to_string(), field);
        }

        let primary_key = primary_key.ok_or_else(|| SchemaError::MissingPrimaryKey {
            table: table.to_string(),
        })?;

        let column_of = |attr: &String| -> String {
            mappings
                .get(attr)
                .and_then(|f| f.name())
                .unwrap_or(attr)
                .to_string()
        };
        let pk_col = quote(&column_of(&primary_key));
        let escaped: Vec<String> = fields.iter().map(|f| quote(&column_of(f))).collect();

        let select_stmt = if escaped.is_empty() {
            format!("select {pk_col} from {}", quote(table))
        } else {
            format!("select {pk_col}, {} from {}", escaped.join(", "), quote(table))
        };
        let insert_stmt = if escaped.is_empty() {
            format!(
                "insert into {} ({pk_col}) values ({})",
                quote(table),
                placeholders(1)
            )
        } else {
            format!(
                "insert into {} ({}, {pk_col}) values ({})",
                quote(table),
                escaped.join(", "),
                placeholders(escaped.len() + 1)
            )
        };
        let update_stmt = if escaped.is_empty() {
            // pk-only table: the no-op assignment keeps the statement well-formed
            format!("update {} set {pk_col}={pk_col} where {pk_col}=?", quote(table))
        } else {
            let assignments: Vec<String> =
                escaped.iter().map(|col| format!("{col}=?")).collect();
            format!(
                "update {} set {} where {pk_col}=?",
                quote(table),
                assignments.join(", ")
            )
        };
        let delete_stmt = format!("delete from {} where {pk_col}=?", quote(table));

        Ok(TableSchema {
            table: table.to_string(),
            mappings,
            primary_key,
            fields,
            select_stmt,
            insert_stmt,
            update_stmt,
            delete_stmt,
        })
    }

    /// Compiles the schema for a model type, panicking on failure.
    ///
    /// Registration failures are unrecoverable: the model type cannot be used
    /// at all, so this is intended for the one-time `LazyLock` initialization
    /// inside [`Model::schema`] implementations. Use [`TableSchema::compile`]
    /// directly when the failure itself is the thing under test.
    pub fn register<M: Model>() -> TableSchema {
        match Self::compile(M::table_name(), M::declare()) {
            Ok(schema) => schema,
            Err(err) => panic!("cannot register model `{}`: {err}", M::table_name()),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Non-primary-key attribute names, in declaration order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn field(&self, attr: &str) -> Option<&Field> {
        self.mappings.get(attr)
    }

    /// Resolves an attribute to its column name (descriptor override, or the
    /// attribute name itself).
    pub fn column_for<'a>(&'a self, attr: &'a str) -> &'a str {
        self.mappings
            .get(attr)
            .and_then(|f| f.name())
            .unwrap_or(attr)
    }

    pub fn select_stmt(&self) -> &str {
        &self.select_stmt
    }

    pub fn insert_stmt(&self) -> &str {
        &self.insert_stmt
    }

    pub fn update_stmt(&self) -> &str {
        &self.update_stmt
    }

    pub fn delete_stmt(&self) -> &str {
        &self.delete_stmt
    }
}
