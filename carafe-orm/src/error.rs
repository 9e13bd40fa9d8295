use thiserror::Error;

/// Raised while compiling a model's declared fields into a [`TableSchema`].
///
/// Schema errors are fatal: a model that fails registration is unusable for
/// the lifetime of the process.
///
/// [`TableSchema`]: crate::schema::TableSchema
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("table `{table}`: primary key not found")]
    MissingPrimaryKey { table: String },

    #[error("table `{table}`: duplicate primary key for field: {attr}")]
    DuplicatePrimaryKey { table: String, attr: String },

    #[error("table `{table}`: field `{attr}` cannot act as a primary key")]
    UnsupportedPrimaryKey { table: String, attr: String },

    #[error("table `{table}`: duplicate field declaration: {attr}")]
    DuplicateField { table: String, attr: String },
}

/// The crate-wide error type.
///
/// Driver and connection failures are wrapped unchanged; nothing in this crate
/// retries or swallows them.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Invalid `limit` shape passed to `find_all` or parsed from input.
    #[error("invalid limit value: {0}")]
    InvalidLimit(String),

    /// A record was keyed by an attribute its schema does not map.
    #[error("table `{table}` has no mapped attribute `{attr}`")]
    UnknownAttribute { table: String, attr: String },

    /// A required connection option was missing at pool construction.
    #[error("missing required connection option `{0}`")]
    Config(&'static str),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
