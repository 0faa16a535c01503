//! Error kinds per the five classes the orchestrator must distinguish:
//! encoding, schema/constraint, transient (retryable), terminal, and
//! programmer errors. Every variant carries the scope tag of the
//! operation that raised it, e.g. `"AddBlock()"` or `"getSigTypeDelta()"`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("{scope}: encoding error: {source}")]
    Encoding {
        scope: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{scope}: schema violation: {message}")]
    Schema { scope: String, message: String },

    #[error("{scope}: transient database error: {source}")]
    Transient {
        scope: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{scope}: terminal database error: {source}")]
    Terminal {
        scope: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{scope}: programmer error: {message}")]
    Programmer { scope: String, message: String },
}

impl WriterError {
    pub fn schema(scope: &str, message: impl Into<String>) -> Self {
        WriterError::Schema {
            scope: scope.to_string(),
            message: message.into(),
        }
    }

    pub fn programmer(scope: &str, message: impl Into<String>) -> Self {
        WriterError::Programmer {
            scope: scope.to_string(),
            message: message.into(),
        }
    }

    pub fn encoding(scope: &str, source: impl Into<anyhow::Error>) -> Self {
        WriterError::Encoding {
            scope: scope.to_string(),
            source: source.into(),
        }
    }

    /// Classifies a raw rusqlite error as transient (caller should retry
    /// the whole block transaction with a fresh connection) or terminal.
    pub fn from_sql(scope: &str, source: rusqlite::Error) -> Self {
        if is_transient(&source) {
            WriterError::Transient {
                scope: scope.to_string(),
                source,
            }
        } else {
            WriterError::Terminal {
                scope: scope.to_string(),
                source,
            }
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, WriterError::Transient { .. })
    }
}

fn is_transient(err: &rusqlite::Error) -> bool {
    use rusqlite::ffi::ErrorCode;
    match err {
        rusqlite::Error::SqliteFailure(ffi_err, _) => {
            matches!(ffi_err.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
        }
        _ => false,
    }
}

pub type WriterResult<T> = Result<T, WriterError>;

/// Helper to tag a [`rusqlite::Error`] with a scope and classify it,
/// for use with `.map_err(sql_err("AddBlock()"))`.
pub fn sql_err(scope: &'static str) -> impl Fn(rusqlite::Error) -> WriterError {
    move |e| WriterError::from_sql(scope, e)
}
