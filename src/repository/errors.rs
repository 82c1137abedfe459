#[cfg(feature = "sqlite")]
use diesel::r2d2::{Error as R2D2Error, PoolError};
#[cfg(feature = "sqlite")]
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

use crate::query::columns::Column;

/// Classification of failures reported by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendErrorKind {
    ConnectivityLost,
    ConstraintViolated,
    SyntaxError,
    Other,
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),

    #[error("Invalid sort: {0}")]
    InvalidSort(String),

    #[error("Backend failure ({kind:?}): {diagnostic}")]
    BackendFailure {
        kind: BackendErrorKind,
        diagnostic: String,
    },

    #[error("Query cancelled")]
    Cancelled,

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl RepositoryError {
    pub fn backend(kind: BackendErrorKind, diagnostic: impl Into<String>) -> Self {
        RepositoryError::BackendFailure {
            kind,
            diagnostic: diagnostic.into(),
        }
    }

    /// A column the statement's source cannot provide, reported the way
    /// SQLite reports it.
    pub fn no_such_column(column: Column) -> Self {
        RepositoryError::backend(
            BackendErrorKind::SyntaxError,
            format!("no such column: {column}"),
        )
    }

    /// The backend error kind, if this is a backend failure.
    pub fn backend_kind(&self) -> Option<BackendErrorKind> {
        match self {
            RepositoryError::BackendFailure { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Advisory returned with every bulk mutation: the statement went straight
/// to the store, so any identity cache the backend keeps now holds stale
/// entities and must be cleared before the next read in the same session.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("Identity cache is stale after a bulk mutation; invalidate it before reading")]
pub struct CacheStale;

#[cfg(feature = "sqlite")]
impl From<DieselError> for RepositoryError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => {
                RepositoryError::backend(BackendErrorKind::Other, "Entity not found")
            }

            DieselError::DatabaseError(kind, info) => {
                let message = info.message().to_string();
                match kind {
                    DatabaseErrorKind::UniqueViolation => RepositoryError::backend(
                        BackendErrorKind::ConstraintViolated,
                        format!("Unique constraint violation: {message}"),
                    ),
                    DatabaseErrorKind::ForeignKeyViolation => RepositoryError::backend(
                        BackendErrorKind::ConstraintViolated,
                        format!("Foreign key constraint violation: {message}"),
                    ),
                    DatabaseErrorKind::NotNullViolation => RepositoryError::backend(
                        BackendErrorKind::ConstraintViolated,
                        format!("Not null constraint violation: {message}"),
                    ),
                    DatabaseErrorKind::CheckViolation => RepositoryError::backend(
                        BackendErrorKind::ConstraintViolated,
                        format!("Check constraint violation: {message}"),
                    ),
                    DatabaseErrorKind::ClosedConnection => {
                        RepositoryError::backend(BackendErrorKind::ConnectivityLost, message)
                    }
                    _ if is_syntax_message(&message) => {
                        RepositoryError::backend(BackendErrorKind::SyntaxError, message)
                    }
                    _ => RepositoryError::backend(BackendErrorKind::Other, message),
                }
            }

            DieselError::QueryBuilderError(e) => RepositoryError::backend(
                BackendErrorKind::SyntaxError,
                format!("Query builder error: {e}"),
            ),

            DieselError::DeserializationError(e) => {
                RepositoryError::ValidationError(format!("Deserialization error: {e}"))
            }

            DieselError::SerializationError(e) => {
                RepositoryError::ValidationError(format!("Serialization error: {e}"))
            }

            DieselError::InvalidCString(_) => {
                RepositoryError::ValidationError("Invalid C string".to_string())
            }

            DieselError::BrokenTransactionManager => RepositoryError::backend(
                BackendErrorKind::ConnectivityLost,
                "Broken transaction manager",
            ),

            _ => RepositoryError::backend(
                BackendErrorKind::Other,
                format!("Unexpected diesel error: {err}"),
            ),
        }
    }
}

#[cfg(feature = "sqlite")]
fn is_syntax_message(message: &str) -> bool {
    message.contains("syntax error") || message.starts_with("no such")
}

#[cfg(feature = "sqlite")]
impl From<R2D2Error> for RepositoryError {
    fn from(err: R2D2Error) -> Self {
        RepositoryError::backend(
            BackendErrorKind::ConnectivityLost,
            format!("Connection error: {err}"),
        )
    }
}

#[cfg(feature = "sqlite")]
impl From<PoolError> for RepositoryError {
    fn from(err: PoolError) -> Self {
        RepositoryError::backend(
            BackendErrorKind::ConnectivityLost,
            format!("Connection error: {err}"),
        )
    }
}
