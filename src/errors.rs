//! # Error Handling
//!
//! Every fallible operation on [`Service`](crate::Service) and
//! [`TypedService`](crate::TypedService) returns a [`ServiceError`].
//!
//! ## Philosophy
//!
//! **Store failures are never rewritten.** A `DbErr` produced by the delegate
//! (constraint violations, connectivity, missing rows) is carried unchanged
//! inside [`ServiceError::Database`], so callers can still match on the exact
//! variant the store produced. The same holds for cache adapter failures: an
//! adapter whose `get`/`set` fails fails the whole call.
//!
//! ```rust,ignore
//! match service.find_unique(request, &CacheOptions::default()).await {
//!     Ok(row) => println!("{row}"),
//!     Err(ServiceError::Database(DbErr::RecordNotFound(_))) => println!("missing"),
//!     Err(err) => return Err(err),
//! }
//! ```
//!
//! ## Logging
//!
//! Errors are reported through the `tracing` crate when they leave the
//! service. Nothing is printed unless the application installs a subscriber.

use sea_orm::DbErr;
use std::fmt;

use crate::cache::CacheError;

/// Error returned by the request facades
#[derive(Debug)]
pub enum ServiceError {
    /// The delegate or store failed; the inner error is the store's own
    Database(DbErr),

    /// The configured cache adapter failed
    Cache(CacheError),

    /// A sniffed request named shorthand or native keys but did not
    /// deserialize into that shape
    InvalidRequest(serde_json::Error),

    /// A typed facade could not decode the delegate's result
    Decode {
        /// Model or row type the result was decoded into
        model: &'static str,
        /// Underlying decoding error
        source: serde_json::Error,
    },
}

impl ServiceError {
    /// Wrap a store error without altering it
    ///
    /// # Example
    /// ```rust,ignore
    /// let rows = store.raw_query(sql).await.map_err(ServiceError::database)?;
    /// ```
    #[must_use]
    pub fn database(err: DbErr) -> Self {
        Self::Database(err)
    }

    /// Wrap a cache adapter failure
    #[must_use]
    pub fn cache(err: CacheError) -> Self {
        Self::Cache(err)
    }

    /// Build a decode error for the given model
    #[must_use]
    pub fn decode(model: &'static str, source: serde_json::Error) -> Self {
        Self::Decode { model, source }
    }

    /// Whether the store reported that no matching record exists
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Database(DbErr::RecordNotFound(_)))
    }

    /// The store error, if this error came from the store
    #[must_use]
    pub fn as_db_err(&self) -> Option<&DbErr> {
        match self {
            Self::Database(err) => Some(err),
            _ => None,
        }
    }

    /// Log error details
    ///
    /// Store and cache failures are logged at `error`, caller mistakes at
    /// `debug`. No output if tracing is not configured.
    pub fn log(&self) {
        match self {
            Self::Database(internal) => {
                tracing::error!(
                    error = ?internal,
                    "Database error occurred"
                );
            }
            Self::Cache(internal) => {
                tracing::error!(
                    error = %internal,
                    "Cache adapter error occurred"
                );
            }
            Self::InvalidRequest(source) => {
                tracing::debug!(
                    error = %source,
                    "Invalid request shape"
                );
            }
            Self::Decode { model, source } => {
                tracing::debug!(
                    model = %model,
                    error = %source,
                    "Failed to decode delegate result"
                );
            }
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database(err) => write!(f, "database error: {err}"),
            Self::Cache(err) => write!(f, "cache error: {err}"),
            Self::InvalidRequest(err) => write!(f, "invalid request: {err}"),
            Self::Decode { model, source } => {
                write!(f, "failed to decode {model} result: {source}")
            }
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database(err) => Some(err),
            Self::Cache(err) => Some(err),
            Self::InvalidRequest(err) | Self::Decode { source: err, .. } => Some(err),
        }
    }
}

// ============================================================================
// Conversions from common error types
// ============================================================================

impl From<DbErr> for ServiceError {
    fn from(err: DbErr) -> Self {
        Self::Database(err)
    }
}

impl From<CacheError> for ServiceError {
    fn from(err: CacheError) -> Self {
        Self::Cache(err)
    }
}

/// Convert into a [`ServiceError`] and log it on the way out
pub(crate) fn logged(err: impl Into<ServiceError>) -> ServiceError {
    let err = err.into();
    err.log();
    err
}
