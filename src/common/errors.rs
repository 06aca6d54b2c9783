use std::error::Error as StdError;
use std::fmt::{Display, Formatter, Result as FmtResult};
use thiserror::Error;

/// Error categories shared across the whole crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Entity not found (unknown transaction id, missing trash entry)
    NotFound,
    /// Invalid input or failed validation
    InvalidInput,
    /// OS-level permission denial, surfaced verbatim
    AccessDenied,
    /// Requested state change conflicts with the current state
    /// (double rollback, rollback of a pending transaction, non-empty directory)
    Conflict,
    /// Some files of a multi-file operation failed; the rest were processed
    PartialFailure,
    /// Internal error
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ErrorKind::NotFound => write!(f, "Not Found"),
            ErrorKind::InvalidInput => write!(f, "Invalid Input"),
            ErrorKind::AccessDenied => write!(f, "Access Denied"),
            ErrorKind::Conflict => write!(f, "Conflict"),
            ErrorKind::PartialFailure => write!(f, "Partial Failure"),
            ErrorKind::InternalError => write!(f, "Internal Error"),
        }
    }
}

/// Base domain error carrying detailed context
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct DomainError {
    /// Error category
    pub kind: ErrorKind,
    /// Affected entity type (e.g. "Transaction", "Trash")
    pub entity_type: &'static str,
    /// Entity identifier when available
    pub entity_id: Option<String>,
    /// Human-readable reason
    pub message: String,
    /// Source error (optional)
    #[source]
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

pub type Result<T> = std::result::Result<T, DomainError>;

impl DomainError {
    pub fn new<S: Into<String>>(kind: ErrorKind, entity_type: &'static str, message: S) -> Self {
        Self {
            kind,
            entity_type,
            entity_id: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn not_found<S: Into<String>>(entity_type: &'static str, entity_id: S) -> Self {
        let id = entity_id.into();
        Self {
            kind: ErrorKind::NotFound,
            entity_type,
            entity_id: Some(id.clone()),
            message: format!("{} not found: {}", entity_type, id),
            source: None,
        }
    }

    pub fn conflict<S: Into<String>>(entity_type: &'static str, message: S) -> Self {
        Self {
            kind: ErrorKind::Conflict,
            entity_type,
            entity_id: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn partial_failure<S: Into<String>>(entity_type: &'static str, message: S) -> Self {
        Self {
            kind: ErrorKind::PartialFailure,
            entity_type,
            entity_id: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn access_denied<S: Into<String>>(entity_type: &'static str, message: S) -> Self {
        Self {
            kind: ErrorKind::AccessDenied,
            entity_type,
            entity_id: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn validation_error<S: Into<String>>(entity_type: &'static str, message: S) -> Self {
        Self {
            kind: ErrorKind::InvalidInput,
            entity_type,
            entity_id: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn internal_error<S: Into<String>>(entity_type: &'static str, message: S) -> Self {
        Self {
            kind: ErrorKind::InternalError,
            entity_type,
            entity_id: None,
            message: message.into(),
            source: None,
        }
    }

    /// Sets the entity id
    pub fn with_id<S: Into<String>>(mut self, entity_id: S) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Sets the source error
    pub fn with_source<E: StdError + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

/// Trait to attach context to fallible results
pub trait ErrorContext<T, E> {
    fn with_context<C, F>(self, context: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T, E: StdError + Send + Sync + 'static> ErrorContext<T, E> for std::result::Result<T, E> {
    fn with_context<C, F>(self, context: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| DomainError {
            kind: ErrorKind::InternalError,
            entity_type: "Unknown",
            entity_id: None,
            message: context().into(),
            source: Some(Box::new(e)),
        })
    }
}

// IO errors keep their nature: permission denials and missing files stay
// distinguishable for callers instead of collapsing into InternalError.
impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::AccessDenied,
            _ => ErrorKind::InternalError,
        };
        DomainError {
            kind,
            entity_type: "IO",
            entity_id: None,
            message: format!("{}", err),
            source: Some(Box::new(err)),
        }
    }
}

/// Macro converting third-party errors to DomainError
#[macro_export]
macro_rules! impl_from_error {
    ($error_type:ty, $entity_type:expr) => {
        impl From<$error_type> for DomainError {
            fn from(err: $error_type) -> Self {
                DomainError {
                    kind: ErrorKind::InternalError,
                    entity_type: $entity_type,
                    entity_id: None,
                    message: format!("{}", err),
                    source: Some(Box::new(err)),
                }
            }
        }
    };
}

impl_from_error!(serde_json::Error, "Serialization");
impl_from_error!(sqlx::Error, "Database");
