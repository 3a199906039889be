//! Error types for the storage access layer.

use std::time::Duration;

use crate::{Operation, Scheme};

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Flat classification of an [`Error`].
///
/// Matching on `ErrorKind` is the stable way for callers (and bindings) to
/// branch on failures without caring about the context each variant carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The path does not exist.
    NotFound,
    /// The backend refused access.
    PermissionDenied,
    /// The target already exists.
    AlreadyExists,
    /// A directory was given where an object was expected.
    IsADirectory,
    /// An object was given where a directory was expected.
    NotADirectory,
    /// The operation is neither native nor emulable on this backend.
    Unsupported,
    /// The operation ran out of time.
    Timeout,
    /// The operation was cancelled before completing.
    Cancelled,
    /// A retryable fault (network hiccup, throttling, 5xx).
    Transient,
    /// Bad path, argument or configuration.
    Invalid,
    /// Unexpected backend fault that must not be retried automatically.
    Internal,
}

impl ErrorKind {
    /// Stable lowercase name, suitable for logs and metrics labels.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::IsADirectory => "is_a_directory",
            ErrorKind::NotADirectory => "not_a_directory",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Transient => "transient",
            ErrorKind::Invalid => "invalid",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage error with contextual variants.
///
/// Every variant records the path and/or operation involved. Multi-step
/// emulated operations report through [`Error::Partial`], which wraps the
/// first failing step.
///
/// # Examples
///
/// ```rust
/// use anystore::{Error, ErrorKind};
///
/// let err = Error::NotFound { path: "data/missing.bin".into() };
/// assert_eq!(err.to_string(), "not found: data/missing.bin");
/// assert_eq!(err.kind(), ErrorKind::NotFound);
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Path does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// The path that was not found.
        path: String,
    },

    /// Permission denied for operation.
    #[error("{operation}: permission denied: {path}")]
    PermissionDenied {
        /// The path where permission was denied.
        path: String,
        /// The operation that was denied.
        operation: Operation,
    },

    /// Path already exists when it shouldn't.
    #[error("{operation}: already exists: {path}")]
    AlreadyExists {
        /// The path that already exists.
        path: String,
        /// The operation that failed.
        operation: Operation,
    },

    /// Expected an object but found a directory.
    #[error("{operation}: is a directory: {path}")]
    IsADirectory {
        /// The directory path.
        path: String,
        /// The operation that failed.
        operation: Operation,
    },

    /// Expected a directory but found something else.
    #[error("{operation}: not a directory: {path}")]
    NotADirectory {
        /// The path that is not a directory.
        path: String,
        /// The operation that failed.
        operation: Operation,
    },

    /// Operation is not supported by the backend and cannot be emulated.
    #[error("{operation}: not supported by {scheme} backend{}", detail_suffix(.detail))]
    Unsupported {
        /// The unsupported operation.
        operation: Operation,
        /// The backend scheme.
        scheme: Scheme,
        /// What exactly is missing (e.g. "range reads").
        detail: Option<&'static str>,
    },

    /// Operation exceeded its deadline.
    #[error("{operation} timed out after {timeout:?}: {path}")]
    Timeout {
        /// The operation that timed out.
        operation: Operation,
        /// The path involved.
        path: String,
        /// The configured deadline.
        timeout: Duration,
    },

    /// Operation was cancelled before it could complete.
    #[error("{operation}: cancelled")]
    Cancelled {
        /// The cancelled operation.
        operation: Operation,
    },

    /// Retryable backend or network fault.
    #[error("{operation}: transient failure on {path}: {message}")]
    Transient {
        /// The operation that failed.
        operation: Operation,
        /// The path involved.
        path: String,
        /// Backend-supplied description.
        message: String,
    },

    /// Invalid path, argument or configuration.
    #[error("invalid: {message}")]
    Invalid {
        /// What was wrong.
        message: String,
    },

    /// Unexpected backend fault.
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O error that could not be classified more precisely.
    #[error("{operation} failed for {path}: {source}")]
    Io {
        /// The operation that failed.
        operation: Operation,
        /// The path involved in the operation.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A multi-step emulated operation failed part way through.
    ///
    /// Steps already committed are not rolled back.
    #[error("{operation}: failed after {committed} committed step(s): {source}")]
    Partial {
        /// The logical operation being emulated.
        operation: Operation,
        /// Number of steps that completed before the failure. Steps of a
        /// nested emulation (the copy inside an emulated rename) are
        /// counted individually.
        committed: usize,
        /// The first failing step's error.
        #[source]
        source: Box<Error>,
    },
}

fn detail_suffix(detail: &Option<&'static str>) -> String {
    match detail {
        Some(d) => format!(" ({d})"),
        None => String::new(),
    }
}

impl Error {
    /// Classify this error. [`Error::Partial`] reports the kind of its cause.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Error::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Error::IsADirectory { .. } => ErrorKind::IsADirectory,
            Error::NotADirectory { .. } => ErrorKind::NotADirectory,
            Error::Unsupported { .. } => ErrorKind::Unsupported,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::Cancelled { .. } => ErrorKind::Cancelled,
            Error::Transient { .. } => ErrorKind::Transient,
            Error::Invalid { .. } => ErrorKind::Invalid,
            Error::Internal(_) | Error::Io { .. } => ErrorKind::Internal,
            Error::Partial { source, .. } => source.kind(),
        }
    }

    /// Returns `true` if a retry may succeed.
    ///
    /// Saga reports are never transient: repeating the whole sequence would
    /// redo steps that already committed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient { .. })
    }

    /// Returns `true` for [`ErrorKind::NotFound`].
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Shorthand for [`Error::Invalid`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Error::Invalid {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Unsupported`] without detail.
    pub fn unsupported(operation: Operation, scheme: Scheme) -> Self {
        Error::Unsupported {
            operation,
            scheme,
            detail: None,
        }
    }

    /// Classify an OS error, keeping the operation and path as context.
    pub fn from_io(operation: Operation, path: &str, error: std::io::Error) -> Self {
        use std::io::ErrorKind as Io;

        let path = path.to_string();
        match error.kind() {
            Io::NotFound => Error::NotFound { path },
            Io::PermissionDenied => Error::PermissionDenied { path, operation },
            Io::AlreadyExists => Error::AlreadyExists { path, operation },
            Io::IsADirectory => Error::IsADirectory { path, operation },
            Io::NotADirectory => Error::NotADirectory { path, operation },
            Io::TimedOut
            | Io::Interrupted
            | Io::WouldBlock
            | Io::ConnectionReset
            | Io::ConnectionAborted
            | Io::ConnectionRefused
            | Io::BrokenPipe => Error::Transient {
                operation,
                path,
                message: error.to_string(),
            },
            Io::InvalidInput => Error::Invalid {
                message: format!("{operation} {path}: {error}"),
            },
            _ => Error::Io {
                operation,
                path,
                source: error,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = Error::NotFound {
            path: "missing".into(),
        };
        assert_eq!(err.to_string(), "not found: missing");
    }

    #[test]
    fn already_exists_display() {
        let err = Error::AlreadyExists {
            path: "exists".into(),
            operation: Operation::CreateDir,
        };
        assert_eq!(err.to_string(), "create_dir: already exists: exists");
    }

    #[test]
    fn unsupported_display_with_detail() {
        let err = Error::Unsupported {
            operation: Operation::Read,
            scheme: Scheme::Fs,
            detail: Some("range reads"),
        };
        assert_eq!(
            err.to_string(),
            "read: not supported by fs backend (range reads)"
        );
        assert_eq!(
            Error::unsupported(Operation::Copy, Scheme::Memory).to_string(),
            "copy: not supported by memory backend"
        );
    }

    #[test]
    fn partial_reports_inner_kind() {
        let err = Error::Partial {
            operation: Operation::RemoveAll,
            committed: 2,
            source: Box::new(Error::PermissionDenied {
                path: "dir/c".into(),
                operation: Operation::Delete,
            }),
        };
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert!(!err.is_transient());
        assert!(err.to_string().contains("2 committed"));
    }

    #[test]
    fn from_io_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err = Error::from_io(Operation::Stat, "a", io_err);
        assert!(matches!(err, Error::NotFound { ref path } if path == "a"));
    }

    #[test]
    fn from_io_permission_denied() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let err = Error::from_io(Operation::Write, "a", io_err);
        assert!(matches!(
            err,
            Error::PermissionDenied {
                operation: Operation::Write,
                ..
            }
        ));
    }

    #[test]
    fn from_io_timed_out_is_transient() {
        let io_err = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow");
        let err = Error::from_io(Operation::Read, "a", io_err);
        assert!(err.is_transient());
        assert_eq!(err.kind(), ErrorKind::Transient);
    }

    #[test]
    fn from_io_other() {
        let io_err = std::io::Error::other("test");
        let err = Error::from_io(Operation::List, "dir/", io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn error_kind_names() {
        assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
        assert_eq!(ErrorKind::Transient.as_str(), "transient");
    }
}
