//! Error types for the walletcare library.
//!
//! The storage engine and the image codec each have their own error enum so a
//! caller can tell which layer failed. `WalletCareError` wraps both without
//! rewording them, and every variant that carries a cause keeps it reachable
//! through [`std::error::Error::source`].

use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by the storage engine.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The directory holding the database file could not be created
    #[error("Failed to create database directory {path}: {source}")]
    Directory {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The connection pool could not be built (file unreadable, disk full, ...)
    #[error("Failed to open database {path}: {source}")]
    Open {
        /// Database location
        path: String,
        /// Underlying pool error
        #[source]
        source: r2d2::Error,
    },

    /// No pooled connection became available
    #[error("No database connection available for {operation}: {source}")]
    Connection {
        /// Operation that asked for the connection
        operation: &'static str,
        /// Underlying pool error
        #[source]
        source: r2d2::Error,
    },

    /// SQLite rejected or failed a statement
    #[error("Database error during {operation}: {source}")]
    Statement {
        /// Operation that issued the statement
        operation: &'static str,
        /// Underlying engine error
        #[source]
        source: rusqlite::Error,
    },

    /// The blocking task running the operation panicked or was cancelled
    #[error("Storage task for {operation} did not complete: {source}")]
    Task {
        /// Operation that was running
        operation: &'static str,
        /// Join failure
        #[source]
        source: tokio::task::JoinError,
    },

    /// The storage handle was closed and there is no configuration to reopen it
    #[error("Storage is closed")]
    Closed,
}

/// Failures raised by the image codec.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The source image could not be read
    #[error("Failed to read image {path}: {source}")]
    Read {
        /// Image location
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The encoded text was empty
    #[error("Encoded image is empty")]
    EmptyInput,

    /// The encoded text is not valid base64
    #[error("Encoded image is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    /// The suggested file name is not a bare file name
    #[error("Invalid image file name: {0:?}")]
    InvalidName(String),

    /// The decoded bytes could not be written
    #[error("Failed to write image {path}: {source}")]
    Write {
        /// Target location
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The blocking task running the codec panicked or was cancelled
    #[error("Image task did not complete: {0}")]
    Task(#[source] tokio::task::JoinError),
}

/// Errors surfaced by the access facade.
#[derive(Error, Debug)]
pub enum WalletCareError {
    /// Storage engine failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Image codec failure
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A form failed validation before reaching storage
    #[error("Invalid input: {0}")]
    Validation(String),
}

/// Convenience type alias for Result with `WalletCareError`
pub type Result<T> = std::result::Result<T, WalletCareError>;

/// Attaches the operation name to a raw engine result.
pub(crate) trait StorageContext<T> {
    fn during(self, operation: &'static str) -> std::result::Result<T, StorageError>;
}

impl<T> StorageContext<T> for rusqlite::Result<T> {
    fn during(self, operation: &'static str) -> std::result::Result<T, StorageError> {
        self.map_err(|source| StorageError::Statement { operation, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn statement_error_keeps_operation_and_cause() {
        let err: std::result::Result<(), StorageError> =
            Err(rusqlite::Error::QueryReturnedNoRows).during("get_exam_by_id");
        let err = err.unwrap_err();

        assert!(err.to_string().contains("get_exam_by_id"));
        assert!(err.source().is_some());
    }

    #[test]
    fn facade_error_is_transparent() {
        let storage = StorageError::Statement {
            operation: "insert_exam",
            source: rusqlite::Error::InvalidQuery,
        };
        let expected = storage.to_string();
        let err = WalletCareError::from(storage);

        assert_eq!(err.to_string(), expected);
        assert!(matches!(err, WalletCareError::Storage(StorageError::Statement { .. })));
    }

    #[test]
    fn empty_codec_input_message() {
        assert_eq!(CodecError::EmptyInput.to_string(), "Encoded image is empty");
    }
}
