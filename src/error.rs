//! Error taxonomy for the review store and the identification boundary.
//!
//! Read paths never surface errors to callers (see
//! [`ReviewStore::list_reviews`](crate::review_store::ReviewStore::list_reviews)),
//! so only writes, validation and identification produce values of these types.

use thiserror::Error;

/// Failure reported by a [`KeyValueStorage`](crate::storage::KeyValueStorage) backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The medium refused the write because it is full.
    #[error("storage quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The medium could not be opened, read or written.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<lmdb::Error> for StorageError {
    fn from(err: lmdb::Error) -> Self {
        match err {
            lmdb::Error::MapFull => StorageError::QuotaExceeded(err.to_string()),
            _ => StorageError::Unavailable(format!("LMDB error: {err}")),
        }
    }
}

/// A write could not be made durable. Persisted state is left as it was.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to serialize reviews: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no review id left above {0}")]
    IdSpaceExhausted(u64),
}

/// Rejected input to [`save_review`](crate::review_store::ReviewStore::save_review)
/// or to wine record normalization. Raised before any storage access.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("wine name must not be empty")]
    MissingName,

    #[error("user rating must be a whole number between 1 and 5, got {0}")]
    RatingOutOfRange(f64),

    #[error("wine score must be a number between 0 and 5, got {0}")]
    ScoreOutOfRange(f64),

    #[error("price must be a non-negative number, got {0}")]
    InvalidPrice(f64),

    #[error("match confidence must be between 0 and 1, got {0}")]
    ConfidenceOutOfRange(f64),
}

/// Malformed data found in the storage slot. Recovered locally as an empty
/// collection and only recorded for diagnostics.
#[derive(Error, Debug)]
pub enum CorruptDataError {
    #[error("stored reviews are not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("stored reviews could not be read: {0}")]
    Unreadable(#[from] StorageError),
}

/// Errors returned by write operations on the review store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("persistence failed: {0}")]
    Persistence(#[from] PersistenceError),
}

impl From<StorageError> for StoreError {
    fn from(err: StorageError) -> Self {
        StoreError::Persistence(PersistenceError::Storage(err))
    }
}

/// The identification provider failed or produced output that is not a wine record.
#[derive(Error, Debug)]
pub enum IdentificationError {
    #[error("API key is required")]
    MissingCredentials,

    #[error("provider request failed: {0}")]
    Provider(String),

    #[error("no text returned from provider")]
    EmptyResponse,

    #[error("failed to parse wine data from provider response: {0}")]
    Unparsable(#[from] serde_json::Error),

    #[error("provider returned an invalid wine record: {0}")]
    Invalid(#[from] ValidationError),
}
