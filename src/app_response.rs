use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeError;

use crate::error::{IdentificationError, PersistenceError, StorageError, StoreError};

/// JSON envelope returned by every FFI call, e.g. `{"Ok":"[...]"}` or
/// `{"ValidationError":"wine name must not be empty"}`.
#[derive(Debug, Serialize, Deserialize)]
pub enum AppResponse {
    PersistenceError(String),
    SerializationError(String),
    ValidationError(String),
    IdentificationError(String),
    BadRequest(String),
    Ok(String),
}

impl Display for AppResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AppResponse::PersistenceError(msg) => write!(f, "Persistence error: {}", msg),
            AppResponse::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            AppResponse::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppResponse::IdentificationError(msg) => write!(f, "Identification error: {}", msg),
            AppResponse::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppResponse::Ok(msg) => write!(f, "Ok: {}", msg),
        }
    }
}

impl From<StoreError> for AppResponse {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(e) => AppResponse::ValidationError(e.to_string()),
            StoreError::Persistence(e) => AppResponse::from(e),
        }
    }
}

impl From<PersistenceError> for AppResponse {
    fn from(err: PersistenceError) -> Self {
        AppResponse::PersistenceError(err.to_string())
    }
}

impl From<StorageError> for AppResponse {
    fn from(err: StorageError) -> Self {
        AppResponse::PersistenceError(err.to_string())
    }
}

impl From<SerdeError> for AppResponse {
    fn from(err: SerdeError) -> Self {
        AppResponse::SerializationError(format!("JSON serialization error: {}", err))
    }
}

impl From<IdentificationError> for AppResponse {
    fn from(err: IdentificationError) -> Self {
        AppResponse::IdentificationError(err.to_string())
    }
}
