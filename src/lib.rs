//! # Wine Cellar Core
//!
//! On-device store for a personal wine log: reviews of wines identified from a
//! label photo, and the subset the user keeps in their cellar. Built on LMDB
//! and designed for FFI integration with Flutter and other cross-platform
//! front-ends.
//!
//! ## Features
//!
//! - **Single-slot persistence**: the whole review collection is one JSON value
//!   under [`review_store::STORAGE_KEY`], rewritten atomically on each change
//! - **Fail-soft reads**: missing or corrupted data reads as an empty log
//! - **Strict writes**: invalid input and storage failures are reported, never
//!   half-applied
//! - **Pluggable storage**: any [`storage::KeyValueStorage`], with in-memory and
//!   LMDB implementations included
//! - **Provider-agnostic identification**: [`identification::IdentificationProvider`]
//!   accepts any source of wine records
//!
//! ## Quick Start
//!
//! ```
//! use wine_cellar_core::review_store::ReviewStore;
//! use wine_cellar_core::storage::MemoryStorage;
//! use wine_cellar_core::wine_record::WineRecord;
//!
//! let store = ReviewStore::new(MemoryStorage::new());
//! let wine = WineRecord {
//!     name: "Château Margaux 2015".to_string(),
//!     region: "Bordeaux, France".to_string(),
//!     wine_type: "Red".to_string(),
//!     rating: 4.8,
//!     ..WineRecord::default()
//! };
//!
//! let review = store.save_review(&wine, 5, "Great with steak", true)?;
//! assert_eq!(store.list_reviews()[0].id(), review.id());
//! assert_eq!(store.get_cellar_wines().len(), 1);
//! # Ok::<(), wine_cellar_core::error::StoreError>(())
//! ```
//!
//! ## FFI Functions
//!
//! - [`create_review_store`] - Open or create a store in `<name>.lmdb`
//! - [`list_reviews`] - All reviews, newest first
//! - [`save_review`] - Save a review for an identified wine
//! - [`delete_review`] - Delete a review by id
//! - [`get_cellar_wines`] - Reviews flagged as in the cellar
//! - [`parse_identification`] - Turn a model answer into a wine record
//! - [`close_review_store`] - Sync and release a store
//! - [`free_response`] - Release a string returned by any of the above

pub mod error;
pub mod identification;
pub mod lmdb_storage;
pub mod review;
pub mod review_store;
pub mod storage;
pub mod wine_record;
mod app_response;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use log::{info, warn};
use serde::Deserialize;

pub use crate::app_response::AppResponse;
use crate::error::ValidationError;
use crate::lmdb_storage::LmdbStorage;
use crate::review::{Review, ReviewId};
use crate::review_store::{ReviewStore, USER_RATING_RANGE};
use crate::wine_record::WineRecord;

/// Store handle handed across the FFI boundary.
pub type LocalReviewStore = ReviewStore<LmdbStorage>;

/// Body of a [`save_review`] call.
///
/// ```json
/// {
///   "wine": { "name": "...", "region": "...", "type": "Red", "rating": 4.5,
///             "price": { "value": 40, "currency": "EUR" }, "review": "..." },
///   "rating": 4,
///   "notes": "Bought for the anniversary",
///   "inCellar": true
/// }
/// ```
///
/// `notes` defaults to empty and `inCellar` to `false`. `rating` accepts any
/// JSON number so that every out-of-range value is reported the same way.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReviewRequest {
    pub wine: WineRecord,
    pub rating: serde_json::Number,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub in_cellar: bool,
}

impl SaveReviewRequest {
    /// The rating as a whole number in `1..=5`.
    pub fn user_rating(&self) -> Result<u8, ValidationError> {
        self.rating
            .as_u64()
            .and_then(|value| u8::try_from(value).ok())
            .filter(|value| USER_RATING_RANGE.contains(value))
            .ok_or_else(|| {
                ValidationError::RatingOutOfRange(self.rating.as_f64().unwrap_or(f64::NAN))
            })
    }
}

/// Opens or creates a review store backed by `<name>.lmdb`.
///
/// # Returns
///
/// A pointer to the store, or null if `name` is null, not UTF-8, or the
/// environment cannot be opened. Release it with [`close_review_store`].
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use wine_cellar_core::{close_review_store, create_review_store, free_response};
///
/// let name = CString::new("sommelier").unwrap();
/// let store = create_review_store(name.as_ptr());
/// assert!(!store.is_null());
/// free_response(close_review_store(store) as *mut _);
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_review_store(name: *const c_char) -> *mut LocalReviewStore {
    if name.is_null() {
        warn!("Null name pointer passed to create_review_store");
        return std::ptr::null_mut();
    }

    let name_str = match unsafe { CStr::from_ptr(name).to_str() } {
        Ok(s) => s,
        Err(e) => {
            warn!("Invalid UTF-8 in name parameter: {e}");
            return std::ptr::null_mut();
        }
    };

    info!("Opening review store at: {name_str}.lmdb");

    match LmdbStorage::init(name_str) {
        Ok(storage) => {
            info!("✅ Review store ready");
            Box::into_raw(Box::new(ReviewStore::new(storage)))
        }
        Err(e) => {
            warn!("❌ Failed to open review store: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Lists every review, newest first.
///
/// Returns `{"Ok":"<json array>"}`. A corrupted store reads as `"[]"`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn list_reviews(store: *mut LocalReviewStore) -> *const c_char {
    let store = match unsafe { store.as_ref() } {
        Some(s) => s,
        None => return bad_request("Null store pointer passed to list_reviews"),
    };

    reviews_to_c_string(&store.list_reviews())
}

/// Saves a review from a [`SaveReviewRequest`] JSON body.
///
/// Returns `{"Ok":"<review json>"}` on success, `ValidationError` for an
/// out-of-range rating or invalid wine, `PersistenceError` if the write fails.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn save_review(store: *mut LocalReviewStore, json_ptr: *const c_char) -> *const c_char {
    let store = match unsafe { store.as_ref() } {
        Some(s) => s,
        None => return bad_request("Null store pointer passed to save_review"),
    };

    let json_str = match c_ptr_to_string(json_ptr, "JSON") {
        Ok(json) => json,
        Err(err) => return err,
    };

    let request: SaveReviewRequest = match serde_json::from_str(&json_str) {
        Ok(r) => r,
        Err(e) => {
            let error = AppResponse::SerializationError(format!("Invalid JSON: {e}"));
            return response_to_c_string(&error);
        }
    };

    let rating = match request.user_rating() {
        Ok(rating) => rating,
        Err(e) => return response_to_c_string(&AppResponse::ValidationError(e.to_string())),
    };

    match store.save_review(&request.wine, rating, &request.notes, request.in_cellar) {
        Ok(review) => match serde_json::to_string(&review) {
            Ok(json) => response_to_c_string(&AppResponse::Ok(json)),
            Err(e) => response_to_c_string(&AppResponse::from(e)),
        },
        Err(e) => response_to_c_string(&AppResponse::from(e)),
    }
}

/// Deletes the review with `id` and returns the remaining reviews.
///
/// Deleting an unknown id is not an error; the unchanged list is returned.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn delete_review(store: *mut LocalReviewStore, id: *const c_char) -> *const c_char {
    let store = match unsafe { store.as_ref() } {
        Some(s) => s,
        None => return bad_request("Null store pointer passed to delete_review"),
    };

    let id_str = match c_ptr_to_string(id, "id") {
        Ok(id) => id,
        Err(err) => return err,
    };

    match store.delete_review(&ReviewId::from(id_str.as_str())) {
        Ok(reviews) => reviews_to_c_string(&reviews),
        Err(e) => response_to_c_string(&AppResponse::from(e)),
    }
}

/// Lists the reviews flagged as in the cellar, newest first.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_cellar_wines(store: *mut LocalReviewStore) -> *const c_char {
    let store = match unsafe { store.as_ref() } {
        Some(s) => s,
        None => return bad_request("Null store pointer passed to get_cellar_wines"),
    };

    reviews_to_c_string(&store.get_cellar_wines())
}

/// Parses a model's text answer into a normalized wine record.
///
/// Returns `{"Ok":"<wine json>"}` or `IdentificationError`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn parse_identification(text_ptr: *const c_char) -> *const c_char {
    let text = match c_ptr_to_string(text_ptr, "text") {
        Ok(text) => text,
        Err(err) => return err,
    };

    match identification::parse_candidate(&text) {
        Ok(wine) => match serde_json::to_string(&wine) {
            Ok(json) => response_to_c_string(&AppResponse::Ok(json)),
            Err(e) => response_to_c_string(&AppResponse::from(e)),
        },
        Err(e) => response_to_c_string(&AppResponse::from(e)),
    }
}

/// Syncs the store to disk and releases it. The pointer must not be used afterwards.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn close_review_store(store: *mut LocalReviewStore) -> *const c_char {
    if store.is_null() {
        return bad_request("Null store pointer passed to close_review_store");
    }

    let store = unsafe { Box::from_raw(store) };

    match store.storage().close_database() {
        Ok(()) => response_to_c_string(&AppResponse::Ok("Review store closed successfully".to_string())),
        Err(e) => response_to_c_string(&AppResponse::from(e)),
    }
}

/// Releases a string returned by one of the functions in this crate.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_response(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }
    drop(unsafe { CString::from_raw(ptr) });
}

fn reviews_to_c_string(reviews: &[Review]) -> *const c_char {
    match serde_json::to_string(reviews) {
        Ok(json) => response_to_c_string(&AppResponse::Ok(json)),
        Err(e) => response_to_c_string(&AppResponse::from(e)),
    }
}

fn bad_request(message: &str) -> *const c_char {
    warn!("{message}");
    response_to_c_string(&AppResponse::BadRequest(message.to_string()))
}

/// Serializes an [`AppResponse`] into a heap C string owned by the caller.
///
/// Returns null only if the response itself cannot be serialized.
fn response_to_c_string(response: &AppResponse) -> *const c_char {
    let json = match serde_json::to_string(response) {
        Ok(j) => j,
        Err(e) => {
            warn!("Error serializing response: {e}");
            return std::ptr::null();
        }
    };

    match CString::new(json) {
        Ok(c_str) => c_str.into_raw(),
        Err(e) => {
            warn!("Error creating CString: {e}");
            std::ptr::null()
        }
    }
}

/// Converts a C string argument, mapping null and invalid UTF-8 to a
/// `BadRequest` response.
fn c_ptr_to_string(ptr: *const c_char, field_name: &str) -> Result<String, *const c_char> {
    if ptr.is_null() {
        let error = AppResponse::BadRequest(format!("Null {field_name} pointer"));
        return Err(response_to_c_string(&error));
    }

    match unsafe { CStr::from_ptr(ptr).to_str() } {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            let error = AppResponse::BadRequest(format!("Invalid UTF-8 in {field_name}: {e}"));
            Err(response_to_c_string(&error))
        }
    }
}
