//! The review and cellar store.
//!
//! All reviews live in one storage slot under [`STORAGE_KEY`] as a JSON array,
//! newest first. Every operation re-reads that slot, so there is no cached
//! copy to go stale between calls, and every write replaces the whole array
//! in a single `set`.
//!
//! Two processes sharing the same slot are not coordinated: if both read
//! before either writes, the second write wins and the first review is lost.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use chrono::{SubsecRound, Utc};
use log::{debug, info, warn};

use crate::error::{CorruptDataError, PersistenceError, StoreError, ValidationError};
use crate::review::{Review, ReviewId};
use crate::storage::KeyValueStorage;
use crate::wine_record::WineRecord;

/// Key of the slot holding the serialized review collection.
pub const STORAGE_KEY: &str = "sommelier_ai_reviews";

/// Valid range of the user's rating.
pub const USER_RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

pub struct ReviewStore<S> {
    storage: S,
    last_issued_id: AtomicU64,
    corrupt_reads: AtomicUsize,
}

impl<S: KeyValueStorage> ReviewStore<S> {
    pub fn new(storage: S) -> Self {
        ReviewStore {
            storage,
            last_issued_id: AtomicU64::new(0),
            corrupt_reads: AtomicUsize::new(0),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Returns every review, newest first.
    ///
    /// A missing, empty or unreadable slot yields an empty list. Corruption is
    /// logged and counted in [`corrupt_read_count`](Self::corrupt_read_count)
    /// instead of being returned.
    pub fn list_reviews(&self) -> Vec<Review> {
        match self.load() {
            Ok(reviews) => reviews,
            Err(e) => {
                self.corrupt_reads.fetch_add(1, Ordering::Relaxed);
                warn!("Error reading reviews from storage, treating as empty: {e}");
                Vec::new()
            }
        }
    }

    /// Saves a new review at the front of the collection.
    ///
    /// The wine is normalized and copied, so later changes to `wine` do not
    /// reach the stored review.
    ///
    /// # Errors
    ///
    /// [`StoreError::Validation`] if `rating` is outside `1..=5` or the wine
    /// fails [`WineRecord::normalized`]; nothing is read or written in that
    /// case. [`StoreError::Persistence`] if the storage cannot be read, the
    /// collection cannot be serialized, no fresh id is left, or the storage
    /// rejects the write; the stored collection is then unchanged.
    pub fn save_review(
        &self,
        wine: &WineRecord,
        rating: u8,
        notes: &str,
        in_cellar: bool,
    ) -> Result<Review, StoreError> {
        if !USER_RATING_RANGE.contains(&rating) {
            return Err(ValidationError::RatingOutOfRange(f64::from(rating)).into());
        }
        let snapshot = wine.normalized()?;

        if let Some(image) = &snapshot.image {
            if !image.is_durable() {
                warn!(
                    "Saving '{}' with a session-scoped image; it will not display after reload",
                    snapshot.name
                );
            }
        }

        let reviews = self.load_for_write()?;
        let id = self.next_id(&reviews)?;
        let review = Review::new(
            id,
            Utc::now().trunc_subsecs(3),
            snapshot,
            rating,
            notes.to_string(),
            in_cellar,
        );

        let mut updated = Vec::with_capacity(reviews.len() + 1);
        updated.push(review.clone());
        updated.extend(reviews);

        self.persist(&updated).map_err(|e| {
            warn!("Error saving review {}: {e}", review.id());
            e
        })?;

        info!(
            "Saved review {} for '{}' (rating {}, in cellar: {})",
            review.id(),
            review.wine().name,
            rating,
            in_cellar
        );
        Ok(review)
    }

    /// Removes the review with `id` and returns the remaining collection.
    ///
    /// An unknown id leaves the collection as it is and is not an error.
    ///
    /// # Errors
    ///
    /// [`StoreError::Persistence`] if the storage cannot be read or the
    /// updated collection cannot be written. Nothing is written after a
    /// failed read.
    pub fn delete_review(&self, id: &ReviewId) -> Result<Vec<Review>, StoreError> {
        let mut reviews = self.load_for_write()?;
        let before = reviews.len();
        reviews.retain(|review| review.id() != id);

        if reviews.len() == before {
            debug!("No review with id {id} to delete");
        }

        self.persist(&reviews).map_err(|e| {
            warn!("Error deleting review {id}: {e}");
            e
        })?;

        Ok(reviews)
    }

    /// Reviews flagged as in the cellar, newest first.
    pub fn get_cellar_wines(&self) -> Vec<Review> {
        self.list_reviews()
            .into_iter()
            .filter(Review::in_cellar)
            .collect()
    }

    /// Number of reads that found malformed or unreadable data since this
    /// store was created.
    pub fn corrupt_read_count(&self) -> usize {
        self.corrupt_reads.load(Ordering::Relaxed)
    }

    fn load(&self) -> Result<Vec<Review>, CorruptDataError> {
        match self.storage.get(STORAGE_KEY)? {
            Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
            _ => Ok(Vec::new()),
        }
    }

    /// Current collection for a read-modify-write.
    ///
    /// A storage read failure aborts the write, since writing on top of it
    /// would replace reviews that were never seen. Malformed JSON is still
    /// treated as empty, as [`list_reviews`](Self::list_reviews) does, so the
    /// next write replaces the damaged value.
    fn load_for_write(&self) -> Result<Vec<Review>, PersistenceError> {
        match self.load() {
            Ok(reviews) => Ok(reviews),
            Err(CorruptDataError::Unreadable(e)) => {
                warn!("Refusing to rewrite reviews after a failed read: {e}");
                Err(PersistenceError::Storage(e))
            }
            Err(e @ CorruptDataError::Malformed(_)) => {
                self.corrupt_reads.fetch_add(1, Ordering::Relaxed);
                warn!("Stored reviews are malformed and will be replaced: {e}");
                Ok(Vec::new())
            }
        }
    }

    fn persist(&self, reviews: &[Review]) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(reviews)?;
        self.storage.set(STORAGE_KEY, &json)?;
        Ok(())
    }

    /// Current time in milliseconds, moved forward past every id issued by
    /// this store and every id already stored.
    fn next_id(&self, existing: &[Review]) -> Result<ReviewId, PersistenceError> {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let newest_stored = existing
            .iter()
            .filter_map(|review| review.id().as_millis())
            .max()
            .unwrap_or(0);
        let floor = newest_stored
            .checked_add(1)
            .ok_or(PersistenceError::IdSpaceExhausted(newest_stored))?;

        let issue = move |last: u64| last.checked_add(1).map(|next| now.max(next).max(floor));

        match self
            .last_issued_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, issue)
        {
            Ok(previous) => issue(previous)
                .map(ReviewId::from_millis)
                .ok_or(PersistenceError::IdSpaceExhausted(previous)),
            Err(last) => Err(PersistenceError::IdSpaceExhausted(last)),
        }
    }
}
