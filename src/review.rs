//! The persisted review entity.

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::wine_record::WineRecord;

/// Identifier of a stored review.
///
/// Issued by the store as the decimal creation time in milliseconds, bumped
/// past every id already issued so two reviews never share one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(String);

impl ReviewId {
    pub(crate) fn from_millis(millis: u64) -> Self {
        ReviewId(millis.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value of the id, when it was issued as a millisecond timestamp.
    pub fn as_millis(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl Display for ReviewId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReviewId {
    fn from(id: &str) -> Self {
        ReviewId(id.to_string())
    }
}

/// A user's rating and notes attached to a snapshot of a wine.
///
/// Reviews are only created by
/// [`ReviewStore::save_review`](crate::review_store::ReviewStore::save_review)
/// and never change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    id: ReviewId,
    #[serde(with = "iso_millis")]
    date: DateTime<Utc>,
    wine: WineRecord,
    rating: u8,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    in_cellar: bool,
}

impl Review {
    pub(crate) fn new(
        id: ReviewId,
        date: DateTime<Utc>,
        wine: WineRecord,
        rating: u8,
        notes: String,
        in_cellar: bool,
    ) -> Self {
        Review {
            id,
            date,
            wine,
            rating,
            notes,
            in_cellar,
        }
    }

    pub fn id(&self) -> &ReviewId {
        &self.id
    }

    /// When the review was saved.
    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn wine(&self) -> &WineRecord {
        &self.wine
    }

    /// The user's own rating, 1 to 5.
    pub fn rating(&self) -> u8 {
        self.rating
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn in_cellar(&self) -> bool {
        self.in_cellar
    }
}

/// ISO-8601 timestamps with millisecond precision, e.g. `2025-03-01T18:04:05.120Z`.
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|date| date.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
