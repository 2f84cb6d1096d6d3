//! Data model for an identified wine.
//!
//! [`WineRecord`] is the normalized description produced by an identification
//! provider and embedded, as an owned snapshot, in every stored review. Field
//! names on disk follow the camelCase layout used by the front-end
//! (`type`, `scannedText`, `matchConfidence`).
//!
//! Fields other than `name` carry serde defaults so reviews written by earlier
//! versions of the app, which stored only part of the record, still load.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Currency assumed when a price arrives without a code.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Highest score a wine (or a user) can give.
pub const MAX_SCORE: f64 = 5.0;

/// Estimated retail price of a bottle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub value: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for Price {
    fn default() -> Self {
        Price {
            value: 0.0,
            currency: default_currency(),
        }
    }
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// Opaque reference to displayable image data.
///
/// Stored as a plain URI string. Images captured on device should be converted
/// with [`WineImage::from_bytes`] into a `data:` URI before saving; session
/// scoped references such as `blob:` URLs do not survive a reload and the
/// picture will be missing when the review is displayed later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WineImage(String);

impl WineImage {
    pub fn from_uri(uri: impl Into<String>) -> Self {
        WineImage(uri.into())
    }

    /// Encodes raw image bytes as a base64 `data:` URI.
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        WineImage(format!("data:{mime_type};base64,{}", STANDARD.encode(bytes)))
    }

    pub fn as_uri(&self) -> &str {
        &self.0
    }

    /// Whether the reference can still be resolved after the app restarts.
    pub fn is_durable(&self) -> bool {
        !self.0.starts_with("blob:")
    }
}

/// Normalized description of a wine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WineRecord {
    /// Wine name, optionally including the vintage.
    pub name: String,

    #[serde(default)]
    pub region: String,

    /// Free text style such as "Red", "White" or "Sparkling".
    #[serde(rename = "type", default)]
    pub wine_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<WineImage>,

    #[serde(default)]
    pub price: Price,

    /// Score estimated by the identification provider, 0 to 5.
    /// Not to be confused with the user's own [`Review::rating`](crate::review::Review::rating).
    #[serde(default)]
    pub rating: f64,

    /// Short tasting note.
    #[serde(default)]
    pub review: String,

    /// Raw text recognized on the label, kept for diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanned_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_confidence: Option<f64>,
}

impl WineRecord {
    /// Returns a trimmed, validated copy of this record.
    ///
    /// Text fields are trimmed, the currency code is upper-cased (falling back
    /// to [`DEFAULT_CURRENCY`] when blank) and a blank `scanned_text` becomes
    /// `None`. Numeric fields are checked, never clamped.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the name is blank, the score is not
    /// within `0..=5`, the price is negative or not finite, or the match
    /// confidence falls outside `0..=1`.
    pub fn normalized(&self) -> Result<WineRecord, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingName);
        }

        if !self.rating.is_finite() || !(0.0..=MAX_SCORE).contains(&self.rating) {
            return Err(ValidationError::ScoreOutOfRange(self.rating));
        }

        if !self.price.value.is_finite() || self.price.value < 0.0 {
            return Err(ValidationError::InvalidPrice(self.price.value));
        }

        if let Some(confidence) = self.match_confidence {
            if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
                return Err(ValidationError::ConfidenceOutOfRange(confidence));
            }
        }

        let currency = match self.price.currency.trim() {
            "" => default_currency(),
            code => code.to_uppercase(),
        };

        let scanned_text = self
            .scanned_text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string);

        Ok(WineRecord {
            name: name.to_string(),
            region: self.region.trim().to_string(),
            wine_type: self.wine_type.trim().to_string(),
            image: self.image.clone(),
            price: Price {
                value: self.price.value,
                currency,
            },
            rating: self.rating,
            review: self.review.trim().to_string(),
            scanned_text,
            match_confidence: self.match_confidence,
        })
    }
}
