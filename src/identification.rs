//! Boundary to the service that turns a label photo into a [`WineRecord`].
//!
//! The store never calls a provider itself; the front-end awaits
//! [`IdentificationProvider::identify`], lets the user add a rating and notes,
//! and then hands the record to the store. How the record is produced (a
//! multimodal model, OCR, a fixture) is up to the implementation.

use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;

use crate::error::IdentificationError;
use crate::wine_record::{Price, WineImage, WineRecord, DEFAULT_CURRENCY};

/// Image captured by the camera.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImagePayload {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        ImagePayload {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Inline copy of the image that remains displayable after a reload.
    pub fn to_durable_image(&self) -> WineImage {
        WineImage::from_bytes(&self.mime_type, &self.bytes)
    }
}

/// Credentials handed to the provider by the front-end.
#[derive(Clone, Default)]
pub struct Credentials {
    pub api_key: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Credentials {
            api_key: api_key.into(),
        }
    }

    pub fn ensure_present(&self) -> Result<(), IdentificationError> {
        if self.api_key.trim().is_empty() {
            return Err(IdentificationError::MissingCredentials);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("api_key", &"<redacted>").finish()
    }
}

#[async_trait]
pub trait IdentificationProvider: Send + Sync {
    /// Identifies the wine shown in `image`.
    ///
    /// Implementations return a normalized record or an
    /// [`IdentificationError`]; malformed output is never repaired.
    async fn identify(
        &self,
        image: &ImagePayload,
        credentials: &Credentials,
    ) -> Result<WineRecord, IdentificationError>;
}

/// Candidate as produced by a model: every descriptive field is required.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCandidate {
    name: String,
    region: String,
    #[serde(rename = "type")]
    wine_type: String,
    rating: f64,
    price: RawPrice,
    review: String,
    #[serde(default)]
    scanned_text: Option<String>,
    #[serde(default)]
    match_confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawPrice {
    value: f64,
    #[serde(default)]
    currency: Option<String>,
}

/// Parses the text answer of a model into a validated [`WineRecord`].
///
/// The answer may be wrapped in a Markdown code fence. Name, region, type,
/// rating, price value and review must all be present; the currency falls
/// back to `USD` when missing.
pub fn parse_candidate(text: &str) -> Result<WineRecord, IdentificationError> {
    let json = strip_code_fence(text);
    if json.is_empty() {
        return Err(IdentificationError::EmptyResponse);
    }

    let raw: RawCandidate = serde_json::from_str(json).map_err(|e| {
        warn!("Failed to parse provider response: {e}");
        IdentificationError::from(e)
    })?;

    let record = WineRecord {
        name: raw.name,
        region: raw.region,
        wine_type: raw.wine_type,
        image: None,
        price: Price {
            value: raw.price.value,
            currency: raw
                .price
                .currency
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        },
        rating: raw.rating,
        review: raw.review,
        scanned_text: raw.scanned_text,
        match_confidence: raw.match_confidence,
    };

    let record = record.normalized()?;
    debug!("Parsed provider candidate '{}'", record.name);
    Ok(record)
}

/// Body returned by a `generateContent` style endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProviderEnvelope {
    candidates: Vec<EnvelopeCandidate>,
    error: Option<EnvelopeError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EnvelopeCandidate {
    content: Option<EnvelopeContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EnvelopeContent {
    parts: Vec<EnvelopePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EnvelopePart {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EnvelopeError {
    code: Option<i64>,
    message: Option<String>,
}

/// Parses the full response body of a multimodal model call.
///
/// An `error` object becomes [`IdentificationError::Provider`] carrying its
/// message. Otherwise the text of the first part of the first candidate is
/// handed to [`parse_candidate`]; a body without that text is
/// [`IdentificationError::EmptyResponse`].
pub fn parse_provider_response(body: &str) -> Result<WineRecord, IdentificationError> {
    let envelope: ProviderEnvelope = serde_json::from_str(body)?;

    if let Some(error) = envelope.error {
        let message = match (error.message, error.code) {
            (Some(message), _) if !message.trim().is_empty() => message,
            (_, Some(code)) => format!("API Error: {code}"),
            _ => "API Error".to_string(),
        };
        warn!("Provider returned an error: {message}");
        return Err(IdentificationError::Provider(message));
    }

    let text = envelope
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .ok_or(IdentificationError::EmptyResponse)?;

    parse_candidate(&text)
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string, e.g. "json"
    let body = body.split_once('\n').map_or(body, |(_, rest)| rest);
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Provider answering with a fixed model response, for tests and offline use.
///
/// Mirrors what a real provider does with the answer: parses it, attaches an
/// inline copy of the photographed image and records where the data came from.
#[derive(Debug, Clone)]
pub struct FixtureProvider {
    response: String,
}

impl FixtureProvider {
    pub const SCANNED_TEXT: &'static str = "Identified by fixture provider";

    pub fn new(response: impl Into<String>) -> Self {
        FixtureProvider {
            response: response.into(),
        }
    }
}

#[async_trait]
impl IdentificationProvider for FixtureProvider {
    async fn identify(
        &self,
        image: &ImagePayload,
        credentials: &Credentials,
    ) -> Result<WineRecord, IdentificationError> {
        credentials.ensure_present()?;

        let mut record = parse_candidate(&self.response)?;
        record.image = Some(image.to_durable_image());
        if record.scanned_text.is_none() {
            record.scanned_text = Some(Self::SCANNED_TEXT.to_string());
        }
        Ok(record)
    }
}
