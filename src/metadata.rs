use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version tag prepended to every minted token
const TOKEN_VERSION: &str = "v1";

/// Deepgram truncates callback extras beyond this size
pub const MAX_TOKEN_BYTES: usize = 2048;

/// Per-item job context round-tripped through the engine's callback metadata.
///
/// The service keeps no job table, so this is the only copy of the
/// submission's identity anywhere in the system. It is minted at submission
/// time, carried opaquely by the engine, and decoded when the callback
/// arrives. `(batch_id, batch_index)` uniquely identifies one submitted item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItemContext {
    /// Identifier shared by every item submitted in one batch
    pub batch_id: String,
    /// Zero-based position of this item within the batch
    pub batch_index: usize,
    /// Source audio locator
    pub audio_url: String,
    /// When the batch was submitted
    pub submitted_at: DateTime<Utc>,
    /// URL to POST a completion notification to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_target: Option<String>,
    /// Where the normalized result is written; `{batch_id}` and `{index}`
    /// placeholders are substituted at persistence time
    pub output_location_template: String,
}

/// Default result layout: one folder per batch, one file per item
pub const DEFAULT_LOCATION_TEMPLATE: &str = "{batch_id}/{batch_id}_url_{index}.json";

impl BatchItemContext {
    /// Resolve the storage location for this item
    pub fn output_location(&self) -> String {
        self.output_location_template
            .replace("{batch_id}", &self.batch_id)
            .replace("{index}", &self.batch_index.to_string())
    }
}

/// Failure to read a metadata token back into a context
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("token has no version prefix")]
    MissingVersion,
    #[error("unsupported token version: {0:?}")]
    UnsupportedVersion(String),
    #[error("token is not valid base64: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),
    #[error("token payload is not a valid context: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// Failure to mint a token
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("context does not serialize: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("encoded token is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },
}

/// Serialize a context into an opaque token the engine echoes back verbatim.
///
/// The token is `v1.<base64url(json)>`. It contains no characters outside
/// `[A-Za-z0-9._-]`, so it can ride in a query parameter or JSON field
/// without further escaping.
pub fn encode_context(context: &BatchItemContext) -> Result<String, EncodeError> {
    let json = serde_json::to_vec(context)?;
    let token = format!("{TOKEN_VERSION}.{}", URL_SAFE_NO_PAD.encode(&json));
    if token.len() > MAX_TOKEN_BYTES {
        return Err(EncodeError::TooLarge {
            size: token.len(),
            limit: MAX_TOKEN_BYTES,
        });
    }
    Ok(token)
}

/// Decode a token minted by [`encode_context`].
///
/// Fails closed on unknown versions: a token minted by a future format
/// revision is a [`DecodeError`], never a silently misread context.
pub fn decode_context(token: &str) -> Result<BatchItemContext, DecodeError> {
    let (version, payload) = token.split_once('.').ok_or(DecodeError::MissingVersion)?;
    if version != TOKEN_VERSION {
        return Err(DecodeError::UnsupportedVersion(version.to_string()));
    }
    let bytes = URL_SAFE_NO_PAD.decode(payload)?;
    Ok(serde_json::from_slice(&bytes)?)
}
