use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::extract::extract;
use crate::metadata::decode_context;
use crate::models::{CallbackPayload, NotificationPayload, TranscriptionRecord};
use crate::notify::Notifier;
use crate::storage::{ResultStore, StorageError};

/// Outcome of handling one callback delivery
#[derive(Debug)]
pub enum HandlingOutcome {
    /// Result extracted and persisted; notification attempted if requested
    Completed {
        request_id: String,
        location: String,
        /// `None` when no notification target was present
        notified: Option<bool>,
    },
    /// Metadata token unreadable: the callback is acknowledged so the engine
    /// stops retrying, but there is no context to correlate the result with
    Orphaned { request_id: String },
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("malformed callback payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
    #[error("callback carries no metadata token")]
    MissingMetadataToken,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Correlates engine callbacks with their original submission.
///
/// Holds no per-request state: everything needed to handle a callback is
/// recovered from the callback body itself, so any number of deliveries can
/// be processed concurrently and in any order. Re-handling the same body is
/// safe because persistence overwrites by location.
pub struct Correlator {
    store: Arc<dyn ResultStore>,
    notifier: Arc<dyn Notifier>,
    include_raw_results: bool,
}

impl Correlator {
    pub fn new(store: Arc<dyn ResultStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            include_raw_results: false,
        }
    }

    /// Also embed the raw engine results block in each persisted record, for
    /// consumers that need per-label confidences the normalized form drops
    pub fn with_raw_results(mut self) -> Self {
        self.include_raw_results = true;
        self
    }

    /// Handle one raw callback body.
    ///
    /// Storage failure is the only error after parsing: persistence is the
    /// correctness-critical step. A failed notification never undoes it.
    pub async fn handle(&self, raw_body: &str) -> Result<HandlingOutcome, WebhookError> {
        let payload: CallbackPayload = serde_json::from_str(raw_body)?;
        let request_id = payload.metadata.request_id.clone();

        let token = payload
            .metadata
            .extra
            .as_deref()
            .ok_or(WebhookError::MissingMetadataToken)?;

        let context = match decode_context(token) {
            Ok(context) => context,
            Err(e) => {
                warn!(
                    "Metadata token on request {} unreadable ({}); result is orphaned",
                    request_id, e
                );
                return Ok(HandlingOutcome::Orphaned { request_id });
            }
        };

        let intelligence = extract(&payload.results);
        let mut record =
            TranscriptionRecord::assemble(&context, &request_id, intelligence, Utc::now());
        if self.include_raw_results {
            record.raw_results = serde_json::to_value(&payload.results).ok();
        }

        let location = record.output_location.clone();
        self.store.put(&location, &record).await?;
        info!(
            "Persisted result for batch {} item {} at {}",
            context.batch_id, context.batch_index, location
        );

        let notified = match &context.notification_target {
            Some(target) => {
                let payload = NotificationPayload::from_record(&record);
                Some(self.notifier.notify(target, &payload).await)
            }
            None => None,
        };

        Ok(HandlingOutcome::Completed {
            request_id,
            location,
            notified,
        })
    }
}
