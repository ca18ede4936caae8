use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::models::NotificationPayload;

/// Default ceiling on one notification attempt
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Best-effort completion notification.
///
/// Returns whether delivery succeeded. Implementations log failures and never
/// escalate them: by the time a notification is attempted the result is
/// already persisted, and persistence is the source of truth.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, target: &str, payload: &NotificationPayload) -> bool;
}

/// POSTs the payload as JSON with an explicit timeout; one attempt, no retry
pub struct HttpNotifier {
    client: Client,
    timeout: Duration,
}

impl HttpNotifier {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            timeout,
        }
    }
}

impl Default for HttpNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFY_TIMEOUT)
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, target: &str, payload: &NotificationPayload) -> bool {
        let result = self
            .client
            .post(target)
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!("Notification delivered to {}", target);
                true
            }
            Ok(response) => {
                warn!(
                    "Notification to {} rejected with status {}",
                    target,
                    response.status()
                );
                false
            }
            Err(e) => {
                warn!("Notification to {} failed: {}", target, e);
                false
            }
        }
    }
}
