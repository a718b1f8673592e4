//! Fire-and-forget mirroring of ledger events to a remote backend.
//!
//! Callers hand events to [`SyncClient::push`], which never blocks and never
//! fails. The HTTP implementation queues events in a bounded channel drained
//! by a background task; a full queue drops the event, and backend failures
//! are logged and swallowed. There is no retry.
//!
//! # Example
//!
//! ```no_run
//! use dropquery_core::sync::{HttpSyncClient, SyncClient, SyncConfig, SyncEvent};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> dropquery_core::Result<()> {
//! let config = SyncConfig::new("https://sync.example.org");
//! let (client, worker) = HttpSyncClient::spawn(config, CancellationToken::new())?;
//! client.push(SyncEvent::query(None, dropquery_types::ModelTag::Claude, 0.3,
//!     time::OffsetDateTime::now_utc()));
//! # drop(worker);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tracing::debug;

use dropquery_types::ModelTag;

use crate::onboarding::SurveyAnswers;

/// Event mirrored to the sync backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    /// A recorded query.
    Query {
        user_id: Option<String>,
        model: ModelTag,
        volume_ml: f64,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: OffsetDateTime,
    },
    /// The user's onboarding profile.
    Profile {
        user_id: String,
        survey_answers: SurveyAnswers,
        average_usage_ml: f64,
    },
}

impl SyncEvent {
    /// Build a query event.
    pub fn query(
        user_id: Option<String>,
        model: ModelTag,
        volume_ml: f64,
        timestamp: OffsetDateTime,
    ) -> Self {
        SyncEvent::Query {
            user_id,
            model,
            volume_ml,
            timestamp,
        }
    }

    /// Backend table path the event is posted to.
    pub fn path(&self) -> &'static str {
        match self {
            SyncEvent::Query { .. } => "/rest/v1/queries",
            SyncEvent::Profile { .. } => "/rest/v1/users",
        }
    }

    /// Row body in the backend's column naming.
    pub fn body(&self) -> serde_json::Value {
        match self {
            SyncEvent::Query {
                user_id,
                model,
                volume_ml,
                timestamp,
            } => serde_json::json!({
                "user_id": user_id,
                "model": model,
                "water_usage": volume_ml,
                "timestamp": format_rfc3339(*timestamp),
            }),
            SyncEvent::Profile {
                user_id,
                survey_answers,
                average_usage_ml,
            } => serde_json::json!({
                "user_id": user_id,
                "survey_answers": survey_answers,
                "average_usage": average_usage_ml,
            }),
        }
    }
}

fn format_rfc3339(at: OffsetDateTime) -> String {
    at.format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

/// Non-blocking sink for sync events.
pub trait SyncClient: Send + Sync {
    /// Hand off an event. Must return immediately and never fail.
    fn push(&self, event: SyncEvent);
}

/// Sync client that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSync;

impl SyncClient for NoopSync {
    fn push(&self, event: SyncEvent) {
        debug!("Sync disabled, discarding {}", event.path());
    }
}

/// Remote sync settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Backend base URL, e.g. `https://project.example.org`.
    pub base_url: String,
    /// Optional key sent as `apikey` and bearer token.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Maximum queued events before new ones are dropped.
    pub queue_capacity: usize,
}

impl SyncConfig {
    /// Settings with default timeout (10 s) and queue capacity (64).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout: Duration::from_secs(10),
            queue_capacity: 64,
        }
    }

    /// Set the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

/// Queue half of a sync client: counts events it had to drop.
#[derive(Debug, Clone)]
struct SyncQueue {
    sender: mpsc::Sender<SyncEvent>,
    dropped: Arc<AtomicU64>,
}

impl SyncQueue {
    fn new(capacity: usize) -> (Self, mpsc::Receiver<SyncEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            receiver,
        )
    }

    fn push(&self, event: SyncEvent) {
        if let Err(e) = self.sender.try_send(event) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            debug!("Sync queue unavailable, dropping event: {}", e);
        }
    }
}

#[cfg(feature = "http-sync")]
pub use http::HttpSyncClient;

#[cfg(feature = "http-sync")]
mod http {
    use std::sync::atomic::Ordering;

    use reqwest::Client;
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;
    use tokio_util::sync::CancellationToken;
    use tracing::{debug, info, warn};

    use super::{SyncClient, SyncConfig, SyncEvent, SyncQueue};
    use crate::error::{Error, Result};

    /// HTTP sync client posting events as JSON rows.
    #[derive(Debug, Clone)]
    pub struct HttpSyncClient {
        queue: SyncQueue,
        base_url: String,
    }

    impl HttpSyncClient {
        /// Validate settings and start the background sender.
        ///
        /// The worker stops when `cancel` fires or every client clone is
        /// dropped.
        pub fn spawn(config: SyncConfig, cancel: CancellationToken) -> Result<(Self, JoinHandle<()>)> {
            let base_url = normalize_base_url(&config.base_url)?;
            let client = Client::builder()
                .timeout(config.timeout)
                .build()
                .map_err(|e| Error::Sync(e.to_string()))?;

            let (queue, receiver) = SyncQueue::new(config.queue_capacity);
            let worker = Worker {
                client,
                base_url: base_url.clone(),
                api_key: config.api_key,
            };
            let handle = tokio::spawn(worker.run(receiver, cancel));

            info!("Remote sync enabled: {}", base_url);
            Ok((Self { queue, base_url }, handle))
        }

        /// Get the base URL.
        pub fn base_url(&self) -> &str {
            &self.base_url
        }

        /// Number of events dropped because the queue was full or closed.
        pub fn dropped(&self) -> u64 {
            self.queue.dropped.load(Ordering::Relaxed)
        }
    }

    impl SyncClient for HttpSyncClient {
        fn push(&self, event: SyncEvent) {
            self.queue.push(event);
        }
    }

    pub(super) fn normalize_base_url(raw: &str) -> Result<String> {
        let base_url = raw.trim().trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::InvalidUrl(format!(
                "URL must start with http:// or https://, got: {}",
                base_url
            )));
        }
        url::Url::parse(&base_url).map_err(|e| Error::InvalidUrl(format!("{base_url}: {e}")))?;
        Ok(base_url)
    }

    struct Worker {
        client: Client,
        base_url: String,
        api_key: Option<String>,
    }

    impl Worker {
        async fn run(self, mut receiver: mpsc::Receiver<SyncEvent>, cancel: CancellationToken) {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Sync worker cancelled");
                        break;
                    }
                    event = receiver.recv() => {
                        let Some(event) = event else {
                            debug!("Sync clients dropped, stopping worker");
                            break;
                        };
                        self.post(&event).await;
                    }
                }
            }
        }

        /// Post one event. Every failure is logged and swallowed.
        async fn post(&self, event: &SyncEvent) {
            let url = format!("{}{}", self.base_url, event.path());
            let mut request = self
                .client
                .post(&url)
                .header("Prefer", "return=minimal")
                .json(&event.body());
            if let Some(key) = &self.api_key {
                request = request.header("apikey", key).bearer_auth(key);
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    debug!("Synced event to {}", url);
                }
                Ok(response) => {
                    warn!("Sync backend {} returned {}", url, response.status());
                }
                Err(e) => {
                    debug!("Sync backend {} not reachable: {}", url, e);
                }
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_query_body_columns() {
        let event = SyncEvent::query(
            Some("user-1".to_string()),
            ModelTag::ChatGpt,
            0.322,
            datetime!(2024-01-15 10:00 UTC),
        );
        assert_eq!(event.path(), "/rest/v1/queries");
        let body = event.body();
        assert_eq!(body["user_id"], "user-1");
        assert_eq!(body["model"], "chatgpt");
        assert_eq!(body["water_usage"], 0.322);
        assert_eq!(body["timestamp"], "2024-01-15T10:00:00Z");
    }

    #[test]
    fn test_profile_body_columns() {
        let event = SyncEvent::Profile {
            user_id: "user-1".to_string(),
            survey_answers: SurveyAnswers::default(),
            average_usage_ml: 21.0,
        };
        assert_eq!(event.path(), "/rest/v1/users");
        let body = event.body();
        assert_eq!(body["average_usage"], 21.0);
        assert_eq!(body["survey_answers"]["usagePurpose"], "other");
    }

    #[test]
    fn test_full_queue_drops_events() {
        let (queue, mut receiver) = SyncQueue::new(1);
        let event = SyncEvent::query(None, ModelTag::Claude, 0.3, OffsetDateTime::UNIX_EPOCH);
        queue.push(event.clone());
        queue.push(event.clone());
        assert_eq!(queue.dropped.load(Ordering::Relaxed), 1);
        assert_eq!(receiver.try_recv().unwrap(), event);
    }

    #[test]
    fn test_closed_queue_drops_events() {
        let (queue, receiver) = SyncQueue::new(4);
        drop(receiver);
        queue.push(SyncEvent::query(None, ModelTag::Claude, 0.3, OffsetDateTime::UNIX_EPOCH));
        assert_eq!(queue.dropped.load(Ordering::Relaxed), 1);
    }
}
