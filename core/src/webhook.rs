//! Best-effort mirroring of writes to external webhook endpoints.
//!
//! A mirror call is queued only after the primary insert has succeeded. It is
//! never awaited on the success path, never retried, and never rolls the
//! insert back. Failures are logged and kept in a [`FailureSink`].

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use url::Url;

use crate::error::WebhookError;

/// Delivers one JSON body to one endpoint.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn post_json(&self, url: &Url, body: &Value) -> Result<(), WebhookError>;
}

/// Unauthenticated `POST` with `Content-Type: application/json`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    http: reqwest::Client,
}

#[async_trait]
impl WebhookTransport for HttpTransport {
    async fn post_json(&self, url: &Url, body: &Value) -> Result<(), WebhookError> {
        let resp = self.http.post(url.clone()).json(body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(WebhookError::Status(status.as_u16()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MirrorFailure {
    pub url: Url,
    pub error: WebhookError,
    pub at: DateTime<Utc>,
}

/// Shared record of mirror failures, for logs and inspection.
#[derive(Debug, Clone, Default)]
pub struct FailureSink {
    failures: Arc<Mutex<Vec<MirrorFailure>>>,
}

impl FailureSink {
    fn push(&self, failure: MirrorFailure) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(failure);
    }

    pub fn snapshot(&self) -> Vec<MirrorFailure> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone)]
pub struct WebhookMirror {
    transport: Arc<dyn WebhookTransport>,
    failures: FailureSink,
}

impl std::fmt::Debug for WebhookMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookMirror")
            .field("failures", &self.failures.len())
            .finish_non_exhaustive()
    }
}

impl WebhookMirror {
    pub fn http() -> Self {
        Self::with_transport(Arc::new(HttpTransport::default()))
    }

    pub fn with_transport(transport: Arc<dyn WebhookTransport>) -> Self {
        Self {
            transport,
            failures: FailureSink::default(),
        }
    }

    pub fn failures(&self) -> &FailureSink {
        &self.failures
    }

    /// Queue one delivery on the runtime and return immediately.
    ///
    /// The handle resolves once delivery finished, whatever the result; it
    /// carries no error.
    pub fn dispatch(&self, url: Url, payload: Value) -> JoinHandle<()> {
        let transport = Arc::clone(&self.transport);
        let failures = self.failures.clone();
        tokio::spawn(async move {
            match transport.post_json(&url, &payload).await {
                Ok(()) => tracing::debug!(%url, "webhook mirror delivered"),
                Err(error) => {
                    tracing::warn!(%url, %error, "webhook mirror failed");
                    failures.push(MirrorFailure {
                        url,
                        error,
                        at: Utc::now(),
                    });
                }
            }
        })
    }
}

/// The insert payload plus an ISO-8601 `timestamp` (millisecond precision,
/// `Z` suffix).
pub fn mirror_payload<T: Serialize>(
    insert: &T,
    at: DateTime<Utc>,
) -> Result<Value, serde_json::Error> {
    let mut value = serde_json::to_value(insert)?;
    if let Value::Object(obj) = &mut value {
        obj.insert(
            "timestamp".to_string(),
            Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
    }
    Ok(value)
}
