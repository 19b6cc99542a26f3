use serde::Deserialize;

/// Failure reported by the remote record store.
///
/// Every variant renders to a message that is shown to the user verbatim;
/// callers never branch on the kind of failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store answered with a non-2xx status and a structured body.
    #[error("{message}")]
    Remote {
        status: u16,
        message: String,
        code: Option<String>,
    },
    /// The request never produced a response.
    #[error("{0}")]
    Transport(String),
    /// The response could not be decoded into the expected shape.
    #[error("Unexpected response from record store: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        StoreError::Remote {
            status,
            message: message.into(),
            code: None,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

/// Error body returned by the hosted table API.
#[derive(Debug, Default, Deserialize)]
pub struct RemoteErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
    /// Auth endpoints use `error_description` / `msg` instead of `message`
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
}

impl RemoteErrorBody {
    pub fn into_store_error(self, status: u16) -> StoreError {
        let message = self
            .message
            .or(self.error_description)
            .or(self.msg)
            .unwrap_or_else(|| format!("Request failed with HTTP {status}"));
        StoreError::Remote {
            status,
            message,
            code: self.code,
        }
    }
}

/// Failure of a best-effort webhook mirror call. Never surfaced to the user.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WebhookError {
    #[error("webhook request failed: {0}")]
    Transport(String),
    #[error("webhook returned HTTP {0}")]
    Status(u16),
}

impl From<reqwest::Error> for WebhookError {
    fn from(err: reqwest::Error) -> Self {
        WebhookError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_prefers_message_field() {
        let body: RemoteErrorBody = serde_json::from_str(
            r#"{"message":"new row violates row-level security policy","code":"42501"}"#,
        )
        .unwrap();
        let err = body.into_store_error(403);
        assert_eq!(err.to_string(), "new row violates row-level security policy");
        match err {
            StoreError::Remote { status, code, .. } => {
                assert_eq!(status, 403);
                assert_eq!(code.as_deref(), Some("42501"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn remote_error_falls_back_to_auth_fields_then_status() {
        let body: RemoteErrorBody =
            serde_json::from_str(r#"{"error_description":"Invalid login credentials"}"#).unwrap();
        assert_eq!(
            body.into_store_error(400).to_string(),
            "Invalid login credentials"
        );

        let empty = RemoteErrorBody::default();
        assert_eq!(
            empty.into_store_error(502).to_string(),
            "Request failed with HTTP 502"
        );
    }
}
