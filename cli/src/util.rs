use std::io::Write;

use base64::Engine;
use callcraft_core::{Identity, Notice, Outcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;
use uuid::Uuid;

/// Stored session for the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub url: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: Identity,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user: TokenUser,
}

#[derive(Debug, Deserialize)]
pub struct TokenUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// The signed-in user plus the bearer token that proves it.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub user: Identity,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Auth request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Rejected(String),
    #[error("Access token is not a readable JWT: {0}")]
    MalformedToken(String),
    #[error("Access token expired and refresh failed. Run `callcraft login` again.")]
    RefreshFailed,
    #[error("Could not store session: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not encode session: {0}")]
    Encode(#[from] serde_json::Error),
}

pub fn client() -> reqwest::Client {
    reqwest::Client::new()
}

pub fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    let mut err = json!({
        "error": "cli_error",
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    eprintln!("{}", to_pretty(&err));
    std::process::exit(4);
}

pub fn to_pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
}

pub fn print_json<T: Serialize>(value: &T) {
    println!("{}", to_pretty(value));
}

/// Print the outcome of a record operation and return the exit code.
///
/// Exit codes: 0=success, 1=remote failure or rejected form, 4=not signed in
pub fn report(outcome: &Outcome) -> i32 {
    match outcome {
        Outcome::Notified(notice) => print_notice(notice),
        Outcome::Loaded { .. } => 0,
        Outcome::Skipped => {
            eprintln!(
                "{}",
                to_pretty(&json!({
                    "error": "not_authenticated",
                    "message": "No signed-in user; nothing was done.",
                    "docs_hint": "Run `callcraft login` or set CALLCRAFT_ACCESS_TOKEN."
                }))
            );
            4
        }
        Outcome::Disabled => {
            eprintln!(
                "{}",
                to_pretty(&json!({
                    "error": "disabled",
                    "message": "You need to create an agent first",
                    "docs_hint": "callcraft agent create --help"
                }))
            );
            1
        }
        Outcome::Invalid { missing } => {
            eprintln!(
                "{}",
                to_pretty(&json!({
                    "error": "validation_failed",
                    "message": "Required fields are empty",
                    "fields": missing
                }))
            );
            1
        }
    }
}

pub fn print_notice(notice: &Notice) -> i32 {
    if notice.is_error() {
        eprintln!("{}", to_pretty(notice));
        1
    } else {
        println!("{}", to_pretty(notice));
        0
    }
}

pub fn config_path() -> std::path::PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("callcraft");
    config_dir.join("session.json")
}

pub fn load_session() -> Option<StoredSession> {
    let path = config_path();
    let data = std::fs::read_to_string(&path).ok()?;
    serde_json::from_str(&data).ok()
}

pub fn save_session(session: &StoredSession) -> Result<(), SessionError> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let data = serde_json::to_string_pretty(session)?;

    // Write with restricted permissions (0o600)
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(&path)?;
    file.write_all(data.as_bytes())?;

    Ok(())
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: Uuid,
    #[serde(default)]
    email: Option<String>,
}

/// Read the user out of an access token's payload. The signature is the
/// backend's concern; this only needs the subject.
pub fn identity_from_token(token: &str) -> Result<Identity, SessionError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| SessionError::MalformedToken("expected three segments".into()))?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| SessionError::MalformedToken(e.to_string()))?;
    let claims: Claims =
        serde_json::from_slice(&bytes).map_err(|e| SessionError::MalformedToken(e.to_string()))?;
    Ok(Identity {
        id: claims.sub,
        email: claims.email,
    })
}

fn auth_url(url: &Url, grant_type: &str) -> Result<Url, SessionError> {
    let mut endpoint = url
        .join("auth/v1/token")
        .map_err(|e| SessionError::Rejected(format!("Invalid URL: {e}")))?;
    endpoint
        .query_pairs_mut()
        .append_pair("grant_type", grant_type);
    Ok(endpoint)
}

/// Exchange a grant for tokens at the hosted auth API.
pub async fn request_token(
    url: &Url,
    anon_key: &str,
    grant_type: &str,
    body: serde_json::Value,
) -> Result<StoredSession, SessionError> {
    let resp = client()
        .post(auth_url(url, grant_type)?)
        .header("apikey", anon_key)
        .json(&body)
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body: callcraft_core::error::RemoteErrorBody = resp.json().await.unwrap_or_default();
        return Err(SessionError::Rejected(
            body.into_store_error(status.as_u16()).to_string(),
        ));
    }

    let token: TokenResponse = resp.json().await?;
    Ok(StoredSession {
        url: url.to_string(),
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        expires_at: Utc::now() + chrono::Duration::seconds(token.expires_in),
        user: Identity {
            id: token.user.id,
            email: token.user.email,
        },
    })
}

/// Resolve the current user (priority order):
/// 1. CALLCRAFT_ACCESS_TOKEN env var
/// 2. ~/.config/callcraft/session.json (with auto-refresh)
/// 3. None: operations become no-ops
pub async fn resolve_session(url: &Url, anon_key: &str) -> Result<Option<Session>, SessionError> {
    // 1. Environment variable
    if let Ok(token) = std::env::var("CALLCRAFT_ACCESS_TOKEN") {
        let user = identity_from_token(&token)?;
        return Ok(Some(Session {
            access_token: token,
            user,
        }));
    }

    // 2. Stored session
    let Some(stored) = load_session() else {
        return Ok(None);
    };

    // Refresh with a 5-min buffer
    let buffer = chrono::Duration::minutes(5);
    if Utc::now() + buffer < stored.expires_at {
        return Ok(Some(Session {
            access_token: stored.access_token,
            user: stored.user,
        }));
    }

    tracing::debug!("access token near expiry, refreshing");
    let refreshed = request_token(
        url,
        anon_key,
        "refresh_token",
        json!({ "refresh_token": stored.refresh_token }),
    )
    .await
    .map_err(|e| {
        tracing::warn!(error = %e, "session refresh failed");
        SessionError::RefreshFailed
    })?;
    save_session(&refreshed)?;

    Ok(Some(Session {
        access_token: refreshed.access_token,
        user: refreshed.user,
    }))
}

/// Read text from a file path or stdin (when path is "-").
pub fn read_text_from_file(path: &str) -> Result<String, String> {
    if path == "-" {
        return std::io::read_to_string(std::io::stdin())
            .map_err(|e| format!("Failed to read stdin: {e}"));
    }
    std::fs::read_to_string(path).map_err(|e| format!("Failed to read file '{path}': {e}"))
}

// Unix-specific imports for file permissions
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

// No-op on non-unix (won't compile for Windows without this)
#[cfg(not(unix))]
trait OpenOptionsExt {
    fn mode(&mut self, _mode: u32) -> &mut Self;
}

#[cfg(not(unix))]
impl OpenOptionsExt for std::fs::OpenOptions {
    fn mode(&mut self, _mode: u32) -> &mut Self {
        self
    }
}
