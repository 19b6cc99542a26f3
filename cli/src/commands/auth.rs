use callcraft_core::Identity;
use serde_json::json;
use url::Url;

use crate::util::{SessionError, config_path, print_json, request_token, save_session};

pub async fn login(
    url: &Url,
    anon_key: &str,
    email: &str,
    password: &str,
) -> Result<(), SessionError> {
    let session = request_token(
        url,
        anon_key,
        "password",
        json!({ "email": email, "password": password }),
    )
    .await?;

    save_session(&session)?;
    tracing::info!(user_id = %session.user.id, "signed in");

    print_json(&json!({
        "status": "authenticated",
        "user": session.user,
        "expires_at": session.expires_at,
        "config_path": config_path().to_string_lossy()
    }));
    Ok(())
}

pub fn logout() -> Result<(), SessionError> {
    let path = config_path();
    if path.exists() {
        std::fs::remove_file(&path)?;
    }
    print_json(&json!({
        "status": "logged_out",
        "config_path": path.to_string_lossy()
    }));
    Ok(())
}

pub fn whoami(user: Option<&Identity>) -> i32 {
    print_json(&json!({ "user": user }));
    if user.is_some() { 0 } else { 4 }
}
