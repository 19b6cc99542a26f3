use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use super::RecordStore;
use crate::error::{RemoteErrorBody, StoreError};
use crate::query::ListQuery;

/// Record store backed by the hosted table API (`/rest/v1/<table>`).
#[derive(Debug, Clone)]
pub struct RestStore {
    http: reqwest::Client,
    base_url: Url,
    anon_key: String,
    access_token: Option<String>,
}

impl RestStore {
    pub fn new(base_url: Url, anon_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            anon_key: anon_key.into(),
            access_token: None,
        }
    }

    /// Act as the signed-in user; without a token requests run as `anon`.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn table_url(&self, table: &str) -> Result<Url, StoreError> {
        self.base_url
            .join("rest/v1/")
            .and_then(|u| u.join(table))
            .map_err(|e| StoreError::Transport(format!("Invalid store URL: {e}")))
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        let mut req = self
            .http
            .request(method, url)
            .header("apikey", &self.anon_key);
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {bearer}")) {
            req = req.header(AUTHORIZATION, value);
        }
        req
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let code = status.as_u16();
        let body = resp.text().await.unwrap_or_default();
        let parsed: RemoteErrorBody = serde_json::from_str(&body).unwrap_or_default();
        tracing::debug!(status = code, body = %body, "record store request failed");
        Err(parsed.into_store_error(code))
    }

    fn keyed(&self, table: &str, key: Uuid) -> Result<Url, StoreError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{key}"));
        Ok(url)
    }
}

#[async_trait]
impl RecordStore for RestStore {
    async fn list(&self, query: &ListQuery) -> Result<Vec<Value>, StoreError> {
        let mut url = self.table_url(&query.table)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query.to_params() {
                pairs.append_pair(&k, &v);
            }
        }

        let resp = self.send(self.request(reqwest::Method::GET, url)).await?;
        let rows: Vec<Value> = resp.json().await?;
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        let url = self.table_url(table)?;
        let req = self
            .request(reqwest::Method::POST, url)
            .header("Prefer", "return=representation")
            .json(&row);

        let resp = self.send(req).await?;
        let mut rows: Vec<Value> = resp.json().await?;
        if rows.is_empty() {
            return Err(StoreError::Decode(format!(
                "insert into {table} returned no rows"
            )));
        }
        Ok(rows.swap_remove(0))
    }

    async fn update(
        &self,
        table: &str,
        key: Uuid,
        fields: Value,
    ) -> Result<Vec<Value>, StoreError> {
        let url = self.keyed(table, key)?;
        let req = self
            .request(reqwest::Method::PATCH, url)
            .header("Prefer", "return=representation")
            .json(&fields);

        let resp = self.send(req).await?;
        let rows: Vec<Value> = resp.json().await?;
        Ok(rows)
    }

    async fn delete(&self, table: &str, key: Uuid) -> Result<(), StoreError> {
        let url = self.keyed(table, key)?;
        self.send(self.request(reqwest::Method::DELETE, url))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    fn store(base: &str) -> RestStore {
        RestStore::new(Url::parse(base).unwrap(), "anon-key")
    }

    #[test]
    fn table_url_appends_rest_prefix() {
        let url = store("https://proj.example.co/").table_url("contacts").unwrap();
        assert_eq!(url.as_str(), "https://proj.example.co/rest/v1/contacts");
    }

    #[test]
    fn keyed_url_filters_on_id() {
        let key = Uuid::nil();
        let url = store("https://proj.example.co/").keyed("contacts", key).unwrap();
        assert_eq!(
            url.query(),
            Some("id=eq.00000000-0000-0000-0000-000000000000")
        );
    }

    #[test]
    fn requests_carry_api_key_and_bearer() {
        let s = store("https://proj.example.co/").with_access_token("user-jwt");
        let req = s
            .request(
                reqwest::Method::GET,
                Url::parse("https://proj.example.co/rest/v1/agents").unwrap(),
            )
            .build()
            .unwrap();
        assert_eq!(req.headers()["apikey"], "anon-key");
        assert_eq!(req.headers()[AUTHORIZATION], "Bearer user-jwt");
    }

    /// Answer a single request on a local port with a canned response.
    async fn serve_once(status: &'static str, body: &'static str) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        Url::parse(&format!("http://{addr}/")).unwrap()
    }

    fn local_store(base: Url) -> RestStore {
        RestStore {
            http: reqwest::Client::builder().no_proxy().build().unwrap(),
            ..RestStore::new(base, "anon-key")
        }
    }

    #[tokio::test]
    async fn rejected_request_surfaces_backend_message() {
        let base = serve_once(
            "403 Forbidden",
            r#"{"message":"permission denied for table agents","code":"42501"}"#,
        )
        .await;

        let err = local_store(base)
            .list(&ListQuery::table("agents"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "permission denied for table agents");
        match err {
            StoreError::Remote { status, code, .. } => {
                assert_eq!(status, 403);
                assert_eq!(code.as_deref(), Some("42501"));
            }
            other => panic!("expected remote error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unparseable_error_body_falls_back_to_status() {
        let base = serve_once("500 Internal Server Error", "upstream exploded").await;

        let err = local_store(base)
            .delete("contacts", Uuid::nil())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Request failed with HTTP 500");
    }
}
