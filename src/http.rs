//!
//! REST client for the marketplace backend
//! ----------------------------------------
//! Every request goes through [`ApiClient`], which asks an injected [`TokenSource`] for the
//! current bearer credential instead of reading storage itself.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{AppError, AppResult};

/// Supplies the bearer token for outgoing requests.
pub trait TokenSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// A source with no credential, for anonymous calls such as login.
pub struct NoToken;

impl TokenSource for NoToken {
    fn bearer_token(&self) -> Option<String> { None }
}

#[derive(Clone)]
pub struct ApiClient {
    base: Url,
    client: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
}

impl ApiClient {
    pub fn new(base: &str, tokens: Arc<dyn TokenSource>) -> AppResult<Self> {
        // a base without trailing slash would drop its last segment on join
        let normalized = if base.ends_with('/') { base.to_string() } else { format!("{}/", base) };
        let base = Url::parse(&normalized)
            .map_err(|e| AppError::config("invalid_api_url", format!("{}: {}", base, e).as_str()))?;
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { base, client, tokens })
    }

    pub fn base(&self) -> &Url { &self.base }

    pub fn url(&self, path: &str) -> AppResult<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| AppError::config("invalid_api_path", format!("{}: {}", path, e).as_str()))
    }

    fn authorize(&self, req: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match token {
            Some(t) if !t.is_empty() => req.header(AUTHORIZATION, format!("Bearer {}", t)),
            _ => req,
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        let token = self.tokens.bearer_token();
        self.get_json_with_token(path, token.as_deref()).await
    }

    /// GET with an explicit token, bypassing the token source.
    pub async fn get_json_with_token<T: DeserializeOwned>(&self, path: &str, token: Option<&str>) -> AppResult<T> {
        let url = self.url(path)?;
        debug!(target: "adopta::http", %url, auth = token.is_some(), "GET");
        let resp = self.authorize(self.client.get(url), token).send().await?;
        decode(resp).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> AppResult<T> {
        let url = self.url(path)?;
        let token = self.tokens.bearer_token();
        debug!(target: "adopta::http", %url, auth = token.is_some(), "POST");
        let resp = self.authorize(self.client.post(url), token.as_deref()).json(body).send().await?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> AppResult<T> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(AppError::from_status(status.as_u16(), &body));
    }
    serde_json::from_str(&body).map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_join_keeps_base_path() {
        let c = ApiClient::new("http://127.0.0.1:8080/api", Arc::new(NoToken)).unwrap();
        assert_eq!(c.url("/usuarios/perfil").unwrap().as_str(), "http://127.0.0.1:8080/api/usuarios/perfil");
        assert_eq!(c.url("auth/login").unwrap().as_str(), "http://127.0.0.1:8080/api/auth/login");
    }

    #[test]
    fn bad_base_is_config_error() {
        let err = ApiClient::new("not a url", Arc::new(NoToken)).err().unwrap();
        assert!(matches!(err, AppError::Config { .. }));
    }
}
