//! Common utilities for phpIPAM API client
//!
//! Provides the authenticated HTTP layer shared by all object controllers.

use crate::error::PhpIpamError;
use crate::models::{ApiResponse, TokenData};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

/// HTTP client wrapper with phpIPAM token authentication
///
/// phpIPAM issues a session token in exchange for basic-auth credentials on
/// `POST /api/{app}/user/`. The token is obtained lazily on first use and sent
/// in the `token` header of every subsequent request.
pub struct HttpClient {
    client: Client,
    base_url: String,
    app_id: String,
    username: String,
    password: String,
    token: RwLock<Option<String>>,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: String, app_id: String, username: String, password: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            app_id,
            username,
            password,
            token: RwLock::new(None),
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the API application ID
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Build a full API URL from a controller path such as `sections/`
    pub fn build_url(&self, path: &str) -> String {
        format!("{}/api/{}/{}", self.base_url, self.app_id, path.trim_start_matches('/'))
    }

    /// Exchange credentials for a fresh API token
    pub async fn authenticate(&self) -> Result<String, PhpIpamError> {
        let url = self.build_url("user/");
        debug!("Authenticating against phpIPAM as {}", self.username);

        let response = self.client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(PhpIpamError::Http)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(PhpIpamError::Authentication(format!("{} - {}", status, body)));
        }

        let envelope: ApiResponse<TokenData> = Self::decode(response, "user/").await?;
        let token = envelope
            .data
            .map(|d| d.token)
            .ok_or_else(|| PhpIpamError::Authentication(
                envelope.message.unwrap_or_else(|| "no token in login response".to_string())
            ))?;

        *self.token.write().await = Some(token.clone());
        debug!("phpIPAM token acquired");
        Ok(token)
    }

    /// Current token, logging in first if none is held
    async fn token(&self) -> Result<String, PhpIpamError> {
        if let Some(token) = self.token.read().await.as_ref() {
            return Ok(token.clone());
        }
        self.authenticate().await
    }

    /// Read the body and decode the phpIPAM envelope
    async fn decode<T: for<'de> Deserialize<'de>>(
        response: Response,
        path: &str,
    ) -> Result<ApiResponse<T>, PhpIpamError> {
        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(PhpIpamError::Api(format!(
                "{} failed: {} - {}",
                path, status, response_text
            )));
        }

        serde_json::from_str(&response_text).map_err(|e| {
            PhpIpamError::Api(format!(
                "error decoding response body: {} - Response (first 500 chars): {}",
                e,
                response_text.chars().take(500).collect::<String>()
            ))
        })
    }

    /// Whether a reply signals a missing object, by HTTP status or envelope code
    fn is_not_found(status: StatusCode, body: &str) -> bool {
        if status == StatusCode::NOT_FOUND {
            return true;
        }
        serde_json::from_str::<ApiResponse<serde_json::Value>>(body)
            .map(|envelope| envelope.code == 404)
            .unwrap_or(false)
    }

    async fn send_get(&self, path: &str) -> Result<(StatusCode, String), PhpIpamError> {
        let url = self.build_url(path);
        debug!("GET {}", url);

        let response = self.client
            .get(&url)
            .header("token", self.token().await?)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(PhpIpamError::Http)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(PhpIpamError::Authentication(format!("GET {}: {} - {}", path, status, body)));
        }
        let body = response.text().await?;
        Ok((status, body))
    }

    /// Make a GET request for a single object
    ///
    /// A 404 is reported as [`PhpIpamError::NotFound`].
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, PhpIpamError> {
        let (status, body) = self.send_get(path).await?;

        if Self::is_not_found(status, &body) {
            return Err(PhpIpamError::NotFound(format!(
                "Resource not found: {} - {}",
                path, body
            )));
        }

        if !status.is_success() {
            return Err(PhpIpamError::Api(format!(
                "GET {} failed: {} - {}",
                path, status, body
            )));
        }

        let envelope: ApiResponse<T> = serde_json::from_str(&body).map_err(|e| {
            PhpIpamError::Api(format!(
                "error decoding response body: {} - Response (first 500 chars): {}",
                e,
                body.chars().take(500).collect::<String>()
            ))
        })?;
        envelope
            .data
            .ok_or_else(|| PhpIpamError::NotFound(format!("Resource not found: {} (empty data)", path)))
    }

    /// Make a GET request for a collection
    ///
    /// phpIPAM answers searches and listings with no matches as 404; that is
    /// returned as an empty list.
    pub async fn get_list<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<Vec<T>, PhpIpamError> {
        match self.get::<Vec<T>>(path).await {
            Ok(items) => Ok(items),
            Err(PhpIpamError::NotFound(_)) => {
                debug!("GET {} returned no results", path);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Make a POST request, returning the full envelope
    pub async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<ApiResponse<T>, PhpIpamError> {
        let url = self.build_url(path);
        debug!("POST {} with body: {}", url, serde_json::to_string_pretty(body).unwrap_or_default());

        let response = self.client
            .post(&url)
            .header("token", self.token().await?)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(PhpIpamError::Http)?;

        Self::decode(response, path).await
    }

    /// Make a PATCH request
    pub async fn patch(&self, path: &str, body: &serde_json::Value) -> Result<(), PhpIpamError> {
        let url = self.build_url(path);
        debug!("PATCH {} with body: {}", url, serde_json::to_string_pretty(body).unwrap_or_default());

        let response = self.client
            .patch(&url)
            .header("token", self.token().await?)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(PhpIpamError::Http)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PhpIpamError::NotFound(format!("Resource not found: {}", path)));
        }
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(PhpIpamError::Api(format!(
                "PATCH {} failed: {} - {}",
                path, status, body_text
            )));
        }

        Ok(())
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<(), PhpIpamError> {
        let url = self.build_url(path);
        debug!("DELETE {}", url);

        let response = self.client
            .delete(&url)
            .header("token", self.token().await?)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(PhpIpamError::Http)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PhpIpamError::NotFound(format!("Resource not found: {}", path)));
        }
        if !status.is_success() && status != StatusCode::NO_CONTENT {
            let body = response.text().await.unwrap_or_default();
            return Err(PhpIpamError::Api(format!(
                "DELETE {} failed: {} - {}",
                path, status, body
            )));
        }

        Ok(())
    }
}

/// Percent-encode a value for use as a single URL path segment
pub fn path_segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
