//! Transport primitives shared by every class-scoped operation: URL
//! building, auth header, the bounded flat retry loop, and pagination.

pub mod query;

use crate::error::NetBoxError;
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Paginated response wrapper from the NetBox API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    /// Total number of matching objects on the server, not just this page.
    pub count: u64,
    /// URL of the next page, if any.
    pub next: Option<String>,
    /// URL of the previous page, if any.
    pub previous: Option<String>,
    /// This page's results.
    pub results: Vec<T>,
}

/// The outcome of one successful write request.
#[derive(Debug, Clone)]
pub enum WriteOutcome {
    /// 2xx with a JSON body (POST/PATCH).
    Object(serde_json::Value),
    /// 204 No Content (DELETE).
    NoContent,
}

/// HTTP client wrapper with authentication, retry and API-version enforcement.
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: String,
    /// Bounded retry count for transient (connection-level) failures. Matches
    /// `single_request()`'s flat immediate-retry loop in the original tool:
    /// no backoff, just a retry budget.
    max_retry_attempts: u32,
}

impl HttpClient {
    /// Create a new HTTP client wrapper.
    pub fn new(client: Client, base_url: String, token: String, max_retry_attempts: u32) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            max_retry_attempts,
        }
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL from a path or pass an already-absolute URL through.
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.token)
    }

    /// Build a query string from filters, matching NetBox's flat `k=v&...` convention.
    pub fn build_query_string(&self, filters: &[(&str, &str)]) -> String {
        filters
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Issue one request, retrying up to `max_retry_attempts` on transient
    /// transport failure. Returns the raw status, the `API-Version` response
    /// header (if present) and the response body text.
    async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<(StatusCode, Option<String>, String), NetBoxError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let mut req = self
                .client
                .request(method.clone(), url)
                .header("Authorization", self.auth_header())
                .header("Accept", "application/json");
            if let Some(b) = body {
                req = req.header("Content-Type", "application/json").json(b);
            }

            match req.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    let api_version = resp
                        .headers()
                        .get("API-Version")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_owned);
                    let text = resp.text().await.unwrap_or_default();
                    return Ok((status, api_version, text));
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    if attempt > self.max_retry_attempts {
                        return Err(NetBoxError::Fatal(format!(
                            "{method} {url} exhausted {} retries: {e}",
                            self.max_retry_attempts
                        )));
                    }
                    warn!(
                        "{method} {url} attempt {attempt}/{} failed transiently: {e}, retrying",
                        self.max_retry_attempts
                    );
                }
                Err(e) => return Err(NetBoxError::Http(e)),
            }
        }
    }

    /// GET a single JSON-decodable resource.
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, NetBoxError> {
        let url = self.build_url(path);
        debug!("GET {url}");
        let (status, _version, text) = self.execute(Method::GET, &url, None).await?;
        Self::decode(status, &url, "GET", text)
    }

    /// GET and follow `next` until exhausted, accumulating every page's `results`.
    pub async fn fetch_all_pages<T: for<'de> Deserialize<'de>>(
        &self,
        mut url: String,
    ) -> Result<Vec<T>, NetBoxError> {
        let mut all_results = Vec::new();
        loop {
            debug!("GET (page) {url}");
            let (status, _version, text) = self.execute(Method::GET, &url, None).await?;
            let page: PaginatedResponse<T> = Self::decode(status, &url, "GET", text)?;
            all_results.extend(page.results);
            match page.next {
                Some(next_url) => url = self.build_url(&next_url),
                None => break,
            }
        }
        Ok(all_results)
    }

    /// POST a create request, expecting 201.
    pub async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, NetBoxError> {
        let url = self.build_url(path);
        debug!("POST {url}");
        let (status, _version, text) = self.execute(Method::POST, &url, Some(body)).await?;
        Self::decode(status, &url, "POST", text)
    }

    /// PATCH a partial update, expecting 200.
    pub async fn patch(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, NetBoxError> {
        let url = self.build_url(path);
        debug!("PATCH {url}");
        let (status, _version, text) = self.execute(Method::PATCH, &url, Some(body)).await?;
        Self::decode(status, &url, "PATCH", text)
    }

    /// DELETE, expecting 204.
    pub async fn delete(&self, path: &str) -> Result<(), NetBoxError> {
        let url = self.build_url(path);
        debug!("DELETE {url}");
        let (status, _version, text) = self.execute(Method::DELETE, &url, None).await?;
        match status {
            StatusCode::NO_CONTENT | StatusCode::OK => Ok(()),
            _ => Err(Self::status_to_error(status, &url, "DELETE", text)),
        }
    }

    /// Issue a GET and return the `API-Version` response header, or
    /// [`NetBoxError::Fatal`] if the server omitted it (spec §6: its
    /// absence on any request aborts the run).
    pub async fn probe_api_version(&self, path: &str) -> Result<String, NetBoxError> {
        let url = self.build_url(path);
        let (status, version, text) = self.execute(Method::GET, &url, None).await?;
        if !status.is_success() {
            return Err(Self::status_to_error(status, &url, "GET", text));
        }
        version.ok_or_else(|| {
            NetBoxError::Fatal(format!("{url} response carried no API-Version header"))
        })
    }

    fn decode<T: for<'de> Deserialize<'de>>(
        status: StatusCode,
        url: &str,
        method: &str,
        text: String,
    ) -> Result<T, NetBoxError> {
        if !status.is_success() {
            return Err(Self::status_to_error(status, url, method, text));
        }
        serde_json::from_str(&text).map_err(|e| {
            NetBoxError::Api {
                status: status.as_u16(),
                body: format!(
                    "error decoding response body: {e} - first 500 chars: {}",
                    text.chars().take(500).collect::<String>()
                ),
            }
        })
    }

    /// Translate a non-success status per spec §7: 404 -> NotFound, 403/5xx
    /// -> Fatal, any other 4xx -> Api (permanent, non-fatal to the run).
    fn status_to_error(status: StatusCode, url: &str, method: &str, body: String) -> NetBoxError {
        match status {
            StatusCode::NOT_FOUND => NetBoxError::NotFound(format!("{method} {url}: {body}")),
            StatusCode::FORBIDDEN => {
                NetBoxError::Fatal(format!("{method} {url}: 403 forbidden: {body}"))
            }
            s if s.is_server_error() => {
                NetBoxError::Fatal(format!("{method} {url}: {s}: {body}"))
            }
            s => NetBoxError::Api {
                status: s.as_u16(),
                body: format!("{method} {url}: {body}"),
            },
        }
    }
}
