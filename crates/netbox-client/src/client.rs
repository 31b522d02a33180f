//! The generic, class-driven NetBox client.
//!
//! Unlike a client with one hand-written method per resource type, this
//! client is parameterised on a per-class `api_path` (e.g. `"dcim/devices"`,
//! `"ipam/ip-addresses"`) supplied by the caller (the class descriptors the
//! sync core owns, see `nb-inventory::ClassDescriptor`). It moves
//! `serde_json::Value` payloads; typed (de)serialisation into entity structs
//! is the inventory layer's job, matching the spec's split between a
//! transport-only NetBox Client and a typed Object Model.

use crate::common::{query::query_resources, HttpClient};
use crate::error::NetBoxError;
use serde_json::Value;
use std::time::Duration;
use tracing::info;

/// Minimum NetBox API version this engine tolerates (spec §6).
pub const MIN_API_VERSION: &str = "2.9";

/// A thin, class-agnostic NetBox REST client.
pub struct NetBoxClient {
    http: HttpClient,
    default_limit: u32,
}

impl NetBoxClient {
    /// Build a client. `max_retry_attempts` bounds the flat retry loop on
    /// transient transport failures; `timeout` bounds each individual request.
    pub fn new(
        base_url: String,
        token: String,
        timeout: Duration,
        max_retry_attempts: u32,
        default_limit: u32,
        validate_tls_certs: bool,
        proxy: Option<&str>,
    ) -> Result<Self, NetBoxError> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(!validate_tls_certs);
        if let Some(p) = proxy {
            let proxy = reqwest::Proxy::all(p).map_err(NetBoxError::Http)?;
            builder = builder.proxy(proxy);
        }
        let client = builder.build().map_err(NetBoxError::Http)?;
        Ok(Self {
            http: HttpClient::new(client, base_url, token, max_retry_attempts),
            default_limit,
        })
    }

    /// Validate the token, distinguishing auth failure from other errors.
    pub async fn validate_token(&self) -> Result<(), NetBoxError> {
        match self.http.get::<Value>("/api/status/").await {
            Ok(_) => {
                info!("NetBox token validated");
                Ok(())
            }
            Err(NetBoxError::Fatal(msg)) if msg.contains("403") => {
                Err(NetBoxError::Fatal(format!("NetBox token rejected (403): {msg}")))
            }
            Err(e) => Err(e),
        }
    }

    /// Discover and enforce the `API-Version` header (spec §6: its absence aborts the run).
    pub async fn discover_api_version(&self) -> Result<String, NetBoxError> {
        let version = self.http.probe_api_version("/api/status/").await?;
        let parsed = semver_like(&version);
        let min = semver_like(MIN_API_VERSION);
        if parsed < min {
            return Err(NetBoxError::Fatal(format!(
                "NetBox API version {version} is below the minimum supported {MIN_API_VERSION}"
            )));
        }
        Ok(version)
    }

    /// List every object of a class, honouring `exclude=config_context` the
    /// way the original always did to shrink payload size.
    pub async fn list(
        &self,
        api_path: &str,
        extra_filters: &[(&str, &str)],
    ) -> Result<Vec<Value>, NetBoxError> {
        let limit = self.default_limit.to_string();
        let mut filters: Vec<(&str, &str)> =
            vec![("limit", limit.as_str()), ("exclude", "config_context")];
        filters.extend_from_slice(extra_filters);
        query_resources(&self.http, api_path, &filters, true).await
    }

    /// Brief GET returning only `id`, used to detect server-side deletions
    /// against a cached snapshot (spec §4.3 cache protocol).
    pub async fn list_brief_ids(&self, api_path: &str) -> Result<Vec<u64>, NetBoxError> {
        let limit = self.default_limit.to_string();
        let filters = [("limit", limit.as_str()), ("brief", "1"), ("fields", "id")];
        let rows: Vec<Value> = query_resources(&self.http, api_path, &filters, true).await?;
        Ok(rows
            .into_iter()
            .filter_map(|v| v.get("id").and_then(Value::as_u64))
            .collect())
    }

    /// Delta GET: everything with `last_updated >= since`.
    pub async fn list_delta(&self, api_path: &str, since: &str) -> Result<Vec<Value>, NetBoxError> {
        let limit = self.default_limit.to_string();
        let filters = [
            ("limit", limit.as_str()),
            ("exclude", "config_context"),
            ("last_updated__gte", since),
        ];
        query_resources(&self.http, api_path, &filters, true).await
    }

    /// POST a new object.
    pub async fn create(&self, api_path: &str, body: &Value) -> Result<Value, NetBoxError> {
        self.http.post(&format!("/api/{api_path}/"), body).await
    }

    /// PATCH an existing object by id.
    pub async fn update(&self, api_path: &str, id: u64, body: &Value) -> Result<Value, NetBoxError> {
        self.http.patch(&format!("/api/{api_path}/{id}/"), body).await
    }

    /// DELETE an object by id.
    pub async fn delete(&self, api_path: &str, id: u64) -> Result<(), NetBoxError> {
        self.http.delete(&format!("/api/{api_path}/{id}/")).await
    }

    /// Access to the underlying transport, for callers (e.g. the cache
    /// loader) that need the raw pagination primitive directly.
    pub fn http(&self) -> &HttpClient {
        &self.http
    }
}

/// A tiny, dependency-free `major.minor.patch` comparator — NetBox version
/// strings are always this shape, so pulling in a full semver crate for the
/// one feature-gate comparison the engine needs would be overkill.
fn semver_like(v: &str) -> (u32, u32, u32) {
    let mut parts = v.split('.').map(|p| p.parse::<u32>().unwrap_or(0));
    (
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semver_like_compares_feature_gate_versions() {
        assert!(semver_like("3.6.0") >= semver_like("3.6.0"));
        assert!(semver_like("3.6.1") > semver_like("3.6.0"));
        assert!(semver_like("2.8") < semver_like("2.9"));
        assert!(semver_like("4.2.0") > semver_like("4.1.0"));
    }
}
