//! Plain `serde`-deserialisable configuration structs mirroring the option
//! surface of `module/netbox/config.py` and `module/sources/common/config.py`
//! (SPEC_FULL.md §1 "Configuration"). Loading a config file from disk is the
//! one piece of "config loading" left in scope here — parsing CLI flags,
//! environment variables, or alternate formats (INI/TOML) is not (spec §1).

use std::time::Duration;

use serde::Deserialize;
use source_framework::SourceSettings;
use sync_core::settings::{EngineSettings, SetPrimaryIp, TenantInheritanceSource};
use tracing::{error, warn};

/// Top-level config file shape (a single YAML document).
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub netbox: NetBoxConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

/// Connection parameters to the NetBox instance (spec §6, `module/netbox/config.py`).
#[derive(Debug, Clone, Deserialize)]
pub struct NetBoxConfig {
    pub api_token: String,
    pub host_fqdn: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub disable_tls: bool,
    #[serde(default = "default_true")]
    pub validate_tls_certs: bool,
    pub proxy: Option<String>,
    pub client_cert: Option<String>,
    pub client_cert_key: Option<String>,
    #[serde(default)]
    pub prune_enabled: bool,
    #[serde(default = "default_prune_delay")]
    pub prune_delay_in_days: i64,
    #[serde(default)]
    pub ignore_unknown_source_object_pruning: bool,
    #[serde(default = "default_result_limit")]
    pub default_netbox_result_limit: u32,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_max_retry")]
    pub max_retry_attempts: u32,
    #[serde(default = "default_true")]
    pub use_caching: bool,
    #[serde(default = "default_cache_dir")]
    pub cache_directory_location: String,
}

fn default_port() -> u16 {
    443
}
fn default_true() -> bool {
    true
}
fn default_prune_delay() -> i64 {
    30
}
fn default_result_limit() -> u32 {
    200
}
fn default_timeout() -> u64 {
    30
}
fn default_max_retry() -> u32 {
    4
}
fn default_cache_dir() -> String {
    "cache".to_string()
}

impl NetBoxConfig {
    /// `https://host:port` or `http://host:port`, per `disable_tls`.
    pub fn base_url(&self) -> String {
        let scheme = if self.disable_tls { "http" } else { "https" };
        format!("{scheme}://{}:{}", self.host_fqdn, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Validate `proxy`'s schema, matching `NetBoxConfig.validate_options` in
    /// the original (`http`/`https`/`socks5`/`socks5h`).
    pub fn validate(&self) -> bool {
        match &self.proxy {
            Some(p) if !(p.starts_with("http") || p.starts_with("socks5")) || !p.contains("://") => {
                error!("config option 'proxy' must contain the schema http, https, socks5 or socks5h");
                false
            }
            _ => true,
        }
    }
}

/// One source instance's config block (`module/sources/common/config.py`'s
/// shared option set, flattened over every concrete source this binary
/// knows how to build).
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub permitted_subnets: Option<String>,
    #[serde(default = "default_set_primary_ip")]
    pub set_primary_ip: String,
    #[serde(default = "default_inheritance_order")]
    pub ip_tenant_inheritance_order: String,
    #[serde(default)]
    pub match_host_by_serial: bool,
    #[serde(default)]
    pub disable_vlan_sync: bool,
    #[serde(default)]
    pub vlan_sync_exclude_by_name: Vec<String>,
    #[serde(default)]
    pub vlan_sync_exclude_by_id: Vec<String>,
    #[serde(default)]
    pub vlan_group_relation_by_name: Vec<String>,
    #[serde(default)]
    pub vlan_group_relation_by_id: Vec<String>,
    /// Adapter-specific: the already-collected snapshot file to load (a
    /// hypervisor-cluster or hardware-inventory JSON dump). Crawling the
    /// live source to produce this file is out of scope (spec §1).
    pub snapshot_file: Option<String>,
    /// `hardware_inventory` only: overwrite the NetBox device name from the
    /// snapshot's reported hostname.
    #[serde(default)]
    pub overwrite_host_name: bool,
}

fn default_set_primary_ip() -> String {
    "when-undefined".to_string()
}
fn default_inheritance_order() -> String {
    "device, prefix".to_string()
}

/// Parse `"always"` / `"when-undefined"` / `"never"` (spec §4.4).
pub fn parse_set_primary_ip(raw: &str) -> SetPrimaryIp {
    match raw.trim() {
        "always" => SetPrimaryIp::Always,
        "never" => SetPrimaryIp::Never,
        other => {
            if other != "when-undefined" {
                warn!("unknown set_primary_ip value '{other}', defaulting to when-undefined");
            }
            SetPrimaryIp::WhenUndefined
        }
    }
}

/// Parse a comma-separated `device, prefix` / `disabled` list (spec §4.4
/// "ordered inheritance list").
pub fn parse_inheritance_order(raw: &str) -> Vec<TenantInheritanceSource> {
    if raw.trim() == "disabled" {
        return Vec::new();
    }
    raw.split(',')
        .filter_map(|part| match part.trim() {
            "device" => Some(TenantInheritanceSource::Device),
            "prefix" => Some(TenantInheritanceSource::Prefix),
            "" => None,
            other => {
                warn!("unknown ip_tenant_inheritance_order entry '{other}', ignoring");
                None
            }
        })
        .collect()
}

impl SourceConfig {
    /// Build the typed [`SourceSettings`] bundle every adapter consults.
    pub fn to_settings(&self) -> SourceSettings {
        use source_framework::settings::{VlanGroupRelationById, VlanGroupRelationByName};
        use source_framework::vlan_filter::{VlanFilterById, VlanFilterByName};

        let vlan_sync_exclude_by_name = self
            .vlan_sync_exclude_by_name
            .iter()
            .filter_map(|raw| VlanFilterByName::parse(raw, "exclude"))
            .collect();
        let vlan_sync_exclude_by_id = self
            .vlan_sync_exclude_by_id
            .iter()
            .filter_map(|raw| VlanFilterById::parse(raw, "exclude"))
            .collect();
        let vlan_group_relation_by_name = self
            .vlan_group_relation_by_name
            .iter()
            .filter_map(|raw| parse_group_relation(raw))
            .filter_map(|(filter, group)| VlanFilterByName::parse(&filter, "group relation").map(|f| VlanGroupRelationByName(f, group)))
            .collect();
        let vlan_group_relation_by_id = self
            .vlan_group_relation_by_id
            .iter()
            .filter_map(|raw| parse_group_relation(raw))
            .filter_map(|(filter, group)| VlanFilterById::parse(&filter, "group relation").map(|f| VlanGroupRelationById(f, group)))
            .collect();

        SourceSettings {
            enabled: self.enabled,
            permitted_subnets: source_framework::PermittedSubnets::parse(self.permitted_subnets.as_deref()),
            set_primary_ip: parse_set_primary_ip(&self.set_primary_ip),
            ip_tenant_inheritance_order: parse_inheritance_order(&self.ip_tenant_inheritance_order),
            match_host_by_serial: self.match_host_by_serial,
            disable_vlan_sync: self.disable_vlan_sync,
            vlan_sync_exclude_by_name,
            vlan_sync_exclude_by_id,
            vlan_group_relation_by_name,
            vlan_group_relation_by_id,
        }
    }
}

/// `"<filter>=<group name>"` entries in `vlan_group_relation_by_*`.
fn parse_group_relation(raw: &str) -> Option<(String, String)> {
    let (filter, group) = raw.split_once('=')?;
    Some((filter.trim().to_string(), group.trim().to_string()))
}

/// Build [`EngineSettings`] from the `[netbox]` block.
pub fn engine_settings(cfg: &NetBoxConfig) -> EngineSettings {
    let mut settings = EngineSettings::default();
    settings.prune_enabled = cfg.prune_enabled;
    settings.prune_delay_in_days = cfg.prune_delay_in_days;
    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_yaml_document() {
        let yaml = r#"
netbox:
  api_token: "XYZ"
  host_fqdn: "netbox.example.com"
sources:
  - name: "vc1"
    type: "hypervisor_cluster"
"#;
        let cfg: EngineConfig = serde_yaml::from_str(yaml).expect("valid config");
        assert_eq!(cfg.netbox.port, 443);
        assert!(!cfg.netbox.disable_tls);
        assert_eq!(cfg.sources.len(), 1);
        assert_eq!(cfg.sources[0].set_primary_ip, "when-undefined");
    }

    #[test]
    fn base_url_honours_disable_tls() {
        let mut cfg = NetBoxConfig {
            api_token: "t".to_string(),
            host_fqdn: "nb.example.com".to_string(),
            port: 8080,
            disable_tls: true,
            validate_tls_certs: true,
            proxy: None,
            client_cert: None,
            client_cert_key: None,
            prune_enabled: false,
            prune_delay_in_days: 30,
            ignore_unknown_source_object_pruning: false,
            default_netbox_result_limit: 200,
            timeout: 30,
            max_retry_attempts: 4,
            use_caching: true,
            cache_directory_location: "cache".to_string(),
        };
        assert_eq!(cfg.base_url(), "http://nb.example.com:8080");
        cfg.disable_tls = false;
        assert_eq!(cfg.base_url(), "https://nb.example.com:8080");
    }

    #[test]
    fn validate_rejects_schema_less_proxy() {
        let cfg = NetBoxConfig {
            api_token: "t".to_string(),
            host_fqdn: "nb.example.com".to_string(),
            port: 443,
            disable_tls: false,
            validate_tls_certs: true,
            proxy: Some("10.10.1.10:312".to_string()),
            client_cert: None,
            client_cert_key: None,
            prune_enabled: false,
            prune_delay_in_days: 30,
            ignore_unknown_source_object_pruning: false,
            default_netbox_result_limit: 200,
            timeout: 30,
            max_retry_attempts: 4,
            use_caching: true,
            cache_directory_location: "cache".to_string(),
        };
        assert!(!cfg.validate());
    }

    #[test]
    fn inheritance_order_parses_disabled() {
        assert!(parse_inheritance_order("disabled").is_empty());
        assert_eq!(
            parse_inheritance_order("device, prefix"),
            vec![TenantInheritanceSource::Device, TenantInheritanceSource::Prefix]
        );
    }
}
