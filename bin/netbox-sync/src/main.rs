//! One-shot NetBox inventory reconciliation run (spec §2 dataflow).
//!
//! Bootstrapping mirrors the teacher's `controllers/netbox/src/main.rs`:
//! `tracing_subscriber::fmt::init()` plus environment-variable-driven
//! configuration, no CLI flag parser (spec §1 Non-goal). The config file
//! path itself comes from `NETBOX_SYNC_CONFIG` (default `config.yaml`).

mod config;

use std::collections::{BTreeSet, HashSet};
use std::env;
use std::fs;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use nb_inventory::{ClassTag, Inventory};
use netbox_client::{DiskCache, NetBoxClient};
use sources::{ClusterSnapshot, HardwareInventoryAdapter, HardwareSnapshot, HypervisorClusterAdapter};
use source_framework::SourceAdapter;
use sync_core::Orchestrator;
use tracing::{error, info, warn};

use config::{EngineConfig, SourceConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    info!("Starting NetBox reconciliation run");

    let config_path = env::var("NETBOX_SYNC_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let cfg = load_config(&config_path)?;
    if !cfg.netbox.validate() {
        bail!("invalid configuration, see above");
    }

    let client = NetBoxClient::new(
        cfg.netbox.base_url(),
        cfg.netbox.api_token.clone(),
        cfg.netbox.timeout(),
        cfg.netbox.max_retry_attempts,
        cfg.netbox.default_netbox_result_limit,
        cfg.netbox.validate_tls_certs,
        cfg.netbox.proxy.as_deref(),
    )
    .context("building NetBox client")?;

    client.validate_token().await.context("validating NetBox API token")?;
    let api_version = client
        .discover_api_version()
        .await
        .context("discovering NetBox API version")?;
    info!("NetBox API version: {api_version}");

    let cache = DiskCache::new(&cfg.netbox.cache_directory_location);
    if !cfg.netbox.use_caching {
        info!("caching disabled by config, invalidating any existing cache");
        cache.invalidate_all().context("invalidating disk cache")?;
    }

    let mut inventory = Inventory::new();
    sync_core::load_current(&client, &cache, &mut inventory, ClassTag::ALL, &api_version)
        .await
        .context("loading current NetBox state")?;
    inventory.set_api_version(api_version);

    let settings = config::engine_settings(&cfg.netbox);
    let orchestrator = Orchestrator::new(&client, &settings);
    orchestrator.seed_basics(&mut inventory).await.context("seeding primary/orphan tags")?;

    let disabled_sources: HashSet<String> = cfg.sources.iter().filter(|s| !s.enabled).map(|s| s.name.clone()).collect();
    let mut used_tags: BTreeSet<String> = BTreeSet::from([settings.primary_tag.clone()]);

    for source_cfg in cfg.sources.iter().filter(|s| s.enabled) {
        let Some(mut adapter) = build_adapter(source_cfg) else {
            continue;
        };
        if !adapter.init_successful() {
            warn!("source '{}' failed to initialise, skipping", source_cfg.name);
            continue;
        }
        info!("running source '{}' ({})", adapter.name(), adapter.source_type());
        used_tags.insert(adapter.source_tag());
        adapter.apply(&mut inventory);
    }

    inventory.resolve_relations();

    let primary_tag = settings.primary_tag.clone();
    let orphan_tag = settings.orphan_tag();
    inventory.tag_lifecycle(
        &primary_tag,
        |name| format!("Source: {name}"),
        &orphan_tag,
        |id, _entity| !nb_inventory::descriptor(id.class()).prune,
    );

    orchestrator.apply_all(&mut inventory).await.context("applying sync passes")?;

    let ignore_unknown_source = cfg.netbox.ignore_unknown_source_object_pruning;
    orchestrator
        .prune(&mut inventory, Utc::now(), |source_name| {
            if ignore_unknown_source && !disabled_sources.contains(source_name) && !cfg.sources.iter().any(|s| s.name == source_name) {
                // Unknown source (not in config at all): do not prune, per
                // `ignore_unknown_source_object_pruning` (spec supplement, §2).
                return true;
            }
            disabled_sources.contains(source_name)
        })
        .await
        .context("pruning orphaned objects")?;

    orchestrator.gc_tags(&mut inventory, &used_tags).await.context("garbage-collecting unused tags")?;

    info!("reconciliation run complete");
    Ok(())
}

fn load_config(path: &str) -> Result<EngineConfig> {
    let text = fs::read_to_string(path).with_context(|| format!("reading config file '{path}'"))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing config file '{path}'"))
}

/// Construct the adapter a `SourceConfig` names, loading its pre-collected
/// snapshot file (spec §1: crawling the live source itself is out of scope,
/// `bin/netbox-sync` only needs to hand the adapter an already-collected
/// snapshot).
fn build_adapter(src: &SourceConfig) -> Option<Box<dyn SourceAdapter>> {
    let settings = src.to_settings();
    if HypervisorClusterAdapter::implements(&src.source_type) {
        let snapshot = match &src.snapshot_file {
            Some(path) => match read_json::<ClusterSnapshot>(path) {
                Ok(s) => s,
                Err(e) => {
                    error!("source '{}': failed to load snapshot '{path}': {e}", src.name);
                    return None;
                }
            },
            None => ClusterSnapshot::default(),
        };
        Some(Box::new(HypervisorClusterAdapter::new(src.name.clone(), settings, snapshot)))
    } else if HardwareInventoryAdapter::implements(&src.source_type) {
        let snapshots = match &src.snapshot_file {
            Some(path) => match read_json::<Vec<HardwareSnapshot>>(path) {
                Ok(s) => s,
                Err(e) => {
                    error!("source '{}': failed to load snapshot '{path}': {e}", src.name);
                    return None;
                }
            },
            None => Vec::new(),
        };
        Some(Box::new(HardwareInventoryAdapter::new(src.name.clone(), settings, src.overwrite_host_name, snapshots)))
    } else {
        warn!("source '{}': unknown source type '{}', skipping", src.name, src.source_type);
        None
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("reading snapshot file '{path}'"))?;
    serde_json::from_str(&text).with_context(|| format!("parsing snapshot file '{path}'"))
}
