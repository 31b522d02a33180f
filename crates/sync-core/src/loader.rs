//! Cache-accelerated bulk load of current NetBox state into the inventory
//! (spec §2 dataflow "NetBox Client -> Inventory", spec §4.3 cache protocol).

use nb_inventory::{class::descriptor, ClassTag, Inventory};
use netbox_client::{cache, DiskCache, NetBoxClient};
use tracing::{debug, info, warn};

use crate::error::SyncError;

/// Load every class in `classes` into `inventory`, using `cache` to avoid a
/// full GET when a prior snapshot exists and the API version matches.
pub async fn load_current(
    client: &NetBoxClient,
    cache_dir: &DiskCache,
    inventory: &mut Inventory,
    classes: &[ClassTag],
    api_version: &str,
) -> Result<(), SyncError> {
    if cache_dir.cached_version().map_err(SyncError::NetBox)?.as_deref() != Some(api_version) {
        info!("NetBox API version changed (or no prior cache); invalidating all class caches");
        cache_dir.invalidate_all().map_err(SyncError::NetBox)?;
        cache_dir.write_version(api_version).map_err(SyncError::NetBox)?;
    }

    for &class in classes {
        if inventory.is_queried(class) {
            continue;
        }
        let desc = descriptor(class);
        if let Some(min) = desc.min_api_version {
            if crate::version::semver_lt(api_version, min) {
                debug!("{}: skipping, requires NetBox >= {min}, server is {api_version}", desc.name);
                inventory.mark_queried(class);
                continue;
            }
        }

        let snapshot = if desc.has_last_updated {
            load_with_delta(client, cache_dir, desc.api_path).await?
        } else {
            client.list(desc.api_path, &[]).await?
        };

        info!("{}: loaded {} objects", desc.name, snapshot.len());
        for raw in &snapshot {
            inventory.add_object(class, raw, true, None);
        }
        cache_dir
            .save_snapshot(desc.api_path, &snapshot)
            .map_err(SyncError::NetBox)?;
        inventory.mark_queried(class);
    }

    inventory.resolve_relations();
    for (id, field) in inventory.unresolved_references() {
        warn!("{id}: unresolved reference field {field:?} after resolve_relations()");
    }
    Ok(())
}

async fn load_with_delta(
    client: &NetBoxClient,
    cache_dir: &DiskCache,
    api_path: &str,
) -> Result<Vec<serde_json::Value>, SyncError> {
    match cache_dir.load_snapshot(api_path).map_err(SyncError::NetBox)? {
        Some(cached) if !cached.is_empty() => {
            let since = cache::max_last_updated(&cached).unwrap_or_default();
            let current_ids = client.list_brief_ids(api_path).await?;
            let delta = client.list_delta(api_path, &since).await?;
            Ok(cache::reconstruct(cached, &current_ids, delta))
        }
        _ => client.list(api_path, &[]).await.map_err(Into::into),
    }
}
