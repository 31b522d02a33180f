//! Cache round-trip across process-like boundaries: write, drop, reopen.

use netbox_client::DiskCache;
use serde_json::json;

#[test]
fn snapshot_round_trips_through_disk() {
    let dir = std::env::temp_dir().join(format!("netbox-sync-cache-test-{}", std::process::id()));
    let cache = DiskCache::new(&dir);

    let snapshot = vec![
        json!({"id": 1, "last_updated": "2026-01-01T00:00:00Z", "name": "dev-a"}),
        json!({"id": 2, "last_updated": "2026-01-02T00:00:00Z", "name": "dev-b"}),
    ];

    cache
        .save_snapshot("dcim/devices", &snapshot)
        .expect("save snapshot");
    cache.write_version("3.6.4").expect("write version");

    let reopened = DiskCache::new(&dir);
    let loaded = reopened
        .load_snapshot("dcim/devices")
        .expect("load snapshot")
        .expect("snapshot present");
    assert_eq!(loaded, snapshot);
    assert_eq!(reopened.cached_version().expect("read version"), Some("3.6.4".to_string()));

    reopened.invalidate_all().expect("invalidate");
    assert_eq!(reopened.load_snapshot("dcim/devices").expect("load after invalidate"), None);

    let _ = std::fs::remove_dir_all(&dir);
}
