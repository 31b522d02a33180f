//! Concurrent PTR lookup helper offered to adapters that want to populate
//! `IPAddress.dns_name` (spec §5 "DNS lookups... the helper is allowed to
//! issue those lookups concurrently because it produces a self-contained
//! `ip -> name` map that is merged back serially"; grounded on the
//! concurrent-PTR-lookup use in `module/common/support.py`).

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use hickory_resolver::TokioAsyncResolver;
use tokio::task::JoinSet;
use tracing::debug;

/// Resolve PTR records for `ips` using up to `concurrency` simultaneous
/// lookups, returning only the addresses that resolved. A single shared
/// [`TokioAsyncResolver`] (built from the system configuration) backs every
/// lookup; a resolver that fails to read system config resolves nothing
/// rather than aborting the run.
pub async fn resolve_ptrs(ips: Vec<IpAddr>, concurrency: usize) -> HashMap<IpAddr, String> {
    let Ok((conf, opts)) = hickory_resolver::system_conf::read_system_conf() else {
        debug!("unable to read system DNS configuration, skipping PTR resolution");
        return HashMap::new();
    };
    let resolver = Arc::new(TokioAsyncResolver::tokio(conf, opts));

    let mut results = HashMap::with_capacity(ips.len());
    let mut pending = ips.into_iter();
    let mut in_flight = JoinSet::new();
    let concurrency = concurrency.max(1);

    for ip in pending.by_ref().take(concurrency) {
        spawn_lookup(&mut in_flight, Arc::clone(&resolver), ip);
    }

    while let Some(joined) = in_flight.join_next().await {
        if let Ok((ip, Some(name))) = joined {
            results.insert(ip, name);
        }
        if let Some(ip) = pending.next() {
            spawn_lookup(&mut in_flight, Arc::clone(&resolver), ip);
        }
    }

    results
}

fn spawn_lookup(set: &mut JoinSet<(IpAddr, Option<String>)>, resolver: Arc<TokioAsyncResolver>, ip: IpAddr) {
    set.spawn(async move {
        let name = resolver
            .reverse_lookup(ip)
            .await
            .ok()
            .and_then(|lookup| lookup.iter().next().map(|n| n.to_string().trim_end_matches('.').to_string()));
        (ip, name)
    });
}
