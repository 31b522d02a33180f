//! Include/exclude CIDR allow-list for IP addresses a source discovers
//! (spec §4.5 `PermittedSubnets`, grounded on `permitted_subnets.py`).

use std::net::IpAddr;

use ipnet::IpNet;
use tracing::{debug, error, warn};

/// A parsed `permitted_subnets` config value: comma-separated CIDRs, an
/// optional leading `!` marking an exclusion.
#[derive(Debug, Clone, Default)]
pub struct PermittedSubnets {
    included: Vec<IpNet>,
    excluded: Vec<IpNet>,
    validation_failed: bool,
}

impl PermittedSubnets {
    /// Parse `config_string` (comma-separated `cidr` / `!cidr` entries). A
    /// `None` value means no subnet is permitted (matches the original's
    /// "no IP addresses will be populated" behaviour for an unset option).
    pub fn parse(config_string: Option<&str>) -> Self {
        let Some(config_string) = config_string else {
            debug!("permitted_subnets is undefined, no IP addresses will be populated to NetBox");
            return Self::default();
        };

        let mut included = Vec::new();
        let mut excluded = Vec::new();
        let mut validation_failed = false;

        for raw in config_string.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (exclude, subnet) = match raw.strip_prefix('!') {
                Some(rest) => (true, rest.trim()),
                None => (false, raw),
            };

            if !subnet.contains('/') {
                error!("permitted subnet '{subnet}' is missing the prefix length (i.e.: {subnet}/24)");
                validation_failed = true;
                continue;
            }

            match subnet.parse::<IpNet>() {
                Ok(net) if exclude => excluded.push(net),
                Ok(net) => included.push(net),
                Err(e) => {
                    error!("problem parsing permitted subnet '{subnet}': {e}");
                    validation_failed = true;
                }
            }
        }

        Self { included, excluded, validation_failed }
    }

    /// True if any entry failed to parse; callers should treat this as a
    /// source-init failure (spec §7 "Source-init failure").
    pub fn validation_failed(&self) -> bool {
        self.validation_failed
    }

    /// Is `ip` allowed onto NetBox: not link-local/loopback, not in any
    /// exclusion, and inside at least one inclusion.
    pub fn permitted(&self, ip: IpAddr, interface_name: Option<&str>) -> bool {
        if ip.is_loopback() {
            debug!("IP address {} is a loopback address, skipping", describe(ip, interface_name));
            return false;
        }
        if is_link_local(ip) {
            debug!("IP address {} is a link local address, skipping", describe(ip, interface_name));
            return false;
        }

        if self.excluded.iter().any(|net| net.contains(&ip)) {
            return false;
        }
        if self.included.iter().any(|net| net.contains(&ip)) {
            return true;
        }

        debug!("IP address {} is not part of any permitted subnet, skipping", describe(ip, interface_name));
        false
    }
}

fn is_link_local(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_link_local(),
        IpAddr::V6(v6) => (v6.segments()[0] & 0xffc0) == 0xfe80,
    }
}

fn describe(ip: IpAddr, interface_name: Option<&str>) -> String {
    match interface_name {
        Some(name) => format!("'{ip}' for {name}"),
        None => format!("'{ip}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_config_permits_nothing() {
        let subnets = PermittedSubnets::parse(None);
        assert!(!subnets.permitted("10.0.0.1".parse().unwrap(), None));
    }

    #[test]
    fn included_subnet_is_permitted() {
        let subnets = PermittedSubnets::parse(Some("10.0.0.0/8"));
        assert!(subnets.permitted("10.1.2.3".parse().unwrap(), None));
        assert!(!subnets.permitted("192.168.1.1".parse().unwrap(), None));
    }

    #[test]
    fn exclusion_wins_over_inclusion() {
        let subnets = PermittedSubnets::parse(Some("10.0.0.0/8,!10.1.0.0/16"));
        assert!(subnets.permitted("10.2.0.1".parse().unwrap(), None));
        assert!(!subnets.permitted("10.1.0.1".parse().unwrap(), None));
    }

    #[test]
    fn loopback_and_link_local_are_always_rejected() {
        let subnets = PermittedSubnets::parse(Some("0.0.0.0/0"));
        assert!(!subnets.permitted("127.0.0.1".parse().unwrap(), None));
        assert!(!subnets.permitted("169.254.1.1".parse().unwrap(), None));
    }

    #[test]
    fn missing_prefix_length_fails_validation() {
        let subnets = PermittedSubnets::parse(Some("10.0.0.0"));
        assert!(subnets.validation_failed());
    }
}
