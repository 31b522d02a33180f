//! Feature-gate version comparison for `ClassDescriptor::min_api_version`
//! (spec §4.3, e.g. `MacAddress`/`VirtualDisk` needing NetBox >= 4.2/3.7).

/// True when `current` is strictly below `minimum`, comparing
/// `major.minor.patch` numerically rather than lexically.
pub fn semver_lt(current: &str, minimum: &str) -> bool {
    parse(current) < parse(minimum)
}

fn parse(v: &str) -> (u32, u32, u32) {
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
    fn compares_numerically_not_lexically() {
        assert!(semver_lt("3.9.0", "3.10.0"));
        assert!(!semver_lt("4.2.0", "4.2.0"));
        assert!(semver_lt("3.6.0", "4.2.0"));
        assert!(!semver_lt("4.3.0", "4.2.0"));
    }
}
