//! VLAN include/exclude-by-name and by-ID filters, and the VLAN-group
//! name/ID relation tables that reuse the same filter object (spec §4.5
//! VLAN handling, grounded on `handle_vlan.py`).

use regex::Regex;
use tracing::error;

/// A parsed `site/value` filter string. An escaped `\/` inside `value`
/// keeps the slash; an unescaped one splits site from value.
fn split_site_value(raw: &str) -> Option<(Option<String>, String)> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                current.push(next);
                chars.next();
                continue;
            }
        }
        if c == '/' {
            parts.push(std::mem::take(&mut current));
            continue;
        }
        current.push(c);
    }
    parts.push(current);

    match parts.len() {
        1 => Some((None, parts.remove(0))),
        2 => Some((Some(parts.remove(0)), parts.remove(1))),
        _ => None,
    }
}

fn site_matches(filter_site: Option<&Regex>, site_name: Option<&str>) -> bool {
    match filter_site {
        None => true,
        Some(re) => match site_name {
            Some(name) => re.is_match(name),
            None => false,
        },
    }
}

/// Matches a VLAN by name (and optional site), e.g. `"site-a/^prod-.*$"`.
#[derive(Debug, Clone)]
pub struct VlanFilterByName {
    site: Option<Regex>,
    name: Regex,
}

impl VlanFilterByName {
    pub fn parse(raw: &str, filter_kind: &str) -> Option<Self> {
        if raw.is_empty() {
            error!("submitted VLAN {filter_kind} string for VLAN was empty");
            return None;
        }
        let (site, value) = split_site_value(raw)?;
        let site = match site {
            Some(s) => match Regex::new(&format!("^{s}$")) {
                Ok(re) => Some(re),
                Err(e) => {
                    error!("invalid VLAN {filter_kind} site regex '{s}': {e}");
                    return None;
                }
            },
            None => None,
        };
        let name = match Regex::new(&format!("^{value}$")) {
            Ok(re) => re,
            Err(e) => {
                error!("invalid VLAN {filter_kind} name regex '{value}': {e}");
                return None;
            }
        };
        Some(Self { site, name })
    }

    pub fn matches(&self, name: &str, site: Option<&str>) -> bool {
        site_matches(self.site.as_ref(), site) && self.name.is_match(name)
    }
}

/// Matches a VLAN by numeric ID or ID range (and optional site), e.g.
/// `"100-200"` or `"10,20,30-40"`.
#[derive(Debug, Clone)]
pub struct VlanFilterById {
    site: Option<Regex>,
    ids: Vec<u32>,
}

impl VlanFilterById {
    pub fn parse(raw: &str, filter_kind: &str) -> Option<Self> {
        if raw.is_empty() {
            error!("submitted VLAN {filter_kind} string for VLAN was empty");
            return None;
        }
        let (site, value) = split_site_value(raw)?;
        let site = match site {
            Some(s) => match Regex::new(&format!("^{s}$")) {
                Ok(re) => Some(re),
                Err(e) => {
                    error!("invalid VLAN {filter_kind} site regex '{s}': {e}");
                    return None;
                }
            },
            None => None,
        };

        let mut ids = Vec::new();
        for part in value.split(',') {
            if let Some((lo, hi)) = part.split_once('-') {
                let (Ok(lo), Ok(hi)) = (lo.parse::<u32>(), hi.parse::<u32>()) else {
                    error!("unable to extract VLAN IDs from value '{value}'");
                    return None;
                };
                if lo >= hi {
                    error!("VLAN {filter_kind} range has to start with the lower ID: {value}");
                    return None;
                }
                ids.extend(lo..=hi);
            } else {
                match part.parse::<u32>() {
                    Ok(id) => ids.push(id),
                    Err(_) => {
                        error!("unable to extract VLAN IDs from value '{value}'");
                        return None;
                    }
                }
            }
        }
        Some(Self { site, ids })
    }

    pub fn matches(&self, vlan_id: u32, site: Option<&str>) -> bool {
        site_matches(self.site.as_ref(), site) && self.ids.contains(&vlan_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_filter_matches_regex() {
        let f = VlanFilterByName::parse("^prod-.*$", "exclude").unwrap();
        assert!(f.matches("prod-web", None));
        assert!(!f.matches("dev-web", None));
    }

    #[test]
    fn name_filter_with_site_only_matches_that_site() {
        let f = VlanFilterByName::parse("dc1/^prod-.*$", "exclude").unwrap();
        assert!(f.matches("prod-web", Some("dc1")));
        assert!(!f.matches("prod-web", Some("dc2")));
    }

    #[test]
    fn id_filter_expands_ranges() {
        let f = VlanFilterById::parse("10,20-22", "exclude").unwrap();
        assert!(f.matches(10, None));
        assert!(f.matches(21, None));
        assert!(!f.matches(23, None));
    }

    #[test]
    fn id_filter_rejects_descending_range() {
        assert!(VlanFilterById::parse("20-10", "exclude").is_none());
    }
}
