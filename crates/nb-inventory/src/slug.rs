//! Slug generation: normalise a display name into NetBox's `[a-z0-9_-]`
//! charset and disambiguate collisions with a numeric suffix.
//!
//! Grounded in the original's `normalize_name`/slug handling in
//! `object_classes.py`, which lower-cases, replaces runs of disallowed
//! characters with a single `-`, trims the result to the field's max
//! length, and appends `_2`, `_3`, ... on collision, bailing out after a
//! bounded number of attempts rather than looping forever.

/// Same bound the original used before giving up and returning a
/// last-resort slug.
const MAX_SUFFIX_ATTEMPTS: u32 = 19;

/// Normalise `name` into a valid, length-bounded slug. Does not check
/// uniqueness; see [`unique_slug`].
pub fn normalize(name: &str, max_len: u32) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_sep = false;
    for ch in name.chars().flat_map(char::to_lowercase) {
        let mapped = if ch.is_ascii_alphanumeric() {
            Some(ch)
        } else if ch == '_' || ch == '-' {
            Some(ch)
        } else if ch.is_whitespace() || ch == '.' || ch == ':' || ch == '/' {
            Some('-')
        } else {
            None
        };
        match mapped {
            Some(c) if c == '-' || c == '_' => {
                if !last_was_sep {
                    out.push(c);
                }
                last_was_sep = true;
            }
            Some(c) => {
                out.push(c);
                last_was_sep = false;
            }
            None => {}
        }
    }
    let trimmed = out.trim_matches(|c| c == '-' || c == '_');
    let truncated: String = trimmed.chars().take(max_len as usize).collect();
    if truncated.is_empty() {
        "unnamed".to_string()
    } else {
        truncated
    }
}

/// Normalise `name` and, if it collides with an entry `taken` already
/// contains, append `_2`, `_3`, ... up to [`MAX_SUFFIX_ATTEMPTS`] attempts.
/// Returns the final slug regardless of whether uniqueness was achieved —
/// callers that require a hard uniqueness guarantee should check membership
/// in `taken` themselves and log when it was exhausted.
pub fn unique_slug(name: &str, max_len: u32, taken: impl Fn(&str) -> bool) -> String {
    let base = normalize(name, max_len);
    if !taken(&base) {
        return base;
    }
    for attempt in 2..=MAX_SUFFIX_ATTEMPTS {
        let suffix = format!("_{attempt}");
        let keep = max_len as usize - suffix.len().min(max_len as usize);
        let candidate = format!("{}{}", &base[..base.len().min(keep)], suffix);
        if !taken(&candidate) {
            return candidate;
        }
    }
    format!("{base}_{MAX_SUFFIX_ATTEMPTS}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_spaces_and_case() {
        assert_eq!(normalize("VMware vSphere 7", 64), "vmware-vsphere-7");
    }

    #[test]
    fn collapses_runs_of_separators() {
        assert_eq!(normalize("a   b///c", 64), "a-b-c");
    }

    #[test]
    fn truncates_to_max_length() {
        assert_eq!(normalize("abcdef", 4), "abcd");
    }

    #[test]
    fn appends_numeric_suffix_on_collision() {
        let taken = |s: &str| s == "site-a";
        assert_eq!(unique_slug("Site A", 64, taken), "site-a_2");
    }

    #[test]
    fn falls_back_after_exhausting_attempts() {
        let taken = |_: &str| true;
        let slug = unique_slug("dup", 64, taken);
        assert_eq!(slug, format!("dup_{MAX_SUFFIX_ATTEMPTS}"));
    }
}
