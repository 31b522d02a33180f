//! Vendor-string normalisation used when a source infers a `Manufacturer`
//! from free-form hardware data (spec §2 supplemented feature, grounded on
//! `manufacturer_mapping.py`).

use std::sync::OnceLock;

use regex::RegexBuilder;

const MAPPINGS: &[(&str, &str)] = &[
    ("^AMD$", "AMD"),
    (".*Broadcom.*", "Broadcom"),
    (".*Cisco.*", "Cisco"),
    (".*Dell.*", "Dell"),
    ("FTS Corp", "Fujitsu"),
    (".*Fujitsu.*", "Fujitsu"),
    (".*HiSilicon.*", "HiSilicon"),
    ("^HP$", "HPE"),
    ("^HPE$", "HPE"),
    (".*Huawei.*", "Huawei"),
    (".*Hynix.*", "Hynix"),
    (".*Inspur.*", "Inspur"),
    (".*Intel.*", "Intel"),
    ("LEN", "Lenovo"),
    (".*Lenovo.*", "Lenovo"),
    (".*Micron.*", "Micron"),
    (".*Nvidia.*", "Nvidia"),
    (".*Samsung.*", "Samsung"),
    (".*Supermicro.*", "Supermicro"),
    (".*Toshiba.*", "Toshiba"),
    ("^WD$", "Western Digital"),
    (".*Western Digital.*", "Western Digital"),
];

fn compiled() -> &'static [(regex::Regex, &'static str)] {
    static TABLE: OnceLock<Vec<(regex::Regex, &'static str)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        MAPPINGS
            .iter()
            .map(|(pattern, name)| {
                let re = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .unwrap_or_else(|e| panic!("invalid manufacturer mapping regex '{pattern}': {e}"));
                (re, *name)
            })
            .collect()
    })
}

/// Normalise a free-form vendor string to NetBox's canonical manufacturer
/// name, or return it unchanged if no alias matches.
pub fn sanitize_manufacturer_name(name: &str) -> String {
    for (re, canonical) in compiled() {
        if re.is_match(name) {
            return (*canonical).to_string();
        }
    }
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_are_normalised() {
        assert_eq!(sanitize_manufacturer_name("Dell Inc."), "Dell");
        assert_eq!(sanitize_manufacturer_name("HPE"), "HPE");
        assert_eq!(sanitize_manufacturer_name("HP"), "HPE");
    }

    #[test]
    fn unknown_vendor_passes_through() {
        assert_eq!(sanitize_manufacturer_name("Acme Corp"), "Acme Corp");
    }
}
