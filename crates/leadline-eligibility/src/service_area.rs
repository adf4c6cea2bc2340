//! Postal-code normalization and the service-area rule.

/// A contiguous block of excluded three-digit ZIP prefixes.
struct ExcludedRegion {
    name: &'static str,
    first_prefix: u16,
    last_prefix: u16,
}

const EXCLUDED_REGIONS: &[ExcludedRegion] = &[
    ExcludedRegion {
        name: "Alaska",
        first_prefix: 995,
        last_prefix: 999,
    },
    ExcludedRegion {
        name: "Hawaii",
        first_prefix: 967,
        last_prefix: 968,
    },
];

/// Reduces a spoken or typed postal code to its five-digit form.
///
/// Accepts `30093`, `30093-1234`, `300931234`, and the same with stray
/// spaces. Returns `None` for anything that does not contain exactly five
/// or nine digits.
pub fn normalize_zip(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let extra = raw
        .chars()
        .any(|c| !(c.is_ascii_digit() || c == '-' || c.is_whitespace()));
    if extra {
        return None;
    }
    match digits.len() {
        5 | 9 => Some(digits[..5].to_string()),
        _ => None,
    }
}

/// Returns the name of the excluded region a five-digit ZIP falls in.
pub fn excluded_region(zip: &str) -> Option<&'static str> {
    let prefix: u16 = zip.get(..3)?.parse().ok()?;
    EXCLUDED_REGIONS
        .iter()
        .find(|r| (r.first_prefix..=r.last_prefix).contains(&prefix))
        .map(|r| r.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_plus_four_truncates() {
        assert_eq!(normalize_zip("30093-1234").as_deref(), Some("30093"));
        assert_eq!(normalize_zip(" 30093 ").as_deref(), Some("30093"));
        assert_eq!(normalize_zip("300931234").as_deref(), Some("30093"));
    }

    #[test]
    fn malformed_zip_is_rejected() {
        assert_eq!(normalize_zip("3009"), None);
        assert_eq!(normalize_zip("ABCDE"), None);
        assert_eq!(normalize_zip("300930"), None);
    }

    #[test]
    fn region_boundaries() {
        assert_eq!(excluded_region("99501"), Some("Alaska"));
        assert_eq!(excluded_region("99999"), Some("Alaska"));
        assert_eq!(excluded_region("96701"), Some("Hawaii"));
        assert_eq!(excluded_region("96898"), Some("Hawaii"));
        assert_eq!(excluded_region("96601"), None);
        assert_eq!(excluded_region("99401"), None);
        assert_eq!(excluded_region("30093"), None);
    }
}
