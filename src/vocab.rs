//! Well-known relationship URIs and the repository URI scheme.

/// Prefix every repository object URI carries in the resource index.
pub const FEDORA_URI_PREFIX: &str = "info:fedora/";

/// External relation: a part declares the whole it belongs to.
pub const IS_PART_OF: &str = "info:fedora/fedora-system:def/relations-external#isPartOf";

/// A part declares the part it comes after.
pub const FOLLOWS: &str = "http://fedora.lib.virginia.edu/relationships#follows";

/// Page-level variant of [`FOLLOWS`].
pub const FOLLOWS_PAGE: &str = "http://fedora.lib.virginia.edu/relationships#isFollowingPageOf";

/// Page-level variant of [`IS_PART_OF`].
pub const IS_CONSTITUENT_OF: &str = "http://fedora.lib.virginia.edu/relationships#isConstituentOf";

/// Strip the repository scheme from a URI, if present.
pub fn strip_fedora_prefix(uri: &str) -> Option<&str> {
    uri.strip_prefix(FEDORA_URI_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_prefix() {
        assert_eq!(strip_fedora_prefix("info:fedora/uva-lib:42"), Some("uva-lib:42"));
        assert_eq!(strip_fedora_prefix("http://example.org/x"), None);
    }

    #[test]
    fn test_predicates_are_absolute() {
        for p in [IS_PART_OF, FOLLOWS, FOLLOWS_PAGE, IS_CONSTITUENT_OF] {
            assert!(p.contains(':'), "{} is not an absolute URI", p);
        }
    }
}
