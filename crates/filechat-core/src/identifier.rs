//! Identifier derivation.
//!
//! An identifier names both the registry row and the vector index of one
//! ingested source, so it must only use characters that are safe as a SQL
//! key and as a file name on every platform.

/// Longest identifier accepted. Leaves room for the index file extension
/// within the 255 byte file name limit of common filesystems.
pub const MAX_IDENTIFIER_LEN: usize = 200;

/// Replace every character outside `[A-Za-z0-9_]` with `_`.
///
/// Works per Unicode scalar value, so `"é"` becomes a single `_`.
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Derive the identifier for a source submitted by `owner` into `collection`.
///
/// Total and deterministic: the same triple always yields the same identifier.
pub fn derive_identifier(owner: &str, collection: &str, name: &str) -> String {
    format!(
        "{}_{}_{}",
        sanitize(owner),
        sanitize(collection),
        sanitize(name)
    )
}

/// Check that a string could have been produced by [`derive_identifier`]
/// and is short enough to name an index file.
pub fn is_valid_identifier(identifier: &str) -> bool {
    !identifier.is_empty()
        && identifier.len() <= MAX_IDENTIFIER_LEN
        && identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_specials() {
        assert_eq!(sanitize("notes.pdf"), "notes_pdf");
        assert_eq!(sanitize("a b/c"), "a_b_c");
        assert_eq!(sanitize("already_safe_123"), "already_safe_123");
        assert_eq!(sanitize("café"), "caf_");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_derive_identifier_for_link() {
        assert_eq!(
            derive_identifier("alice", "biology", "http://example.com/page"),
            "alice_biology_http___example_com_page"
        );
    }

    #[test]
    fn test_derive_identifier_sanitizes_every_part() {
        let id = derive_identifier("bob smith", "sci-fi", "chapter 1.txt");
        assert_eq!(id, "bob_smith_sci_fi_chapter_1_txt");
    }

    #[test]
    fn test_derive_identifier_is_deterministic() {
        let inputs = [
            ("alice", "math", "f1"),
            ("Ω", "∑", "📄 report.pdf"),
            ("", "", ""),
            ("a\nb", "c\td", "https://youtu.be/xyz?t=10"),
        ];

        for (owner, collection, name) in inputs {
            let first = derive_identifier(owner, collection, name);
            let second = derive_identifier(owner, collection, name);
            assert_eq!(first, second);
            assert!(first
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_'));
        }
    }

    #[test]
    fn test_is_valid_identifier() {
        assert!(is_valid_identifier("alice_math_f1"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("../etc/passwd"));
        assert!(is_valid_identifier(&derive_identifier("a/b", "..", "x y")));
        assert!(is_valid_identifier(&"a".repeat(MAX_IDENTIFIER_LEN)));
        assert!(!is_valid_identifier(&"a".repeat(MAX_IDENTIFIER_LEN + 1)));
    }
}
