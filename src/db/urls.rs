//! URL classification shared by the checks and the fix.
//!
//! The SQL side filters with LIKE patterns; these helpers are the same
//! predicates in Rust, used for report labeling and tested directly.

/// LIKE pattern selecting relative upload paths.
pub const LOCAL_UPLOAD_PATTERN: &str = "/uploads/%";

/// LIKE pattern selecting values already rewritten to absolute URLs.
pub const HTTP_PATTERN: &str = "http%";

/// LIKE pattern selecting the missing-colon typo (`https//...`).
pub const MISSING_COLON_PATTERN: &str = "https//%";

/// True for relative upload paths (`/uploads/...`).
pub fn is_local_upload(url: &str) -> bool {
    url.starts_with("/uploads/")
}

/// True for the malformed `https//...` form — a scheme missing its colon.
/// Well-formed `https://` URLs do not match.
pub fn is_missing_scheme_colon(url: &str) -> bool {
    url.starts_with("https//")
}

/// Prepend the base URL onto a relative upload path.
pub fn prefix_base(base_url: &str, url: &str) -> String {
    format!("{base_url}{url}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_upload_detection() {
        assert!(is_local_upload("/uploads/avatars/1.png"));
        assert!(!is_local_upload("http://localhost:3000/uploads/avatars/1.png"));
        assert!(!is_local_upload("https//cdn.example.com/1.png"));
    }

    #[test]
    fn test_missing_colon_detection_is_exclusive() {
        // Counted by the malformed check...
        assert!(is_missing_scheme_colon("https//cdn.example.com/a.png"));
        // ...and by no other check.
        assert!(!is_local_upload("https//cdn.example.com/a.png"));

        // Well-formed URLs and local paths are not malformed.
        assert!(!is_missing_scheme_colon("https://cdn.example.com/a.png"));
        assert!(!is_missing_scheme_colon("http://cdn.example.com/a.png"));
        assert!(!is_missing_scheme_colon("/uploads/a.png"));
    }

    #[test]
    fn test_prefix_rewrite() {
        let rewritten = prefix_base("http://localhost:3000", "/uploads/a.png");
        assert_eq!(rewritten, "http://localhost:3000/uploads/a.png");
    }

    #[test]
    fn test_prefix_rewrite_is_idempotent_under_the_filter() {
        // Once prefixed, the value no longer matches the LIKE filter, so a
        // second run selects nothing and cannot double-prefix.
        let rewritten = prefix_base("http://localhost:3000", "/uploads/a.png");
        assert!(!is_local_upload(&rewritten));
    }
}
