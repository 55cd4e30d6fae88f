//! Filename and Content-Disposition sanitization.
//!
//! Turns arbitrary untrusted strings into names that are safe to embed in
//! filesystem paths and HTTP response headers. Non-ASCII scripts are
//! preserved verbatim; only structurally dangerous characters are removed.

/// Disposition types accepted verbatim. Anything else falls back to
/// `inline` - close matches such as `attachments` are not accepted.
const ACCEPTABLE_DISPOSITIONS: [&str; 2] = ["inline", "attachment"];

/// Windows reserved device names. A filename matching one of these
/// (case-insensitively) is replaced wholesale with the fallback.
const WINDOWS_RESERVED_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Characters stripped from filenames: path separators, shell metacharacters
/// that break header quoting, and anything Windows rejects.
const UNSAFE_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Maximum filename length most filesystems accept.
const MAX_FILENAME_LEN: usize = 255;

/// Sanitization settings.
#[derive(Debug, Clone)]
pub struct SanitizeOptions {
    /// Characters to reserve below the 255 limit, for callers that append
    /// their own extension later.
    pub padding: usize,
    /// Replacement used when sanitization would produce an unusable name.
    pub fallback: String,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            padding: 0,
            fallback: "file".to_string(),
        }
    }
}

impl SanitizeOptions {
    /// Reserves `padding` characters below the length limit.
    #[must_use]
    pub fn with_padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    /// Sets the fallback name.
    #[must_use]
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }
}

/// Normalizes, filters, and truncates a filename.
///
/// Steps, in order: collapse whitespace, truncate to `255 - padding`
/// characters, strip control and filesystem-unsafe characters, collapse
/// whitespace again, replace Windows reserved device names, prefix names
/// starting with a dot, and fall back to `opts.fallback` if nothing is left.
#[must_use]
pub fn sanitize(name: &str, opts: &SanitizeOptions) -> String {
    let limit = MAX_FILENAME_LEN.saturating_sub(opts.padding);

    let collapsed = collapse_whitespace(name);
    let truncated: String = collapsed.chars().take(limit).collect();
    let filtered: String = truncated
        .chars()
        .filter(|c| !c.is_control() && !UNSAFE_CHARS.contains(c))
        .collect();
    // Removal can join separate whitespace runs into a new run.
    let cleaned = collapse_whitespace(&filtered);

    let cleaned = filter_windows_reserved_names(cleaned, &opts.fallback);
    let cleaned = filter_leading_dot(cleaned, &opts.fallback);
    if cleaned.is_empty() {
        opts.fallback.clone()
    } else {
        cleaned
    }
}

/// Builds a Content-Disposition header value from a disposition type and a
/// filename.
///
/// The type is kept only if it is exactly `inline` or `attachment`;
/// everything else becomes `inline`. The filename is passed through
/// [`sanitize`].
#[must_use]
pub fn content_disposition_with(kind: &str, filename: &str, opts: &SanitizeOptions) -> String {
    format!("{}; filename=\"{}\"", cleaned_type(kind), sanitize(filename, opts))
}

fn cleaned_type(kind: &str) -> &str {
    if ACCEPTABLE_DISPOSITIONS.contains(&kind) {
        kind
    } else {
        "inline"
    }
}

fn collapse_whitespace(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn filter_windows_reserved_names(name: String, fallback: &str) -> String {
    if WINDOWS_RESERVED_NAMES
        .iter()
        .any(|reserved| name.eq_ignore_ascii_case(reserved))
    {
        fallback.to_string()
    } else {
        name
    }
}

fn filter_leading_dot(name: String, fallback: &str) -> String {
    if name.starts_with('.') {
        format!("{fallback}{name}")
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn defaults() -> SanitizeOptions {
        SanitizeOptions::default()
    }

    #[test]
    fn test_plain_names_pass_through() {
        assert_eq!(sanitize("picture.png", &defaults()), "picture.png");
        assert_eq!(sanitize("my holiday photo.jpg", &defaults()), "my holiday photo.jpg");
    }

    #[test]
    fn test_empty_name_falls_back() {
        assert_eq!(sanitize("", &defaults()), "file");
        assert_eq!(sanitize("   ", &defaults()), "file");
        assert_eq!(sanitize("???", &defaults()), "file");
    }

    #[test]
    fn test_leading_dot_is_prefixed() {
        assert_eq!(sanitize(".txt", &defaults()), "file.txt");
        assert_eq!(sanitize("..txt", &defaults()), "file..txt");
    }

    #[rstest]
    #[case("CON")]
    #[case("con")]
    #[case("Con")]
    #[case("PRN")]
    #[case("AUX")]
    #[case("NUL")]
    #[case("COM1")]
    #[case("COM9")]
    #[case("LPT1")]
    #[case("lpt9")]
    fn test_windows_reserved_names_fall_back(#[case] name: &str) {
        assert_eq!(sanitize(name, &defaults()), "file");
    }

    #[test]
    fn test_reserved_name_with_extension_is_kept() {
        assert_eq!(sanitize("CON.txt", &defaults()), "CON.txt");
    }

    #[test]
    fn test_unsafe_characters_are_stripped() {
        assert_eq!(sanitize("a/b\\c:d*e?f\"g<h>i|j", &defaults()), "abcdefghij");
        assert_eq!(sanitize("tab\there.txt", &defaults()), "tab here.txt");
        assert_eq!(sanitize("null\u{0}byte", &defaults()), "nullbyte");
    }

    #[test]
    fn test_whitespace_is_collapsed() {
        assert_eq!(sanitize("  spaced   out  name  ", &defaults()), "spaced out name");
        // Removal of unsafe chars joins the two runs either side of them.
        assert_eq!(sanitize("a \u{1}\u{2} b", &defaults()), "a b");
    }

    #[test]
    fn test_non_ascii_is_preserved() {
        assert_eq!(sanitize("日本語.pdf", &defaults()), "日本語.pdf");
        assert_eq!(sanitize("résumé.doc", &defaults()), "résumé.doc");
    }

    #[test]
    fn test_truncation_to_255_chars() {
        let long = format!("a{}", "Z".repeat(400));
        assert_eq!(sanitize(&long, &defaults()).chars().count(), 255);
    }

    #[test]
    fn test_padding_reserves_room() {
        let long = "Z".repeat(400);
        let opts = defaults().with_padding(10);
        assert_eq!(sanitize(&long, &opts).chars().count(), 245);
    }

    #[test]
    fn test_custom_fallback() {
        let opts = defaults().with_fallback("image");
        assert_eq!(sanitize("", &opts), "image");
        assert_eq!(sanitize(".png", &opts), "image.png");
    }

    #[test]
    fn test_content_disposition_inline() {
        assert_eq!(
            content_disposition_with("inline", "test.txt", &defaults()),
            "inline; filename=\"test.txt\""
        );
    }

    #[test]
    fn test_content_disposition_attachment() {
        assert_eq!(
            content_disposition_with("attachment", "report.pdf", &defaults()),
            "attachment; filename=\"report.pdf\""
        );
    }

    #[rstest]
    #[case("bogus")]
    #[case("attachments")]
    #[case("INLINE")]
    #[case("")]
    fn test_unknown_disposition_defaults_to_inline(#[case] kind: &str) {
        let disposition = content_disposition_with(kind, "x", &defaults());
        assert!(disposition.starts_with("inline"));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    // Sanitized names never exceed the filesystem limit, never contain an
    // unsafe character, and are never empty.
    proptest! {
        #[test]
        fn prop_sanitized_name_is_safe(name in ".*") {
            let sanitized = sanitize(&name, &SanitizeOptions::default());

            prop_assert!(sanitized.chars().count() <= 255 + "file".len());
            prop_assert!(!sanitized.is_empty());
            for c in sanitized.chars() {
                prop_assert!(!c.is_control(), "control char survived: {c:?}");
                prop_assert!(!UNSAFE_CHARS.contains(&c), "unsafe char survived: {c:?}");
            }
        }
    }

    // With the default fallback, a sanitized name never starts with a dot.
    proptest! {
        #[test]
        fn prop_no_leading_dot(name in ".*") {
            let sanitized = sanitize(&name, &SanitizeOptions::default());
            prop_assert!(!sanitized.starts_with('.'));
        }
    }

    // Sanitization is idempotent for names that need no fallback.
    proptest! {
        #[test]
        fn prop_sanitize_is_idempotent(name in "[a-zA-Z0-9 ._-]{1,100}") {
            let opts = SanitizeOptions::default();
            let once = sanitize(&name, &opts);
            let twice = sanitize(&once, &opts);
            prop_assert_eq!(once, twice);
        }
    }
}
