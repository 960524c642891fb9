//! Pure string transformations applied when a release is adopted.
//!
//! Download URLs and in-archive paths embed a `<version>-<hash>` token, e.g.
//! `bith-linux-amd64-1.4.2-abc12345.tar.gz`. These helpers find and rewrite
//! that token without touching the rest of the string.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::{NoExpand, Regex};
use semver::Version;

use crate::version::is_bare_version;

/// Length of the short commit identifier embedded in asset names.
pub const SHORT_HASH_LEN: usize = 8;

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+\.\d+\.\d+-[A-Za-z0-9]{8}").unwrap())
}

/// Returns true if `text` carries a `<version>-<hash>` token.
pub fn has_version_token(text: &str) -> bool {
    token_pattern().is_match(text)
}

/// Replace the first `<version>-<hash>` token in `text`.
///
/// Returns the input unchanged (borrowed) when no token is present.
pub fn rewrite_version_token<'a>(text: &'a str, version: &Version, hash: &str) -> Cow<'a, str> {
    let replacement = format!("{}-{}", version, hash);
    token_pattern().replacen(text, 1, NoExpand(&replacement))
}

/// Truncate a full commit id to the short form used in asset names.
///
/// Returns `None` if the id is shorter than the short form or is not
/// alphanumeric.
pub fn short_hash(sha: &str) -> Option<String> {
    let sha = sha.trim();
    let short: String = sha.chars().take(SHORT_HASH_LEN).collect();
    if short.len() == SHORT_HASH_LEN && short.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(short)
    } else {
        None
    }
}

/// Trailing path segment of a URL, without query or fragment.
pub fn asset_name(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    let path = &url[..end];
    path.rsplit('/').next().unwrap_or(path)
}

/// Point the expected sanity output at a new version.
///
/// Every line that is a bare version is replaced; if there is none, the
/// version is appended.
pub fn update_sanity_output(lines: &mut Vec<String>, version: &Version) {
    let mut replaced = false;
    for line in lines.iter_mut().filter(|l| is_bare_version(l)) {
        *line = version.to_string();
        replaced = true;
    }
    if !replaced {
        lines.push(version.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_url_and_bin_path() {
        let v = Version::new(1, 5, 0);
        assert_eq!(
            rewrite_version_token(
                "https://builds.example.com/bith-linux-amd64-1.4.2-abc12345.tar.gz",
                &v,
                "def67890"
            ),
            "https://builds.example.com/bith-linux-amd64-1.5.0-def67890.tar.gz"
        );
        assert_eq!(
            rewrite_version_token("bith-linux-amd64-1.4.2-abc12345/bith", &v, "def67890"),
            "bith-linux-amd64-1.5.0-def67890/bith"
        );
    }

    #[test]
    fn test_rewrite_multi_digit_components() {
        let v = Version::new(10, 20, 300);
        assert_eq!(
            rewrite_version_token("node-1.10.99-0a1b2c3d.zip", &v, "ffffffff"),
            "node-10.20.300-ffffffff.zip"
        );
    }

    #[test]
    fn test_rewrite_absent_token_is_untouched() {
        let v = Version::new(1, 5, 0);
        let text = "https://builds.example.com/bith-latest.tar.gz";
        let out = rewrite_version_token(text, &v, "def67890");
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(out, text);
        assert!(!has_version_token(text));
    }

    #[test]
    fn test_rewrite_only_first_token() {
        let v = Version::new(2, 0, 0);
        assert_eq!(
            rewrite_version_token("a-1.0.0-aaaaaaaa/b-1.0.0-bbbbbbbb", &v, "cccccccc"),
            "a-2.0.0-cccccccc/b-1.0.0-bbbbbbbb"
        );
    }

    #[test]
    fn test_short_hash() {
        assert_eq!(
            short_hash("def67890a1b2c3d4e5f6").as_deref(),
            Some("def67890")
        );
        assert_eq!(short_hash("abc"), None);
        assert_eq!(short_hash("abc-1234zz"), None);
    }

    #[test]
    fn test_asset_name() {
        assert_eq!(
            asset_name("https://x.example.com/builds/bith-1.5.0-def67890.tar.gz"),
            "bith-1.5.0-def67890.tar.gz"
        );
        assert_eq!(
            asset_name("https://x.example.com/b/bith.zip?sig=abc/def"),
            "bith.zip"
        );
        assert_eq!(asset_name("bith.tar.gz"), "bith.tar.gz");
    }

    #[test]
    fn test_update_sanity_output_replaces_version_line() {
        let mut lines = vec!["Bith".to_string(), "1.4.2".to_string()];
        update_sanity_output(&mut lines, &Version::new(1, 5, 0));
        assert_eq!(lines, vec!["Bith", "1.5.0"]);
    }

    #[test]
    fn test_update_sanity_output_appends_when_missing() {
        let mut lines = vec!["Bith".to_string()];
        update_sanity_output(&mut lines, &Version::new(1, 5, 0));
        assert_eq!(lines, vec!["Bith", "1.5.0"]);
    }
}
