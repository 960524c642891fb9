//! Three-component version extraction shared by the catalog and the updater.

use regex::Regex;
use semver::Version;
use std::sync::OnceLock;

/// Matches the first `major.minor.patch` run in a string.
fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d+)\.(\d+)\.(\d+)").unwrap())
}

/// Extract the first three-component version from arbitrary text.
///
/// Release tags look like `v1.5.0` or `Bith v1.5.0-stable`; anything around
/// the numbers is ignored, and pre-release or build suffixes are dropped so
/// that comparison is purely component-wise numeric.
pub fn extract_version(text: &str) -> Option<Version> {
    let caps = version_pattern().captures(text)?;
    let major = caps[1].parse().ok()?;
    let minor = caps[2].parse().ok()?;
    let patch = caps[3].parse().ok()?;
    Some(Version::new(major, minor, patch))
}

/// Returns true if `text` consists of exactly one three-component version.
pub fn is_bare_version(text: &str) -> bool {
    version_pattern()
        .find(text.trim())
        .is_some_and(|m| m.start() == 0 && m.end() == text.trim().len())
}
