use std::fmt::Write;

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns a formatted version string including build metadata if available.
#[must_use]
pub fn version_string() -> String {
    let mut s = format!("nnp {VERSION}");

    if let Some(hash) = option_env!("NNP_BUILD_GIT_HASH") {
        let _ = write!(s, " ({hash})");
    }

    s
}

/// The running version as a comparable semantic version.
///
/// Bound to the `nnp` variable of `cfg(...)` predicates.
#[must_use]
pub fn running_version() -> Option<semver::Version> {
    semver::Version::parse(VERSION).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_not_empty() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_version_string_contains_version() {
        let vs = version_string();
        assert!(vs.contains(VERSION));
        assert!(vs.starts_with("nnp "));
    }

    #[test]
    fn test_running_version_parses() {
        let version = running_version().unwrap();
        assert_eq!(version.to_string(), VERSION);
    }
}
