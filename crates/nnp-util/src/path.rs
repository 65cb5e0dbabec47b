//! Posix-style module path helpers.
//!
//! Module names inside a package always use `/` as separator regardless of
//! the host platform, so these helpers operate on strings rather than
//! `std::path::Path`.

/// Directory part of a module name (`"lib/util"` -> `"lib"`, `"main"` -> `""`).
#[must_use]
pub fn dirname(name: &str) -> &str {
    name.rfind('/').map_or("", |pos| &name[..pos])
}

/// Join `rel` onto the directory `base` and normalize the result.
///
/// Returns `None` when the path climbs above the package root.
#[must_use]
pub fn join_module(base: &str, rel: &str) -> Option<String> {
    if rel.starts_with('/') || base.is_empty() {
        return normalize_module_path(rel);
    }
    normalize_module_path(&format!("{base}/{rel}"))
}

/// Collapse `.` and `..` segments and duplicate separators.
///
/// An empty result means the package root itself. Returns `None` when a
/// `..` segment would leave the package.
#[must_use]
pub fn normalize_module_path(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirname() {
        assert_eq!(dirname("lib/util"), "lib");
        assert_eq!(dirname("a/b/c"), "a/b");
        assert_eq!(dirname("main"), "");
    }

    #[test]
    fn test_normalize_collapses_dots() {
        assert_eq!(normalize_module_path("./a/./b"), Some("a/b".to_string()));
        assert_eq!(normalize_module_path("a/b/../c"), Some("a/c".to_string()));
        assert_eq!(normalize_module_path("a//b"), Some("a/b".to_string()));
    }

    #[test]
    fn test_normalize_root() {
        assert_eq!(normalize_module_path("."), Some(String::new()));
        assert_eq!(normalize_module_path("a/.."), Some(String::new()));
    }

    #[test]
    fn test_normalize_escape_is_rejected() {
        assert_eq!(normalize_module_path(".."), None);
        assert_eq!(normalize_module_path("a/../../b"), None);
    }

    #[test]
    fn test_join_module() {
        assert_eq!(join_module("lib", "./util"), Some("lib/util".to_string()));
        assert_eq!(join_module("lib", "../main"), Some("main".to_string()));
        assert_eq!(join_module("", "./main"), Some("main".to_string()));
        assert_eq!(join_module("", "../main"), None);
    }
}
