use crate::manifest::MANIFEST_FILE;
use std::path::{Path, PathBuf};

/// Name of the project-local package directory.
pub const LOCAL_PACKAGES_DIR: &str = "nnp_packages";

/// Directory below a package root that holds host interpreter modules.
pub const HOST_MODULES_DIR: &str = ".modules";

/// Find the project root by walking up from `cwd` looking for `nnp.json` or `.git`.
///
/// Returns the first directory containing either marker, or `None` if neither is found.
#[must_use]
pub fn project_root(cwd: &Path) -> Option<PathBuf> {
    let mut current = cwd.to_path_buf();

    loop {
        if current.join(MANIFEST_FILE).exists() || current.join(".git").exists() {
            return Some(current);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Default global install prefix.
///
/// `~/.nnp`, or `.nnp` relative to the working directory when no home
/// directory can be determined.
#[must_use]
pub fn default_prefix() -> PathBuf {
    dirs_next::home_dir().map_or_else(|| PathBuf::from(".nnp"), |home| home.join(".nnp"))
}

/// Package directory below a prefix.
#[must_use]
pub fn prefix_packages_dir(prefix: &Path) -> PathBuf {
    prefix.join("packages")
}

/// Host module directory below a prefix.
#[must_use]
pub fn prefix_modules_dir(prefix: &Path) -> PathBuf {
    prefix.join("modules")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_project_root_with_manifest() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("c");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), "{}").unwrap();

        let root = project_root(&nested);
        assert_eq!(root, Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_project_root_with_git() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("src");
        fs::create_dir_all(&nested).unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();

        let root = project_root(&nested);
        assert_eq!(root, Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_default_prefix_is_dot_nnp() {
        assert!(default_prefix().ends_with(".nnp"));
    }

    #[test]
    fn test_prefix_dirs() {
        let prefix = Path::new("/opt/nnp");
        assert_eq!(prefix_packages_dir(prefix), Path::new("/opt/nnp/packages"));
        assert_eq!(prefix_modules_dir(prefix), Path::new("/opt/nnp/modules"));
    }
}
