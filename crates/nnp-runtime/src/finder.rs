//! Package finders.
//!
//! A finder maps a package name and version selector to a manifest. The
//! session asks its finders in order and the first hit wins.

use crate::error::SessionError;
use nnp_core::{Manifest, PackageName, Selector, MANIFEST_FILE};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Locates package manifests.
pub trait Finder: fmt::Debug {
    /// Find a manifest for `name` whose version satisfies `selector`.
    ///
    /// # Errors
    /// Returns `SessionError::PackageNotFound` on a miss so the next finder
    /// is consulted. Any other error aborts the lookup.
    fn find_package(&self, name: &str, selector: &Selector) -> Result<Manifest, SessionError>;
}

fn not_found(name: &str, selector: &Selector) -> SessionError {
    SessionError::PackageNotFound {
        name: name.to_string(),
        selector: selector.clone(),
    }
}

/// Finds packages installed below one directory.
///
/// `spam` is looked up at `<dir>/spam/nnp.json`, `@scope/spam` at
/// `<dir>/@scope/spam/nnp.json`.
#[derive(Debug, Clone)]
pub struct DirectoryFinder {
    root: PathBuf,
}

impl DirectoryFinder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory a package would be installed in.
    pub fn package_dir(&self, name: &PackageName) -> PathBuf {
        match name.scope {
            Some(ref scope) => self.root.join(format!("@{scope}")).join(&name.name),
            None => self.root.join(&name.name),
        }
    }
}

impl Finder for DirectoryFinder {
    fn find_package(&self, name: &str, selector: &Selector) -> Result<Manifest, SessionError> {
        let parsed = PackageName::parse(name)?;
        let path = self.package_dir(&parsed).join(MANIFEST_FILE);
        if !path.is_file() {
            return Err(not_found(name, selector));
        }

        let manifest = Manifest::from_path(&path)?;
        let found = manifest.name()?.full_name();
        if found != name {
            return Err(SessionError::invalid_operation(format!(
                "{} declares package \"{found}\", expected \"{name}\"",
                path.display()
            )));
        }
        if !selector.matches(&manifest.version()?) {
            return Err(not_found(name, selector));
        }
        Ok(manifest)
    }
}

/// Finds packages among manifests registered in memory.
///
/// Several versions of one package may be registered; the highest one
/// satisfying the selector wins.
#[derive(Debug, Clone, Default)]
pub struct MemoryFinder {
    packages: HashMap<String, Vec<Manifest>>,
}

impl MemoryFinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a manifest under its declared name.
    ///
    /// # Errors
    /// Returns a manifest error if `name` or `version` is missing or invalid.
    pub fn add(&mut self, manifest: Manifest) -> Result<(), SessionError> {
        let name = manifest.name()?.full_name();
        manifest.version()?;
        self.packages.entry(name).or_default().push(manifest);
        Ok(())
    }

    /// Builder form of [`MemoryFinder::add`].
    ///
    /// # Errors
    /// Same as [`MemoryFinder::add`].
    pub fn with(mut self, manifest: Manifest) -> Result<Self, SessionError> {
        self.add(manifest)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.packages.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl Finder for MemoryFinder {
    fn find_package(&self, name: &str, selector: &Selector) -> Result<Manifest, SessionError> {
        let candidates = self.packages.get(name).map(Vec::as_slice).unwrap_or_default();
        // Versions were validated in `add`.
        let versions: Vec<_> = candidates
            .iter()
            .filter_map(|m| m.version().ok().map(|v| (v, m)))
            .collect();
        let best = selector
            .best_match(versions.iter().map(|(v, _)| v))
            .ok_or_else(|| not_found(name, selector))?;
        versions
            .iter()
            .find(|(v, _)| v == best)
            .map(|(_, m)| (*m).clone())
            .ok_or_else(|| not_found(name, selector))
    }
}
