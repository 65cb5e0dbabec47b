//! Package manifests (`nnp.json`).
//!
//! A manifest is an insertion-ordered JSON object. Besides plain fields it
//! may carry conditional fields, either as a block or inline:
//!
//! ```json
//! {
//!   "name": "spam",
//!   "version": "1.0.0",
//!   "dependencies": { "eggs": "~1.2.0" },
//!   "cfg(dev)": { "dependencies": { "ham": "^0.3.0" } },
//!   "cfg(prod).main": "dist/index"
//! }
//! ```

pub mod fields;
pub mod validate;

pub use fields::{
    compute_effective, effective_dependencies, iter_fields, iter_named, parse_dependencies,
    FieldEntry,
};
pub use validate::{validate, FieldReport, Validator, ValidatorRegistry, CATEGORIES};

use crate::cfg::{CfgContext, CfgError, PredicateCache};
use crate::pkg::{codes, parse_version, PackageName, PkgError, Requirement};
use semver::Version;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Manifest file name inside a package directory.
pub const MANIFEST_FILE: &str = "nnp.json";

/// Module loaded when a reference names no module path.
pub const DEFAULT_MAIN: &str = "index";

/// Manifest errors.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read manifest at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifest at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Pkg(#[from] PkgError),

    #[error(transparent)]
    Cfg(#[from] CfgError),
}

impl ManifestError {
    /// Stable error code for reporting.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Pkg(e) => e.code(),
            Self::Read { .. } | Self::Parse { .. } | Self::Cfg(_) => codes::PKG_MANIFEST_INVALID,
        }
    }
}

/// A parsed manifest document and the directory it was loaded from.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    document: Map<String, Value>,
    directory: Option<PathBuf>,
}

impl Manifest {
    /// Wrap an already parsed JSON document.
    ///
    /// # Errors
    /// Returns `PKG_MANIFEST_INVALID` if the value is not a JSON object.
    pub fn from_value(value: Value, directory: Option<PathBuf>) -> Result<Self, ManifestError> {
        match value {
            Value::Object(document) => Ok(Self {
                document,
                directory,
            }),
            other => Err(PkgError::manifest_invalid(format!(
                "manifest must be a JSON object, got {}",
                json_type(&other)
            ))
            .into()),
        }
    }

    /// Parse manifest JSON text.
    ///
    /// # Errors
    /// Returns `PKG_MANIFEST_INVALID` on malformed JSON or a non-object root.
    pub fn parse(text: &str, directory: Option<PathBuf>) -> Result<Self, ManifestError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| PkgError::manifest_invalid(format!("Invalid JSON: {e}")))?;
        Self::from_value(value, directory)
    }

    /// Load a manifest file. The directory is the file's absolute parent.
    ///
    /// # Errors
    /// Returns `PKG_MANIFEST_NOT_FOUND` if the file does not exist, or a
    /// read/parse error.
    pub fn from_path(path: &Path) -> Result<Self, ManifestError> {
        if !path.is_file() {
            return Err(PkgError::manifest_not_found(path).into());
        }
        let content = nnp_util::fs::read_to_string_lossy(path).map_err(|source| {
            ManifestError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let value: Value =
            serde_json::from_str(&content).map_err(|source| ManifestError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let directory = nnp_util::fs::containing_dir(path).map_err(|source| {
            ManifestError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Self::from_value(value, Some(directory))
    }

    /// Load `<dir>/nnp.json`.
    ///
    /// # Errors
    /// Same as [`Manifest::from_path`].
    pub fn from_dir(dir: &Path) -> Result<Self, ManifestError> {
        Self::from_path(&dir.join(MANIFEST_FILE))
    }

    #[must_use]
    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }

    /// Directory the manifest was loaded from, if any.
    #[must_use]
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.document.get(field)
    }

    /// The top-level `name` field.
    ///
    /// # Errors
    /// Returns `PKG_MANIFEST_INVALID` if missing or not a string, or
    /// `PKG_NAME_INVALID` if it is not a valid package name.
    pub fn name(&self) -> Result<PackageName, ManifestError> {
        let name = self.required_str("name")?;
        Ok(PackageName::parse(name)?)
    }

    /// The top-level `version` field.
    ///
    /// # Errors
    /// Returns `PKG_MANIFEST_INVALID` if missing or not a string, or
    /// `PKG_VERSION_INVALID` if it is not a semantic version.
    pub fn version(&self) -> Result<Version, ManifestError> {
        let version = self.required_str("version")?;
        Ok(parse_version(version)?)
    }

    /// `name@version`.
    ///
    /// # Errors
    /// Same as [`Manifest::name`] and [`Manifest::version`].
    pub fn identifier(&self) -> Result<String, ManifestError> {
        Ok(format!("{}@{}", self.name()?, self.version()?))
    }

    /// Default module path from the unconditional `main` field; `index`
    /// unless set. `cfg(...)` overrides are ignored here; read `main` from
    /// [`Manifest::effective`] to apply them.
    #[must_use]
    pub fn main(&self) -> &str {
        self.document
            .get("main")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_MAIN)
    }

    /// Effective fields for the given configuration.
    ///
    /// # Errors
    /// Returns a predicate error if a `cfg(...)` key fails to parse, or
    /// fails to evaluate in strict mode.
    pub fn effective(
        &self,
        cache: &PredicateCache,
        ctx: &mut CfgContext,
    ) -> Result<Map<String, Value>, CfgError> {
        compute_effective(&self.document, cache, ctx)
    }

    /// Active dependencies for the given configuration.
    ///
    /// # Errors
    /// Same as [`effective_dependencies`].
    pub fn dependencies(
        &self,
        cache: &PredicateCache,
        ctx: &mut CfgContext,
    ) -> Result<Vec<(String, Requirement)>, ManifestError> {
        effective_dependencies(&self.document, cache, ctx)
    }

    /// Run field validators over every entry, conditional ones included.
    #[must_use]
    pub fn validate(&self, registry: &ValidatorRegistry) -> Vec<FieldReport> {
        validate(&self.document, registry)
    }

    fn required_str(&self, field: &str) -> Result<&str, ManifestError> {
        match self.document.get(field) {
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(PkgError::manifest_invalid(format!(
                "'{field}' must be a string, got {}",
                json_type(other)
            ))
            .into()),
            None => Err(PkgError::manifest_invalid(format!("missing '{field}' field")).into()),
        }
    }
}

/// JSON type name for error messages.
pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_from_value_identity() {
        let manifest = Manifest::from_value(
            json!({"name": "@spekklez/foobar", "version": "1.6.4", "main": "lib/main"}),
            None,
        )
        .unwrap();
        assert_eq!(manifest.name().unwrap().full_name(), "@spekklez/foobar");
        assert_eq!(manifest.version().unwrap(), Version::new(1, 6, 4));
        assert_eq!(manifest.identifier().unwrap(), "@spekklez/foobar@1.6.4");
        assert_eq!(manifest.main(), "lib/main");
        assert_eq!(manifest.directory(), None);
    }

    #[test]
    fn test_main_defaults_to_index() {
        let manifest = Manifest::from_value(json!({"name": "spam"}), None).unwrap();
        assert_eq!(manifest.main(), DEFAULT_MAIN);
    }

    #[test]
    fn test_main_ignores_conditional_override() {
        let manifest = Manifest::from_value(
            json!({"name": "spam", "main": "lib/main", "cfg(prod).main": "dist/index"}),
            None,
        )
        .unwrap();
        assert_eq!(manifest.main(), "lib/main");

        let cache = PredicateCache::new();
        let mut ctx = CfgContext::new().with_var("prod", true);
        let effective = manifest.effective(&cache, &mut ctx).unwrap();
        assert_eq!(effective["main"], json!("dist/index"));
    }

    #[test]
    fn test_name_rejects_reference_syntax() {
        let manifest = Manifest::from_value(json!({"name": "spam@1.0.0"}), None).unwrap();
        assert_eq!(manifest.name().unwrap_err().code(), codes::PKG_NAME_INVALID);
    }

    #[test]
    fn test_non_object_rejected() {
        let err = Manifest::from_value(json!(["spam"]), None).unwrap_err();
        assert_eq!(err.code(), codes::PKG_MANIFEST_INVALID);
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn test_missing_fields() {
        let manifest = Manifest::from_value(json!({"version": 1}), None).unwrap();
        let err = manifest.name().unwrap_err();
        assert_eq!(err.code(), codes::PKG_MANIFEST_INVALID);
        let err = manifest.version().unwrap_err();
        assert!(err.to_string().contains("must be a string"));

        let manifest = Manifest::from_value(json!({"version": "1.0"}), None).unwrap();
        assert_eq!(
            manifest.version().unwrap_err().code(),
            codes::PKG_VERSION_INVALID
        );
    }

    #[test]
    fn test_from_path_records_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        fs::write(&path, r#"{"name": "spam", "version": "1.0.0"}"#).unwrap();

        let manifest = Manifest::from_path(&path).unwrap();
        assert_eq!(manifest.name().unwrap().name, "spam");
        assert_eq!(
            manifest.directory().unwrap().canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );

        let manifest = Manifest::from_dir(dir.path()).unwrap();
        assert_eq!(manifest.identifier().unwrap(), "spam@1.0.0");
    }

    #[test]
    fn test_from_path_errors() {
        let dir = tempdir().unwrap();
        let err = Manifest::from_dir(dir.path()).unwrap_err();
        assert_eq!(err.code(), codes::PKG_MANIFEST_NOT_FOUND);

        let path = dir.path().join(MANIFEST_FILE);
        fs::write(&path, "{ not json").unwrap();
        let err = Manifest::from_path(&path).unwrap_err();
        assert!(matches!(err, ManifestError::Parse { .. }));
        assert_eq!(err.code(), codes::PKG_MANIFEST_INVALID);
    }

    #[test]
    fn test_declaration_order_preserved() {
        let manifest = Manifest::parse(r#"{"z": 1, "a": 2, "m": 3}"#, None).unwrap();
        let keys: Vec<&str> = manifest.document().keys().map(String::as_str).collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }
}
