use nnp_core::{CfgError, ManifestError, PkgError, Selector};
use semver::Version;
use thiserror::Error;

/// Boxed error returned by executors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Session errors.
///
/// None of these leave partial state behind: a failed package load registers
/// nothing and a failed execution leaves the module unexecuted.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("package \"{name}\" not found (selector \"{selector}\")")]
    PackageNotFound { name: String, selector: Selector },

    #[error("\"{name}@{loaded}\" is already loaded but \"{selector}\" was required")]
    DependencyMismatch {
        name: String,
        loaded: Version,
        selector: Selector,
    },

    #[error("{0}")]
    InvalidOperation(String),

    #[error(transparent)]
    InvalidReference(#[from] PkgError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("cyclic require of \"{module}\"")]
    CyclicRequire { module: String },

    #[error("executing \"{module}\" failed: {source}")]
    Execution {
        module: String,
        #[source]
        source: BoxError,
    },
}

impl SessionError {
    pub(crate) fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }
}

impl From<CfgError> for SessionError {
    fn from(err: CfgError) -> Self {
        Self::Manifest(ManifestError::Cfg(err))
    }
}
