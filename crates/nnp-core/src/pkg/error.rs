//! Package error types.

use std::fmt;
use std::path::Path;

/// Package error codes.
pub mod codes {
    pub const PKG_VERSION_INVALID: &str = "PKG_VERSION_INVALID";
    pub const PKG_SELECTOR_INVALID: &str = "PKG_SELECTOR_INVALID";
    pub const PKG_REF_INVALID: &str = "PKG_REF_INVALID";
    pub const PKG_NAME_INVALID: &str = "PKG_NAME_INVALID";
    pub const PKG_REQUIREMENT_INVALID: &str = "PKG_REQUIREMENT_INVALID";
    pub const PKG_MANIFEST_INVALID: &str = "PKG_MANIFEST_INVALID";
    pub const PKG_MANIFEST_NOT_FOUND: &str = "PKG_MANIFEST_NOT_FOUND";
}

/// Package error.
///
/// Parse-time failures of user or manifest input. The offending text is
/// always part of the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkgError {
    code: &'static str,
    message: String,
}

impl PkgError {
    /// Create a new error with the given code and message.
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Get the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Create a version invalid error.
    #[must_use]
    pub fn version_invalid(input: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            codes::PKG_VERSION_INVALID,
            format!("Invalid version '{input}': {reason}"),
        )
    }

    /// Create a selector invalid error.
    #[must_use]
    pub fn selector_invalid(input: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            codes::PKG_SELECTOR_INVALID,
            format!("Invalid version selector '{input}': {reason}"),
        )
    }

    /// Create a reference invalid error.
    #[must_use]
    pub fn ref_invalid(input: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            codes::PKG_REF_INVALID,
            format!("Invalid reference '{input}': {reason}"),
        )
    }

    /// Create a package name invalid error.
    #[must_use]
    pub fn name_invalid(input: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            codes::PKG_NAME_INVALID,
            format!("Invalid package name '{input}': {reason}"),
        )
    }

    /// Create a requirement invalid error.
    #[must_use]
    pub fn requirement_invalid(input: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            codes::PKG_REQUIREMENT_INVALID,
            format!("Invalid requirement '{input}': {reason}"),
        )
    }

    /// Create a manifest invalid error.
    #[must_use]
    pub fn manifest_invalid(message: impl Into<String>) -> Self {
        Self::new(codes::PKG_MANIFEST_INVALID, message)
    }

    /// Create a manifest not found error.
    #[must_use]
    pub fn manifest_not_found(path: &Path) -> Self {
        Self::new(
            codes::PKG_MANIFEST_NOT_FOUND,
            format!("Manifest not found: {}", path.display()),
        )
    }
}

impl fmt::Display for PkgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PkgError {}
