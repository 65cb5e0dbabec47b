//! Package addressing.
//!
//! Provides utilities for:
//! - Parsing semantic versions and version selectors (`~1.0.0`, `>=1.2.0 || 2.0.0`)
//! - Parsing package references (`@scope/name@selector/module:member`)
//! - Parsing dependency requirement lines from manifests
//! - Parsing external interpreter requirements (`name[extra]>=1.0`)

pub mod error;
pub mod requirement;
pub mod spec;
pub mod version;

pub use error::{codes, PkgError};
pub use requirement::{ExternalRequirement, Requirement, RequirementFlags};
pub use spec::{PackageName, PackageRef};
pub use version::{parse_version, Comparator, Op, Selector};

/// Parse a bare `[@scope/]name` package name.
///
/// # Errors
/// Returns `PKG_NAME_INVALID` if the text is not a bare package name.
pub fn parse_package(input: &str) -> Result<PackageName, PkgError> {
    PackageName::parse(input)
}
