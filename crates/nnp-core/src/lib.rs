#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

pub mod cfg;
pub mod config;
pub mod error;
pub mod manifest;
pub mod paths;
pub mod pkg;
pub mod version;

pub use cfg::{CfgContext, CfgError, CfgKey, CfgValue, EvalError, Predicate, PredicateCache};
pub use config::{Config, ConfigVar, Environment};
pub use error::Error;
pub use manifest::{
    compute_effective, effective_dependencies, iter_fields, parse_dependencies, validate,
    FieldEntry, FieldReport, Manifest, ManifestError, ValidatorRegistry, MANIFEST_FILE,
};
pub use pkg::{
    parse_package, parse_version, ExternalRequirement, PackageName, PackageRef, PkgError,
    Requirement, RequirementFlags, Selector,
};
pub use version::VERSION;
