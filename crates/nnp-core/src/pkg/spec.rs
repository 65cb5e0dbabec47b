//! Package reference parsing.
//!
//! Parses references like:
//! - `foobar`
//! - `@spekklez/foobar`
//! - `@spekklez/foobar@1.6.4`
//! - `spam@~1.0.0/main`
//! - `spam@~1.0.0/main:run`
//! - `spam:run`

use super::error::PkgError;
use super::version::Selector;
use std::fmt;
use std::str::FromStr;

/// A package name, optionally scoped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageName {
    /// Scope without the `@` prefix, if scoped.
    pub scope: Option<String>,
    /// Unscoped package name.
    pub name: String,
}

impl PackageName {
    /// Parse `[@scope/]name`. Versions, module paths and members are rejected.
    ///
    /// # Errors
    /// Returns `PKG_NAME_INVALID` if the text is not a bare package name.
    pub fn parse(input: &str) -> Result<Self, PkgError> {
        let text = input.trim();
        let invalid = |reason: String| PkgError::name_invalid(input, reason);
        let (scope, rest) = split_scope(text).map_err(invalid)?;
        validate_name(rest).map_err(invalid)?;
        Ok(Self {
            scope,
            name: rest.to_string(),
        })
    }

    /// Check if this is a scoped package.
    #[must_use]
    pub fn is_scoped(&self) -> bool {
        self.scope.is_some()
    }

    /// Full name including the scope (`@scope/name` or `name`).
    #[must_use]
    pub fn full_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref scope) = self.scope {
            write!(f, "@{scope}/")?;
        }
        f.write_str(&self.name)
    }
}

impl FromStr for PackageName {
    type Err = PkgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A parsed package reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageRef {
    /// The referenced package.
    pub package: PackageName,
    /// Version selector after `@`.
    pub selector: Option<Selector>,
    /// Module path inside the package after `/`.
    pub module: Option<String>,
    /// Member of the module after `:`.
    pub member: Option<String>,
}

impl PackageRef {
    /// Parse a reference string.
    ///
    /// # Errors
    /// Returns `PKG_REF_INVALID` if the text is empty, has no package name
    /// (`.`, `..`, `/`, `@`, `@/`), has a scope without `/name`, or contains
    /// a malformed selector, module path or member.
    pub fn parse(input: &str) -> Result<Self, PkgError> {
        let text = input.trim();
        let invalid = |reason: String| PkgError::ref_invalid(input, reason);
        let (scope, rest) = split_scope(text).map_err(invalid)?;

        let end = rest.find(['@', '/', ':']).unwrap_or(rest.len());
        let name = &rest[..end];
        validate_name(name).map_err(invalid)?;
        let mut rest = &rest[end..];

        let mut selector = None;
        if let Some(body) = rest.strip_prefix('@') {
            let end = body.find(['/', ':']).unwrap_or(body.len());
            let text = &body[..end];
            if text.trim().is_empty() {
                return Err(PkgError::ref_invalid(input, "empty version selector"));
            }
            let parsed = Selector::parse(text)
                .map_err(|e| PkgError::ref_invalid(input, e.message()))?;
            selector = Some(parsed);
            rest = &body[end..];
        }

        let mut module = None;
        if let Some(body) = rest.strip_prefix('/') {
            let end = body.find(':').unwrap_or(body.len());
            let path = &body[..end];
            validate_module_path(path, input)?;
            module = Some(path.to_string());
            rest = &body[end..];
        }

        let mut member = None;
        if let Some(body) = rest.strip_prefix(':') {
            validate_member(body, input)?;
            member = Some(body.to_string());
            rest = "";
        }

        if !rest.is_empty() {
            return Err(PkgError::ref_invalid(
                input,
                format!("unexpected '{rest}' after reference"),
            ));
        }

        Ok(Self {
            package: PackageName {
                scope,
                name: name.to_string(),
            },
            selector,
            module,
            member,
        })
    }

    /// Scope of the referenced package.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.package.scope.as_deref()
    }

    /// Unscoped name of the referenced package.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.package.name
    }

    /// Full package name (`@scope/name` or `name`).
    #[must_use]
    pub fn package_name(&self) -> String {
        self.package.full_name()
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.package)?;
        if let Some(ref selector) = self.selector {
            write!(f, "@{selector}")?;
        }
        if let Some(ref module) = self.module {
            write!(f, "/{module}")?;
        }
        if let Some(ref member) = self.member {
            write!(f, ":{member}")?;
        }
        Ok(())
    }
}

impl FromStr for PackageRef {
    type Err = PkgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Split an optional `@scope/` prefix off `text`. Errors carry the reason only.
fn split_scope(text: &str) -> Result<(Option<String>, &str), String> {
    if text.is_empty() {
        return Err("empty reference".to_string());
    }

    let Some(after_at) = text.strip_prefix('@') else {
        return Ok((None, text));
    };

    let Some(slash_pos) = after_at.find('/') else {
        return Err("scope without '/name'".to_string());
    };

    let scope = &after_at[..slash_pos];
    if scope.is_empty() {
        return Err("empty scope".to_string());
    }
    if !is_name(scope) {
        return Err(format!("invalid scope '{scope}'"));
    }

    Ok((Some(scope.to_string()), &after_at[slash_pos + 1..]))
}

/// `[A-Za-z0-9_][A-Za-z0-9_.-]*`
fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("missing package name".to_string());
    }
    if !is_name(name) {
        return Err(format!("invalid package name '{name}'"));
    }
    Ok(())
}

fn validate_module_path(path: &str, input: &str) -> Result<(), PkgError> {
    if path.is_empty() {
        return Err(PkgError::ref_invalid(input, "empty module path"));
    }
    if path.starts_with('@') {
        return Err(PkgError::ref_invalid(
            input,
            format!("module path '{path}' must not start with '@'"),
        ));
    }
    for segment in path.split('/') {
        if segment == "." || segment == ".." || !is_name(segment) {
            return Err(PkgError::ref_invalid(
                input,
                format!("invalid module path '{path}'"),
            ));
        }
    }
    Ok(())
}

fn validate_member(member: &str, input: &str) -> Result<(), PkgError> {
    let mut chars = member.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(PkgError::ref_invalid(
            input,
            format!("invalid member '{member}'"),
        ));
    }
    Ok(())
}
