//! Dependency requirement lines.
//!
//! A requirement line is what a manifest's `dependencies` map holds per
//! package:
//!
//! ```text
//! [--flag ...] [--registry=URL] [name@](selector | ./path | /abs/path | git+URL)
//! ```

use super::error::PkgError;
use super::spec::PackageName;
use super::version::Selector;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Per-requirement install flags.
///
/// `None` means "not specified here"; such flags may be inherited from a
/// parent requirement with [`RequirementFlags::inherit`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RequirementFlags {
    pub pure: Option<bool>,
    pub internal: Option<bool>,
    pub link: Option<bool>,
    pub optional: Option<bool>,
    pub recursive: Option<bool>,
}

impl RequirementFlags {
    /// Flag names in rendering order.
    pub const NAMES: [&'static str; 5] = ["pure", "internal", "link", "optional", "recursive"];

    fn slot_mut(&mut self, name: &str) -> Option<&mut Option<bool>> {
        match name {
            "pure" => Some(&mut self.pure),
            "internal" => Some(&mut self.internal),
            "link" => Some(&mut self.link),
            "optional" => Some(&mut self.optional),
            "recursive" => Some(&mut self.recursive),
            _ => None,
        }
    }

    fn get(&self, name: &str) -> Option<bool> {
        match name {
            "pure" => self.pure,
            "internal" => self.internal,
            "link" => self.link,
            "optional" => self.optional,
            "recursive" => self.recursive,
            _ => None,
        }
    }

    /// Fill every unset flag from `parent`.
    pub fn inherit(&mut self, parent: &RequirementFlags) {
        self.pure = self.pure.or(parent.pure);
        self.internal = self.internal.or(parent.internal);
        self.link = self.link.or(parent.link);
        self.optional = self.optional.or(parent.optional);
        self.recursive = self.recursive.or(parent.recursive);
    }

    /// Check whether a flag is explicitly enabled.
    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.get(name) == Some(true)
    }
}

/// A dependency on another package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Resolved through a package registry by version selector.
    Registry {
        name: Option<String>,
        selector: Selector,
        registry: Option<String>,
        flags: RequirementFlags,
    },
    /// A package directory on the local filesystem.
    Path {
        name: Option<String>,
        path: String,
        flags: RequirementFlags,
    },
    /// A git repository (URL without the `git+` prefix).
    Git {
        name: Option<String>,
        url: String,
        flags: RequirementFlags,
    },
}

impl Requirement {
    /// Parse a full requirement line, including an optional `name@` prefix.
    ///
    /// # Errors
    /// Returns `PKG_REQUIREMENT_INVALID` on unknown flags or options, a
    /// dangling flag with nothing after it, a malformed name or selector, or
    /// `--registry` on a path or git requirement.
    pub fn parse(line: &str) -> Result<Self, PkgError> {
        parse_line(line, None)
    }

    /// Parse the value half of a `dependencies` entry; `name` is the key.
    ///
    /// An `@` in the line is not treated as a name separator.
    ///
    /// # Errors
    /// Same as [`Requirement::parse`].
    pub fn parse_named(name: &str, line: &str) -> Result<Self, PkgError> {
        parse_line(line, Some(name))
    }

    /// Name of the required package, if known.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Registry { name, .. } | Self::Path { name, .. } | Self::Git { name, .. } => {
                name.as_deref()
            }
        }
    }

    #[must_use]
    pub fn flags(&self) -> &RequirementFlags {
        match self {
            Self::Registry { flags, .. } | Self::Path { flags, .. } | Self::Git { flags, .. } => {
                flags
            }
        }
    }

    pub fn flags_mut(&mut self) -> &mut RequirementFlags {
        match self {
            Self::Registry { flags, .. } | Self::Path { flags, .. } | Self::Git { flags, .. } => {
                flags
            }
        }
    }

    /// Fill unset flags from a parent requirement.
    pub fn inherit(&mut self, parent: &Requirement) {
        let parent_flags = *parent.flags();
        self.flags_mut().inherit(&parent_flags);
    }

    /// The version selector, for registry requirements.
    #[must_use]
    pub fn selector(&self) -> Option<&Selector> {
        match self {
            Self::Registry { selector, .. } => Some(selector),
            _ => None,
        }
    }

    /// Check if this requirement is resolved through a registry.
    #[must_use]
    pub fn is_registry(&self) -> bool {
        matches!(self, Self::Registry { .. })
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = self.flags();
        for flag in RequirementFlags::NAMES {
            if flags.is_set(flag) {
                write!(f, "--{flag} ")?;
            }
        }
        if let Self::Registry {
            registry: Some(registry),
            ..
        } = self
        {
            write!(f, "--registry={registry} ")?;
        }
        if let Some(name) = self.name() {
            write!(f, "{name}@")?;
        }
        match self {
            Self::Registry { selector, .. } => write!(f, "{selector}"),
            Self::Path { path, .. } => f.write_str(path),
            Self::Git { url, .. } => write!(f, "git+{url}"),
        }
    }
}

impl FromStr for Requirement {
    type Err = PkgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_line(input: &str, known_name: Option<&str>) -> Result<Requirement, PkgError> {
    let mut line = input.trim();
    let mut flags = RequirementFlags::default();
    let mut registry = None;

    while let Some(after) = line.strip_prefix("--") {
        let Some(end) = after.find(char::is_whitespace) else {
            return Err(PkgError::requirement_invalid(
                input,
                "flag without a requirement",
            ));
        };
        let token = &after[..end];
        match token.split_once('=') {
            Some(("registry", value)) if !value.is_empty() => {
                registry = Some(value.to_string());
            }
            Some((option, _)) => {
                return Err(PkgError::requirement_invalid(
                    input,
                    format!("invalid option \"{option}\""),
                ));
            }
            None => match flags.slot_mut(token) {
                Some(slot) => *slot = Some(true),
                None => {
                    return Err(PkgError::requirement_invalid(
                        input,
                        format!("invalid flag \"{token}\""),
                    ));
                }
            },
        }
        line = after[end..].trim_start();
    }

    let mut name = known_name.map(str::to_string);
    if known_name.is_none() {
        if let Some((left, right)) = split_name(line) {
            let parsed = PackageName::parse(left)
                .map_err(|e| PkgError::requirement_invalid(input, e.message()))?;
            name = Some(parsed.full_name());
            line = right.trim_end();
        }
    }

    if line.is_empty() {
        return Err(PkgError::requirement_invalid(
            input,
            "missing selector, path or git URL",
        ));
    }

    let requirement = if let Some(url) = line.strip_prefix("git+") {
        if url.is_empty() {
            return Err(PkgError::requirement_invalid(input, "empty git URL"));
        }
        Requirement::Git {
            name,
            url: url.to_string(),
            flags,
        }
    } else if is_path(line) {
        Requirement::Path {
            name,
            path: line.to_string(),
            flags,
        }
    } else {
        let selector = Selector::parse(line)
            .map_err(|e| PkgError::requirement_invalid(input, e.message()))?;
        return Ok(Requirement::Registry {
            name,
            selector,
            registry,
            flags,
        });
    };

    if registry.is_some() {
        return Err(PkgError::requirement_invalid(
            input,
            "--registry can only be specified for dependencies resolved in a registry",
        ));
    }
    Ok(requirement)
}

/// Split `name@rest`, skipping the `@` of a scope and leaving git URLs alone.
fn split_name(line: &str) -> Option<(&str, &str)> {
    if line.starts_with("git+") {
        return None;
    }
    let search_from = usize::from(line.starts_with('@'));
    let at = line[search_from..].find('@')? + search_from;
    Some((&line[..at], &line[at + 1..]))
}

fn is_path(s: &str) -> bool {
    s.starts_with("./")
        || s.starts_with(".\\")
        || s.starts_with("../")
        || s.starts_with("..\\")
        || s.starts_with('/')
        || Path::new(s).is_absolute()
}

/// A requirement on a package of the external interpreter's ecosystem.
///
/// `name[extra,...]specifier`, e.g. `requests[security]>=2.0,<3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalRequirement {
    pub name: String,
    pub extras: Vec<String>,
    /// Version specifier clauses, comma separated. Empty means any version.
    pub specifier: String,
}

const EXTERNAL_OPERATORS: [&str; 8] = ["===", "==", "!=", "~=", "<=", ">=", "<", ">"];

impl ExternalRequirement {
    /// Parse an external requirement.
    ///
    /// # Errors
    /// Returns `PKG_REQUIREMENT_INVALID` on a missing or malformed name,
    /// an unclosed extras list, or a malformed specifier clause.
    pub fn parse(input: &str) -> Result<Self, PkgError> {
        let text = input.trim();

        let end = text
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
            .unwrap_or(text.len());
        let name = &text[..end];
        if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return Err(PkgError::requirement_invalid(input, "missing package name"));
        }
        let mut rest = text[end..].trim_start();

        let mut extras = Vec::new();
        if let Some(body) = rest.strip_prefix('[') {
            let Some(close) = body.find(']') else {
                return Err(PkgError::requirement_invalid(input, "unclosed extras list"));
            };
            for extra in body[..close].split(',').map(str::trim) {
                if extra.is_empty()
                    || !extra
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
                {
                    return Err(PkgError::requirement_invalid(
                        input,
                        format!("invalid extra '{extra}'"),
                    ));
                }
                extras.push(extra.to_string());
            }
            rest = body[close + 1..].trim_start();
        }

        let specifier = rest.trim_end();
        if !specifier.is_empty() {
            for clause in specifier.split(',').map(str::trim) {
                validate_external_clause(clause)
                    .map_err(|reason| PkgError::requirement_invalid(input, reason))?;
            }
        }

        Ok(Self {
            name: name.to_string(),
            extras,
            specifier: specifier.to_string(),
        })
    }
}

fn validate_external_clause(clause: &str) -> Result<(), String> {
    let Some(op) = EXTERNAL_OPERATORS.iter().find(|op| clause.starts_with(**op)) else {
        return Err(format!("specifier clause '{clause}' has no operator"));
    };
    let version = clause[op.len()..].trim();
    let valid = !version.is_empty()
        && version
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '*' | '+' | '!' | '-' | '_'));
    if valid {
        Ok(())
    } else {
        Err(format!("invalid version in specifier clause '{clause}'"))
    }
}

impl fmt::Display for ExternalRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.extras.is_empty() {
            write!(f, "[{}]", self.extras.join(","))?;
        }
        f.write_str(&self.specifier)
    }
}

impl FromStr for ExternalRequirement {
    type Err = PkgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
