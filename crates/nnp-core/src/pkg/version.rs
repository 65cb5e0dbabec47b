//! Versions and version selectors.
//!
//! Versions are strict semver (`MAJOR.MINOR.PATCH[-PRE][+BUILD]`). Selectors
//! are written like:
//! - `*`
//! - `1.6.4` (exact match, same as `=1.6.4` and `==1.6.4`)
//! - `~1.0.0`, `^1.0.0`
//! - `>=1.6.4`, `< 2.0.0`, `!=1.2.3`
//! - `>=1.0.0 <2.0.0` or `>=1.0.0, <2.0.0` (all must hold)
//! - `^1.0.0 || ^2.0.0` (any group may hold)

use super::error::PkgError;
use semver::Version;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Parse a strict semantic version.
///
/// # Errors
/// Returns `PKG_VERSION_INVALID` if the text is not `MAJOR.MINOR.PATCH` with
/// optional pre-release and build parts.
pub fn parse_version(input: &str) -> Result<Version, PkgError> {
    Version::parse(input.trim()).map_err(|e| PkgError::version_invalid(input, e))
}

/// Compare by semver precedence (build metadata is ignored).
fn precedence(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch)
        .cmp(&(b.major, b.minor, b.patch))
        .then_with(|| a.pre.cmp(&b.pre))
}

/// Comparison operator of a single comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// `1.0.0`, `=1.0.0` or `==1.0.0`
    Exact,
    /// `!=1.0.0`
    NotEqual,
    /// `<1.0.0`
    Less,
    /// `<=1.0.0`
    LessEq,
    /// `>1.0.0`
    Greater,
    /// `>=1.0.0`
    GreaterEq,
    /// `~1.2.3`: same minor release line
    Tilde,
    /// `^1.2.3`: compatible with the leftmost non-zero component
    Caret,
}

impl Op {
    /// Operator prefixes, longest first so `>=` wins over `>`.
    const PREFIXES: &'static [(&'static str, Op)] = &[
        (">=", Op::GreaterEq),
        ("<=", Op::LessEq),
        ("==", Op::Exact),
        ("!=", Op::NotEqual),
        (">", Op::Greater),
        ("<", Op::Less),
        ("=", Op::Exact),
        ("~", Op::Tilde),
        ("^", Op::Caret),
    ];

    /// Canonical textual prefix.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessEq => "<=",
            Self::Greater => ">",
            Self::GreaterEq => ">=",
            Self::Tilde => "~",
            Self::Caret => "^",
        }
    }

    fn split_prefix(token: &str) -> (Option<Op>, &str) {
        for (prefix, op) in Self::PREFIXES {
            if let Some(rest) = token.strip_prefix(prefix) {
                return (Some(*op), rest);
            }
        }
        (None, token)
    }
}

/// A single `op version` clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Comparator {
    pub op: Op,
    pub version: Version,
}

impl Comparator {
    /// Exclusive upper bound for `~` and `^`; `None` when the bump overflows.
    fn upper_bound(&self) -> Option<Version> {
        let v = &self.version;
        match self.op {
            Op::Tilde => Some(Version::new(v.major, v.minor.checked_add(1)?, 0)),
            Op::Caret if v.major > 0 => Some(Version::new(v.major.checked_add(1)?, 0, 0)),
            Op::Caret if v.minor > 0 => Some(Version::new(0, v.minor.checked_add(1)?, 0)),
            Op::Caret => Some(Version::new(0, 0, v.patch.checked_add(1)?)),
            _ => None,
        }
    }

    /// Test a version against this comparator alone.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        let ord = precedence(version, &self.version);
        match self.op {
            Op::Exact => ord == Ordering::Equal,
            Op::NotEqual => ord != Ordering::Equal,
            Op::Less => ord == Ordering::Less,
            Op::LessEq => ord != Ordering::Greater,
            Op::Greater => ord == Ordering::Greater,
            Op::GreaterEq => ord != Ordering::Less,
            Op::Tilde | Op::Caret => {
                ord != Ordering::Less
                    && match self.upper_bound() {
                        Some(upper) => precedence(version, &upper) == Ordering::Less,
                        None => true,
                    }
            }
        }
    }

    /// Whether this comparator opts the release line of `version` into
    /// pre-release matching.
    fn allows_prerelease_of(&self, version: &Version) -> bool {
        !self.version.pre.is_empty()
            && (self.version.major, self.version.minor, self.version.patch)
                == (version.major, version.minor, version.patch)
    }

    fn parse(token: &str, input: &str) -> Result<Self, PkgError> {
        let (op, rest) = Op::split_prefix(token);
        let version = Version::parse(rest)
            .map_err(|e| PkgError::selector_invalid(input, format!("'{token}': {e}")))?;
        Ok(Self {
            op: op.unwrap_or(Op::Exact),
            version,
        })
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.as_str(), self.version)
    }
}

/// A version selector.
///
/// Holds alternatives (OR) of comparator groups (AND). An empty group
/// matches every version, which is how `*` is represented.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector {
    alternatives: Vec<Vec<Comparator>>,
}

impl Selector {
    /// The selector that matches every version.
    #[must_use]
    pub fn any() -> Self {
        Self {
            alternatives: vec![Vec::new()],
        }
    }

    /// A selector matching exactly `version`.
    #[must_use]
    pub fn exact(version: Version) -> Self {
        Self {
            alternatives: vec![vec![Comparator {
                op: Op::Exact,
                version,
            }]],
        }
    }

    /// Parse a selector string.
    ///
    /// # Errors
    /// Returns `PKG_SELECTOR_INVALID` for empty input, empty `||` groups,
    /// dangling operators or versions that are not strict semver.
    pub fn parse(input: &str) -> Result<Self, PkgError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(PkgError::selector_invalid(input, "empty selector"));
        }

        let mut alternatives = Vec::new();
        for group in trimmed.split("||") {
            let group = group.trim();
            if group.is_empty() {
                return Err(PkgError::selector_invalid(input, "empty alternative"));
            }
            alternatives.push(parse_group(group, input)?);
        }

        Ok(Self { alternatives })
    }

    /// The OR-ed comparator groups.
    #[must_use]
    pub fn alternatives(&self) -> &[Vec<Comparator>] {
        &self.alternatives
    }

    /// Returns true if this selector matches every version.
    #[must_use]
    pub fn is_any(&self) -> bool {
        self.alternatives.iter().any(Vec::is_empty)
    }

    /// Test whether `version` satisfies the selector.
    ///
    /// Pre-release versions only match a group that names a pre-release of
    /// the same `MAJOR.MINOR.PATCH` (or a `*` group).
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|group| {
            if group.is_empty() {
                return true;
            }
            if !version.pre.is_empty() && !group.iter().any(|c| c.allows_prerelease_of(version))
            {
                return false;
            }
            group.iter().all(|c| c.matches(version))
        })
    }

    /// Pick the highest version that satisfies the selector.
    pub fn best_match<'a, I>(&self, candidates: I) -> Option<&'a Version>
    where
        I: IntoIterator<Item = &'a Version>,
    {
        candidates
            .into_iter()
            .filter(|v| self.matches(v))
            .max_by(|a, b| precedence(a, b))
    }
}

/// Parse one AND-group. Operators may be separated from their version by
/// whitespace (`>= 1.0.0`), and clauses by whitespace and/or commas.
fn parse_group(group: &str, input: &str) -> Result<Vec<Comparator>, PkgError> {
    let mut comparators = Vec::new();
    let mut pending_op: Option<&str> = None;

    for token in group
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
    {
        if let Some(op) = pending_op.take() {
            comparators.push(Comparator::parse(&format!("{op}{token}"), input)?);
            continue;
        }
        if token == "*" {
            continue;
        }
        let (op, rest) = Op::split_prefix(token);
        if op.is_some() && rest.is_empty() {
            pending_op = Some(token);
            continue;
        }
        comparators.push(Comparator::parse(token, input)?);
    }

    if let Some(op) = pending_op {
        return Err(PkgError::selector_invalid(
            input,
            format!("operator '{op}' without a version"),
        ));
    }

    Ok(comparators)
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, group) in self.alternatives.iter().enumerate() {
            if i > 0 {
                f.write_str(" || ")?;
            }
            if group.is_empty() {
                f.write_str("*")?;
                continue;
            }
            for (j, comparator) in group.iter().enumerate() {
                if j > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{comparator}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for Selector {
    type Err = PkgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Default for Selector {
    fn default() -> Self {
        Self::any()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkg::error::codes;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn sel(s: &str) -> Selector {
        Selector::parse(s).unwrap()
    }

    #[test]
    fn test_parse_version_strict() {
        assert_eq!(parse_version("1.6.4").unwrap(), v("1.6.4"));
        assert_eq!(parse_version(" 2.0.0-beta.1+abc ").unwrap(), v("2.0.0-beta.1+abc"));
        for bad in ["1", "1.0", "v1.0.0", "1.0.0.0", "a.b.c", ""] {
            let err = parse_version(bad).unwrap_err();
            assert_eq!(err.code(), codes::PKG_VERSION_INVALID, "{bad}");
        }
    }

    #[test]
    fn test_version_format_roundtrip_and_order() {
        for s in ["0.0.1", "1.2.3", "1.0.0-alpha.1", "10.20.30+build.5"] {
            assert_eq!(parse_version(s).unwrap().to_string(), s);
        }
        let a = v("1.0.0-alpha");
        let b = v("1.0.0");
        let c = v("1.0.1");
        assert!(a < b && b < c && a < c);
    }

    #[test]
    fn test_star_matches_everything() {
        let any = sel("*");
        assert!(any.is_any());
        for s in ["0.0.0", "1.2.3", "99.0.0", "2.0.0-rc.1"] {
            assert!(any.matches(&v(s)), "{s}");
        }
    }

    #[test]
    fn test_bare_version_is_exact() {
        let s = sel("1.6.4");
        assert!(s.matches(&v("1.6.4")));
        assert!(!s.matches(&v("1.6.5")));
        assert!(!s.matches(&v("1.7.0")));
        assert_eq!(sel("==1.6.4"), s);
        assert_eq!(sel("=1.6.4"), s);
        assert_eq!(Selector::exact(v("1.6.4")), s);
    }

    #[test]
    fn test_exact_ignores_build_metadata() {
        assert!(sel("1.6.4").matches(&v("1.6.4+git.abc")));
    }

    #[test]
    fn test_tilde() {
        let s = sel("~1.0.0");
        assert!(s.matches(&v("1.0.0")));
        assert!(s.matches(&v("1.0.9")));
        assert!(!s.matches(&v("1.1.0")));
        assert!(!s.matches(&v("0.9.9")));
    }

    #[test]
    fn test_caret() {
        let s = sel("^1.2.3");
        assert!(s.matches(&v("1.2.3")));
        assert!(s.matches(&v("1.9.0")));
        assert!(!s.matches(&v("2.0.0")));
        assert!(!s.matches(&v("1.2.2")));
    }

    #[test]
    fn test_caret_zero_major_narrows() {
        let s = sel("^0.2.3");
        assert!(s.matches(&v("0.2.9")));
        assert!(!s.matches(&v("0.3.0")));

        let s = sel("^0.0.3");
        assert!(s.matches(&v("0.0.3")));
        assert!(!s.matches(&v("0.0.4")));
    }

    #[test]
    fn test_bounds_at_u64_limit() {
        let s = sel("~1.18446744073709551615.0");
        assert!(s.matches(&Version::new(1, u64::MAX, 0)));
        assert!(!s.matches(&Version::new(1, 0, 0)));

        let s = sel("^18446744073709551615.0.0");
        assert!(s.matches(&Version::new(u64::MAX, 0, 0)));
        assert!(s.matches(&Version::new(u64::MAX, 3, 1)));

        let s = sel("^0.0.18446744073709551615");
        assert!(s.matches(&Version::new(0, 0, u64::MAX)));
    }

    #[test]
    fn test_comparison_operators() {
        assert!(sel(">=1.6.4").matches(&v("1.6.4")));
        assert!(!sel(">1.6.4").matches(&v("1.6.4")));
        assert!(sel("<=1.6.4").matches(&v("1.6.4")));
        assert!(!sel("<1.6.4").matches(&v("1.6.4")));
        assert!(sel("!=1.6.4").matches(&v("1.6.5")));
        assert!(!sel("!=1.6.4").matches(&v("1.6.4")));
    }

    #[test]
    fn test_conjunction_space_and_comma() {
        for text in [">=1.0.0 <2.0.0", ">=1.0.0, <2.0.0", ">= 1.0.0 < 2.0.0"] {
            let s = sel(text);
            assert!(s.matches(&v("1.5.0")), "{text}");
            assert!(!s.matches(&v("2.0.0")), "{text}");
            assert!(!s.matches(&v("0.9.0")), "{text}");
        }
        assert_eq!(sel(">= 1.0.0 < 2.0.0"), sel(">=1.0.0,<2.0.0"));
    }

    #[test]
    fn test_alternatives() {
        let s = sel("^1.0.0 || ^3.0.0");
        assert!(s.matches(&v("1.4.0")));
        assert!(!s.matches(&v("2.0.0")));
        assert!(s.matches(&v("3.1.0")));
    }

    #[test]
    fn test_prerelease_needs_opt_in() {
        assert!(!sel("^1.0.0").matches(&v("2.0.0-alpha")));
        assert!(!sel(">=1.0.0").matches(&v("1.5.0-beta")));
        assert!(sel(">=1.5.0-alpha").matches(&v("1.5.0-beta")));
        assert!(!sel(">=1.5.0-alpha").matches(&v("1.6.0-beta")));
    }

    #[test]
    fn test_display_roundtrip() {
        for text in [
            "*",
            "1.6.4",
            "~1.0.0",
            "^0.3.1",
            ">=1.0.0 <2.0.0",
            "!=1.2.3",
            "^1.0.0 || >=3.0.0-rc.1 <4.0.0",
        ] {
            let parsed = sel(text);
            assert_eq!(parsed.to_string(), text);
            assert_eq!(sel(&parsed.to_string()), parsed);
        }
        assert_eq!(sel("==1.0.0, <=2.0.0").to_string(), "1.0.0 <=2.0.0");
    }

    #[test]
    fn test_invalid_selectors() {
        for bad in ["", "   ", "^", ">= ", "~1.0", "foo", "^1.0.0 ||", "|| 1.0.0", ">>1.0.0"] {
            let err = Selector::parse(bad).unwrap_err();
            assert_eq!(err.code(), codes::PKG_SELECTOR_INVALID, "{bad:?}");
        }
    }

    #[test]
    fn test_best_match_picks_highest() {
        let candidates = [v("1.0.0"), v("1.4.2"), v("1.9.0"), v("2.0.0")];
        assert_eq!(sel("~1.4.0").best_match(&candidates), Some(&v("1.4.2")));
        assert_eq!(sel("^1.0.0").best_match(&candidates), Some(&v("1.9.0")));
        assert_eq!(sel("*").best_match(&candidates), Some(&v("2.0.0")));
        assert_eq!(sel("^3.0.0").best_match(&candidates), None);
    }
}
