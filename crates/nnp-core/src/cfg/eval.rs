//! Predicate evaluation.

use super::parser::{CompareOp, LogicalOp, Predicate};
use semver::Version;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Kind of a configuration value. Used as the coercion table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Str,
    Version,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::Version => "version",
        })
    }
}

/// A configuration value visible to predicates.
#[derive(Debug, Clone, PartialEq)]
pub enum CfgValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Version(Version),
}

impl CfgValue {
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::Str(_) => ValueKind::Str,
            Self::Version(_) => ValueKind::Version,
        }
    }

    /// Truthiness used by bare variable predicates.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(x) => *x != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::Version(_) => true,
        }
    }

    /// Order two values of the same kind. Mixed kinds are incomparable.
    fn compare(&self, other: &CfgValue) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Str(a), Self::Str(b)) => Some(a.cmp(b)),
            (Self::Version(a), Self::Version(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for CfgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
            Self::Version(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for CfgValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for CfgValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for CfgValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for CfgValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for CfgValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Version> for CfgValue {
    fn from(value: Version) -> Self {
        Self::Version(value)
    }
}

/// Why a single predicate node failed to evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalReason {
    #[error("variable '{0}' is not set")]
    KeyNotFound(String),

    #[error("coercion to {0} is not available")]
    NoCoercion(ValueKind),

    #[error("cannot coerce '{value}' to {kind}: {reason}")]
    Coercion {
        value: String,
        kind: ValueKind,
        reason: String,
    },

    #[error("{left} and {right} values are not comparable")]
    Incomparable { left: ValueKind, right: ValueKind },
}

/// Evaluation failure at one predicate node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("evaluation failed at \"{node}\": {reason}")]
pub struct EvalError {
    /// Text of the failing node.
    pub node: String,
    pub reason: EvalReason,
}

/// String to value converter registered per target kind.
pub type Coercion = fn(&str) -> Result<CfgValue, String>;

/// Variables, coercions and error policy for evaluating predicates.
///
/// In collect mode (the default) a failing comparison is recorded in
/// [`CfgContext::errors`] and evaluates to `false`. In strict mode the
/// first failure is returned.
#[derive(Debug, Clone)]
pub struct CfgContext {
    vars: HashMap<String, CfgValue>,
    coercions: HashMap<ValueKind, Coercion>,
    strict: bool,
    errors: Vec<EvalError>,
}

impl Default for CfgContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CfgContext {
    /// Empty context with only the string coercion registered.
    #[must_use]
    pub fn new() -> Self {
        let mut ctx = Self {
            vars: HashMap::new(),
            coercions: HashMap::new(),
            strict: false,
            errors: Vec::new(),
        };
        ctx.register_coercion(ValueKind::Str, |s| Ok(CfgValue::Str(s.to_string())));
        ctx
    }

    /// Context with integer, float and version coercions registered too.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut ctx = Self::new();
        ctx.register_coercion(ValueKind::Int, |s| {
            s.parse::<i64>()
                .map(CfgValue::Int)
                .map_err(|e| e.to_string())
        });
        ctx.register_coercion(ValueKind::Float, |s| {
            s.parse::<f64>()
                .map(CfgValue::Float)
                .map_err(|e| e.to_string())
        });
        ctx.register_coercion(ValueKind::Version, |s| {
            Version::parse(s)
                .map(CfgValue::Version)
                .map_err(|e| e.to_string())
        });
        ctx
    }

    /// Return errors immediately instead of collecting them.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    #[must_use]
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<CfgValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<CfgValue>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn unset(&mut self, name: &str) -> Option<CfgValue> {
        self.vars.remove(name)
    }

    /// Register (or replace) the coercion for a value kind.
    pub fn register_coercion(&mut self, kind: ValueKind, coercion: Coercion) {
        self.coercions.insert(kind, coercion);
    }

    /// True iff `name` is present and truthy.
    #[must_use]
    pub fn isset(&self, name: &str) -> bool {
        self.vars.get(name).is_some_and(CfgValue::is_truthy)
    }

    /// Live value of `name`.
    ///
    /// # Errors
    /// Returns `KeyNotFound` if the variable is absent.
    pub fn get_value(&self, name: &str) -> Result<&CfgValue, EvalError> {
        self.vars.get(name).ok_or_else(|| EvalError {
            node: name.to_string(),
            reason: EvalReason::KeyNotFound(name.to_string()),
        })
    }

    /// Convert `text` into a value of `kind`.
    pub fn coerce(&self, kind: ValueKind, text: &str) -> Result<CfgValue, EvalReason> {
        let coercion = self
            .coercions
            .get(&kind)
            .ok_or(EvalReason::NoCoercion(kind))?;
        coercion(text).map_err(|reason| EvalReason::Coercion {
            value: text.to_string(),
            kind,
            reason,
        })
    }

    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Errors collected so far in collect mode.
    #[must_use]
    pub fn errors(&self) -> &[EvalError] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<EvalError> {
        std::mem::take(&mut self.errors)
    }

    fn handle_eval_error(&mut self, error: EvalError) -> Result<bool, EvalError> {
        if self.strict {
            Err(error)
        } else {
            self.errors.push(error);
            Ok(false)
        }
    }
}

impl Predicate {
    /// Evaluate against `ctx`.
    ///
    /// Both operands of `and`/`or` are always evaluated so that every
    /// failing comparison is collected.
    ///
    /// # Errors
    /// Only in strict mode: the first comparison that could not be evaluated.
    pub fn eval(&self, ctx: &mut CfgContext) -> Result<bool, EvalError> {
        match self {
            Self::Var(name) => Ok(ctx.isset(name)),
            Self::Logop { left, op, right } => {
                let a = left.eval(ctx)?;
                let b = right.eval(ctx)?;
                Ok(match op {
                    LogicalOp::And => a && b,
                    LogicalOp::Or => a || b,
                })
            }
            Self::Compare { name, op, value } => match compare(ctx, name, *op, value) {
                Ok(result) => Ok(result),
                Err(reason) => ctx.handle_eval_error(EvalError {
                    node: self.to_string(),
                    reason,
                }),
            },
        }
    }
}

fn compare(ctx: &CfgContext, name: &str, op: CompareOp, literal: &str) -> Result<bool, EvalReason> {
    let live = ctx.get_value(name).map_err(|e| e.reason)?;
    let other = ctx.coerce(live.kind(), literal)?;
    let ordering = live.compare(&other).ok_or(EvalReason::Incomparable {
        left: live.kind(),
        right: other.kind(),
    })?;
    Ok(match op {
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(text: &str, ctx: &mut CfgContext) -> Result<bool, EvalError> {
        Predicate::parse(text).unwrap().eval(ctx)
    }

    #[test]
    fn test_var_is_truthiness() {
        let mut ctx = CfgContext::new()
            .with_var("dev", true)
            .with_var("prod", false)
            .with_var("level", 0_i64)
            .with_var("name", "");
        assert!(eval("dev", &mut ctx).unwrap());
        assert!(!eval("prod", &mut ctx).unwrap());
        assert!(!eval("level", &mut ctx).unwrap());
        assert!(!eval("name", &mut ctx).unwrap());
        assert!(!eval("missing", &mut ctx).unwrap());
        assert!(ctx.errors().is_empty());
    }

    #[test]
    fn test_or_with_version_comparison() {
        let text = "prod or nodepy > 2.0.0";

        let mut ctx = CfgContext::with_defaults().with_var("nodepy", Version::new(2, 1, 0));
        assert!(eval(text, &mut ctx).unwrap());

        let mut ctx = CfgContext::with_defaults().with_var("nodepy", Version::new(1, 9, 0));
        assert!(!eval(text, &mut ctx).unwrap());

        let mut ctx = CfgContext::with_defaults()
            .with_var("prod", true)
            .with_var("nodepy", Version::new(1, 0, 0));
        assert!(eval(text, &mut ctx).unwrap());
    }

    #[test]
    fn test_numeric_and_string_comparisons() {
        let mut ctx = CfgContext::with_defaults()
            .with_var("level", 3_i64)
            .with_var("ratio", 0.5)
            .with_var("os", "linux");
        assert!(eval("level >= 3", &mut ctx).unwrap());
        assert!(eval("level != 4", &mut ctx).unwrap());
        assert!(eval("ratio < 1.5", &mut ctx).unwrap());
        assert!(eval("os == linux", &mut ctx).unwrap());
        assert!(!eval("os == windows", &mut ctx).unwrap());
        assert!(ctx.errors().is_empty());
    }

    #[test]
    fn test_missing_variable_collected_as_false() {
        let mut ctx = CfgContext::with_defaults().with_var("dev", true);
        assert!(!eval("nodepy > 2.0.0", &mut ctx).unwrap());
        assert_eq!(ctx.errors().len(), 1);
        assert_eq!(
            ctx.errors()[0].reason,
            EvalReason::KeyNotFound("nodepy".to_string())
        );
        assert_eq!(ctx.errors()[0].node, "nodepy > 2.0.0");

        // `or` still evaluates the right side after a failing left side.
        assert!(eval("dev or nodepy > 2.0.0", &mut ctx).unwrap());
        assert_eq!(ctx.errors().len(), 2);
    }

    #[test]
    fn test_both_operands_always_evaluated() {
        let mut ctx = CfgContext::with_defaults();
        assert!(!eval("a and x > 1", &mut ctx).unwrap());
        assert_eq!(ctx.take_errors().len(), 1);
        assert!(ctx.errors().is_empty());
    }

    #[test]
    fn test_coercion_failures() {
        // Only the string coercion is registered by `new`.
        let mut ctx = CfgContext::new().with_var("level", 3_i64);
        assert!(!eval("level > 1", &mut ctx).unwrap());
        assert_eq!(
            ctx.errors()[0].reason,
            EvalReason::NoCoercion(ValueKind::Int)
        );

        let mut ctx = CfgContext::with_defaults().with_var("nodepy", Version::new(1, 0, 0));
        assert!(!eval("nodepy > banana", &mut ctx).unwrap());
        assert!(matches!(
            ctx.errors()[0].reason,
            EvalReason::Coercion {
                kind: ValueKind::Version,
                ..
            }
        ));
    }

    #[test]
    fn test_strict_mode_returns_error() {
        let mut ctx = CfgContext::with_defaults().with_strict(true);
        let err = eval("nodepy > 2.0.0", &mut ctx).unwrap_err();
        assert_eq!(err.reason, EvalReason::KeyNotFound("nodepy".to_string()));
        assert!(err.to_string().contains("nodepy > 2.0.0"));
        assert!(ctx.errors().is_empty());
    }

    #[test]
    fn test_custom_coercion() {
        let mut ctx = CfgContext::new().with_var("debug", true);
        ctx.register_coercion(ValueKind::Bool, |s| match s {
            "true" | "yes" => Ok(CfgValue::Bool(true)),
            "false" | "no" => Ok(CfgValue::Bool(false)),
            other => Err(format!("not a boolean: {other}")),
        });
        assert!(eval("debug == yes", &mut ctx).unwrap());
        assert!(!eval("debug != true", &mut ctx).unwrap());
    }

    #[test]
    fn test_get_value() {
        let ctx = CfgContext::new().with_var("os", "linux");
        assert_eq!(ctx.get_value("os").unwrap(), &CfgValue::from("linux"));
        assert!(matches!(
            ctx.get_value("arch").unwrap_err().reason,
            EvalReason::KeyNotFound(_)
        ));
    }
}
