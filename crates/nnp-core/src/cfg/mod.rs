//! `cfg(...)` predicates for conditional manifest fields.
//!
//! A manifest key `cfg(dev)` or `cfg(dev).dependencies` marks fields that are
//! only active when the predicate holds for the current configuration:
//!
//! ```text
//! cfg(dev)
//! cfg(prod or nodepy > 2.0.0)
//! cfg(dev and os == linux).scripts
//! ```

pub mod cache;
pub mod eval;
pub mod lexer;
pub mod parser;

pub use cache::PredicateCache;
pub use eval::{CfgContext, CfgValue, Coercion, EvalError, EvalReason, ValueKind};
pub use parser::{CompareOp, LogicalOp, Predicate};

use thiserror::Error;

/// Predicate errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CfgError {
    #[error("invalid cfg predicate '{input}': expected {expected} at offset {offset}, found {found}")]
    InvalidPredicate {
        input: String,
        offset: usize,
        found: String,
        expected: &'static str,
    },

    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// A recognized conditional manifest key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfgKey<'a> {
    /// `cfg(P)`; the value is an object of fields.
    Block { predicate: &'a str },
    /// `cfg(P).field`; the value is the field's value.
    Inline { predicate: &'a str, field: &'a str },
}

impl<'a> CfgKey<'a> {
    /// Recognize a `cfg(...)` key. Returns `None` for plain keys.
    ///
    /// Inline keys split at the first `).`, so predicates may contain dots
    /// (`cfg(nodepy > 2.0.0).dependencies`).
    #[must_use]
    pub fn recognize(key: &'a str) -> Option<Self> {
        let body = key.strip_prefix("cfg(")?;
        if let Some(predicate) = body.strip_suffix(')') {
            return Some(Self::Block { predicate });
        }
        let close = body.find(").")?;
        let field = &body[close + 2..];
        if field.is_empty() {
            return None;
        }
        Some(Self::Inline {
            predicate: &body[..close],
            field,
        })
    }

    /// Predicate text without the `cfg(` `)` wrapper.
    #[must_use]
    pub fn predicate(&self) -> &'a str {
        match *self {
            Self::Block { predicate } | Self::Inline { predicate, .. } => predicate,
        }
    }
}

/// Parse (through `cache`) and evaluate predicate text.
///
/// # Errors
/// Returns `InvalidPredicate` on parse failure, or `Eval` in strict mode.
pub fn evaluate(
    source: &str,
    cache: &PredicateCache,
    ctx: &mut CfgContext,
) -> Result<bool, CfgError> {
    let predicate = cache.parse(source)?;
    Ok(predicate.eval(ctx)?)
}
