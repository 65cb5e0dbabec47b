//! Predicate AST and parser.
//!
//! Grammar:
//!
//! ```text
//! expr := "(" expr ")" | var (logop expr | cmpop value)?
//! ```
//!
//! The whole input must be consumed. Logical operators are
//! right-associative without precedence: `a and b or c` is
//! `a and (b or c)`. A parenthesized group or a comparison cannot be the
//! left operand of a logical operator.

use super::lexer::{Lexer, Token, TokenKind};
use super::CfgError;
use std::fmt::{self, Write as _};

/// Logical connective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }

    fn from_token(text: &str) -> Option<Self> {
        Some(match text {
            "<" => Self::Lt,
            ">" => Self::Gt,
            "<=" => Self::Le,
            ">=" => Self::Ge,
            "==" => Self::Eq,
            "!=" => Self::Ne,
            _ => return None,
        })
    }
}

/// A parsed `cfg(...)` predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Predicate {
    /// True iff the variable is set and truthy.
    Var(String),
    Logop {
        left: Box<Predicate>,
        op: LogicalOp,
        right: Box<Predicate>,
    },
    /// Compare a variable's live value to a literal coerced to its kind.
    Compare {
        name: String,
        op: CompareOp,
        value: String,
    },
}

impl Predicate {
    /// Parse predicate text (without the `cfg(` `)` wrapper).
    ///
    /// # Errors
    /// Returns `CfgError::InvalidPredicate` with the offset and the text
    /// found there when the input does not match the grammar.
    pub fn parse(source: &str) -> Result<Self, CfgError> {
        let mut parser = Parser {
            source,
            lexer: Lexer::new(source),
        };
        let predicate = parser.expression()?;
        parser.expect(&[TokenKind::Eof])?;
        Ok(predicate)
    }

    /// Multi-line debug dump of the tree.
    #[must_use]
    pub fn format_tree(&self) -> String {
        let mut out = String::new();
        self.write_tree(&mut out, 0);
        out
    }

    fn write_tree(&self, out: &mut String, depth: usize) {
        let indent = "  ";
        match self {
            Self::Var(name) => {
                let _ = write!(out, "Var(name={name:?})");
            }
            Self::Compare { name, op, value } => {
                let _ = write!(
                    out,
                    "Compare(name={name:?}, op={:?}, value={value:?})",
                    op.as_str()
                );
            }
            Self::Logop { left, op, right } => {
                let _ = writeln!(out, "Logop(");
                let _ = writeln!(out, "{}op={:?},", indent.repeat(depth + 1), op.as_str());
                let _ = write!(out, "{}left=", indent.repeat(depth + 1));
                left.write_tree(out, depth + 1);
                let _ = writeln!(out, ",");
                let _ = write!(out, "{}right=", indent.repeat(depth + 1));
                right.write_tree(out, depth + 1);
                let _ = write!(out, "\n{})", indent.repeat(depth));
            }
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Var(name) => f.write_str(name),
            Self::Logop { left, op, right } => write!(f, "{left} {} {right}", op.as_str()),
            Self::Compare { name, op, value } => write!(f, "{name} {} {value}", op.as_str()),
        }
    }
}

impl std::str::FromStr for Predicate {
    type Err = CfgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

struct Parser<'a> {
    source: &'a str,
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    fn expression(&mut self) -> Result<Predicate, CfgError> {
        let token = self.expect(&[TokenKind::Var, TokenKind::LParen])?;
        if token.kind == TokenKind::LParen {
            let inner = self.expression()?;
            self.expect(&[TokenKind::RParen])?;
            return Ok(inner);
        }

        let name = token.text.to_string();
        let Some(op) = self.lexer.next(&[TokenKind::LogOp, TokenKind::CmpOp]) else {
            return Ok(Predicate::Var(name));
        };

        if op.kind == TokenKind::LogOp {
            let op = if op.text == "and" {
                LogicalOp::And
            } else {
                LogicalOp::Or
            };
            let right = self.expression()?;
            return Ok(Predicate::Logop {
                left: Box::new(Predicate::Var(name)),
                op,
                right: Box::new(right),
            });
        }

        let Some(cmp) = CompareOp::from_token(op.text) else {
            return Err(self.unexpected(op.offset, TokenKind::CmpOp));
        };
        let value = self.expect(&[TokenKind::Value])?;
        Ok(Predicate::Compare {
            name,
            op: cmp,
            value: value.text.to_string(),
        })
    }

    fn expect(&mut self, accept: &[TokenKind]) -> Result<Token<'a>, CfgError> {
        match self.lexer.next(accept) {
            Some(token) => Ok(token),
            None => Err(self.unexpected(self.lexer.pos(), accept[0])),
        }
    }

    fn unexpected(&self, offset: usize, wanted: TokenKind) -> CfgError {
        let rest = self.source[offset..].trim_start();
        let found = if rest.is_empty() {
            "end of input".to_string()
        } else {
            format!("'{rest}'")
        };
        CfgError::InvalidPredicate {
            input: self.source.to_string(),
            offset: self.source.len() - rest.len(),
            found,
            expected: wanted.describe(),
        }
    }
}
