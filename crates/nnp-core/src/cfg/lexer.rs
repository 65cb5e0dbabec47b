//! Tokenizer for `cfg(...)` predicates.
//!
//! The lexer is driven by the parser: each call states which token kinds
//! are acceptable next, and only those rules are tried, in a fixed order.
//! This keeps `and`/`or` keywords where a logical operator may follow and
//! lets `2.0.0` lex as a value only on the right of a comparison.

/// Token kinds, in rule order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    LParen,
    RParen,
    /// `and` / `or`
    LogOp,
    /// `==`, `!=`, `<=`, `>=`, `<`, `>`
    CmpOp,
    /// `[A-Za-z0-9]+`
    Var,
    /// A run of printable characters other than whitespace and `()<>=!`.
    Value,
    Eof,
}

impl TokenKind {
    const RULE_ORDER: [TokenKind; 7] = [
        TokenKind::Eof,
        TokenKind::LParen,
        TokenKind::RParen,
        TokenKind::LogOp,
        TokenKind::CmpOp,
        TokenKind::Var,
        TokenKind::Value,
    ];

    /// Human readable name used in error messages.
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::LParen => "'('",
            Self::RParen => "')'",
            Self::LogOp => "'and' or 'or'",
            Self::CmpOp => "comparison operator",
            Self::Var => "variable name",
            Self::Value => "value",
            Self::Eof => "end of input",
        }
    }
}

/// A lexed token borrowing from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Byte offset of the token in the source.
    pub offset: usize,
}

const CMP_OPS: [&str; 6] = ["==", "!=", "<=", ">=", "<", ">"];
const LOG_OPS: [&str; 2] = ["and", "or"];

/// On-demand lexer state.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    /// Current byte position (after any consumed token).
    #[must_use]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Unconsumed input, with leading whitespace skipped.
    #[must_use]
    pub fn rest(&self) -> &'a str {
        self.source[self.pos..].trim_start()
    }

    /// Lex the next token, trying only the `accept`ed kinds.
    ///
    /// Returns `None` without consuming anything if no accepted rule matches.
    pub fn next(&mut self, accept: &[TokenKind]) -> Option<Token<'a>> {
        self.skip_whitespace();
        let rest = &self.source[self.pos..];

        for kind in TokenKind::RULE_ORDER {
            if !accept.contains(&kind) {
                continue;
            }
            let len = match kind {
                TokenKind::Eof => rest.is_empty().then_some(0),
                TokenKind::LParen => rest.starts_with('(').then_some(1),
                TokenKind::RParen => rest.starts_with(')').then_some(1),
                TokenKind::LogOp => LOG_OPS
                    .iter()
                    .find(|op| {
                        rest.starts_with(**op)
                            && !rest[op.len()..].starts_with(|c: char| c.is_ascii_alphanumeric())
                    })
                    .map(|op| op.len()),
                TokenKind::CmpOp => CMP_OPS
                    .iter()
                    .find(|op| rest.starts_with(**op))
                    .map(|op| op.len()),
                TokenKind::Var => run_len(rest, |c| c.is_ascii_alphanumeric()),
                TokenKind::Value => run_len(rest, is_value_char),
            };
            if let Some(len) = len {
                let token = Token {
                    kind,
                    text: &rest[..len],
                    offset: self.pos,
                };
                self.pos += len;
                return Some(token);
            }
        }
        None
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.source[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }
}

fn is_value_char(c: char) -> bool {
    c.is_ascii_graphic() && !matches!(c, '(' | ')' | '<' | '>' | '=' | '!')
}

/// Length of the non-empty leading run of `pred` characters.
fn run_len(s: &str, pred: impl Fn(char) -> bool) -> Option<usize> {
    let len = s.find(|c: char| !pred(c)).unwrap_or(s.len());
    (len > 0).then_some(len)
}
