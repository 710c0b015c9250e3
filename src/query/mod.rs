//! Query Module
//!
//! The small filter/update language behind `select`, `update` and `delete`.
//!
//! ## Grammar
//! ```text
//! select  := [ field { "," field } ] [ "where" filter ]
//! update  := "set" field "=" value { "," field "=" value } "where" filter
//! delete  := "where" filter
//! filter  := term { ( "and" | "or" ) term }
//! term    := [ "not" ] field ( "=" | "!=" ) value
//! value   := bare-word | 'quoted' | "quoted"
//! ```
//!
//! Keywords and field names are case-insensitive. There are no parentheses
//! and no precedence: `a or b and c` evaluates as `(a or b) and c`, strictly
//! left to right with short-circuiting. `not` negates only the comparison
//! right after it.

mod filter;
mod lexer;
mod parser;

use thiserror::Error;

pub use filter::{
    Assignment, CompareOp, Comparison, Connective, Field, Filter, IndexProbe, Term, Value,
};
pub use lexer::{Keyword, Lexer, Token, TokenKind};
pub use parser::{DeleteQuery, SelectQuery, UpdateQuery};

/// A byte range in the query text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Byte offset from the start of the input
    pub start: usize,
    /// Byte offset of the end of the span (exclusive)
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-length span at `pos`
    pub fn at(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }
}

/// Malformed query text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at position {}", .span.start + 1)]
pub struct QueryError {
    pub message: String,
    pub span: Span,
}

impl QueryError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }

    /// An unexpected token where something else was required
    pub fn unexpected(expected: &str, found: &Token) -> Self {
        Self::new(
            format!("expected {}, found {}", expected, found.kind.display_name()),
            found.span,
        )
    }
}
