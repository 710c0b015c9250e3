//! Query parser
//!
//! Recursive-descent parser over the lexer's tokens producing select, update
//! and delete queries.

use super::filter::{Assignment, CompareOp, Comparison, Connective, Field, Filter, Term, Value};
use super::lexer::{Keyword, Lexer, Token, TokenKind};
use super::{QueryError, Span};

use crate::record::Record;

/// `[fields] [where filter]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    /// Projected columns; empty means all
    pub fields: Vec<Field>,
    pub filter: Option<Filter>,
}

impl SelectQuery {
    pub fn parse(input: &str) -> Result<Self, QueryError> {
        let mut parser = Parser::new(input)?;

        let mut fields = Vec::new();
        if !parser.at_keyword(Keyword::Where) && !parser.at_eof() {
            loop {
                let token = parser.advance();
                match &token.kind {
                    TokenKind::Word(star) if star == "*" => fields.extend(Field::ALL),
                    TokenKind::Word(name) => match Field::parse(name) {
                        Some(field) => fields.push(field),
                        None => {
                            return Err(QueryError::new(
                                format!("unknown field '{}'", name),
                                token.span,
                            ))
                        }
                    },
                    _ => return Err(QueryError::unexpected("field name", &token)),
                }
                if !parser.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }

        let filter = if parser.eat(&TokenKind::Keyword(Keyword::Where)) {
            Some(parser.parse_filter()?)
        } else {
            None
        };
        parser.expect_eof()?;

        Ok(Self { fields, filter })
    }

    /// Columns to show, in order
    pub fn columns(&self) -> Vec<Field> {
        if self.fields.is_empty() {
            Field::ALL.to_vec()
        } else {
            self.fields.clone()
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.filter.as_ref().map_or(true, |f| f.eval(record))
    }
}

/// `set assignments where filter`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateQuery {
    pub assignments: Vec<Assignment>,
    pub filter: Filter,
}

impl UpdateQuery {
    pub fn parse(input: &str) -> Result<Self, QueryError> {
        let mut parser = Parser::new(input)?;
        parser.expect_keyword(Keyword::Set)?;

        let mut assignments: Vec<Assignment> = Vec::new();
        loop {
            let (field, span) = parser.parse_field()?;
            if field == Field::Id {
                return Err(QueryError::new("id cannot be updated", span));
            }
            parser.expect(&TokenKind::Eq, "'='")?;
            let value = parser.parse_value(field)?;

            match assignments.iter_mut().find(|a| a.field == field) {
                Some(existing) => existing.value = value,
                None => assignments.push(Assignment { field, value }),
            }

            if !parser.eat(&TokenKind::Comma) {
                break;
            }
        }

        parser.expect_keyword(Keyword::Where)?;
        let filter = parser.parse_filter()?;
        parser.expect_eof()?;

        Ok(Self {
            assignments,
            filter,
        })
    }

    /// `record` with every assignment applied
    pub fn apply(&self, record: &Record) -> Record {
        let mut updated = record.clone();
        for assignment in &self.assignments {
            // Types were checked at parse time.
            assignment.field.assign(&mut updated, &assignment.value);
        }
        updated
    }
}

/// `where filter`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteQuery {
    pub filter: Filter,
}

impl DeleteQuery {
    pub fn parse(input: &str) -> Result<Self, QueryError> {
        let mut parser = Parser::new(input)?;
        parser.expect_keyword(Keyword::Where)?;
        let filter = parser.parse_filter()?;
        parser.expect_eof()?;
        Ok(Self { filter })
    }
}

impl Filter {
    /// Parse a bare filter expression
    pub fn parse(input: &str) -> Result<Self, QueryError> {
        let mut parser = Parser::new(input)?;
        let filter = parser.parse_filter()?;
        parser.expect_eof()?;
        Ok(filter)
    }
}

// =============================================================================
// Parser
// =============================================================================

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Result<Self, QueryError> {
        Ok(Self {
            tokens: Lexer::tokenize(input)?,
            pos: 0,
        })
    }

    fn peek(&self) -> &Token {
        // The lexer always ends the stream with Eof.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn at_keyword(&self, keyword: Keyword) -> bool {
        self.peek().kind == TokenKind::Keyword(keyword)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<(), QueryError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(QueryError::unexpected(expected, self.peek()))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), QueryError> {
        let expected = format!("'{}'", keyword.as_str());
        self.expect(&TokenKind::Keyword(keyword), &expected)
    }

    fn expect_eof(&mut self) -> Result<(), QueryError> {
        self.expect(&TokenKind::Eof, "end of input")
    }

    fn parse_filter(&mut self) -> Result<Filter, QueryError> {
        let first = self.parse_term()?;
        let mut rest = Vec::new();

        loop {
            let connective = if self.eat(&TokenKind::Keyword(Keyword::And)) {
                Connective::And
            } else if self.eat(&TokenKind::Keyword(Keyword::Or)) {
                Connective::Or
            } else {
                break;
            };
            rest.push((connective, self.parse_term()?));
        }

        Ok(Filter { first, rest })
    }

    fn parse_term(&mut self) -> Result<Term, QueryError> {
        let negated = self.eat(&TokenKind::Keyword(Keyword::Not));
        let (field, _) = self.parse_field()?;

        let op = match self.advance() {
            Token {
                kind: TokenKind::Eq,
                ..
            } => CompareOp::Eq,
            Token {
                kind: TokenKind::Neq,
                ..
            } => CompareOp::Neq,
            other => return Err(QueryError::unexpected("'=' or '!='", &other)),
        };

        let value = self.parse_value(field)?;
        Ok(Term {
            negated,
            comparison: Comparison { field, op, value },
        })
    }

    fn parse_field(&mut self) -> Result<(Field, Span), QueryError> {
        let token = self.advance();
        match &token.kind {
            TokenKind::Word(name) => Field::parse(name)
                .map(|field| (field, token.span))
                .ok_or_else(|| QueryError::new(format!("unknown field '{}'", name), token.span)),
            _ => Err(QueryError::unexpected("field name", &token)),
        }
    }

    fn parse_value(&mut self, field: Field) -> Result<Value, QueryError> {
        let token = self.advance();
        match token.text() {
            Some(text) => field
                .parse_value(text)
                .map_err(|message| QueryError::new(message, token.span)),
            None => Err(QueryError::unexpected("value", &token)),
        }
    }
}
