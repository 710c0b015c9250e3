//! Query lexer
//!
//! Splits query text into words, quoted strings, operators and keywords.

use super::{QueryError, Span};

/// A token with its span in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Text of a word or quoted string token
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Word(s) | TokenKind::Quoted(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Unquoted run of characters (field name or bare value)
    Word(String),
    /// Single- or double-quoted string, quotes removed
    Quoted(String),
    Keyword(Keyword),
    /// =
    Eq,
    /// !=
    Neq,
    /// ,
    Comma,
    Eof,
}

impl TokenKind {
    /// Returns the display name for error messages
    pub fn display_name(&self) -> String {
        match self {
            TokenKind::Word(s) => format!("'{}'", s),
            TokenKind::Quoted(s) => format!("string '{}'", s),
            TokenKind::Keyword(kw) => format!("keyword '{}'", kw.as_str()),
            TokenKind::Eq => "'='".to_string(),
            TokenKind::Neq => "'!='".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    And,
    Or,
    Not,
    Where,
    Set,
}

impl Keyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::And => "and",
            Keyword::Or => "or",
            Keyword::Not => "not",
            Keyword::Where => "where",
            Keyword::Set => "set",
        }
    }

    /// Parse a keyword (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "and" => Some(Keyword::And),
            "or" => Some(Keyword::Or),
            "not" => Some(Keyword::Not),
            "where" => Some(Keyword::Where),
            "set" => Some(Keyword::Set),
            _ => None,
        }
    }
}

/// Query lexer
///
/// Yields tokens up to and including one `Eof`, or the first lexical error.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            done: false,
        }
    }

    /// Lex the whole input
    pub fn tokenize(input: &'a str) -> Result<Vec<Token>, QueryError> {
        Lexer::new(input).collect()
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn scan_token(&mut self) -> Result<Token, QueryError> {
        self.skip_whitespace();
        let start = self.pos;

        let Some(ch) = self.bump() else {
            return Ok(Token::new(TokenKind::Eof, Span::at(start)));
        };

        let kind = match ch {
            '=' => TokenKind::Eq,
            ',' => TokenKind::Comma,
            '!' => {
                if self.peek() == Some('=') {
                    self.bump();
                    TokenKind::Neq
                } else {
                    return Err(QueryError::new(
                        "expected '=' after '!'",
                        Span::new(start, self.pos),
                    ));
                }
            }
            '\'' | '"' => return self.scan_quoted(ch, start),
            _ => {
                while self.peek().is_some_and(|c| !is_delimiter(c)) {
                    self.bump();
                }
                let word = &self.input[start..self.pos];
                match Keyword::parse(word) {
                    Some(kw) => TokenKind::Keyword(kw),
                    None => TokenKind::Word(word.to_string()),
                }
            }
        };

        Ok(Token::new(kind, Span::new(start, self.pos)))
    }

    fn scan_quoted(&mut self, quote: char, start: usize) -> Result<Token, QueryError> {
        let body_start = self.pos;
        loop {
            match self.bump() {
                Some(c) if c == quote => break,
                Some(_) => {}
                None => {
                    return Err(QueryError::new(
                        "unterminated string literal",
                        Span::new(start, self.pos),
                    ))
                }
            }
        }
        let body = &self.input[body_start..self.pos - quote.len_utf8()];
        Ok(Token::new(
            TokenKind::Quoted(body.to_string()),
            Span::new(start, self.pos),
        ))
    }
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '=' | '!' | ',' | '\'' | '"')
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let token = self.scan_token();
        if matches!(&token, Ok(t) if t.kind == TokenKind::Eof) || token.is_err() {
            self.done = true;
        }
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(
            kinds("AND Or nOt"),
            vec![
                TokenKind::Keyword(Keyword::And),
                TokenKind::Keyword(Keyword::Or),
                TokenKind::Keyword(Keyword::Not),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comparison_without_spaces() {
        assert_eq!(
            kinds("firstname!='John'"),
            vec![
                TokenKind::Word("firstname".to_string()),
                TokenKind::Neq,
                TokenKind::Quoted("John".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_quoted_keyword_is_a_string() {
        assert_eq!(
            kinds("\"and\""),
            vec![TokenKind::Quoted("and".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::tokenize("name = 'abc").unwrap_err();
        assert_eq!(err.span.start, 7);
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn test_lone_bang() {
        assert!(Lexer::tokenize("id ! 3").is_err());
    }
}
