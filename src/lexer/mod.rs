//! Line lexer.
//!
//! A statement is one line of text. Outside a run, whitespace separates and the
//! three operators `=`, `|` and `>` stand alone. Anything else opens a run that
//! lasts until the next whitespace: a `"` run lasts until the closing quote, a
//! `$` run is a variable reference. Runs left open at end of line are still
//! emitted.

use logos::Logos;
use std::fmt;

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    #[token("=")]
    Assign,

    #[token("|")]
    Pipe,

    #[token(">")]
    Redirect,

    // No escapes inside quotes; a missing closing quote ends at end of line.
    #[regex(r#""[^"\n]*"?"#, unquote)]
    QuotedString(String),

    #[regex(r"\$[^ \t\r\n]*", |lex| lex.slice()[1..].to_string())]
    VariableRef(String),

    #[regex(r#"[^ \t\r\n=|>"$][^ \t\r\n]*"#, |lex| lex.slice().to_string())]
    Word(String),
}

fn unquote(lex: &mut logos::Lexer<Token>) -> String {
    let body = &lex.slice()[1..];
    body.strip_suffix('"').unwrap_or(body).to_string()
}

impl Token {
    /// True for `=`, `|` and `>`.
    pub fn is_operator(&self) -> bool {
        matches!(self, Token::Assign | Token::Pipe | Token::Redirect)
    }

    /// The text a word-like token carries, `None` for operators.
    pub fn text(&self) -> Option<&str> {
        match self {
            Token::Word(s) | Token::QuotedString(s) | Token::VariableRef(s) => Some(s),
            Token::Assign | Token::Pipe | Token::Redirect => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Assign => f.write_str("="),
            Token::Pipe => f.write_str("|"),
            Token::Redirect => f.write_str(">"),
            Token::QuotedString(s) => write!(f, "\"{}\"", s),
            Token::VariableRef(name) => write!(f, "${}", name),
            Token::Word(s) => f.write_str(s),
        }
    }
}

pub struct Lexer<'a> {
    inner: logos::Lexer<'a, Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: Token::lexer(input),
        }
    }

    /// Tokenize a whole line. An empty or blank line yields no tokens.
    pub fn tokenize(input: &str) -> Result<Vec<Token>, LexerError> {
        let tokens = Lexer::new(input).collect::<Result<Vec<_>, _>>()?;
        tracing::trace!(count = tokens.len(), "tokenized line");
        Ok(tokens)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token, LexerError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|result| {
            result.map_err(|_| LexerError::InvalidToken {
                position: self.inner.span().start,
                text: self.inner.slice().to_string(),
            })
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LexerError {
    #[error("Invalid token at position {position}: '{text}'")]
    InvalidToken { position: usize, text: String },
}
