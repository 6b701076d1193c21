pub mod ast;

use crate::lexer::Token;
use crate::runtime::VariableStore;
use ast::*;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("{name}: undefined variable")]
    UndefinedVariable { name: String },

    #[error("missing command")]
    MissingCommand,

    #[error("'=' must follow a variable name at the start of the line")]
    MisplacedAssign,

    #[error("only one '|' per statement is supported (found {count})")]
    TooManyPipes { count: usize },

    #[error("'>' must be followed by exactly one file name")]
    MissingRedirectTarget,

    #[error("unexpected '{op}'")]
    UnexpectedOperator { op: String },
}

type Result<T> = std::result::Result<T, ParseError>;

/// Turns one line of tokens into a [`Statement`].
///
/// Variable references are expanded against the store first, so an expanded
/// value is always a single plain word and never an operator. The shape is
/// then picked from which operators are present:
///
/// | operators     | statement      |
/// |---------------|----------------|
/// | `=` and `\|`  | `PipeAssign`   |
/// | `=`           | `Assign`       |
/// | `\|` and `>`  | `PipeRedirect` |
/// | `\|`          | `Pipe`         |
/// | `>`           | `Redirect`     |
/// | none          | `Exec`         |
pub struct Parser {
    tokens: Vec<Token>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn parse(self, vars: &VariableStore) -> Result<Statement> {
        let tokens = expand(self.tokens, vars)?;

        let assign = tokens.iter().position(|t| *t == Token::Assign);
        let pipes: Vec<usize> = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == Token::Pipe)
            .map(|(i, _)| i)
            .collect();
        if pipes.len() > 1 {
            return Err(ParseError::TooManyPipes { count: pipes.len() });
        }
        let pipe = pipes.first().copied();
        let redirect = tokens.iter().position(|t| *t == Token::Redirect);

        let statement = match (assign, pipe, redirect) {
            (Some(at), Some(pipe), _) => {
                let name = destination(&tokens, at)?;
                let pipeline = parse_pipeline(&tokens[2..pipe], &tokens[pipe + 1..])?;
                Statement::PipeAssign { name, pipeline }
            }
            (Some(at), None, _) => {
                let name = destination(&tokens, at)?;
                let command = parse_command(&tokens[2..])?;
                Statement::Assign { name, command }
            }
            (None, Some(pipe), Some(redirect)) => {
                if redirect < pipe {
                    return Err(ParseError::UnexpectedOperator {
                        op: Token::Redirect.to_string(),
                    });
                }
                let producer = parse_command(&tokens[..pipe])?;
                let consumer = parse_redirect(&tokens[pipe + 1..])?;
                Statement::PipeRedirect(Pipeline::new(producer, consumer))
            }
            (None, Some(pipe), None) => {
                Statement::Pipe(parse_pipeline(&tokens[..pipe], &tokens[pipe + 1..])?)
            }
            (None, None, Some(_)) => Statement::Redirect(parse_redirect(&tokens)?),
            (None, None, None) => Statement::Exec(parse_command(&tokens)?),
        };

        tracing::debug!(strategy = ?statement.strategy(), %statement, "classified statement");
        Ok(statement)
    }
}

fn expand(tokens: Vec<Token>, vars: &VariableStore) -> Result<Vec<Token>> {
    tokens
        .into_iter()
        .map(|token| match token {
            Token::VariableRef(name) => match vars.get_variable(&name) {
                Some(value) => Ok(Token::Word(value.to_string())),
                None => Err(ParseError::UndefinedVariable { name }),
            },
            other => Ok(other),
        })
        .collect()
}

/// The variable name in `NAME = ...`. The `=` has to be the second token.
fn destination(tokens: &[Token], at: usize) -> Result<String> {
    if at != 1 {
        return Err(ParseError::MisplacedAssign);
    }
    match tokens[0].text() {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(ParseError::MisplacedAssign),
    }
}

fn parse_command(tokens: &[Token]) -> Result<Command> {
    let mut words = Vec::with_capacity(tokens.len());
    for token in tokens {
        match token.text() {
            Some(text) => words.push(text.to_string()),
            None => {
                return Err(ParseError::UnexpectedOperator {
                    op: token.to_string(),
                })
            }
        }
    }

    let mut words = words.into_iter();
    let name = words.next().ok_or(ParseError::MissingCommand)?;
    Ok(Command::new(name, words.collect()))
}

fn parse_pipeline(left: &[Token], right: &[Token]) -> Result<Pipeline> {
    Ok(Pipeline::new(parse_command(left)?, parse_command(right)?))
}

/// `cmd args... > target`: the target is the single word after `>`.
fn parse_redirect(tokens: &[Token]) -> Result<Command> {
    let at = tokens
        .iter()
        .position(|t| *t == Token::Redirect)
        .ok_or(ParseError::MissingRedirectTarget)?;

    let target = match &tokens[at + 1..] {
        [only] => only.text().ok_or(ParseError::MissingRedirectTarget)?,
        _ => return Err(ParseError::MissingRedirectTarget),
    };

    Ok(parse_command(&tokens[..at])?.with_output(OutputTarget::File(PathBuf::from(target))))
}
