//! Error taxonomy for a whole run.
//!
//! Each layer has its own error type; [`EngineError`] folds them together and
//! decides the process exit code. A fatal error is turned into an
//! [`ErrorReport`] for the operator, formatted as a text line or as JSON.

use crate::executor::ExecError;
use crate::lexer::LexerError;
use crate::parser::ParseError;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub const EXIT_USAGE: i32 = 2;
pub const EXIT_OPEN_INPUT: i32 = 3;
pub const EXIT_READ_INPUT: i32 = 4;
pub const EXIT_UNDEFINED_VARIABLE: i32 = 5;
pub const EXIT_SYNTAX: i32 = 6;
pub const EXIT_PROCESS_SETUP: i32 = 71;
pub const EXIT_COMMAND_NOT_FOUND: i32 = 127;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    Usage(String),

    #[error("cannot open {}: {source}", path.display())]
    OpenInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("read error: {0}")]
    ReadInput(#[source] io::Error),

    #[error(transparent)]
    Lex(#[from] LexerError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    /// A failure while running the statement on `line`.
    #[error("line {line}: {source}")]
    AtLine {
        line: usize,
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    pub fn at_line(self, line: usize) -> Self {
        match self {
            EngineError::AtLine { .. } => self,
            other => EngineError::AtLine {
                line,
                source: Box::new(other),
            },
        }
    }

    /// The 1-based input line this error belongs to, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            EngineError::AtLine { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// The error without its line annotation.
    pub fn inner(&self) -> &EngineError {
        match self {
            EngineError::AtLine { source, .. } => source.inner(),
            other => other,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::Usage(_) => EXIT_USAGE,
            EngineError::OpenInput { .. } => EXIT_OPEN_INPUT,
            EngineError::ReadInput(_) => EXIT_READ_INPUT,
            EngineError::Lex(_) => EXIT_SYNTAX,
            EngineError::Parse(ParseError::UndefinedVariable { .. }) => EXIT_UNDEFINED_VARIABLE,
            EngineError::Parse(_) => EXIT_SYNTAX,
            EngineError::Exec(ExecError::Resolve(_)) => EXIT_COMMAND_NOT_FOUND,
            EngineError::Exec(_) => EXIT_PROCESS_SETUP,
            EngineError::AtLine { source, .. } => source.exit_code(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            EngineError::Usage(_) => "USAGE",
            EngineError::OpenInput { .. } => "INPUT_OPEN_FAILED",
            EngineError::ReadInput(_) => "INPUT_READ_FAILED",
            EngineError::Lex(_) => "INVALID_TOKEN",
            EngineError::Parse(ParseError::UndefinedVariable { .. }) => "UNDEFINED_VARIABLE",
            EngineError::Parse(_) => "SYNTAX_ERROR",
            EngineError::Exec(ExecError::Resolve(_)) => "COMMAND_NOT_FOUND",
            EngineError::Exec(ExecError::OpenOutput { .. }) => "OUTPUT_OPEN_FAILED",
            EngineError::Exec(ExecError::Fork(_)) => "FORK_FAILED",
            EngineError::Exec(ExecError::Pipe(_)) => "PIPE_FAILED",
            EngineError::Exec(_) => "EXECUTION_ERROR",
            EngineError::AtLine { source, .. } => source.error_code(),
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            error_code: self.error_code().to_string(),
            message: self.inner().to_string(),
            exit_code: self.exit_code(),
            line: self.line(),
        }
    }
}

/// What the operator sees when a run stops on an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorReport {
    pub error_code: String,
    pub message: String,
    pub exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl ErrorReport {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"error_code":"{}","message":"{}","exit_code":{}}}"#,
                self.error_code,
                self.message.replace('"', "'"),
                self.exit_code
            )
        })
    }

    pub fn to_text(&self) -> String {
        match self.line {
            Some(line) => format!("linesh: line {}: {}", line, self.message),
            None => format!("linesh: {}", self.message),
        }
    }

    pub fn render(&self, json: bool) -> String {
        if json {
            self.to_json()
        } else {
            self.to_text()
        }
    }
}

/// Whether `LINESH_ERROR_FORMAT` asks for JSON. Used before a full
/// configuration is available.
pub fn should_output_json_errors() -> bool {
    std::env::var("LINESH_ERROR_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}
