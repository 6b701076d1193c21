//! The run loop: one statement per input line, strictly in order.
//!
//! A line with no tokens ends the run cleanly, as does end of file. Any
//! [`EngineError`] stops the run and comes back annotated with its line
//! number. A child's own exit status never stops the run; the most recent one
//! is kept in [`Script::last_status`].

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::executor::{ExecutionResult, Executor};
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::runtime::VariableStore;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Stdout, Write};
use std::path::Path;

/// Reads input lines of at most `max_len` bytes. Whatever follows the limit
/// on the same line is skipped.
pub struct LineReader<R> {
    inner: R,
    max_len: usize,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R, max_len: usize) -> Self {
        Self { inner, max_len }
    }

    /// The next line without its terminator, or `None` at end of input.
    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut line = Vec::new();
        let mut seen_any = false;
        let mut truncated = false;

        loop {
            let (consumed, done) = {
                let available = match self.inner.fill_buf() {
                    Ok(buf) => buf,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                };
                if available.is_empty() {
                    break;
                }
                seen_any = true;

                let newline = available.iter().position(|&b| b == b'\n');
                let end = newline.unwrap_or(available.len());
                let room = self.max_len.saturating_sub(line.len());
                line.extend_from_slice(&available[..end.min(room)]);
                truncated |= end > room;

                match newline {
                    Some(i) => (i + 1, true),
                    None => (available.len(), false),
                }
            };
            self.inner.consume(consumed);
            if done {
                break;
            }
        }

        if !seen_any {
            return Ok(None);
        }
        if truncated {
            tracing::warn!(max_len = self.max_len, "input line truncated");
        }
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }
}

pub struct Script<W: Write = Stdout> {
    executor: Executor<W>,
    vars: VariableStore,
    max_line_len: usize,
    xtrace: bool,
    line_no: usize,
    last_status: i32,
}

impl Script<Stdout> {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_executor(config, Executor::new(config))
    }
}

impl<W: Write> Script<W> {
    pub fn with_executor(config: &EngineConfig, executor: Executor<W>) -> Self {
        Self {
            executor,
            vars: VariableStore::new(),
            max_line_len: config.max_line_len,
            xtrace: config.xtrace,
            line_no: 0,
            last_status: 0,
        }
    }

    pub fn variables(&self) -> &VariableStore {
        &self.vars
    }

    pub fn executor(&self) -> &Executor<W> {
        &self.executor
    }

    pub fn into_executor(self) -> Executor<W> {
        self.executor
    }

    /// Exit status of the last command run, 0 before anything has run.
    pub fn last_status(&self) -> i32 {
        self.last_status
    }

    /// Number of input lines read so far.
    pub fn line_number(&self) -> usize {
        self.line_no
    }

    pub fn run_file(&mut self, path: &Path) -> Result<(), EngineError> {
        let file = File::open(path).map_err(|source| EngineError::OpenInput {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "running script");
        self.run(BufReader::new(file))
    }

    pub fn run<R: BufRead>(&mut self, input: R) -> Result<(), EngineError> {
        let mut lines = LineReader::new(input, self.max_line_len);

        loop {
            let line = match lines.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => return Err(EngineError::ReadInput(e).at_line(self.line_no + 1)),
            };
            self.line_no += 1;

            match self.run_line(&line) {
                Ok(Some(_)) => {}
                Ok(None) => {
                    tracing::debug!(line = self.line_no, "empty line, stopping");
                    break;
                }
                Err(e) => return Err(e.at_line(self.line_no)),
            }
        }

        Ok(())
    }

    /// Run a single statement. `Ok(None)` means the line held no tokens.
    pub fn run_line(&mut self, line: &str) -> Result<Option<ExecutionResult>, EngineError> {
        let tokens = Lexer::tokenize(line)?;
        if tokens.is_empty() {
            return Ok(None);
        }

        let statement = Parser::new(tokens).parse(&self.vars)?;
        if self.xtrace {
            eprintln!("+ {}", statement);
        }

        let result = self.executor.execute(&statement, &mut self.vars)?;
        self.last_status = result.exit_code;
        Ok(Some(result))
    }
}
