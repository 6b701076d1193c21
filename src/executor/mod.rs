pub mod pipeline;
pub mod process;

use crate::config::EngineConfig;
use crate::parser::ast::*;
use crate::resolve::{ResolveError, Resolver};
use crate::runtime::VariableStore;
use nix::errno::Errno;
use process::{spawn, ChildIo, ChildSet, Prepared};
use std::fs::File;
use std::io::{self, Read, Stdout, Write};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("failed to create pipe: {0}")]
    Pipe(#[source] io::Error),

    #[error("cannot open {} for writing: {source}", path.display())]
    OpenOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("fork failed: {0}")]
    Fork(#[source] Errno),

    #[error("failed to wait for pid {pid}: {source}")]
    Wait {
        pid: i32,
        #[source]
        source: Errno,
    },

    #[error("failed to read command output: {0}")]
    ReadOutput(#[source] io::Error),

    #[error("failed to write command output: {0}")]
    WriteOutput(#[source] io::Error),

    #[error("argument contains a NUL byte: {arg:?}")]
    InvalidArgument { arg: String },
}

/// Outcome of one statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionResult {
    pub strategy: Strategy,
    /// Exit code of the last command launched; 128+N for a signal death.
    pub exit_code: i32,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs classified statements as child processes.
///
/// Output that passes through the engine itself (a plain pipe) is written to
/// `out`; everything else goes straight from the children to their own
/// descriptors.
pub struct Executor<W: Write = Stdout> {
    resolver: Resolver,
    out: W,
    capture_limit: usize,
    pipe_buffer: usize,
}

impl Executor<Stdout> {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_output(config, io::stdout())
    }
}

impl<W: Write> Executor<W> {
    pub fn with_output(config: &EngineConfig, out: W) -> Self {
        Self {
            resolver: Resolver::from_env(&config.search_path_var),
            out,
            capture_limit: config.capture_limit,
            pipe_buffer: config.pipe_buffer,
        }
    }

    /// Replace the resolver, e.g. to pin a search path.
    pub fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Run one statement to completion: every child it spawns has been reaped
    /// when this returns, on success and on error.
    pub fn execute(
        &mut self,
        statement: &Statement,
        vars: &mut VariableStore,
    ) -> Result<ExecutionResult, ExecError> {
        let exit_code = match statement {
            Statement::Exec(command) => self.run_direct(command)?,
            Statement::Assign { name, command } => self.run_assign(name, command, vars)?,
            Statement::Redirect(command) => self.run_redirect(command)?,
            Statement::Pipe(p) => self.run_pipe(p)?,
            Statement::PipeRedirect(p) => self.run_pipe_redirect(p)?,
            Statement::PipeAssign { name, pipeline } => {
                self.run_pipe_assign(name, pipeline, vars)?
            }
        };

        Ok(ExecutionResult {
            strategy: statement.strategy(),
            exit_code,
        })
    }

    fn prepare(&self, command: &Command) -> Result<Prepared, ExecError> {
        let path = self.resolver.resolve(&command.name)?;
        tracing::debug!(name = %command.name, path = %path.display(), "resolved command");
        Prepared::new(&path, command)
    }

    fn run_direct(&mut self, command: &Command) -> Result<i32, ExecError> {
        let prepared = self.prepare(command)?;
        let mut children = ChildSet::new();
        children.push(spawn(&prepared, ChildIo::inherit())?);
        children.wait_all()
    }

    fn run_assign(
        &mut self,
        name: &str,
        command: &Command,
        vars: &mut VariableStore,
    ) -> Result<i32, ExecError> {
        let prepared = self.prepare(command)?;
        let mut children = ChildSet::new();
        let (mut reader, writer) = os_pipe::pipe().map_err(ExecError::Pipe)?;
        children.push(spawn(&prepared, ChildIo::stdout_to(writer.as_raw_fd()))?);
        drop(writer);

        let captured = read_bounded(&mut reader, self.capture_limit)?;
        drop(reader);
        let code = children.wait_all()?;

        vars.set_variable(name, strip_trailing_newline(captured));
        Ok(code)
    }

    fn run_redirect(&mut self, command: &Command) -> Result<i32, ExecError> {
        let OutputTarget::File(path) = &command.output else {
            return self.run_direct(command);
        };
        let prepared = self.prepare(command)?;

        let mut children = ChildSet::new();
        let file = open_output(path)?;
        children.push(spawn(&prepared, ChildIo::stdout_to(file.as_raw_fd()))?);
        drop(file);
        children.wait_all()
    }

    fn run_pipe(&mut self, p: &Pipeline) -> Result<i32, ExecError> {
        let producer = self.prepare(&p.producer)?;
        let consumer = self.prepare(&p.consumer)?;
        let (output, code) = pipeline::capture(&producer, &consumer, self.pipe_buffer)?;

        self.out.write_all(&output).map_err(ExecError::WriteOutput)?;
        self.out.flush().map_err(ExecError::WriteOutput)?;
        Ok(code)
    }

    fn run_pipe_redirect(&mut self, p: &Pipeline) -> Result<i32, ExecError> {
        let OutputTarget::File(path) = &p.consumer.output else {
            return self.run_pipe(p);
        };
        let producer = self.prepare(&p.producer)?;
        let consumer = self.prepare(&p.consumer)?;
        pipeline::to_file(&producer, &consumer, path)
    }

    fn run_pipe_assign(
        &mut self,
        name: &str,
        p: &Pipeline,
        vars: &mut VariableStore,
    ) -> Result<i32, ExecError> {
        let producer = self.prepare(&p.producer)?;
        let consumer = self.prepare(&p.consumer)?;
        let (output, code) = pipeline::capture(&producer, &consumer, self.pipe_buffer)?;

        let value = String::from_utf8_lossy(&output).into_owned();
        vars.set_variable(name, strip_trailing_newline(value));
        Ok(code)
    }
}

/// Create or truncate `path` for a child's stdout.
fn open_output(path: &Path) -> Result<File, ExecError> {
    File::create(path).map_err(|source| ExecError::OpenOutput {
        path: path.to_path_buf(),
        source,
    })
}

/// Keep at most `limit` bytes, then drain the rest so the writer is never
/// left blocked on a full pipe.
fn read_bounded(reader: &mut impl Read, limit: usize) -> Result<String, ExecError> {
    let mut buf = Vec::with_capacity(limit.min(64 * 1024));
    Read::take(&mut *reader, limit as u64)
        .read_to_end(&mut buf)
        .map_err(ExecError::ReadOutput)?;

    let dropped = io::copy(reader, &mut io::sink()).map_err(ExecError::ReadOutput)?;
    if dropped > 0 {
        tracing::warn!(limit, dropped, "captured output truncated");
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn strip_trailing_newline(mut value: String) -> String {
    if value.ends_with('\n') {
        value.pop();
    }
    value
}
