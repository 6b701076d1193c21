//! Fork/exec and child reaping.
//!
//! Every descriptor the engine opens (pipe ends from `os_pipe`, files from
//! `std::fs`) is close-on-exec, so a child only keeps the descriptors it
//! explicitly `dup2`s onto its standard streams. The parent's copies are
//! `OwnedFd`-backed values closed by drop.

use super::ExecError;
use crate::parser::ast::Command;
use nix::errno::Errno;
use nix::sys::signal::{signal, SigHandler, Signal};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{dup2, execv, fork, write, ForkResult, Pid};
use std::ffi::CString;
use std::io::{self, Write};
use std::os::fd::RawFd;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

/// Status a child leaves with when `exec` itself fails.
pub const EXEC_FAILED: i32 = 127;

/// A command ready to be exec'd: everything is converted before forking so
/// the child does no allocation of its own on the success path.
#[derive(Debug)]
pub struct Prepared {
    path: CString,
    argv: Vec<CString>,
}

impl Prepared {
    pub fn new(path: &Path, command: &Command) -> Result<Self, ExecError> {
        let path = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
            ExecError::InvalidArgument {
                arg: path.display().to_string(),
            }
        })?;
        let argv = command
            .argv()
            .map(|arg| {
                CString::new(arg).map_err(|_| ExecError::InvalidArgument {
                    arg: arg.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { path, argv })
    }

    pub fn path(&self) -> &CString {
        &self.path
    }
}

/// Descriptors to install as the child's stdin/stdout. `None` inherits ours.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChildIo {
    pub stdin: Option<RawFd>,
    pub stdout: Option<RawFd>,
}

impl ChildIo {
    pub fn inherit() -> Self {
        Self::default()
    }

    pub fn stdout_to(fd: RawFd) -> Self {
        Self {
            stdin: None,
            stdout: Some(fd),
        }
    }
}

/// Fork and exec `prepared`. Returns the child's pid in the parent; the child
/// never returns from here.
pub fn spawn(prepared: &Prepared, io: ChildIo) -> Result<Pid, ExecError> {
    // Buffered output would otherwise be flushed a second time by the child.
    let _ = io::stdout().flush();

    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => {
            tracing::debug!(pid = child.as_raw(), path = ?prepared.path, "spawned child");
            Ok(child)
        }
        Ok(ForkResult::Child) => exec_child(prepared, io),
        Err(e) => Err(ExecError::Fork(e)),
    }
}

fn exec_child(prepared: &Prepared, io: ChildIo) -> ! {
    // The Rust runtime ignores SIGPIPE and exec would carry that over.
    let _ = unsafe { signal(Signal::SIGPIPE, SigHandler::SigDfl) };

    let redirected = io
        .stdin
        .map_or(Ok(()), |fd| dup2(fd, libc::STDIN_FILENO).map(drop))
        .and_then(|_| {
            io.stdout
                .map_or(Ok(()), |fd| dup2(fd, libc::STDOUT_FILENO).map(drop))
        });

    let err = match redirected {
        Err(e) => e,
        Ok(()) => match execv(&prepared.path, &prepared.argv) {
            Err(e) => e,
            Ok(never) => match never {},
        },
    };

    let message = format!(
        "linesh: error executing {}: {}\n",
        prepared.path.to_string_lossy(),
        err
    );
    // Raw write: the std stderr lock may have been held by another thread at fork time.
    let _ = write(io::stderr(), message.as_bytes());
    // Skip atexit handlers and stdio flushing: this is a copy of the parent.
    unsafe { libc::_exit(EXEC_FAILED) }
}

/// Children spawned for one statement.
///
/// [`ChildSet::wait_all`] reaps them in launch order. Whatever has not been
/// reaped when the set is dropped (an early return on error) is reaped then,
/// so no statement leaves a zombie behind.
#[derive(Debug, Default)]
pub struct ChildSet {
    pids: Vec<Pid>,
}

impl ChildSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pid: Pid) {
        self.pids.push(pid);
    }

    pub fn len(&self) -> usize {
        self.pids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }

    /// Wait for every child. Returns the exit code of the last one launched.
    pub fn wait_all(mut self) -> Result<i32, ExecError> {
        let mut last = 0;
        let mut failure = None;
        for pid in std::mem::take(&mut self.pids) {
            match wait_for(pid) {
                Ok(code) => last = code,
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(last),
        }
    }
}

impl Drop for ChildSet {
    fn drop(&mut self) {
        for pid in self.pids.drain(..) {
            if let Err(e) = wait_for(pid) {
                tracing::warn!(pid = pid.as_raw(), error = %e, "failed to reap child");
            }
        }
    }
}

fn wait_for(pid: Pid) -> Result<i32, ExecError> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => {
                tracing::debug!(pid = pid.as_raw(), code, "child exited");
                return Ok(code);
            }
            Ok(WaitStatus::Signaled(_, sig, _)) => {
                tracing::debug!(pid = pid.as_raw(), signal = ?sig, "child killed by signal");
                return Ok(128 + sig as i32);
            }
            Ok(_) | Err(Errno::EINTR) => continue,
            Err(source) => {
                return Err(ExecError::Wait {
                    pid: pid.as_raw(),
                    source,
                })
            }
        }
    }
}
