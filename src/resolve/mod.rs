//! Executable lookup.
//!
//! Resolution order:
//! - a name starting with `/` is used as is;
//! - a name containing `/` anywhere is joined onto the current directory;
//! - anything else is searched for in each directory of the search path, and
//!   the first regular file with execute permission wins.

use nix::unistd::{access, AccessFlags};
use std::env;
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{name}: command not found")]
    NotFound { name: String },

    #[error("{name}: cannot search for command, {var} is not set")]
    NoSearchPath { name: String, var: String },

    #[error("cannot determine current directory: {0}")]
    NoCurrentDir(#[source] io::Error),
}

#[derive(Debug, Clone)]
pub struct Resolver {
    var: String,
    search_path: Option<OsString>,
}

impl Resolver {
    /// Build a resolver over an explicit search path. `var` only names the
    /// variable in error messages.
    pub fn new(var: impl Into<String>, search_path: Option<OsString>) -> Self {
        Self {
            var: var.into(),
            search_path,
        }
    }

    /// Snapshot the search path from the process environment variable `var`.
    pub fn from_env(var: &str) -> Self {
        Self::new(var, env::var_os(var))
    }

    pub fn search_path(&self) -> Option<&OsStr> {
        self.search_path.as_deref()
    }

    pub fn resolve(&self, name: &str) -> Result<PathBuf, ResolveError> {
        if name.starts_with('/') {
            return Ok(PathBuf::from(name));
        }

        if name.contains('/') {
            let cwd = env::current_dir().map_err(ResolveError::NoCurrentDir)?;
            return Ok(cwd.join(name));
        }

        let search_path = self
            .search_path
            .as_deref()
            .ok_or_else(|| ResolveError::NoSearchPath {
                name: name.to_string(),
                var: self.var.clone(),
            })?;

        find_in_path(search_path, name).ok_or_else(|| ResolveError::NotFound {
            name: name.to_string(),
        })
    }
}

fn find_in_path(search_path: &OsStr, name: &str) -> Option<PathBuf> {
    for dir in env::split_paths(search_path) {
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            tracing::trace!(path = %candidate.display(), "found executable");
            return Some(candidate);
        }
    }
    None
}

fn is_executable(path: &Path) -> bool {
    let is_file = path.metadata().map(|m| m.is_file()).unwrap_or(false);
    is_file && access(path, AccessFlags::X_OK).is_ok()
}
