//! Engine configuration.
//!
//! Read from the environment, then adjusted by command-line flags:
//! - LINESH_MAX_LINE (bytes kept per input line, default 4096)
//! - LINESH_CAPTURE_LIMIT (bytes kept by `NAME = cmd`, default 4096)
//! - LINESH_PIPE_BUFFER (initial pipe capture buffer, default 1024)
//! - LINESH_PATH_VAR (variable holding the search path, default PATH)
//! - LINESH_XTRACE (echo each statement to stderr before running it)
//! - LINESH_ERROR_FORMAT (`json` for machine-readable error reports)
//!
//! LINESH_LOG is not read here; it is handed to the log filter directly.

use anyhow::{anyhow, bail, Context, Result};

pub const DEFAULT_MAX_LINE: usize = 4096;
pub const DEFAULT_CAPTURE_LIMIT: usize = 4096;
pub const DEFAULT_PIPE_BUFFER: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Longer input lines are truncated to this many bytes.
    pub max_line_len: usize,
    /// Upper bound on what an assignment keeps from its command's output.
    pub capture_limit: usize,
    /// Starting size of the buffer a pipe's output is collected into.
    pub pipe_buffer: usize,
    /// Environment variable the executable search path is read from.
    pub search_path_var: String,
    /// Print `+ statement` to stderr before each statement.
    pub xtrace: bool,
    /// Report fatal errors as a JSON object instead of a text line.
    pub json_errors: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_line_len: DEFAULT_MAX_LINE,
            capture_limit: DEFAULT_CAPTURE_LIMIT,
            pipe_buffer: DEFAULT_PIPE_BUFFER,
            search_path_var: "PATH".to_string(),
            xtrace: false,
            json_errors: false,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Build a configuration from `(key, value)` pairs; unrelated keys are ignored.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();

        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref().trim());
            match key {
                "LINESH_MAX_LINE" => config.max_line_len = parse_size(key, value)?,
                "LINESH_CAPTURE_LIMIT" => config.capture_limit = parse_size(key, value)?,
                "LINESH_PIPE_BUFFER" => config.pipe_buffer = parse_size(key, value)?,
                "LINESH_PATH_VAR" => {
                    if value.is_empty() {
                        bail!("{} must not be empty", key);
                    }
                    config.search_path_var = value.to_string();
                }
                "LINESH_XTRACE" => config.xtrace = parse_flag(key, value)?,
                "LINESH_ERROR_FORMAT" => config.json_errors = value.eq_ignore_ascii_case("json"),
                _ => {}
            }
        }

        Ok(config)
    }

    pub fn with_xtrace(mut self, xtrace: bool) -> Self {
        self.xtrace = xtrace;
        self
    }

    pub fn with_json_errors(mut self, json_errors: bool) -> Self {
        self.json_errors = json_errors;
        self
    }

    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len;
        self
    }

    pub fn with_capture_limit(mut self, capture_limit: usize) -> Self {
        self.capture_limit = capture_limit;
        self
    }
}

fn parse_size(key: &str, value: &str) -> Result<usize> {
    let size: usize = value
        .parse()
        .with_context(|| format!("{} must be a number of bytes, got '{}'", key, value))?;
    if size == 0 {
        bail!("{} must be greater than zero", key);
    }
    Ok(size)
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        _ => Err(anyhow!("{} must be a boolean, got '{}'", key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_vars(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.max_line_len, 4096);
        assert_eq!(config.search_path_var, "PATH");
        assert!(!config.xtrace);
    }

    #[test]
    fn test_reads_known_keys() {
        let config = EngineConfig::from_vars([
            ("LINESH_MAX_LINE", "128"),
            ("LINESH_CAPTURE_LIMIT", "64"),
            ("LINESH_PIPE_BUFFER", " 32 "),
            ("LINESH_PATH_VAR", "MY_PATH"),
            ("LINESH_XTRACE", "yes"),
            ("LINESH_ERROR_FORMAT", "JSON"),
            ("HOME", "/root"),
        ])
        .unwrap();

        assert_eq!(config.max_line_len, 128);
        assert_eq!(config.capture_limit, 64);
        assert_eq!(config.pipe_buffer, 32);
        assert_eq!(config.search_path_var, "MY_PATH");
        assert!(config.xtrace);
        assert!(config.json_errors);
    }

    #[test]
    fn test_error_format_other_than_json_is_text() {
        let config = EngineConfig::from_vars([("LINESH_ERROR_FORMAT", "text")]).unwrap();
        assert!(!config.json_errors);
    }

    #[test]
    fn test_invalid_values() {
        let err = EngineConfig::from_vars([("LINESH_MAX_LINE", "lots")]).unwrap_err();
        assert!(err.to_string().contains("LINESH_MAX_LINE"));

        assert!(EngineConfig::from_vars([("LINESH_PIPE_BUFFER", "0")]).is_err());
        assert!(EngineConfig::from_vars([("LINESH_XTRACE", "maybe")]).is_err());
        assert!(EngineConfig::from_vars([("LINESH_PATH_VAR", "")]).is_err());
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::default()
            .with_xtrace(true)
            .with_json_errors(true)
            .with_max_line_len(10)
            .with_capture_limit(5);
        assert!(config.xtrace);
        assert!(config.json_errors);
        assert_eq!(config.max_line_len, 10);
        assert_eq!(config.capture_limit, 5);
    }
}
