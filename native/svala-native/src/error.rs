//! Error types for the preprocessing shell.
//!
//! The rewrite core itself never fails: malformed compiler output degrades the
//! result instead of signalling. Everything here comes from file-system access,
//! the external compiler process, configuration, or the optional output check.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PreprocessError>;

#[derive(Error, Debug)]
pub enum PreprocessError {
    /// File-system failure on a specific path
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The compiler process could not be started at all
    #[error("failed to spawn compiler `{command}`: {source}")]
    CompilerSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The compiler ran and exited unsuccessfully
    #[error("compiler `{command}` exited with {}: {output}", display_status(.status))]
    CompilerFailed {
        command: String,
        status: Option<i32>,
        output: String,
    },

    /// The compiler succeeded but an expected artifact is not on disk
    #[error("compiler artifact not found: {}", .path.display())]
    MissingArtifact { path: PathBuf },

    /// A dialect pattern failed to compile
    #[error("invalid dialect pattern `{field}`: {source}")]
    InvalidPattern {
        field: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The rewritten code failed the output check with `outputCheck: "deny"`
    #[error("rewritten script in {file} is not valid JavaScript: {}", .diagnostics.join("; "))]
    InvalidOutput {
        file: String,
        diagnostics: Vec<String>,
    },
}

fn display_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

impl PreprocessError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PreprocessError::Io {
            path: path.into(),
            source,
        }
    }
}
