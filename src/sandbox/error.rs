use super::SessionState;
use std::fmt;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Failed to read archive: {0}")]
    ArchiveRead(String),

    #[error("{op} failed for {path}: {source}")]
    Io {
        op: &'static str,
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("No such file or directory: {0}")]
    NotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Path escapes the sandbox: {0}")]
    EscapeAttempt(String),

    #[error("Invalid operand: {0}")]
    InvalidOperand(String),

    #[error("Destination path already exists: {0}")]
    AlreadyExists(String),

    #[error("Refusing to replace {0}: not a zipshell staging directory")]
    ForeignStaging(String),

    #[error("File too large: {size} bytes (max: {max})")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Filesystem is not available ({0})")]
    NotMaterialized(SessionState),
}

impl SandboxError {
    /// Adapter for `map_err` on filesystem calls
    pub(crate) fn io(op: &'static str, path: impl fmt::Display) -> impl FnOnce(io::Error) -> Self {
        let path = path.to_string();
        move |source| SandboxError::Io { op, path, source }
    }
}
