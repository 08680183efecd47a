// Public API exports
pub mod config;
pub mod sandbox;
pub mod security;
pub mod shell;

// Re-export main types for convenience
pub use config::{Config, ConfigError};
pub use sandbox::{
    ExtractLimits, SandboxError, SessionState, VirtualFilesystem, DEFAULT_STAGING_DIR,
};
pub use security::{PathSanitizer, Resolved, SandboxResolver, VirtualPath};
pub use shell::{Command, Outcome, Shell, ShellError};
