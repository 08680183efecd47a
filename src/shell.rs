//! Line-oriented front end over a `VirtualFilesystem`.

use crate::sandbox::{SandboxError, SessionState, VirtualFilesystem};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ShellError {
    #[error("{0}: missing argument")]
    MissingArgument(&'static str),

    #[error("{0}: missing arguments")]
    MissingArguments(&'static str),

    #[error(transparent)]
    Sandbox(#[from] SandboxError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    ChangeDirectory(String),
    MakeDirectory(String),
    CreateFile(String),
    Move { source: String, destination: String },
    Exit,
    Unknown(String),
}

impl Command {
    /// Parse one input line; `Ok(None)` for a blank line.
    ///
    /// Arguments are whitespace separated and extra ones are ignored.
    pub fn parse(line: &str) -> Result<Option<Self>, ShellError> {
        let mut parts = line.split_whitespace();
        let Some(cmd) = parts.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = parts.collect();

        let first = |name: &'static str| {
            args.first()
                .map(|a| a.to_string())
                .ok_or(ShellError::MissingArgument(name))
        };

        let command = match cmd {
            "ls" => Command::List,
            "cd" => Command::ChangeDirectory(first("cd")?),
            "mkdir" => Command::MakeDirectory(first("mkdir")?),
            "touch" => Command::CreateFile(first("touch")?),
            "mv" => match args.as_slice() {
                [source, destination, ..] => Command::Move {
                    source: source.to_string(),
                    destination: destination.to_string(),
                },
                _ => return Err(ShellError::MissingArguments("mv")),
            },
            "exit" => Command::Exit,
            other => Command::Unknown(other.to_string()),
        };

        Ok(Some(command))
    }
}

/// Rendered result of one input line
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Outcome {
    pub output: Vec<String>,
    pub exit: bool,
}

pub struct Shell {
    hostname: String,
    fs: VirtualFilesystem,
}

impl Shell {
    pub fn new(hostname: impl Into<String>, fs: VirtualFilesystem) -> Self {
        Self {
            hostname: hostname.into(),
            fs,
        }
    }

    pub fn filesystem(&self) -> &VirtualFilesystem {
        &self.fs
    }

    pub fn prompt(&self) -> String {
        format!("{}:{}$ ", self.hostname, self.fs.current_location())
    }

    /// Parse and run a line, rendering errors as `Error: ...` output
    pub fn execute_line(&mut self, line: &str) -> Outcome {
        let result = Command::parse(line).and_then(|command| match command {
            Some(command) => self.execute(command),
            None => Ok(Outcome::default()),
        });

        result.unwrap_or_else(|err| Outcome {
            output: vec![format!("Error: {}", err)],
            exit: false,
        })
    }

    pub fn execute(&mut self, command: Command) -> Result<Outcome, ShellError> {
        debug!(?command, "execute");

        let output = match command {
            Command::List => self.fs.list()?,
            Command::ChangeDirectory(path) => {
                self.fs.change_directory(&path)?;
                Vec::new()
            }
            Command::MakeDirectory(name) => {
                self.fs.make_directory(&name)?;
                Vec::new()
            }
            Command::CreateFile(name) => {
                self.fs.create_file(&name)?;
                Vec::new()
            }
            Command::Move {
                source,
                destination,
            } => {
                self.fs.move_entry(&source, &destination)?;
                Vec::new()
            }
            Command::Exit => {
                let output = match self.shutdown() {
                    Ok(()) => Vec::new(),
                    Err(err) => vec![format!("Error: {}", err)],
                };
                return Ok(Outcome { output, exit: true });
            }
            Command::Unknown(cmd) => vec![format!("Unknown command: {}", cmd)],
        };

        Ok(Outcome {
            output,
            exit: false,
        })
    }

    /// Tear the sandbox down if it is still live
    pub fn shutdown(&mut self) -> Result<(), SandboxError> {
        if self.fs.state() == SessionState::Materialized {
            self.fs.teardown()?;
        }
        Ok(())
    }
}
