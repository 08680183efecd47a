use crate::sandbox::SandboxError;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use tracing::warn;

pub struct PathSanitizer;

impl PathSanitizer {
    /// Sanitize an entry name from a ZIP archive to prevent:
    /// - Directory traversal (../)
    /// - Absolute paths (/etc/passwd)
    /// - Zip slip attacks
    ///
    /// Returns a normalized relative path or an error.
    pub fn sanitize(raw_path: &str) -> Result<String, SandboxError> {
        if raw_path.is_empty() {
            return Err(SandboxError::ArchiveRead("Empty entry path".to_string()));
        }

        let path = Path::new(raw_path);
        let mut components = Vec::new();

        for component in path.components() {
            match component {
                Component::Prefix(_) | Component::RootDir => {
                    return Err(SandboxError::ArchiveRead(format!(
                        "Absolute entry path not allowed: {}",
                        raw_path
                    )));
                }
                Component::ParentDir => {
                    return Err(SandboxError::ArchiveRead(format!(
                        "Parent directory traversal not allowed: {}",
                        raw_path
                    )));
                }
                Component::CurDir => continue,
                Component::Normal(part) => {
                    let part_str = part.to_str().ok_or_else(|| {
                        SandboxError::ArchiveRead(format!("Invalid UTF-8 in entry path: {:?}", part))
                    })?;
                    components.push(part_str);
                }
            }
        }

        if components.is_empty() {
            return Err(SandboxError::ArchiveRead(format!(
                "No valid components: {}",
                raw_path
            )));
        }

        Ok(components.join("/"))
    }
}

/// Logical location inside the virtual tree, always normalized.
///
/// Holds only plain name segments: no `.`, no `..`, no empty parts.
/// The root `/` is the empty segment list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VirtualPath {
    segments: Vec<String>,
}

impl VirtualPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a path relative to the virtual root.
    pub fn parse(raw: &str) -> Self {
        Self::root().join(raw)
    }

    /// Join an operand onto this path and normalize the result.
    ///
    /// A leading separator makes the operand relative to the virtual root.
    /// `..` above the root clamps to the root. Backslashes are treated as
    /// separators.
    pub fn join(&self, operand: &str) -> Self {
        let operand = operand.replace('\\', "/");
        let mut segments = if operand.starts_with('/') {
            Vec::new()
        } else {
            self.segments.clone()
        };

        for part in operand.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                name => segments.push(name.to_string()),
            }
        }

        Self { segments }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment, `None` for the root
    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

/// A confined mapping of a virtual path onto the sandbox directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub virtual_path: VirtualPath,
    pub real_path: PathBuf,
}

/// Maps virtual paths onto real paths under a single sandbox root.
///
/// Resolution is pure path algebra and never touches the filesystem.
#[derive(Debug, Clone)]
pub struct SandboxResolver {
    root: PathBuf,
}

impl SandboxResolver {
    /// `root` should be absolute; `VirtualFilesystem` passes a canonicalized path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: lexical_normalize(&root.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `operand` against `current`.
    ///
    /// An empty operand resolves to `current` itself. The result is either
    /// under the sandbox root or rejected with `EscapeAttempt`.
    pub fn resolve(&self, current: &VirtualPath, operand: &str) -> Result<Resolved, SandboxError> {
        let virtual_path = current.join(operand);
        let real_path = self.real_path(&virtual_path);

        if !lexical_normalize(&real_path).starts_with(&self.root) {
            warn!(operand, current = %current, "rejected path outside sandbox");
            return Err(SandboxError::EscapeAttempt(operand.to_string()));
        }

        Ok(Resolved {
            virtual_path,
            real_path,
        })
    }

    fn real_path(&self, virtual_path: &VirtualPath) -> PathBuf {
        let mut real = self.root.clone();
        for segment in virtual_path.segments() {
            real.push(segment);
        }
        real
    }
}

/// Resolve `.` and `..` without consulting the filesystem
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
