mod archive;
mod error;
mod state;


pub use archive::ExtractLimits;
pub use error::SandboxError;
pub use state::SessionState;

use crate::security::{Resolved, SandboxResolver, VirtualPath};
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Staging directory used when the configuration does not name one
pub const DEFAULT_STAGING_DIR: &str = "temp_filesystem";

/// Written beside the sandbox root; only marked staging directories are ever replaced
const STAGING_MARKER: &str = ".zipshell-staging";
const SANDBOX_DIR: &str = "root";

enum Lifecycle {
    Uninitialized,
    Materialized {
        staging: PathBuf,
        resolver: SandboxResolver,
    },
    TornDown,
}

/// Navigable filesystem confined to a directory expanded from an archive.
///
/// Every operand is resolved through a `SandboxResolver` before any real
/// filesystem call is made. The staging directory holds a marker file and
/// the sandbox root itself, so the marker is never visible to operations.
pub struct VirtualFilesystem {
    staging_dir: PathBuf,
    limits: ExtractLimits,
    lifecycle: Lifecycle,
    current: VirtualPath,
}

impl VirtualFilesystem {
    /// Create an uninitialized filesystem that will stage into `staging_dir`
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            limits: ExtractLimits::default(),
            lifecycle: Lifecycle::Uninitialized,
            current: VirtualPath::root(),
        }
    }

    /// Set maximum size of a single extracted file
    pub fn max_file_size(mut self, size: u64) -> Self {
        self.limits.max_file_size = size;
        self
    }

    /// Set maximum total extracted size
    pub fn max_total_size(mut self, size: u64) -> Self {
        self.limits.max_total_size = size;
        self
    }

    pub fn state(&self) -> SessionState {
        match self.lifecycle {
            Lifecycle::Uninitialized => SessionState::Uninitialized,
            Lifecycle::Materialized { .. } => SessionState::Materialized,
            Lifecycle::TornDown => SessionState::TornDown,
        }
    }

    /// Absolute sandbox root while materialized
    pub fn root(&self) -> Option<&Path> {
        match &self.lifecycle {
            Lifecycle::Materialized { resolver, .. } => Some(resolver.root()),
            _ => None,
        }
    }

    pub fn current_location(&self) -> &VirtualPath {
        &self.current
    }

    /// Expand `archive` into a fresh staging directory.
    ///
    /// A previous staging directory is removed first, but only if zipshell
    /// created it or it is empty. On failure the partially expanded tree is
    /// removed and the filesystem is left uninitialized, so the call can be
    /// retried.
    pub fn materialize(&mut self, archive: impl AsRef<Path>) -> Result<(), SandboxError> {
        let archive = archive.as_ref();
        let staging_label = self.staging_dir.display().to_string();

        // The live state survives a failed removal so teardown can still run
        self.clear_staging()?;
        self.lifecycle = Lifecycle::Uninitialized;
        self.current = VirtualPath::root();

        fs::create_dir_all(&self.staging_dir)
            .map_err(SandboxError::io("create staging directory", &staging_label))?;
        let staging = fs::canonicalize(&self.staging_dir)
            .map_err(SandboxError::io("create staging directory", &staging_label))?;

        match Self::populate(&staging, archive, self.limits) {
            Ok((root, entries)) => {
                info!(
                    archive = %archive.display(),
                    root = %root.display(),
                    entries,
                    "materialized sandbox"
                );
                self.lifecycle = Lifecycle::Materialized {
                    staging,
                    resolver: SandboxResolver::new(root),
                };
                Ok(())
            }
            Err(err) => {
                if let Err(cleanup) = fs::remove_dir_all(&staging) {
                    warn!(staging = %staging.display(), error = %cleanup, "failed to clean up staging directory");
                }
                Err(err)
            }
        }
    }

    fn populate(
        staging: &Path,
        archive: &Path,
        limits: ExtractLimits,
    ) -> Result<(PathBuf, usize), SandboxError> {
        let label = staging.display().to_string();
        fs::write(staging.join(STAGING_MARKER), b"")
            .map_err(SandboxError::io("create staging directory", &label))?;

        let root = staging.join(SANDBOX_DIR);
        fs::create_dir(&root).map_err(SandboxError::io("create staging directory", &label))?;

        let entries = archive::expand(archive, &root, limits)?;
        Ok((root, entries))
    }

    /// Remove a previous staging directory if it is safe to do so
    fn clear_staging(&self) -> Result<(), SandboxError> {
        let staging = &self.staging_dir;
        let label = staging.display().to_string();

        let meta = match fs::symlink_metadata(staging) {
            Ok(meta) => meta,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(SandboxError::io("inspect staging directory", &label)(err)),
        };

        if !meta.is_dir() {
            return Err(SandboxError::ForeignStaging(label));
        }

        if staging.join(STAGING_MARKER).is_file() {
            debug!(staging = %label, "removing previous staging directory");
            return fs::remove_dir_all(staging)
                .map_err(SandboxError::io("remove staging directory", &label));
        }

        let mut contents = fs::read_dir(staging)
            .map_err(SandboxError::io("inspect staging directory", &label))?;
        if contents.next().is_some() {
            warn!(staging = %label, "staging directory is not empty and has no marker");
            return Err(SandboxError::ForeignStaging(label));
        }

        Ok(())
    }

    /// Recursively remove the staging directory and the sandbox in it.
    ///
    /// On failure the filesystem stays materialized so the caller can retry.
    pub fn teardown(&mut self) -> Result<(), SandboxError> {
        let staging = match &self.lifecycle {
            Lifecycle::Materialized { staging, .. } => staging.clone(),
            _ => return Err(SandboxError::NotMaterialized(self.state())),
        };

        match fs::remove_dir_all(&staging) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                warn!(staging = %staging.display(), error = %err, "teardown failed");
                return Err(SandboxError::Io {
                    op: "teardown",
                    path: VirtualPath::root().to_string(),
                    source: err,
                });
            }
        }

        info!(staging = %staging.display(), "sandbox torn down");
        self.lifecycle = Lifecycle::TornDown;
        self.current = VirtualPath::root();
        Ok(())
    }

    /// Resolve `operand` against the current location
    pub fn resolve(&self, operand: &str) -> Result<Resolved, SandboxError> {
        self.resolver()?.resolve(&self.current, operand)
    }

    /// Names of the entries in the current location, in enumeration order
    pub fn list(&self) -> Result<Vec<String>, SandboxError> {
        let resolved = self.resolve("")?;
        if !resolved.real_path.is_dir() {
            return Err(SandboxError::NotADirectory(self.current.to_string()));
        }

        let entries = fs::read_dir(&resolved.real_path)
            .map_err(SandboxError::io("list", &resolved.virtual_path))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(SandboxError::io("list", &resolved.virtual_path))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }

        debug!(path = %resolved.virtual_path, count = names.len(), "list");
        Ok(names)
    }

    /// Move the current location. Leaves it untouched on any failure.
    pub fn change_directory(&mut self, operand: &str) -> Result<(), SandboxError> {
        let resolved = self.resolve(operand)?;
        if !resolved.real_path.is_dir() {
            return Err(SandboxError::NotFound(resolved.virtual_path.to_string()));
        }

        debug!(from = %self.current, to = %resolved.virtual_path, "change directory");
        self.current = resolved.virtual_path;
        Ok(())
    }

    /// Create a directory and any missing parents; existing directories are fine
    pub fn make_directory(&self, name: &str) -> Result<(), SandboxError> {
        let resolved = self.resolve(name)?;
        fs::create_dir_all(&resolved.real_path)
            .map_err(SandboxError::io("mkdir", &resolved.virtual_path))?;

        debug!(path = %resolved.virtual_path, "make directory");
        Ok(())
    }

    /// Create an empty file, truncating an existing one
    pub fn create_file(&self, name: &str) -> Result<(), SandboxError> {
        let resolved = self.resolve(name)?;
        File::create(&resolved.real_path)
            .map_err(SandboxError::io("touch", &resolved.virtual_path))?;

        debug!(path = %resolved.virtual_path, "create file");
        Ok(())
    }

    /// Rename `source` to `destination`.
    ///
    /// When `destination` is an existing directory the source is moved into
    /// it under its own name, unless that name is already taken there. The destination's parent is not pre-checked;
    /// the rename reports that itself. The current location is not updated
    /// if it was inside the moved entry.
    pub fn move_entry(&self, source: &str, destination: &str) -> Result<(), SandboxError> {
        let resolver = self.resolver()?;
        let from = resolver.resolve(&self.current, source)?;
        let to = resolver.resolve(&self.current, destination)?;

        let name = from
            .virtual_path
            .file_name()
            .ok_or_else(|| SandboxError::InvalidOperand(format!("cannot move {}", from.virtual_path)))?;

        if fs::symlink_metadata(&from.real_path).is_err() {
            return Err(SandboxError::NotFound(from.virtual_path.to_string()));
        }

        let to = if to.real_path.is_dir() {
            let inside = resolver.resolve(&to.virtual_path, name)?;
            if fs::symlink_metadata(&inside.real_path).is_ok() {
                return Err(SandboxError::AlreadyExists(inside.virtual_path.to_string()));
            }
            inside
        } else {
            to
        };

        fs::rename(&from.real_path, &to.real_path).map_err(SandboxError::io(
            "mv",
            format!("{} -> {}", from.virtual_path, to.virtual_path),
        ))?;

        debug!(from = %from.virtual_path, to = %to.virtual_path, "move");
        Ok(())
    }

    fn resolver(&self) -> Result<&SandboxResolver, SandboxError> {
        match &self.lifecycle {
            Lifecycle::Materialized { resolver, .. } => Ok(resolver),
            _ => Err(SandboxError::NotMaterialized(self.state())),
        }
    }
}
