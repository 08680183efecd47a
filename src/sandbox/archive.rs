use super::SandboxError;
use crate::security::PathSanitizer;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

/// Size caps applied while expanding an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractLimits {
    pub max_file_size: u64,
    pub max_total_size: u64,
}

impl Default for ExtractLimits {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,   // 50 MB per file
            max_total_size: 500 * 1024 * 1024, // 500 MB total
        }
    }
}

/// Expand every entry of the ZIP archive at `archive_path` into `dest`.
///
/// Returns the number of entries written. Stops at the first bad entry;
/// the caller owns cleanup of `dest`.
pub(crate) fn expand(
    archive_path: &Path,
    dest: &Path,
    limits: ExtractLimits,
) -> Result<usize, SandboxError> {
    let file = File::open(archive_path).map_err(|e| {
        SandboxError::ArchiveRead(format!("{}: {}", archive_path.display(), e))
    })?;

    let mut archive = ZipArchive::new(BufReader::new(file))
        .map_err(|e| SandboxError::ArchiveRead(e.to_string()))?;

    let mut total: u64 = 0;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| SandboxError::ArchiveRead(e.to_string()))?;

        let relative = PathSanitizer::sanitize(entry.name())?;
        let target = dest.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(SandboxError::io("extract", &relative))?;
            continue;
        }

        // Declared sizes are checked up front, actual bytes again while copying
        let declared = entry.size();
        if declared > limits.max_file_size {
            return Err(SandboxError::FileTooLarge {
                size: declared,
                max: limits.max_file_size,
            });
        }
        if total + declared > limits.max_total_size {
            return Err(SandboxError::FileTooLarge {
                size: total + declared,
                max: limits.max_total_size,
            });
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(SandboxError::io("extract", &relative))?;
        }

        let mut out = File::create(&target).map_err(SandboxError::io("extract", &relative))?;
        let mut capped = (&mut entry).take(limits.max_file_size + 1);
        let written = io::copy(&mut capped, &mut out).map_err(|e| {
            SandboxError::ArchiveRead(format!("Failed to extract {}: {}", relative, e))
        })?;

        if written > limits.max_file_size {
            return Err(SandboxError::FileTooLarge {
                size: written,
                max: limits.max_file_size,
            });
        }

        total += written;
        if total > limits.max_total_size {
            return Err(SandboxError::FileTooLarge {
                size: total,
                max: limits.max_total_size,
            });
        }

        debug!(entry = %relative, size = written, "extracted");
    }

    Ok(archive.len())
}
